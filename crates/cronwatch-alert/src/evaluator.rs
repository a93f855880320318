use cronwatch_common::types::Rule;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Comparison operator of a threshold rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            ">" => Ok(Self::Gt),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq => write!(f, "=="),
            Self::Ne => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Gt => write!(f, ">"),
        }
    }
}

impl CompareOp {
    /// Applies the operator with plain IEEE float comparison. `Eq` and
    /// `Ne` are exact: no epsilon tolerance, so fractional metrics can
    /// miss an `==` rule they visually satisfy. Known limitation.
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Eq => value == threshold,
            Self::Ne => value != threshold,
            Self::Lt => value < threshold,
            Self::Gt => value > threshold,
        }
    }
}

/// Outcome of evaluating one rule against one run's metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub violated: bool,
    /// The coerced numeric value of the inspected metric; 0.0 when the
    /// metric was absent or non-numeric.
    pub value: f64,
}

impl Evaluation {
    const NOOP: Evaluation = Evaluation {
        violated: false,
        value: 0.0,
    };
}

fn to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Evaluates `rule` against a run's reported metrics.
///
/// A metric that is missing from the map, or present but not numeric,
/// never violates — the result is `(violated: false, value: 0.0)`.
/// An operator string outside `==`, `!=`, `<`, `>` is treated the same
/// way (the rule CRUD layer whitelists operators before storage).
pub fn evaluate(metrics: &Map<String, Value>, rule: &Rule) -> Evaluation {
    let Some(raw) = metrics.get(&rule.metric_name) else {
        return Evaluation::NOOP;
    };
    let Some(value) = to_f64(raw) else {
        return Evaluation::NOOP;
    };
    let Ok(op) = CompareOp::from_str(&rule.operator) else {
        return Evaluation::NOOP;
    };

    Evaluation {
        violated: op.check(value, rule.threshold_value),
        value,
    }
}
