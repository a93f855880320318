//! Threshold rule evaluation over reported run metrics.
//!
//! Evaluation is a pure function of a run's metric map and one
//! [`evaluator::CompareOp`]-based rule: no I/O, no clock, no state.
//! Missing or non-numeric metrics never trigger a violation.

pub mod evaluator;


pub use evaluator::{evaluate, CompareOp, Evaluation};
