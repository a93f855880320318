use anyhow::Result;
use chrono::Utc;
use cronwatch_common::types::{Rule, Severity};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};
use std::str::FromStr;

use crate::entities::rule;
use crate::store::MonitorStore;

fn to_rule(m: rule::Model) -> Rule {
    // Severity was whitelisted at creation time; fall back to warning if a
    // row predates the whitelist.
    let severity = Severity::from_str(&m.severity).unwrap_or(Severity::Warning);
    Rule {
        id: m.id,
        job_id: m.job_id,
        metric_name: m.metric_name,
        operator: m.operator,
        threshold_value: m.threshold_value,
        severity,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

impl MonitorStore {
    pub async fn insert_rule(
        &self,
        job_id: &str,
        metric_name: &str,
        operator: &str,
        threshold_value: f64,
        severity: Severity,
    ) -> Result<Rule> {
        let now = Utc::now().fixed_offset();
        let am = rule::ActiveModel {
            id: Set(cronwatch_common::id::next_id()),
            job_id: Set(job_id.to_string()),
            metric_name: Set(metric_name.to_string()),
            operator: Set(operator.to_string()),
            threshold_value: Set(threshold_value),
            severity: Set(severity.to_string()),
            created_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_rule(model))
    }

    pub async fn rules_for_job(&self, job_id: &str) -> Result<Vec<Rule>> {
        let rows = rule::Entity::find()
            .filter(rule::Column::JobId.eq(job_id))
            .order_by(rule::Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_rule).collect())
    }

    pub async fn delete_rule(&self, id: &str) -> Result<bool> {
        let res = rule::Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }
}
