use anyhow::Result;
use chrono::Utc;
use cronwatch_common::types::Alert;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::alert;
use crate::store::MonitorStore;

fn to_alert(m: alert::Model) -> Alert {
    Alert {
        id: m.id,
        job_id: m.job_id,
        run_id: m.run_id,
        message: m.message,
        sent_at: m.sent_at.with_timezone(&Utc),
    }
}

impl MonitorStore {
    /// Writes the alert row. This is the durability gate for notification
    /// fan-out: callers must not notify unless this succeeds.
    pub async fn insert_alert(
        &self,
        job_id: &str,
        run_id: Option<&str>,
        message: &str,
    ) -> Result<Alert> {
        let now = Utc::now().fixed_offset();
        let am = alert::ActiveModel {
            id: Set(cronwatch_common::id::next_id()),
            job_id: Set(job_id.to_string()),
            run_id: Set(run_id.map(str::to_string)),
            message: Set(message.to_string()),
            sent_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_alert(model))
    }

    /// Whether an alert with this exact message was already sent for the
    /// job within the trailing `window_secs` window (store clock). The
    /// missed-run path uses this as its dedup key.
    pub async fn recent_alert_exists(
        &self,
        job_id: &str,
        message: &str,
        window_secs: u64,
    ) -> Result<bool> {
        let latest = alert::Entity::find()
            .filter(alert::Column::JobId.eq(job_id))
            .filter(alert::Column::Message.eq(message))
            .order_by(alert::Column::SentAt, Order::Desc)
            .one(self.db())
            .await?;
        let Some(latest) = latest else {
            return Ok(false);
        };
        let now = self.clock_now().await?;
        Ok(now - latest.sent_at.timestamp() < window_secs as i64)
    }

    pub async fn list_alerts(&self, job_id: &str, limit: u64) -> Result<Vec<Alert>> {
        let rows = alert::Entity::find()
            .filter(alert::Column::JobId.eq(job_id))
            .order_by(alert::Column::SentAt, Order::Desc)
            .limit(limit)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_alert).collect())
    }
}
