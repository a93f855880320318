use anyhow::Result;
use chrono::Utc;
use cronwatch_common::types::Job;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    TransactionTrait,
};

use crate::entities::{alert, job, job_run, rule};
use crate::store::MonitorStore;

/// Parameters for creating a job. The ping key is generated by the caller
/// (it must be unguessable and unique); the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub ping_key: String,
    pub schedule: String,
    pub timezone: String,
    pub grace_minutes: i32,
    pub owner_id: String,
}

fn to_job(m: job::Model) -> Job {
    Job {
        id: m.id,
        name: m.name,
        ping_key: m.ping_key,
        schedule: m.schedule,
        timezone: m.timezone,
        grace_minutes: m.grace_minutes,
        owner_id: m.owner_id,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

impl MonitorStore {
    pub async fn insert_job(&self, new: &NewJob) -> Result<Job> {
        let now = Utc::now().fixed_offset();
        let am = job::ActiveModel {
            id: Set(cronwatch_common::id::next_id()),
            name: Set(new.name.clone()),
            ping_key: Set(new.ping_key.clone()),
            schedule: Set(new.schedule.clone()),
            timezone: Set(new.timezone.clone()),
            grace_minutes: Set(new.grace_minutes),
            owner_id: Set(new.owner_id.clone()),
            created_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_job(model))
    }

    /// Owner-scoped lookup used by the management API.
    pub async fn get_job(&self, id: &str, owner_id: &str) -> Result<Option<Job>> {
        let model = job::Entity::find_by_id(id)
            .filter(job::Column::OwnerId.eq(owner_id))
            .one(self.db())
            .await?;
        Ok(model.map(to_job))
    }

    /// Resolves a job from its ping key. This is the ping-ingestion path's
    /// only authentication: the key itself is the capability.
    pub async fn get_job_by_ping_key(&self, ping_key: &str) -> Result<Option<Job>> {
        let model = job::Entity::find()
            .filter(job::Column::PingKey.eq(ping_key))
            .one(self.db())
            .await?;
        Ok(model.map(to_job))
    }

    pub async fn list_jobs(&self, owner_id: &str) -> Result<Vec<Job>> {
        let rows = job::Entity::find()
            .filter(job::Column::OwnerId.eq(owner_id))
            .order_by(job::Column::CreatedAt, Order::Desc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_job).collect())
    }

    /// Every job, regardless of owner. Used by the missed-run scanner.
    pub async fn list_all_jobs(&self) -> Result<Vec<Job>> {
        let rows = job::Entity::find()
            .order_by(job::Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_job).collect())
    }

    /// Deletes a job and everything it owns (runs, rules, alerts).
    ///
    /// The cascade is explicit and transactional rather than relying on
    /// the SQLite foreign_keys pragma being active on every pooled
    /// connection. Returns false when the job does not exist or belongs to
    /// a different owner (nothing is touched in that case).
    pub async fn delete_job(&self, id: &str, owner_id: &str) -> Result<bool> {
        let owned = job::Entity::find_by_id(id)
            .filter(job::Column::OwnerId.eq(owner_id))
            .one(self.db())
            .await?;
        if owned.is_none() {
            return Ok(false);
        }

        let txn = self.db.begin().await?;
        alert::Entity::delete_many()
            .filter(alert::Column::JobId.eq(id))
            .exec(&txn)
            .await?;
        rule::Entity::delete_many()
            .filter(rule::Column::JobId.eq(id))
            .exec(&txn)
            .await?;
        job_run::Entity::delete_many()
            .filter(job_run::Column::JobId.eq(id))
            .exec(&txn)
            .await?;
        let res = job::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        Ok(res.rows_affected > 0)
    }

    /// Seconds elapsed since the job was created, on the store's clock.
    pub async fn seconds_since_job_created(&self, id: &str) -> Result<Option<i64>> {
        let Some(model) = job::Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let now = self.clock_now().await?;
        Ok(Some(now - model.created_at.timestamp()))
    }
}
