use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

pub mod alert;
pub mod job;
pub mod rule;
pub mod run;
pub mod stats;

pub use job::NewJob;

/// Unified access layer over the monitoring database.
///
/// All methods are `async fn` on top of SeaORM + SQLite. Lookups that can
/// legitimately miss return `Ok(None)`; only infrastructure failures are
/// errors.
pub struct MonitorStore {
    pub(crate) db: DatabaseConnection,
}

impl MonitorStore {
    /// Connects and initializes the monitoring database.
    ///
    /// `db_url` is a full connection URL provided by the server config,
    /// e.g. `sqlite://data/cronwatch.db?mode=rwc`. Pending migrations from
    /// the `migration` crate run automatically.
    pub async fn new(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
            db.execute_unprepared("PRAGMA foreign_keys=ON;").await?;
        }

        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized monitor store");

        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Current time according to the store's own clock, as Unix seconds.
    ///
    /// Staleness windows (duplicate pings, missed runs, alert dedup) are
    /// measured against this clock rather than the process clock, so a
    /// skewed engine host cannot shift them.
    pub async fn clock_now(&self) -> Result<i64> {
        let stmt = Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT CAST(strftime('%s','now') AS INTEGER) AS now_secs",
        );
        let row = self
            .db
            .query_one(stmt)
            .await?
            .ok_or_else(|| anyhow::anyhow!("store clock query returned no row"))?;
        Ok(row.try_get::<i64>("", "now_secs")?)
    }
}
