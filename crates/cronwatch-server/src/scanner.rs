use crate::alerting;
use anyhow::Result;
use cronwatch_common::types::Job;
use cronwatch_notify::manager::NotificationManager;
use cronwatch_storage::MonitorStore;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Timer-driven sweep that flags jobs that stopped reporting.
///
/// One global liveness threshold applies to every job; the per-job
/// schedule/grace fields are advisory and not consulted here. Elapsed
/// time is measured on the store's clock.
pub struct MissedRunScanner {
    store: Arc<MonitorStore>,
    notifier: Arc<NotificationManager>,
    tick_secs: u64,
    threshold_secs: u64,
}

impl MissedRunScanner {
    pub fn new(
        store: Arc<MonitorStore>,
        notifier: Arc<NotificationManager>,
        tick_secs: u64,
        threshold_secs: u64,
    ) -> Self {
        Self {
            store,
            notifier,
            tick_secs,
            threshold_secs,
        }
    }

    pub async fn run(&self) {
        tracing::info!(
            tick_secs = self.tick_secs,
            threshold_secs = self.threshold_secs,
            "Missed-run scanner started"
        );

        let mut tick = interval(Duration::from_secs(self.tick_secs));
        loop {
            tick.tick().await;
            if let Err(e) = self.sweep().await {
                tracing::error!(error = %e, "Missed-run sweep failed");
            }
        }
    }

    /// One pass over every job. The failure domain is per-job: each check
    /// runs in its own task, and an error or panic in one job's check is
    /// logged and never aborts the rest of the sweep.
    pub async fn sweep(&self) -> Result<()> {
        let jobs = self.store.list_all_jobs().await?;

        for job in jobs {
            let store = self.store.clone();
            let notifier = self.notifier.clone();
            let threshold = self.threshold_secs;
            let name = job.name.clone();

            let handle = tokio::spawn(async move {
                if let Err(e) = check_job(&store, &notifier, &job, threshold).await {
                    tracing::error!(job = %job.name, error = %e, "Missed-run check failed");
                }
            });
            if let Err(e) = handle.await {
                tracing::error!(job = %name, error = %e, "Missed-run check task panicked");
            }
        }

        Ok(())
    }
}

async fn check_job(
    store: &MonitorStore,
    notifier: &NotificationManager,
    job: &Job,
    threshold_secs: u64,
) -> Result<()> {
    let (elapsed, last_known_run) = match store.seconds_since_last_run(&job.id).await? {
        Some(elapsed) => {
            // Fetch the pretty timestamp for notification display only.
            let last = store
                .latest_run(&job.id)
                .await
                .ok()
                .flatten()
                .map(|run| run.created_at);
            (elapsed, last)
        }
        // Never ran: measure from job creation instead.
        None => match store.seconds_since_job_created(&job.id).await? {
            Some(elapsed) => (elapsed, None),
            // Job vanished between the listing and now.
            None => return Ok(()),
        },
    };

    if elapsed > threshold_secs as i64 {
        tracing::info!(
            job = %job.name,
            elapsed_secs = elapsed,
            threshold_secs,
            "Job missed its reporting window"
        );
        alerting::dispatch_missed_run_alert(store, notifier, job, last_known_run, threshold_secs)
            .await;
    } else {
        tracing::debug!(job = %job.name, elapsed_secs = elapsed, "Job within window");
    }

    Ok(())
}
