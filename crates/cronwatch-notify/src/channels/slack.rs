use crate::message::{rfc3339, Notification};
use crate::NotificationChannel;
use anyhow::Result;
use async_trait::async_trait;

/// Chat webhook alert. Posts a JSON object with a single `text` field, the
/// shape Slack-compatible incoming webhooks expect.
pub struct SlackChannel {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackChannel {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.to_string(),
        }
    }

    pub fn render_text(notification: &Notification) -> String {
        let (status, time, run_id) = match notification {
            Notification::RuleViolation { run, .. } => (
                run.status.clone(),
                rfc3339(run.created_at),
                run.id.clone(),
            ),
            Notification::MissedRun { .. } => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        format!(
            "\u{1F6A8} Cron Alert\n\nJob: {job}\nStatus: {status}\nTime: {time}\n\nIssue:\n{message}\n\nRun ID: {run_id}",
            job = notification.job().name,
            status = status,
            time = time,
            message = notification.message(),
            run_id = run_id,
        )
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let payload = serde_json::json!({ "text": Self::render_text(notification) });

        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Slack webhook returned HTTP {status}");
        }
        tracing::debug!(job = %notification.job().name, "Slack alert sent");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "slack"
    }
}
