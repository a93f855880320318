use crate::message::{last_good_block, rfc3339, Notification};
use crate::NotificationChannel;
use anyhow::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP alert mail. Built only when the `[notify.email]` config section is
/// present; an unconfigured deployment has no email channel at all.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: String,
}

impl EmailChannel {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
        to: &str,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?.port(smtp_port);

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    pub fn subject(notification: &Notification) -> String {
        match notification {
            Notification::RuleViolation {
                job,
                run,
                metric_name,
                ..
            } => {
                let mut subject = if run.status == "fail" {
                    format!("[CRITICAL] {} failed", job.name)
                } else {
                    format!("[WARNING] {} ran but produced suspicious output", job.name)
                };
                if subject.len() + metric_name.len() + 10 < 80 {
                    subject.push_str(&format!(" ({metric_name})"));
                }
                subject
            }
            Notification::MissedRun { job, .. } => {
                format!("[CRITICAL] {} did not run", job.name)
            }
        }
    }

    pub fn body(notification: &Notification) -> String {
        match notification {
            Notification::RuleViolation {
                job,
                run,
                metric_name,
                operator,
                threshold,
                actual,
                message,
                last_good,
            } => {
                let explanation = if run.status == "fail" {
                    format!(
                        "The job failed to complete successfully (Status: {}).",
                        run.status
                    )
                } else {
                    format!(
                        "This job ran successfully, but the output indicates a problem.\nIt returned {metric_name} {actual}, while your rule expects {metric_name} {operator} {threshold}."
                    )
                };
                let metrics_json = serde_json::to_string_pretty(&run.metrics)
                    .unwrap_or_else(|_| "{}".to_string());

                format!(
                    "{subject}\n\n{explanation}\n\nJOB SUMMARY:\nJob: {job_name}\nStatus: {status}\nTime: {time}\n\nWHAT WENT WRONG:\nRule violated: {message}\nActual value: {actual}\n\nLAST SUCCESSFUL RUN:\n{last_good}\n\nCURRENT RUN METRICS:\nDuration: {duration}ms\nMetrics: {metrics}\n\nSTDERR:\n{stderr}\n\n---\nRun ID: {run_id}",
                    subject = Self::subject(notification),
                    explanation = explanation,
                    job_name = job.name,
                    status = run.status,
                    time = rfc3339(run.created_at),
                    message = message,
                    actual = actual,
                    last_good = last_good_block(last_good.as_ref()),
                    duration = run.duration_ms,
                    metrics = metrics_json,
                    stderr = run.stderr,
                    run_id = run.id,
                )
            }
            Notification::MissedRun {
                job,
                last_known_run,
                ..
            } => {
                let last_known = match last_known_run {
                    Some(ts) => rfc3339(*ts),
                    None => "Never ran".to_string(),
                };
                format!(
                    "Job: {job_name}\n\nThis job did not report any runs within the expected time window.\n\nLast known run:\n{last_known}\n\nThis usually means:\n- Cron did not execute\n- Server was down\n- Script failed before startup\n\nPlease investigate immediately.",
                    job_name = job.name,
                    last_known = last_known,
                )
            }
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(self.to.parse()?)
            .subject(Self::subject(notification))
            .header(ContentType::TEXT_PLAIN)
            .body(Self::body(notification))?;

        self.transport.send(email).await?;
        tracing::debug!(job = %notification.job().name, "Alert email sent");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}
