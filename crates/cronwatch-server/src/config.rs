use cronwatch_notify::channels::email::EmailChannel;
use cronwatch_notify::channels::slack::SlackChannel;
use cronwatch_notify::manager::NotificationManager;
use cronwatch_notify::NotificationChannel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// CORS allowed origins; empty allows every origin (development mode).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ping: PingConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            cors_allowed_origins: Vec::new(),
            database: DatabaseConfig::default(),
            ping: PingConfig::default(),
            scanner: ScannerConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL, e.g. `sqlite://data/cronwatch.db?mode=rwc`.
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Local data directory holding the SQLite file; created on startup.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingConfig {
    /// Trailing window within which a repeat ping for the same job is a
    /// suppressed duplicate.
    #[serde(default = "default_duplicate_window_secs")]
    pub duplicate_window_secs: u64,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            duplicate_window_secs: default_duplicate_window_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_scanner_enabled")]
    pub enabled: bool,
    /// Sweep period, independent of any job's own declared schedule.
    #[serde(default = "default_scanner_tick_secs")]
    pub tick_secs: u64,
    /// Global liveness threshold applied to every job.
    #[serde(default = "default_missed_threshold_secs")]
    pub missed_threshold_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scanner_enabled(),
            tick_secs: default_scanner_tick_secs(),
            missed_threshold_secs: default_missed_threshold_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// SMTP settings; when absent the email channel is inert.
    #[serde(default)]
    pub email: Option<EmailConfig>,
    /// Chat webhook URL; when absent the chat channel is inert.
    #[serde(default)]
    pub slack_webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    pub from: String,
    pub to: String,
}

impl NotifyConfig {
    /// Builds the channel set from whatever is configured. Unconfigured
    /// channels are simply absent; a channel whose transport cannot be
    /// constructed is logged and skipped rather than failing startup.
    pub fn build_manager(&self) -> NotificationManager {
        let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

        if let Some(email) = &self.email {
            match EmailChannel::new(
                &email.smtp_host,
                email.smtp_port,
                email.smtp_username.as_deref(),
                email.smtp_password.as_deref(),
                &email.from,
                &email.to,
            ) {
                Ok(channel) => channels.push(Arc::new(channel)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build email channel; email disabled")
                }
            }
        } else {
            tracing::info!("Email channel not configured");
        }

        if let Some(url) = &self.slack_webhook_url {
            channels.push(Arc::new(SlackChannel::new(url)));
        } else {
            tracing::info!("Slack webhook channel not configured");
        }

        NotificationManager::new(channels)
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_db_url() -> String {
    "sqlite://data/cronwatch.db?mode=rwc".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_duplicate_window_secs() -> u64 {
    10
}

fn default_scanner_enabled() -> bool {
    true
}

fn default_scanner_tick_secs() -> u64 {
    30
}

fn default_missed_threshold_secs() -> u64 {
    120
}

fn default_smtp_port() -> u16 {
    587
}
