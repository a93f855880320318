use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use cronwatch_notify::manager::NotificationManager;
use cronwatch_storage::MonitorStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MonitorStore>,
    pub notifier: Arc<NotificationManager>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}
