use crate::message::Notification;
use crate::NotificationChannel;
use std::sync::Arc;

/// Holds the configured channels and fans a notification out to all of
/// them. Channels are independent and order-insensitive.
pub struct NotificationManager {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationManager {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Fire-and-forget delivery: one detached task per channel, a single
    /// attempt each. A channel failure (or panic) is contained inside its
    /// own task and never reaches the caller or another channel.
    pub fn dispatch(&self, notification: &Notification) {
        for channel in &self.channels {
            let channel = channel.clone();
            let notification = notification.clone();
            tokio::spawn(async move {
                if let Err(e) = channel.send(&notification).await {
                    tracing::error!(
                        channel = channel.channel_name(),
                        job = %notification.job().name,
                        error = %e,
                        "Failed to send notification"
                    );
                }
            });
        }
    }
}
