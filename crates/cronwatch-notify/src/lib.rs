//! Best-effort notification fan-out for fired alerts.
//!
//! Channels implement [`NotificationChannel`] and are registered in a
//! [`manager::NotificationManager`]. Delivery is fire-and-forget: one
//! detached task per channel, a single attempt per notification, failures
//! logged and swallowed. A channel that is not configured simply is not
//! registered.

pub mod channels;
pub mod manager;
pub mod message;


use anyhow::Result;
use async_trait::async_trait;
use message::Notification;

/// A notification delivery channel that sends a fired alert to an
/// external service (SMTP, chat webhook).
///
/// Implementations must swallow nothing themselves — they return errors —
/// but callers never retry and never propagate a channel failure further
/// than a log line.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the notification through this channel, once.
    async fn send(&self, notification: &Notification) -> Result<()>;

    /// Returns the channel type name (e.g., `"email"`, `"slack"`).
    fn channel_name(&self) -> &str;
}
