//! Persistence layer for jobs, runs, rules and alerts.
//!
//! [`MonitorStore`] wraps a SeaORM connection (SQLite with WAL mode) and
//! runs the `migration` crate's schema migrations on connect. The store is
//! the single source of truth: the engine keeps no long-lived in-memory
//! state and re-reads entities on every operation.

pub mod entities;
pub mod store;

#[cfg(test)]
mod tests;

pub use store::stats::{JobStats, OverviewStats};
pub use store::{MonitorStore, NewJob};
