//! Persistence layer for dashboard alerts.
//!
//! [`AlertRepository`] owns a SeaORM connection pool and exposes every
//! alert, dashboard and user operation. Mutations run inside a single
//! transaction, take their timestamps from an injected
//! [`Clock`](dashalert_common::clock::Clock), honour a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) up to commit,
//! and report to a [`HistorianMetrics`](crate::metrics::HistorianMetrics) sink.

pub mod access;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod store;

#[cfg(test)]
mod tests;

pub use access::{authorize_org_read, ensure_org_read, Access};
pub use error::{AlertError, Result};
pub use store::{
    AlertRepository, AlertsQuery, CreateUserCommand, NewDashboard, PauseAlertCommand,
    SaveAlertsCommand, SaveAlertsSummary, SetAlertStateCommand,
};
