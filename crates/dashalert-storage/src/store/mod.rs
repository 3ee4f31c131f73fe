use dashalert_common::clock::Clock;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{AlertError, Result};
use crate::metrics::HistorianMetrics;

pub mod alert;
pub mod dashboard;
pub mod user;

pub use alert::{
    AlertsQuery, PauseAlertCommand, SaveAlertsCommand, SaveAlertsSummary, SetAlertStateCommand,
};
pub use dashboard::NewDashboard;
pub use user::CreateUserCommand;

// ---- Repository ----

/// Backend label reported through `state_history_info`.
pub const BACKEND: &str = "sql";

/// Transactional access to dashboards, their alerts, and users.
///
/// Every mutating method runs in exactly one database transaction, reads the
/// injected [`Clock`] once, and reports its outcome to the
/// [`HistorianMetrics`] sink.
pub struct AlertRepository {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn HistorianMetrics>,
}

impl AlertRepository {
    /// Connects to `db_url` and brings the schema up to date.
    ///
    /// SQLite example: `sqlite:///data/dashalert.db?mode=rwc`
    pub async fn connect(
        db_url: &str,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn HistorianMetrics>,
    ) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        // WAL only applies to SQLite
        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;
        tracing::info!(db_url = %db_url, "Initialized alert repository (SeaORM)");

        Ok(Self::from_connection(db, clock, metrics))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(
        db: DatabaseConnection,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn HistorianMetrics>,
    ) -> Self {
        metrics.record_backend_info(BACKEND);
        Self { db, clock, metrics }
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn metrics(&self) -> &dyn HistorianMetrics {
        self.metrics.as_ref()
    }

    /// Records one store mutation in the write counters and histogram.
    pub(crate) fn observe_write(&self, org: &str, started: Instant, success: bool) {
        self.metrics.record_write(org, started.elapsed(), success);
    }

    /// Closes the connection pool.
    pub async fn close(self) -> Result<()> {
        self.db.close().await?;
        Ok(())
    }
}

// ---- Cancellation ----

/// Races `operation` against `token`.
///
/// A token that is already cancelled short-circuits without touching the
/// store. If it fires mid-flight the operation future is dropped, which rolls
/// back any open transaction.
pub(crate) async fn cancellable<T, F>(token: &CancellationToken, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if token.is_cancelled() {
        return Err(AlertError::Cancelled);
    }
    tokio::select! {
        biased;
        () = token.cancelled() => Err(AlertError::Cancelled),
        result = operation => result,
    }
}

/// Last check before `commit`; after commit cancellation has no effect.
pub(crate) fn ensure_not_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        Err(AlertError::Cancelled)
    } else {
        Ok(())
    }
}
