//! State-history writer metrics.
//!
//! The repository reports transitions and store writes through the
//! [`HistorianMetrics`] trait. Two implementations are included:
//!
//! - [`NoopHistorianMetrics`]: discards everything; the default.
//! - [`MetricsHistorianMetrics`]: forwards to the [`metrics`](https://docs.rs/metrics)
//!   facade, so whichever recorder the process installs (Prometheus or other)
//!   receives them.
//!
//! # Metric Names
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `dashalert_alerting_state_history_info` | Gauge | `backend` |
//! | `dashalert_alerting_state_history_transitions_total` | Counter | `org` |
//! | `dashalert_alerting_state_history_transitions_failed_total` | Counter | `org` |
//! | `dashalert_alerting_state_history_batch_writes_total` | Counter | `org` |
//! | `dashalert_alerting_state_history_batch_writes_failed_total` | Counter | `org` |
//! | `dashalert_alerting_state_history_request_duration_seconds` | Histogram | |

use std::{fmt, sync::Arc, time::Duration};

/// Org label used by operations that span every organization.
pub const ALL_ORGS: &str = "all";

/// Sink for state-history writer telemetry.
///
/// All methods default to no-ops. Implementations must be `Send + Sync`;
/// one instance is shared by every request handler.
pub trait HistorianMetrics: Send + Sync + fmt::Debug {
    /// Marks which backend persists state history. Called once at startup.
    fn record_backend_info(&self, backend: &str) {
        let _ = backend;
    }

    /// A state change (set-state or pause) was committed.
    fn record_transition(&self, org: &str) {
        let _ = org;
    }

    /// A state change was rejected.
    fn record_transition_failed(&self, org: &str) {
        let _ = org;
    }

    /// One store mutation finished, successfully or not.
    fn record_write(&self, org: &str, duration: Duration, success: bool) {
        let _ = (org, duration, success);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NoopHistorianMetrics;

impl HistorianMetrics for NoopHistorianMetrics {}

#[derive(Debug, Clone, Copy)]
pub struct MetricsHistorianMetrics;

mod metric_names {
    pub const INFO: &str = "dashalert_alerting_state_history_info";
    pub const TRANSITIONS_TOTAL: &str = "dashalert_alerting_state_history_transitions_total";
    pub const TRANSITIONS_FAILED: &str =
        "dashalert_alerting_state_history_transitions_failed_total";
    pub const WRITES_TOTAL: &str = "dashalert_alerting_state_history_batch_writes_total";
    pub const WRITES_FAILED: &str = "dashalert_alerting_state_history_batch_writes_failed_total";
    pub const WRITE_DURATION: &str = "dashalert_alerting_state_history_request_duration_seconds";
}

impl MetricsHistorianMetrics {
    /// Attaches help texts to the metric names on the installed recorder.
    pub fn describe() {
        metrics::describe_gauge!(
            metric_names::INFO,
            "Metadata about the state history backend."
        );
        metrics::describe_counter!(
            metric_names::TRANSITIONS_TOTAL,
            "The total number of state transitions processed by the state historian."
        );
        metrics::describe_counter!(
            metric_names::TRANSITIONS_FAILED,
            "The total number of state transitions that failed to be written."
        );
        metrics::describe_counter!(
            metric_names::WRITES_TOTAL,
            "The total number of state history batches that were attempted to be written."
        );
        metrics::describe_counter!(
            metric_names::WRITES_FAILED,
            "The total number of failed writes of state history batches."
        );
        metrics::describe_histogram!(
            metric_names::WRITE_DURATION,
            metrics::Unit::Seconds,
            "Histogram of request durations to the state history store."
        );
    }
}

impl HistorianMetrics for MetricsHistorianMetrics {
    fn record_backend_info(&self, backend: &str) {
        metrics::gauge!(metric_names::INFO, "backend" => backend.to_owned()).set(1.0);
    }

    fn record_transition(&self, org: &str) {
        metrics::counter!(metric_names::TRANSITIONS_TOTAL, "org" => org.to_owned()).increment(1);
    }

    fn record_transition_failed(&self, org: &str) {
        metrics::counter!(metric_names::TRANSITIONS_FAILED, "org" => org.to_owned()).increment(1);
    }

    fn record_write(&self, org: &str, duration: Duration, success: bool) {
        metrics::counter!(metric_names::WRITES_TOTAL, "org" => org.to_owned()).increment(1);
        if !success {
            metrics::counter!(metric_names::WRITES_FAILED, "org" => org.to_owned()).increment(1);
        }
        metrics::histogram!(metric_names::WRITE_DURATION).record(duration.as_secs_f64());
    }
}

/// Creates the default metrics instance (no-op).
pub fn default_metrics() -> Arc<dyn HistorianMetrics> {
    Arc::new(NoopHistorianMetrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_metrics_accepts_every_event() {
        let metrics = default_metrics();
        metrics.record_backend_info("sql");
        metrics.record_transition("1");
        metrics.record_transition_failed("1");
        metrics.record_write("1", Duration::from_millis(3), false);
    }

    #[test]
    fn facade_metrics_without_recorder_do_not_panic() {
        MetricsHistorianMetrics::describe();
        let metrics = MetricsHistorianMetrics;
        metrics.record_backend_info("sql");
        metrics.record_transition(ALL_ORGS);
        metrics.record_write("2", Duration::from_millis(1), true);
    }
}
