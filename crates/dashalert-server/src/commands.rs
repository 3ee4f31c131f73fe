//! Administrative subcommands, kept out of `main` so they can be tested.

use anyhow::Result;
use dashalert_common::clock::SystemClock;
use dashalert_provisioning::definitions::AlertRuleGroup;
use dashalert_storage::metrics::{default_metrics, HistorianMetrics, MetricsHistorianMetrics};
use dashalert_storage::{AlertRepository, PauseAlertCommand};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Counts printed by the default command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreReport {
    pub alerts: u64,
    pub paused: u64,
}

pub fn metrics_sink(config: &ServerConfig) -> Arc<dyn HistorianMetrics> {
    if config.metrics.enabled {
        MetricsHistorianMetrics::describe();
        Arc::new(MetricsHistorianMetrics)
    } else {
        default_metrics()
    }
}

/// Connects to the configured database and applies pending migrations.
pub async fn open_repository(config: &ServerConfig) -> Result<AlertRepository> {
    if config.database.url.is_none() {
        std::fs::create_dir_all(&config.database.data_dir).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create data dir '{}': {}",
                config.database.data_dir,
                e
            )
        })?;
    }
    let repo = AlertRepository::connect(
        &config.database.connection_url(),
        Arc::new(SystemClock),
        metrics_sink(config),
    )
    .await?;
    Ok(repo)
}

pub async fn report(repo: &AlertRepository) -> Result<StoreReport> {
    let alerts = repo.list_all_alerts().await?;
    let paused = alerts
        .iter()
        .filter(|a| a.state == dashalert_common::types::AlertState::Paused)
        .count() as u64;
    Ok(StoreReport {
        alerts: alerts.len() as u64,
        paused,
    })
}

pub async fn pause_all(
    repo: &AlertRepository,
    paused: bool,
    token: &CancellationToken,
) -> Result<u64> {
    Ok(repo.pause_all_alerts(paused, token).await?)
}

pub async fn pause(
    repo: &AlertRepository,
    org_id: i64,
    alert_ids: Vec<i64>,
    paused: bool,
    token: &CancellationToken,
) -> Result<u64> {
    let cmd = PauseAlertCommand {
        org_id,
        alert_ids,
        paused,
    };
    Ok(repo.pause_alert(&cmd, token).await?)
}

pub fn parse_ids(args: &[String]) -> Result<Vec<i64>> {
    args.iter()
        .map(|s| {
            s.parse::<i64>()
                .map_err(|e| anyhow::anyhow!("invalid id '{}': {}", s, e))
        })
        .collect()
}

/// Runs a rule group through the inbound and outbound conversions and returns
/// the normalised JSON.
pub fn check_provisioning(content: &str) -> Result<String> {
    let group: AlertRuleGroup = serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Failed to parse rule group: {}", e))?;
    let domain = dashalert_provisioning::alert_rule_group_from_api(&group)?;
    tracing::info!(
        title = %domain.title,
        rules = domain.rules.len(),
        interval_secs = domain.interval.as_secs(),
        "Rule group is valid"
    );
    let normalised = dashalert_provisioning::alert_rule_group_to_api(&domain);
    Ok(serde_json::to_string_pretty(&normalised)?)
}
