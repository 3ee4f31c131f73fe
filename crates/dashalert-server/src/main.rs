use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use dashalert_server::commands;
use dashalert_server::config::ServerConfig;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  dashalert-server [config.toml]                              Migrate and report alert counts");
    eprintln!("  dashalert-server pause-all <config.toml>                    Pause every alert of every org");
    eprintln!("  dashalert-server unpause-all <config.toml>                  Unpause every alert of every org");
    eprintln!("  dashalert-server pause <config.toml> <org_id> <id>...       Pause alerts of one org");
    eprintln!("  dashalert-server unpause <config.toml> <org_id> <id>...     Unpause alerts of one org");
    eprintln!("  dashalert-server check-provisioning <group.json>            Validate a provisioning rule group");
}

fn init_tracing(directive: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();
    Ok(())
}

fn init_metrics(config: &ServerConfig) -> Result<Option<PrometheusHandle>> {
    if !config.metrics.enabled {
        return Ok(None);
    }
    match config.metrics.listen_addr {
        Some(addr) => {
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {e}"))?;
            tracing::info!(metrics_addr = %addr, "Prometheus metrics exporter started");
            Ok(None)
        }
        None => {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {e}"))?;
            Ok(Some(handle))
        }
    }
}

/// Loads the config and brings up logging, ids and metrics.
fn bootstrap(config_path: &str) -> Result<(ServerConfig, Option<PrometheusHandle>)> {
    let config = ServerConfig::load(config_path)?;
    init_tracing(config.log_directive())?;
    dashalert_common::id::init(config.id.machine_id, config.id.node_id);
    let handle = init_metrics(&config)?;
    tracing::info!(
        config = %config_path,
        db = %config.database.redacted_url(),
        "dashalert-server starting"
    );
    Ok((config, handle))
}

/// Cancels the returned token on Ctrl+C.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            child.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some(cmd @ ("pause-all" | "unpause-all")) => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("{cmd} requires <config.toml> argument")
            })?;
            run_pause_all(config_path, cmd == "pause-all").await
        }
        Some(cmd @ ("pause" | "unpause")) => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("{cmd} requires <config.toml> <org_id> <alert_id>... arguments")
            })?;
            let org_id = args
                .get(3)
                .ok_or_else(|| {
                    print_usage();
                    anyhow::anyhow!("{cmd} requires <org_id> argument")
                })?
                .parse::<i64>()
                .map_err(|e| anyhow::anyhow!("invalid org id: {e}"))?;
            let ids = commands::parse_ids(args.get(4..).unwrap_or_default())?;
            run_pause(config_path, org_id, ids, cmd == "pause").await
        }
        Some("check-provisioning") => {
            let group_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("check-provisioning requires <group.json> argument")
            })?;
            init_tracing("dashalert=info")?;
            run_check_provisioning(group_path)
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_report(config_path).await
        }
    }
}

fn log_metrics_snapshot(handle: Option<PrometheusHandle>) {
    if let Some(handle) = handle {
        tracing::info!(snapshot = %handle.render(), "Metrics");
    }
}

#[allow(clippy::print_stdout)]
async fn run_report(config_path: &str) -> Result<()> {
    let (config, handle) = bootstrap(config_path)?;
    let repo = commands::open_repository(&config).await?;
    let report = commands::report(&repo).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    repo.close().await?;
    log_metrics_snapshot(handle);
    Ok(())
}

async fn run_pause_all(config_path: &str, paused: bool) -> Result<()> {
    let (config, handle) = bootstrap(config_path)?;
    let repo = commands::open_repository(&config).await?;
    let affected = commands::pause_all(&repo, paused, &shutdown_token()).await?;
    tracing::info!(paused, affected, "Done");
    repo.close().await?;
    log_metrics_snapshot(handle);
    Ok(())
}

async fn run_pause(config_path: &str, org_id: i64, ids: Vec<i64>, paused: bool) -> Result<()> {
    let (config, handle) = bootstrap(config_path)?;
    let repo = commands::open_repository(&config).await?;
    let affected = commands::pause(&repo, org_id, ids, paused, &shutdown_token()).await?;
    if affected == 0 {
        tracing::warn!(org_id, "No alert of the org matched the given ids");
    }
    tracing::info!(org_id, paused, affected, "Done");
    repo.close().await?;
    log_metrics_snapshot(handle);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn run_check_provisioning(group_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(group_path)
        .map_err(|e| anyhow::anyhow!("Failed to read rule group '{}': {}", group_path, e))?;
    println!("{}", commands::check_provisioning(&content)?);
    Ok(())
}
