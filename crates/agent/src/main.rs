//! Gas Anomaly Agent - scores transaction gas against per-contract history
//!
//! Reads transactions as JSON lines from stdin, writes findings as JSON lines
//! to stdout and serves health and metrics over HTTP.

use anyhow::Result;
use gas_anomaly::{
    Classifier, EngineMetrics, InMemoryReceipts, Quota, StructuredLogger, TransactionHandler,
};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod feed;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries findings
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    info!("Starting gas-anomaly-agent");

    let config = config::AgentConfig::load()?;
    let store_config = config.store_config()?;
    let classifier = Classifier::new(config.thresholds()?);
    info!(
        alpha = %store_config.alpha,
        warmup_gate = ?store_config.warmup_gate,
        max_keys = ?store_config.max_keys,
        "Agent configured"
    );

    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new("gas-anomaly-agent");
    logger.log_startup(
        AGENT_VERSION,
        &store_config.alpha.to_string(),
        config.quota_capacity,
    );

    let quota = Arc::new(Quota::new(config.quota_capacity));
    metrics.set_quota_remaining(quota.remaining());

    let receipts = Arc::new(InMemoryReceipts::new());
    let handler = Arc::new(
        TransactionHandler::new(store_config, classifier, quota, receipts.clone())
            .with_logger(logger.clone()),
    );

    let app_state = Arc::new(api::AppState::new(handler.clone(), metrics.clone()));
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();

    tokio::select! {
        result = feed::run(input, output, &handler, &receipts) => {
            match result {
                Ok(stats) => {
                    info!(
                        processed = stats.processed,
                        malformed = stats.malformed,
                        failed = stats.failed,
                        findings = stats.findings,
                        "Transaction feed closed"
                    );
                    logger.log_shutdown("end of input");
                }
                Err(e) => {
                    error!(error = %e, "Transaction feed failed");
                    logger.log_shutdown("feed error");
                }
            }
        }
        result = &mut api_handle => {
            match result {
                Ok(Ok(())) => warn!("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
            logger.log_shutdown("api server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
        }
    }

    api_handle.abort();
    info!("Shutting down");

    Ok(())
}
