//! Ticketops job runner - main entry point.
//!
//! Executes one back-office job per invocation. The process exit is the
//! acknowledgment signal for the trigger transport wrapping this binary.

use std::sync::Arc;

use clap::Parser;

use ticketops_core::auth::TokenCache;
use ticketops_core::closure::ClosureEngine;
use ticketops_core::config::Config;
use ticketops_core::dispatch::{self, JobKind};
use ticketops_core::gateway::HttpNotificationGateway;
use ticketops_core::store::MySqlTicketStore;
use ticketops_core::sync::HttpTicketSync;
use ticketops_core::telemetry;

#[derive(Debug, Parser)]
#[command(name = "ticketops", about = "Back-office automation job runner")]
struct Args {
    /// Job to execute: a bare name or a full trigger subject
    job: String,

    /// Configuration file; environment variables with the TICKETOPS__ prefix
    /// override its values
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    telemetry::init_logging(&config.observability)?;

    let kind = JobKind::parse(&args.job).map_err(|error| {
        let known = JobKind::ALL
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow::anyhow!("{error} (known jobs: {known})")
    })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        job = %kind,
        "starting ticketops runner"
    );

    let store = Arc::new(MySqlTicketStore::connect(&config.database).await?);
    tracing::info!("connected to record store");

    let tokens = Arc::new(TokenCache::new(config.auth.clone()));
    let gateway = Arc::new(HttpNotificationGateway::new(config.gateway.clone(), tokens));
    let sync = Arc::new(HttpTicketSync::new(config.sync.clone()));
    let engine = ClosureEngine::new(store, gateway, sync, config.closure.clone());

    let summary = dispatch::execute(kind, &engine).await?;
    tracing::info!(
        job = %kind,
        scanned = summary.scanned,
        closed = summary.closed,
        feedback_sent = summary.feedback_sent,
        sync_attempted = summary.sync_attempted,
        notify_failures = summary.notify_failures,
        "job finished"
    );

    Ok(())
}
