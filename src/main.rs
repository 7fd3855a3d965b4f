/// Pollbox - polling web application core
///
/// Session-based authentication and vote-integrity enforcement:
/// credential hashing, session issuance and validation, brute-force
/// lockout, and exactly-once vote recording with consistent counters.

mod account;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod jobs;
mod metrics;
mod rate_limit;
mod server;
mod session;
mod vote;

use config::ServerConfig;
use context::AppContext;
use error::PollResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> PollResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollbox=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;
    let ctx = Arc::new(ctx);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}
