use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use evcc_gateway::build_router;
use evcc_gateway::config::{Args, normalize_base_url};
use evcc_gateway::state::AppState;
use evcc_gateway::throttle::ThrottleGuard;
use evcc_gateway::upstream::{EvccClient, health_checker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let base_url = normalize_base_url(&args.evcc_url);
    let upstream = Arc::new(
        EvccClient::new(&base_url, args.upstream_timeout()).context("building evcc client")?,
    );

    // upstream reachability in the background
    tokio::spawn(health_checker(Arc::clone(&upstream), args.health_interval()));

    let state = Arc::new(AppState::new(
        upstream,
        ThrottleGuard::new(args.cooldown()),
        args.default_lp,
    ));
    let app = build_router(state);

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!(%addr, "gateway listening");
    info!(evcc = %base_url, "forwarding to evcc");
    info!(
        cooldown_secs = args.mode_cooldown,
        default_lp = args.default_lp,
        "mode change cooldown active"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
