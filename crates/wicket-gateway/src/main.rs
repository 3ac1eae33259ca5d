mod args;
mod auth;
mod handlers;
mod metrics;
mod openai;
mod state;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use clap::Parser;

use wicket_common::GatewayConfig;
use wicket_core::{CliExecutor, Scheduler};

use crate::args::Args;
use crate::handlers::{execute, healthz, stats};
use crate::metrics::metrics_handler;
use crate::openai::chat_completions;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    wicket_common::telemetry::init_tracing("wicket-gateway", &args.log_format);

    let config = GatewayConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error=%e, "invalid configuration");
        std::process::exit(1);
    });

    let executor = Arc::new(CliExecutor::new(config.cli_bin.clone()));
    let scheduler = Scheduler::new(config.clone(), executor);

    let st = AppState {
        scheduler,
        config: Arc::new(config),
    };

    // Request routes go through the shared-secret check; health and metrics
    // stay public.
    let authed_routes = Router::new()
        .route("/v1/execute", post(execute))
        .route("/v1/chat/completions", post(chat_completions))
        .layer(middleware::from_fn_with_state(
            st.clone(),
            auth::require_api_key,
        ));

    let public_routes = Router::new()
        .route("/healthz", get(healthz))
        .route("/health", get(healthz))
        .route("/stats", get(stats))
        .route("/metrics", get(metrics_handler));

    let app = public_routes.merge(authed_routes).with_state(st.clone());

    let listen_addr = args
        .listen_addr
        .unwrap_or_else(|| format!("0.0.0.0:{}", st.config.port));

    tracing::info!(
        listen_addr=%listen_addr,
        cli_bin=%st.config.cli_bin,
        max_concurrent=st.config.max_concurrent,
        max_queue_depth=st.config.max_queue_depth,
        auth_enabled=st.config.proxy_api_key.is_some(),
        "gateway starting"
    );

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
