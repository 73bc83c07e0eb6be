pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod state;
pub mod throttle;
pub mod upstream;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::ui_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/status", get(handlers::status_handler))
        .route("/cooldown", get(handlers::cooldown_handler))
        .route("/mode/{mode}", post(handlers::set_mode))
        .route("/start", post(handlers::start))
        .route("/stop", post(handlers::stop))
        .route("/pv", post(handlers::pv))
        .route("/minpv", post(handlers::minpv))
        .route("/maxcurrent/{amps}", post(handlers::set_max_current))
        .with_state(state)
}
