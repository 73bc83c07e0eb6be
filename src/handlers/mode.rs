use axum::{Json, extract::State};
use std::sync::Arc;
use tracing::{info, warn};
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;
use crate::models::{LpQuery, ModeChanged};
use crate::metrics::{REQUEST_TOTAL, MODE_CHANGES, MODE_THROTTLED};
use crate::throttle::{Decision, LoadpointId};
use crate::upstream::UpstreamError;

// check cooldown -> call evcc -> record only if evcc said yes
async fn apply_mode(
    state: Arc<AppState>,
    lp: LoadpointId,
    mode: String,
) -> Result<Json<ModeChanged>, ApiError> {
    REQUEST_TOTAL.inc();

    if let Decision::Throttled { retry_after_secs } = state.guard.can_change(lp, &mode) {
        MODE_THROTTLED.inc();
        warn!(lp, %mode, retry_after = retry_after_secs, "mode change throttled");
        return Err(ApiError::Throttled {
            lp,
            retry_after_secs,
            cooldown_secs: state.cooldown_secs(),
        });
    }

    // Detached from the request: if the client hangs up after evcc applied
    // the mode, the change must still be recorded.
    let task_mode = mode.clone();
    let forward = tokio::spawn(async move {
        let evcc = state.upstream.set_mode(lp, &task_mode).await?;
        state.guard.record_confirmed(lp, &task_mode);
        MODE_CHANGES.inc();
        info!(lp, mode = %task_mode, "mode changed");
        Ok::<_, UpstreamError>(evcc)
    });

    let evcc = forward
        .await
        .map_err(|e| ApiError::Internal(format!("mode change task failed: {}", e)))?
        .inspect_err(|e| {
            warn!(lp, %mode, error = %e, "evcc did not apply mode");
        })?;

    Ok(Json(ModeChanged { lp, mode, evcc }))
}

pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    ApiPath(mode): ApiPath<String>,
    ApiQuery(query): ApiQuery<LpQuery>,
) -> Result<Json<ModeChanged>, ApiError> {
    let lp = query.or(state.default_lp);
    apply_mode(state, lp, mode).await
}

// Aliases, still throttled
pub async fn start(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LpQuery>,
) -> Result<Json<ModeChanged>, ApiError> {
    let lp = query.or(state.default_lp);
    apply_mode(state, lp, "now".to_string()).await
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LpQuery>,
) -> Result<Json<ModeChanged>, ApiError> {
    let lp = query.or(state.default_lp);
    apply_mode(state, lp, "off".to_string()).await
}

pub async fn pv(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LpQuery>,
) -> Result<Json<ModeChanged>, ApiError> {
    let lp = query.or(state.default_lp);
    apply_mode(state, lp, "pv".to_string()).await
}

pub async fn minpv(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LpQuery>,
) -> Result<Json<ModeChanged>, ApiError> {
    let lp = query.or(state.default_lp);
    apply_mode(state, lp, "minpv".to_string()).await
}
