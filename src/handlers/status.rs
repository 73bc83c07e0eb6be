use axum::{Json, extract::State};
use std::sync::Arc;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;
use crate::models::{CooldownStatus, LpQuery};

// evcc /state, passed through
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.upstream.state().await?))
}

pub async fn cooldown_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LpQuery>,
) -> Json<CooldownStatus> {
    let lp = query.or(state.default_lp);
    let snapshot = state.guard.status(lp);

    Json(CooldownStatus {
        lp,
        remaining: snapshot.remaining_secs,
        window: state.cooldown_secs(),
        last_mode: snapshot.last_mode,
    })
}
