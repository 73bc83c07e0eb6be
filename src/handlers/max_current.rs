use axum::{Json, extract::State};
use std::sync::Arc;
use tracing::info;
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;
use crate::models::{LpQuery, MaxCurrentChanged};
use crate::metrics::REQUEST_TOTAL;

// Current limits don't switch relays, so no cooldown here
pub async fn set_max_current(
    State(state): State<Arc<AppState>>,
    ApiPath(amps): ApiPath<u32>,
    ApiQuery(query): ApiQuery<LpQuery>,
) -> Result<Json<MaxCurrentChanged>, ApiError> {
    REQUEST_TOTAL.inc();
    let lp = query.or(state.default_lp);

    let evcc = state.upstream.set_max_current(lp, amps).await?;
    info!(lp, amps, "max current set");

    Ok(Json(MaxCurrentChanged {
        lp,
        maxcurrent: amps,
        evcc,
    }))
}
