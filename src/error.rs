use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::models::ThrottledBody;
use crate::throttle::LoadpointId;
use crate::upstream::UpstreamError;

// Everything a handler can answer with besides success
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("loadpoint {lp} mode was changed recently, retry in {retry_after_secs}s")]
    Throttled {
        lp: LoadpointId,
        retry_after_secs: u64,
        cooldown_secs: u64,
    },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    // malformed ?lp= or path parameter
    #[error("bad request: {detail}")]
    BadRequest { status: StatusCode, detail: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Throttled {
                lp,
                retry_after_secs,
                cooldown_secs,
            } => {
                let body = ThrottledBody {
                    error: "mode-change-throttled",
                    detail: format!(
                        "Loadpoint {} mode was changed recently. Try again in ~{}s.",
                        lp, retry_after_secs
                    ),
                    retry_after_seconds: retry_after_secs,
                    cooldown_seconds: cooldown_secs,
                };
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after_secs.to_string())],
                    Json(body),
                )
                    .into_response()
            }
            // evcc's own status and body go back untouched
            ApiError::Upstream(UpstreamError::Rejected { status, body }) => (
                status,
                Json(json!({
                    "error": "evcc-error",
                    "status": status.as_u16(),
                    "body": body
                })),
            )
                .into_response(),
            ApiError::Upstream(UpstreamError::BadBody(e)) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "evcc-bad-response",
                    "detail": e.to_string()
                })),
            )
                .into_response(),
            ApiError::Upstream(e) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "evcc-unreachable",
                    "detail": e.to_string()
                })),
            )
                .into_response(),
            ApiError::BadRequest { status, detail } => (
                status,
                Json(json!({
                    "error": "bad-request",
                    "detail": detail
                })),
            )
                .into_response(),
            ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal-error",
                    "detail": detail
                })),
            )
                .into_response(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}
