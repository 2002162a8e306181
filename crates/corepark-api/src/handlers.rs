//! Admin API handlers.
//!
//! Every handler goes through the shared [`Controller`] and returns JSON
//! wrapped in [`ApiResponse`].
//!
//! [`Controller`]: corepark_control::Controller

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::{info, warn};

use corepark_control::TunablesUpdate;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Status ─────────────────────────────────────────────────────

/// GET /api/v1/status
pub async fn get_status(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.controller.status())
}

// ── Activation ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

/// GET /api/v1/active
pub async fn get_active(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(serde_json::json!({ "active": state.controller.is_active() }))
}

/// PUT /api/v1/active
pub async fn set_active(
    State(state): State<ApiState>,
    Json(req): Json<ActiveRequest>,
) -> impl IntoResponse {
    let controller = &state.controller;

    if req.active {
        match controller.start().await {
            Ok(changed) => {
                info!(changed, "controller activation requested");
                ApiResponse::ok(serde_json::json!({ "active": true, "changed": changed }))
                    .into_response()
            }
            Err(e) => {
                warn!(error = %e, "controller failed to start");
                error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
            }
        }
    } else {
        let was_active = controller.is_active();
        let report = controller.stop().await;
        info!(changed = was_active, "controller deactivation requested");
        ApiResponse::ok(serde_json::json!({
            "active": false,
            "changed": was_active,
            "woken": report.woken,
            "still_parked": report.failed,
        }))
        .into_response()
    }
}

// ── Tunables ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QofRequest {
    pub target_qof: u32,
}

/// GET /api/v1/qof
pub async fn get_qof(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(serde_json::json!({ "target_qof": state.controller.tunables().target_qof() }))
}

/// PUT /api/v1/qof
pub async fn set_qof(
    State(state): State<ApiState>,
    Json(req): Json<QofRequest>,
) -> impl IntoResponse {
    match state.controller.tunables().set_target_qof(req.target_qof) {
        Ok(()) => {
            info!(target_qof = req.target_qof, "target qof updated");
            ApiResponse::ok(serde_json::json!({ "target_qof": req.target_qof })).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response(),
    }
}

/// GET /api/v1/tunables
pub async fn get_tunables(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.controller.tunables().snapshot())
}

/// PUT /api/v1/tunables
pub async fn update_tunables(
    State(state): State<ApiState>,
    Json(update): Json<TunablesUpdate>,
) -> impl IntoResponse {
    match state.controller.tunables().apply(update) {
        Ok(snapshot) => {
            info!(?snapshot, "tunables updated");
            ApiResponse::ok(snapshot).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response(),
    }
}

// ── Cores ──────────────────────────────────────────────────────

/// GET /api/v1/parked
pub async fn get_parked(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(serde_json::json!({ "parked_count": state.controller.parked_count() }))
}

/// GET /api/v1/cores
pub async fn list_cores(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.controller.cores())
}
