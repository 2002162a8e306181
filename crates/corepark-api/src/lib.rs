//! corepark-api — admin REST API for the core-parking controller.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/status` | Controller readout |
//! | GET | `/api/v1/active` | Whether the control task runs |
//! | PUT | `/api/v1/active` | Start or stop the controller |
//! | GET | `/api/v1/qof` | Target quality of service |
//! | PUT | `/api/v1/qof` | Set target quality of service |
//! | GET | `/api/v1/tunables` | All tunables |
//! | PUT | `/api/v1/tunables` | Partial tunables update |
//! | GET | `/api/v1/parked` | Number of parked cores |
//! | GET | `/api/v1/cores` | Per-core snapshot |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use corepark_control::Controller;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<Controller>,
}

/// Build the admin router.
pub fn build_router(controller: Arc<Controller>) -> Router {
    let state = ApiState { controller };

    let api_routes = Router::new()
        .route("/status", get(handlers::get_status))
        .route("/active", get(handlers::get_active).put(handlers::set_active))
        .route("/qof", get(handlers::get_qof).put(handlers::set_qof))
        .route("/tunables", get(handlers::get_tunables).put(handlers::update_tunables))
        .route("/parked", get(handlers::get_parked))
        .route("/cores", get(handlers::list_cores))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
