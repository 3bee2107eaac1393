//! HTTP transport for the scenario engine.
//!
//! JSON over REST, served by axum. Every failure leaves through [`ApiError`]
//! so clients always see `{"error": <kind>, "message": <text>}` with a status
//! from [`ScenarioError::status_code`].

mod handlers;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ScenarioError;
use crate::manager::ScenarioManager;

/// Maximum accepted request body size.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Error payload returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// An error as the HTTP layer reports it.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    /// Malformed request body.
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: "invalid_request".to_string(),
                message: message.into(),
            },
        }
    }

    /// Path segment that names no scenario.
    pub(crate) fn unknown_id(raw: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                error: "not_found".to_string(),
                message: format!("Scenario not found: {raw}"),
            },
        }
    }

    /// Status code of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ScenarioError> for ApiError {
    fn from(err: ScenarioError) -> Self {
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self {
            status,
            body: ErrorBody {
                error: err.kind().to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Build the application router around a manager.
pub fn router(manager: ScenarioManager) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        .route("/api/simulations", post(handlers::simulate))
        .route(
            "/api/scenarios",
            get(handlers::list_scenarios).post(handlers::create_scenario),
        )
        .route(
            "/api/scenarios/:id",
            get(handlers::get_scenario)
                .put(handlers::update_scenario)
                .delete(handlers::delete_scenario),
        )
        .route("/api/scenarios/:id/duplicate", post(handlers::duplicate_scenario))
        .route("/api/scenarios/:id/activate", post(handlers::activate_scenario))
        .route("/api/scenarios/:id/archive", post(handlers::archive_scenario))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}
