//! REST handlers for the scenario endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::manager::{CreateScenario, ScenarioManager, ScenarioPatch, SimulationRequest};
use crate::scenario::{ImpactResult, Scenario, ScenarioId, ScenarioStatus};
use crate::transport::ApiError;

type ApiResult<T> = Result<T, ApiError>;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))
}

fn parse_id(raw: &str) -> ApiResult<ScenarioId> {
    raw.parse().map_err(|_| ApiError::unknown_id(raw))
}

/// Query string of the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    status: Option<String>,
}

/// Service identity.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    name: &'static str,
    version: &'static str,
}

/// GET `/`
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET `/api/health` - liveness plus store reachability.
///
/// Answers `503` when the store health check fails.
pub async fn health(State(manager): State<ScenarioManager>) -> (StatusCode, Json<Value>) {
    match manager.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok", "storage": "ok"}))),
        Err(err) => {
            warn!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "degraded", "storage": err.to_string()})),
            )
        }
    }
}

/// POST `/api/simulations` - compute an impact without saving a scenario.
pub async fn simulate(State(manager): State<ScenarioManager>, body: Bytes) -> ApiResult<Json<ImpactResult>> {
    let request: SimulationRequest = parse_body(&body)?;
    Ok(Json(manager.simulate(&request)?))
}

/// GET `/api/scenarios?status=` - newest first.
pub async fn list_scenarios(
    State(manager): State<ScenarioManager>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Scenario>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<ScenarioStatus>)
        .transpose()
        .map_err(crate::error::ScenarioError::from)?;
    Ok(Json(manager.list_by_status(status).await?))
}

/// POST `/api/scenarios` - create a draft scenario.
///
/// # Response
/// - `201 Created` with the stored scenario, results included
/// - `400` on a malformed or out-of-range payload
pub async fn create_scenario(
    State(manager): State<ScenarioManager>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Scenario>)> {
    let request: CreateScenario = parse_body(&body)?;
    let scenario = manager.create(request).await?;
    Ok((StatusCode::CREATED, Json(scenario)))
}

/// GET `/api/scenarios/:id`
pub async fn get_scenario(
    State(manager): State<ScenarioManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<Scenario>> {
    let id = parse_id(&id)?;
    Ok(Json(manager.get(id).await?))
}

/// PUT `/api/scenarios/:id` - partial update; results are recomputed when
/// the simulation inputs change.
pub async fn update_scenario(
    State(manager): State<ScenarioManager>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Scenario>> {
    let id = parse_id(&id)?;
    let patch: ScenarioPatch = parse_body(&body)?;
    Ok(Json(manager.update(id, patch).await?))
}

/// DELETE `/api/scenarios/:id` - soft delete.
pub async fn delete_scenario(
    State(manager): State<ScenarioManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id)?;
    manager.delete(id).await?;
    Ok(Json(json!({"message": "Scenario deleted", "id": id})))
}

/// POST `/api/scenarios/:id/duplicate`
pub async fn duplicate_scenario(
    State(manager): State<ScenarioManager>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Scenario>)> {
    let id = parse_id(&id)?;
    let copy = manager.duplicate(id).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// POST `/api/scenarios/:id/activate`
pub async fn activate_scenario(
    State(manager): State<ScenarioManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<Scenario>> {
    let id = parse_id(&id)?;
    Ok(Json(manager.activate(id).await?))
}

/// POST `/api/scenarios/:id/archive`
pub async fn archive_scenario(
    State(manager): State<ScenarioManager>,
    Path(id): Path<String>,
) -> ApiResult<Json<Scenario>> {
    let id = parse_id(&id)?;
    Ok(Json(manager.archive(id).await?))
}
