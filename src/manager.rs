//! Scenario lifecycle manager.
//!
//! Orchestrates validation, impact computation, projection, and persistence
//! of scenarios. Computation always completes before anything is written, so
//! a failing request never leaves a partial record behind.
//!
//! Operations on one scenario id are serialized through a per-id async
//! mutex, and every write is a compare-and-swap on the record version, so
//! `results` can never be saved against parameters they were not computed
//! from.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::calculator::compute_impact;
use crate::config::EngineConfig;
use crate::error::{ScenarioError, ScenarioResult, ValidationError};
use crate::parameters::{ScenarioParameters, SimulationType};
use crate::projector::{project_evolution, project_store_impact, RampProfile};
use crate::scenario::{
    ImpactResult, InputsDigest, Period, Scenario, ScenarioId, ScenarioStatus, ScenarioType,
};
use crate::storage::{ScenarioStore, StorageError};

/// Maximum scenario name length.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum description length.
pub const MAX_TEXT_LEN: usize = 16 * 1024;

/// Suffix appended to the name of a duplicated scenario.
pub const COPY_SUFFIX: &str = " (copy)";

/// Request to create a scenario.
///
/// Enumerated fields travel as wire strings and are validated by the
/// manager, so every malformed request surfaces as a typed error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateScenario {
    /// Display name (required).
    #[serde(default)]
    pub name: String,
    /// Optional description; blank is treated as absent.
    #[serde(default)]
    pub description: Option<String>,
    /// Scenario family, `what_if` when omitted.
    #[serde(default)]
    pub scenario_type: Option<String>,
    /// Simulation kind tag (required).
    #[serde(default)]
    pub simulation_type: Option<String>,
    /// Projection period; defaults per simulation kind.
    #[serde(default)]
    pub period: Option<String>,
    /// Ramp profile, `even` when omitted.
    #[serde(default)]
    pub ramp_profile: Option<String>,
    /// Parameter payload for the simulation kind.
    #[serde(default)]
    pub parameters: Value,
    /// Author; the configured default when omitted.
    #[serde(default)]
    pub created_by: Option<String>,
}

impl CreateScenario {
    /// Create a request with the required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, simulation_type: SimulationType, parameters: Value) -> Self {
        Self {
            name: name.into(),
            simulation_type: Some(simulation_type.as_str().to_string()),
            parameters,
            ..Self::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the projection period.
    #[must_use]
    pub fn period(mut self, period: Period) -> Self {
        self.period = Some(period.as_str().to_string());
        self
    }

    /// Set the ramp profile.
    #[must_use]
    pub fn ramp_profile(mut self, profile: RampProfile) -> Self {
        self.ramp_profile = Some(profile.as_str().to_string());
        self
    }

    /// Set the author.
    #[must_use]
    pub fn created_by(mut self, author: impl Into<String>) -> Self {
        self.created_by = Some(author.into());
        self
    }
}

/// Request to preview a simulation without saving it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulationRequest {
    /// Simulation kind tag (required).
    #[serde(default)]
    pub simulation_type: Option<String>,
    /// Projection period; defaults per simulation kind.
    #[serde(default)]
    pub period: Option<String>,
    /// Ramp profile, `even` when omitted.
    #[serde(default)]
    pub ramp_profile: Option<String>,
    /// Parameter payload for the simulation kind.
    #[serde(default)]
    pub parameters: Value,
}

impl From<&CreateScenario> for SimulationRequest {
    fn from(req: &CreateScenario) -> Self {
        Self {
            simulation_type: req.simulation_type.clone(),
            period: req.period.clone(),
            ramp_profile: req.ramp_profile.clone(),
            parameters: req.parameters.clone(),
        }
    }
}

/// Partial update of a scenario. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioPatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description; blank clears it.
    #[serde(default)]
    pub description: Option<String>,
    /// Target status.
    #[serde(default)]
    pub status: Option<String>,
    /// New simulation kind; requires a complete `parameters` payload.
    #[serde(default)]
    pub simulation_type: Option<String>,
    /// New period.
    #[serde(default)]
    pub period: Option<String>,
    /// New ramp profile.
    #[serde(default)]
    pub ramp_profile: Option<String>,
    /// Parameters; merged into the stored ones unless the kind changes.
    #[serde(default)]
    pub parameters: Option<Value>,
}

impl ScenarioPatch {
    /// Set the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Request a status transition.
    #[must_use]
    pub fn status(mut self, status: ScenarioStatus) -> Self {
        self.status = Some(status.to_string());
        self
    }

    /// Switch to another simulation kind with a complete payload.
    #[must_use]
    pub fn simulation(mut self, simulation_type: SimulationType, parameters: Value) -> Self {
        self.simulation_type = Some(simulation_type.as_str().to_string());
        self.parameters = Some(parameters);
        self
    }

    /// Set (or partially overlay) the parameters.
    #[must_use]
    pub fn parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Set the period.
    #[must_use]
    pub fn period(mut self, period: Period) -> Self {
        self.period = Some(period.as_str().to_string());
        self
    }

    /// Set the ramp profile.
    #[must_use]
    pub fn ramp_profile(mut self, profile: RampProfile) -> Self {
        self.ramp_profile = Some(profile.as_str().to_string());
        self
    }
}

/// Validated simulation inputs.
struct Inputs {
    parameters: ScenarioParameters,
    period: Period,
    ramp_profile: RampProfile,
}

fn resolve_inputs(
    simulation_type: Option<&str>,
    period: Option<&str>,
    ramp_profile: Option<&str>,
    parameters: &Value,
) -> ScenarioResult<Inputs> {
    let tag = simulation_type
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ValidationError::missing("simulation_type"))?;
    let parameters = ScenarioParameters::decode(tag, parameters)?;
    let period = match period {
        Some(p) => p.parse()?,
        None => parameters.simulation_type().default_period(),
    };
    let ramp_profile = ramp_profile
        .map(str::parse::<RampProfile>)
        .transpose()?
        .unwrap_or_default();
    Ok(Inputs {
        parameters,
        period,
        ramp_profile,
    })
}

fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::FieldTooLong {
            field: "name".to_string(),
            max_length: MAX_NAME_LEN,
        });
    }
    Ok(name.to_string())
}

fn normalize_description(description: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(d) = description.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if d.len() > MAX_TEXT_LEN {
        return Err(ValidationError::FieldTooLong {
            field: "description".to_string(),
            max_length: MAX_TEXT_LEN,
        });
    }
    Ok(Some(d.to_string()))
}

/// Per-id async mutexes.
///
/// An entry lives only while some caller holds or waits for it.
#[derive(Debug, Default)]
struct IdLocks {
    locks: Mutex<HashMap<ScenarioId, Arc<AsyncMutex<()>>>>,
}

impl IdLocks {
    async fn acquire(&self, id: ScenarioId) -> ScenarioResult<IdLease<'_>> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| ScenarioError::internal("scenario lock table poisoned"))?;
            Arc::clone(locks.entry(id).or_default())
        };
        let guard = lock.lock_owned().await;
        Ok(IdLease {
            table: self,
            id,
            guard: Some(guard),
        })
    }

    fn release(&self, id: ScenarioId) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // Only the table's own handle left: nobody holds or waits on it.
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map_or(0, |locks| locks.len())
    }
}

/// Exclusive hold on one scenario id.
struct IdLease<'a> {
    table: &'a IdLocks,
    id: ScenarioId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdLease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.table.release(self.id);
    }
}

/// Scenario lifecycle manager.
#[derive(Clone)]
pub struct ScenarioManager {
    store: Arc<dyn ScenarioStore>,
    config: Arc<EngineConfig>,
    locks: Arc<IdLocks>,
}

impl ScenarioManager {
    /// Create a manager persisting through `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ScenarioStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            locks: Arc::new(IdLocks::default()),
        }
    }

    /// Get a reference to the scenario store.
    pub fn store(&self) -> &Arc<dyn ScenarioStore> {
        &self.store
    }

    /// Get a reference to the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn evaluate(&self, inputs: &Inputs) -> ScenarioResult<(ImpactResult, InputsDigest)> {
        let baseline = &self.config.baseline;
        let figures = compute_impact(
            &inputs.parameters,
            inputs.period,
            baseline,
            self.config.probability_model,
        )?;
        debug!(
            simulation_type = %inputs.parameters.simulation_type(),
            period = %inputs.period,
            revenue_impact = figures.revenue_impact,
            margin_impact = figures.margin_impact,
            "impact computed"
        );

        let result = ImpactResult {
            evolution_data: project_evolution(
                &figures,
                inputs.period.months(),
                baseline.monthly_revenue,
                inputs.ramp_profile,
            ),
            store_impact: project_store_impact(&figures, &baseline.stores),
            figures,
        };
        let digest = InputsDigest::of(&inputs.parameters, inputs.period, inputs.ramp_profile, &self.config);
        Ok((result, digest))
    }

    fn storage_failure(err: StorageError) -> ScenarioError {
        match &err {
            StorageError::VersionConflict { id, expected, actual } => {
                warn!(scenario_id = %id, expected, actual, "lost compare-and-swap on scenario update");
            }
            StorageError::Unavailable(message) | StorageError::BackendError(message) => {
                warn!(error = %message, "scenario storage failure");
            }
            StorageError::NotFound(_) | StorageError::DuplicateKey(_) => {}
        }
        err.into()
    }

    /// Compute the impact of a simulation without persisting anything.
    ///
    /// # Errors
    /// `Validation`, `UnsupportedSimulationType`, or `InvalidParameter`.
    pub fn simulate(&self, request: &SimulationRequest) -> ScenarioResult<ImpactResult> {
        let inputs = resolve_inputs(
            request.simulation_type.as_deref(),
            request.period.as_deref(),
            request.ramp_profile.as_deref(),
            &request.parameters,
        )?;
        self.evaluate(&inputs).map(|(result, _)| result)
    }

    /// Validate, compute, and persist a new draft scenario.
    ///
    /// # Errors
    /// Validation errors on bad input (nothing is written), or
    /// `StorageUnavailable` if the store fails.
    pub async fn create(&self, request: CreateScenario) -> ScenarioResult<Scenario> {
        let name = validate_name(&request.name)?;
        let description = normalize_description(request.description.as_deref())?;
        let scenario_type = match request.scenario_type.as_deref() {
            Some(t) => ScenarioType::parse_supported(t)?,
            None => ScenarioType::WhatIf,
        };
        let created_by = request
            .created_by
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map_or_else(|| self.config.default_created_by.clone(), str::to_string);

        let inputs = resolve_inputs(
            request.simulation_type.as_deref(),
            request.period.as_deref(),
            request.ramp_profile.as_deref(),
            &request.parameters,
        )?;
        let (results, inputs_digest) = self.evaluate(&inputs)?;

        let now = Utc::now();
        let scenario = Scenario {
            id: ScenarioId::new(),
            name,
            description,
            scenario_type,
            period: inputs.period,
            ramp_profile: inputs.ramp_profile,
            parameters: inputs.parameters,
            status: ScenarioStatus::Draft,
            created_by,
            created_at: now,
            updated_at: now,
            version: 1,
            deleted_at: None,
            results,
            inputs_digest,
        };

        self.store
            .insert(scenario.clone())
            .await
            .map_err(Self::storage_failure)?;
        info!(
            scenario_id = %scenario.id,
            simulation_type = %scenario.simulation_type(),
            period = %scenario.period,
            "scenario created"
        );
        Ok(scenario)
    }

    /// Get a live scenario.
    ///
    /// # Errors
    /// `NotFound` for unknown or deleted ids.
    pub async fn get(&self, id: ScenarioId) -> ScenarioResult<Scenario> {
        self.store
            .get(id)
            .await
            .map_err(Self::storage_failure)?
            .ok_or(ScenarioError::NotFound { id })
    }

    /// Apply a partial update.
    ///
    /// Changing the simulation kind, parameters, period, or ramp profile
    /// recomputes the results before the record is saved.
    ///
    /// # Errors
    /// `NotFound`, validation errors, `InvalidTransition`, `Conflict`, or
    /// `StorageUnavailable`.
    pub async fn update(&self, id: ScenarioId, patch: ScenarioPatch) -> ScenarioResult<Scenario> {
        let _lease = self.locks.acquire(id).await?;

        let current = self.get(id).await?;
        let mut next = current.clone();

        if let Some(name) = patch.name.as_deref() {
            next.name = validate_name(name)?;
        }
        if let Some(description) = patch.description.as_deref() {
            next.description = normalize_description(Some(description))?;
        }
        if let Some(status) = patch.status.as_deref() {
            let target: ScenarioStatus = status.parse()?;
            next.status = current.status.transition(target)?;
        }

        let new_kind = patch
            .simulation_type
            .as_deref()
            .map(str::parse::<SimulationType>)
            .transpose()?
            .filter(|kind| *kind != current.simulation_type());
        next.parameters = match (new_kind, patch.parameters.as_ref()) {
            (Some(kind), Some(raw)) => ScenarioParameters::from_raw(kind, raw)?,
            (Some(_), None) => return Err(ValidationError::missing("parameters").into()),
            (None, Some(raw)) => current.parameters.merged_with(raw)?,
            (None, None) => current.parameters.clone(),
        };
        if let Some(period) = patch.period.as_deref() {
            next.period = period.parse()?;
        }
        if let Some(profile) = patch.ramp_profile.as_deref() {
            next.ramp_profile = profile.parse()?;
        }

        let inputs_changed = next.parameters != current.parameters
            || next.period != current.period
            || next.ramp_profile != current.ramp_profile;
        if inputs_changed || !current.results_are_current(&self.config) {
            let inputs = Inputs {
                parameters: next.parameters.clone(),
                period: next.period,
                ramp_profile: next.ramp_profile,
            };
            let (results, digest) = self.evaluate(&inputs)?;
            next.results = results;
            next.inputs_digest = digest;
            debug!(scenario_id = %id, "scenario results recomputed");
        }

        next.updated_at = Utc::now();
        let stored = self
            .store
            .update(next, current.version)
            .await
            .map_err(Self::storage_failure)?;

        if stored.status != current.status {
            info!(scenario_id = %id, from = %current.status, to = %stored.status, "scenario status changed");
        } else {
            debug!(scenario_id = %id, version = stored.version, "scenario updated");
        }
        Ok(stored)
    }

    /// Move a scenario to `active`.
    ///
    /// # Errors
    /// Same as [`ScenarioManager::update`].
    pub async fn activate(&self, id: ScenarioId) -> ScenarioResult<Scenario> {
        self.update(id, ScenarioPatch::default().status(ScenarioStatus::Active)).await
    }

    /// Move a scenario to `archived`. Archiving twice is a no-op.
    ///
    /// # Errors
    /// Same as [`ScenarioManager::update`].
    pub async fn archive(&self, id: ScenarioId) -> ScenarioResult<Scenario> {
        self.update(id, ScenarioPatch::default().status(ScenarioStatus::Archived)).await
    }

    /// Soft-delete a scenario. Deleting an already-deleted scenario succeeds.
    ///
    /// # Errors
    /// `NotFound` if the id was never stored, or `StorageUnavailable`.
    pub async fn delete(&self, id: ScenarioId) -> ScenarioResult<()> {
        let _lease = self.locks.acquire(id).await?;

        let deleted = self
            .store
            .soft_delete(id, Utc::now())
            .await
            .map_err(Self::storage_failure)?;
        if deleted {
            info!(scenario_id = %id, "scenario deleted");
        } else {
            debug!(scenario_id = %id, "scenario already deleted");
        }
        Ok(())
    }

    /// Copy a scenario into a new draft, recomputing its results.
    ///
    /// # Errors
    /// `NotFound` for unknown or deleted ids, or `StorageUnavailable`.
    pub async fn duplicate(&self, id: ScenarioId) -> ScenarioResult<Scenario> {
        let source = self.get(id).await?;
        let inputs = Inputs {
            parameters: source.parameters,
            period: source.period,
            ramp_profile: source.ramp_profile,
        };
        let (results, inputs_digest) = self.evaluate(&inputs)?;

        let now = Utc::now();
        let copy = Scenario {
            id: ScenarioId::new(),
            name: format!("{}{COPY_SUFFIX}", source.name),
            description: source.description,
            scenario_type: source.scenario_type,
            period: inputs.period,
            ramp_profile: inputs.ramp_profile,
            parameters: inputs.parameters,
            status: ScenarioStatus::Draft,
            created_by: source.created_by,
            created_at: now,
            updated_at: now,
            version: 1,
            deleted_at: None,
            results,
            inputs_digest,
        };

        self.store
            .insert(copy.clone())
            .await
            .map_err(Self::storage_failure)?;
        info!(scenario_id = %copy.id, source_id = %id, "scenario duplicated");
        Ok(copy)
    }

    /// List live scenarios, newest first, optionally filtered by status.
    ///
    /// # Errors
    /// `StorageUnavailable`.
    pub async fn list_by_status(&self, status: Option<ScenarioStatus>) -> ScenarioResult<Vec<Scenario>> {
        self.store
            .list_by_status(status)
            .await
            .map_err(Self::storage_failure)
    }

    /// Check that the store is reachable.
    ///
    /// # Errors
    /// `StorageUnavailable`.
    pub async fn health_check(&self) -> ScenarioResult<()> {
        self.store.health_check().await.map_err(Self::storage_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::storage::InMemoryScenarioStore;

    fn manager() -> ScenarioManager {
        ScenarioManager::new(Arc::new(InMemoryScenarioStore::new()), EngineConfig::default())
    }

    fn promotion_request() -> CreateScenario {
        CreateScenario::new(
            "Summer sale",
            SimulationType::Promotion,
            json!({"promo_type": "percentage", "discount": 30, "marketing_budget": 100000, "traffic_increase_pct": 40}),
        )
        .period(Period::ThreeMonths)
    }

    #[tokio::test]
    async fn create_populates_draft() {
        let m = manager();
        let s = m.create(promotion_request().description("  ")).await.unwrap();
        assert_eq!(s.status, ScenarioStatus::Draft);
        assert_eq!(s.version, 1);
        assert_eq!(s.created_by, "system");
        assert_eq!(s.description, None);
        assert_eq!(s.scenario_type, ScenarioType::WhatIf);
        assert_eq!(s.results.evolution_data.len(), 3);
        assert_eq!(s.results.store_impact.len(), 6);
        assert!(s.results_are_current(m.config()));
        assert_eq!(m.get(s.id).await.unwrap(), s);
    }

    #[tokio::test]
    async fn create_rejects_bad_requests_without_writing() {
        let m = manager();

        let err = m.create(CreateScenario::default()).await.unwrap_err();
        assert!(matches!(err, ScenarioError::Validation(ValidationError::EmptyName)));

        let mut req = promotion_request();
        req.simulation_type = None;
        let err = m.create(req).await.unwrap_err();
        assert!(matches!(err, ScenarioError::Validation(ValidationError::MissingField { ref field }) if field == "simulation_type"));

        let mut req = promotion_request();
        req.scenario_type = Some("stress_test".to_string());
        assert!(m.create(req).await.unwrap_err().is_validation());

        let mut req = promotion_request();
        req.period = Some("2_years".to_string());
        assert!(m.create(req).await.unwrap_err().is_validation());

        let mut req = promotion_request();
        req.parameters["marketing_budget"] = json!(-5);
        assert!(matches!(m.create(req).await.unwrap_err(), ScenarioError::InvalidParameter { .. }));

        assert!(m.list_by_status(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn period_defaults_by_kind() {
        let m = manager();
        let req = CreateScenario::new(
            "Lille opening",
            SimulationType::NewStore,
            json!({"city": "Lille", "surface_sqm": 350, "investment": 250000, "monthly_revenue": 120000}),
        );
        let s = m.create(req).await.unwrap();
        assert_eq!(s.period, Period::TwelveMonths);
        assert_eq!(s.results.evolution_data.len(), 12);
    }

    #[tokio::test]
    async fn parameter_patch_recomputes() {
        let m = manager();
        let s = m.create(promotion_request()).await.unwrap();
        let updated = m
            .update(s.id, ScenarioPatch::default().parameters(json!({"marketing_budget": 50000})))
            .await
            .unwrap();
        assert_eq!(updated.results.figures.cost_impact, 50_000.0);
        assert_ne!(updated.inputs_digest, s.inputs_digest);
        assert!(updated.results_are_current(m.config()));
        assert_eq!(updated.version, 2);
        assert_eq!(updated.created_at, s.created_at);
    }

    #[tokio::test]
    async fn period_patch_recomputes() {
        let m = manager();
        let s = m.create(promotion_request()).await.unwrap();
        let updated = m
            .update(s.id, ScenarioPatch::default().period(Period::TwelveMonths))
            .await
            .unwrap();
        assert_eq!(updated.results.evolution_data.len(), 12);
        assert!(updated.results.figures.revenue_impact > s.results.figures.revenue_impact);
    }

    #[tokio::test]
    async fn kind_change_requires_full_payload() {
        let m = manager();
        let s = m.create(promotion_request()).await.unwrap();

        let mut patch = ScenarioPatch::default();
        patch.simulation_type = Some("cost_optimization".to_string());
        let err = m.update(s.id, patch).await.unwrap_err();
        assert!(matches!(err, ScenarioError::Validation(ValidationError::MissingField { ref field }) if field == "parameters"));

        let updated = m
            .update(
                s.id,
                ScenarioPatch::default().simulation(
                    SimulationType::CostOptimization,
                    json!({"cost_type": "rent", "cost_reduction_pct": 5, "implementation_cost": 0, "service_impact": "none"}),
                ),
            )
            .await
            .unwrap();
        assert_eq!(updated.simulation_type(), SimulationType::CostOptimization);
        assert!(updated.results.figures.cost_impact < 0.0);
    }

    #[tokio::test]
    async fn archived_cannot_be_reactivated() {
        let m = manager();
        let s = m.create(promotion_request()).await.unwrap();
        m.archive(s.id).await.unwrap();
        let err = m.activate(s.id).await.unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::InvalidTransition { from: ScenarioStatus::Archived, to: ScenarioStatus::Active }
        ));
        let err = m.update(s.id, ScenarioPatch::default().status(ScenarioStatus::Draft)).await.unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn rename_keeps_results() {
        let m = manager();
        let s = m.create(promotion_request()).await.unwrap();
        let updated = m.update(s.id, ScenarioPatch::default().name("Winter sale")).await.unwrap();
        assert_eq!(updated.name, "Winter sale");
        assert_eq!(updated.results, s.results);
        assert_eq!(updated.inputs_digest, s.inputs_digest);

        let err = m.update(s.id, ScenarioPatch::default().name(" ")).await.unwrap_err();
        assert!(matches!(err, ScenarioError::Validation(ValidationError::EmptyName)));
    }

    #[tokio::test]
    async fn baseline_change_refreshes_results_on_next_save() {
        let store: Arc<dyn ScenarioStore> = Arc::new(InMemoryScenarioStore::new());
        let before = ScenarioManager::new(Arc::clone(&store), EngineConfig::default());
        let s = before.create(promotion_request()).await.unwrap();

        let mut config = EngineConfig::default();
        config.baseline.monthly_revenue *= 2.0;
        let after = ScenarioManager::new(store, config);
        let stored = after.get(s.id).await.unwrap();
        assert!(stored.results_are_current(before.config()));
        assert!(!stored.results_are_current(after.config()));

        let renamed = after.update(s.id, ScenarioPatch::default().name("Winter sale")).await.unwrap();
        assert_ne!(renamed.inputs_digest, s.inputs_digest);
        assert!(renamed.results_are_current(after.config()));
        assert!(renamed.results.figures.revenue_impact > s.results.figures.revenue_impact);
    }

    #[tokio::test]
    async fn simulate_previews_without_persisting() {
        let m = manager();
        let preview = m.simulate(&SimulationRequest::from(&promotion_request())).unwrap();
        assert_eq!(preview.figures.cost_impact, 100_000.0);
        assert!(m.list_by_status(None).await.unwrap().is_empty());

        let err = m
            .simulate(&SimulationRequest {
                simulation_type: Some("loyalty".to_string()),
                ..SimulationRequest::default()
            })
            .unwrap_err();
        assert!(matches!(err, ScenarioError::UnsupportedSimulationType { .. }));
    }

    #[tokio::test]
    async fn lock_table_does_not_retain_released_ids() {
        let m = manager();
        for _ in 0..1000 {
            assert!(m.delete(ScenarioId::new()).await.unwrap_err().is_not_found());
            let err = m
                .update(ScenarioId::new(), ScenarioPatch::default().name("ghost"))
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }
        assert_eq!(m.locks.len(), 0);

        let s = m.create(promotion_request()).await.unwrap();
        m.activate(s.id).await.unwrap();
        m.delete(s.id).await.unwrap();
        assert_eq!(m.locks.len(), 0);
    }

    #[tokio::test]
    async fn concurrent_updates_are_serialized() {
        let m = manager();
        let s = m.create(promotion_request()).await.unwrap();

        let mut handles = Vec::new();
        for budget in 1..=8u32 {
            let m = m.clone();
            handles.push(tokio::spawn(async move {
                m.update(
                    s.id,
                    ScenarioPatch::default().parameters(json!({"marketing_budget": f64::from(budget) * 1000.0})),
                )
                .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let stored = m.get(s.id).await.unwrap();
        assert_eq!(stored.version, 9);
        assert!(stored.results_are_current(m.config()));
        let ScenarioParameters::Promotion(p) = &stored.parameters else {
            panic!("expected promotion parameters");
        };
        assert_eq!(stored.results.figures.cost_impact, p.marketing_budget);
        assert_eq!(m.locks.len(), 0);
    }
}
