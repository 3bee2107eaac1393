//! Scenario entity and its lifecycle vocabulary.
//!
//! A [`Scenario`] is a named what-if configuration persisted together with
//! the impact computed from it. Results are what was computed when the
//! inputs were last saved; [`Scenario::results_are_current`] detects drift
//! in either the scenario inputs or the engine configuration they ran under.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::calculator::ImpactFigures;
use crate::config::EngineConfig;
use crate::error::{ScenarioError, ScenarioResult, ValidationError};
use crate::parameters::{ScenarioParameters, SimulationType};
use crate::projector::{EvolutionPoint, RampProfile, StoreImpact};

/// Globally unique, stable scenario identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(Uuid);

impl ScenarioId {
    /// Creates a new random scenario ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a scenario ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ScenarioId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScenarioId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Family a scenario belongs to. Only `what_if` is simulated by this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    /// What-if simulation.
    #[default]
    WhatIf,
    /// Budget scenario.
    Budget,
    /// Forecast scenario.
    Forecast,
    /// Stress test.
    StressTest,
}

impl ScenarioType {
    /// Wire name of this scenario type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WhatIf => "what_if",
            Self::Budget => "budget",
            Self::Forecast => "forecast",
            Self::StressTest => "stress_test",
        }
    }

    /// Parse a wire value, rejecting the families this engine cannot run.
    ///
    /// # Errors
    /// `UnsupportedScenarioType` for anything other than `what_if`, and
    /// `InvalidField` for an unknown value.
    pub fn parse_supported(s: &str) -> Result<Self, ValidationError> {
        let parsed = match s.trim() {
            "what_if" => Self::WhatIf,
            "budget" => Self::Budget,
            "forecast" => Self::Forecast,
            "stress_test" => Self::StressTest,
            other => {
                return Err(ValidationError::invalid(
                    "scenario_type",
                    format!("unknown scenario type '{other}'"),
                ))
            }
        };
        if parsed != Self::WhatIf {
            return Err(ValidationError::UnsupportedScenarioType {
                value: parsed.as_str().to_string(),
            });
        }
        Ok(parsed)
    }
}

/// Publication status of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Being worked on.
    #[default]
    Draft,
    /// Retained for planning.
    Active,
    /// Retired; only reachable again through duplication.
    Archived,
}

impl ScenarioStatus {
    /// Returns true if `self -> next` is allowed. Same-status moves are no-ops.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Draft | Self::Active | Self::Archived)
                | (Self::Active, Self::Active | Self::Archived)
                | (Self::Archived, Self::Archived)
        )
    }

    /// Apply a transition.
    ///
    /// # Errors
    /// `InvalidTransition` when the move is not allowed.
    pub fn transition(self, next: Self) -> ScenarioResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ScenarioError::InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for ScenarioStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(ValidationError::invalid(
                "status",
                format!("unknown status '{other}', expected draft, active or archived"),
            )),
        }
    }
}

/// Projection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// One month.
    #[serde(rename = "1_month")]
    OneMonth,
    /// Three months.
    #[serde(rename = "3_months")]
    ThreeMonths,
    /// Six months.
    #[serde(rename = "6_months")]
    SixMonths,
    /// Twelve months.
    #[serde(rename = "12_months")]
    TwelveMonths,
}

impl Period {
    /// Number of months covered.
    #[must_use]
    pub const fn months(self) -> u32 {
        match self {
            Self::OneMonth => 1,
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::TwelveMonths => 12,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMonth => "1_month",
            Self::ThreeMonths => "3_months",
            Self::SixMonths => "6_months",
            Self::TwelveMonths => "12_months",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1_month" => Ok(Self::OneMonth),
            "3_months" => Ok(Self::ThreeMonths),
            "6_months" => Ok(Self::SixMonths),
            "12_months" | "1_year" => Ok(Self::TwelveMonths),
            other => Err(ValidationError::invalid(
                "period",
                format!("unknown period '{other}', expected 1_month, 3_months, 6_months or 12_months"),
            )),
        }
    }
}

/// Full simulation output: headline figures plus projected views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactResult {
    /// Headline impact figures.
    #[serde(flatten)]
    pub figures: ImpactFigures,
    /// Month-by-month revenue with and without the simulation.
    pub evolution_data: Vec<EvolutionPoint>,
    /// Revenue impact allocated per store.
    pub store_impact: Vec<StoreImpact>,
}

/// blake3 digest of the inputs a result was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputsDigest([u8; 32]);

impl InputsDigest {
    /// Digest of a set of simulation inputs and the engine settings that
    /// shape their results (baseline and probability model).
    #[must_use]
    pub fn of(
        parameters: &ScenarioParameters,
        period: Period,
        ramp_profile: RampProfile,
        config: &EngineConfig,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(parameters.simulation_type().as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(period.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(ramp_profile.as_str().as_bytes());
        hasher.update(b"\0");
        // serde_json output is stable for a given value (maps are sorted).
        hasher.update(parameters.to_raw().to_string().as_bytes());
        hasher.update(b"\0");

        let baseline = &config.baseline;
        for figure in [
            baseline.monthly_revenue,
            baseline.margin_rate,
            baseline.category_shares.clothing,
            baseline.category_shares.shoes,
            baseline.category_shares.leather_goods,
        ] {
            hasher.update(&figure.to_le_bytes());
        }
        for store in &baseline.stores {
            hasher.update(store.name.as_bytes());
            hasher.update(b"\0");
            hasher.update(&store.monthly_revenue.to_le_bytes());
        }
        hasher.update(config.probability_model.to_string().as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for InputsDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for InputsDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// A persisted what-if scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Stable identifier, assigned at creation.
    pub id: ScenarioId,
    /// Display name (non-empty).
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Scenario family (always `WhatIf` for records created here).
    pub scenario_type: ScenarioType,
    /// Projection window.
    pub period: Period,
    /// How the revenue impact is spread over the period.
    pub ramp_profile: RampProfile,
    /// Simulation inputs; carries the simulation kind.
    pub parameters: ScenarioParameters,
    /// Current status.
    pub status: ScenarioStatus,
    /// Author.
    pub created_by: String,
    /// Creation time, immutable.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency version, 1 on insert.
    pub version: u64,
    /// Soft-delete tombstone.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Results computed from the inputs at the last save.
    pub results: ImpactResult,
    /// Digest of the inputs `results` were computed from.
    pub inputs_digest: InputsDigest,
}

impl Scenario {
    /// Simulation kind, derived from the parameters.
    #[must_use]
    pub const fn simulation_type(&self) -> SimulationType {
        self.parameters.simulation_type()
    }

    /// Returns true if `results` were computed from the current inputs under
    /// `config`.
    #[must_use]
    pub fn results_are_current(&self, config: &EngineConfig) -> bool {
        InputsDigest::of(&self.parameters, self.period, self.ramp_profile, config) == self.inputs_digest
    }

    /// Returns true once soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Serialize)]
struct ScenarioView<'a> {
    id: ScenarioId,
    name: &'a str,
    description: Option<&'a str>,
    scenario_type: ScenarioType,
    simulation_type: SimulationType,
    period: Period,
    ramp_profile: RampProfile,
    parameters: &'a ScenarioParameters,
    status: ScenarioStatus,
    created_by: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_at: Option<DateTime<Utc>>,
    results: &'a ImpactResult,
    inputs_digest: InputsDigest,
}

impl Serialize for Scenario {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ScenarioView {
            id: self.id,
            name: &self.name,
            description: self.description.as_deref(),
            scenario_type: self.scenario_type,
            simulation_type: self.simulation_type(),
            period: self.period,
            ramp_profile: self.ramp_profile,
            parameters: &self.parameters,
            status: self.status,
            created_by: &self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
            deleted_at: self.deleted_at,
            results: &self.results,
            inputs_digest: self.inputs_digest,
        }
        .serialize(serializer)
    }
}
