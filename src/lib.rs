//! # retail-whatif - What-if scenario simulation for retail planning
//!
//! Takes business levers (a promotion, a new store, a cost-cutting plan, a
//! price change) over a time horizon and projects their effect on revenue,
//! cost, and margin against a baseline of company actuals. Projections are
//! persisted as versioned scenarios with a small draft/active/archived
//! lifecycle.
//!
//! ## Core Concepts
//!
//! - **Baseline**: company actuals impacts are measured against
//! - **Calculator**: pure function from parameters to impact figures
//! - **Projector**: month-by-month evolution and per-store allocation
//! - **Scenario**: a named, persisted simulation with its results
//! - **Manager**: lifecycle orchestration over an async record store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use retail_whatif::{CreateScenario, EngineConfig, InMemoryScenarioStore, ScenarioManager, SimulationType};
//!
//! let manager = ScenarioManager::new(Arc::new(InMemoryScenarioStore::new()), EngineConfig::default());
//! let scenario = manager
//!     .create(CreateScenario::new(
//!         "Summer sale",
//!         SimulationType::Promotion,
//!         serde_json::json!({"promo_type": "percentage", "discount": 30,
//!                            "marketing_budget": 100000, "traffic_increase_pct": 40}),
//!     ))
//!     .await?;
//! println!("margin impact: {}", scenario.results.figures.margin_impact);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Computation
pub mod baseline;
pub mod calculator;
pub mod parameters;
pub mod projector;

// Records and lifecycle
pub mod config;
pub mod error;
pub mod manager;
pub mod scenario;
pub mod storage;

#[cfg(feature = "http")]
pub mod transport;

// Re-export primary types at crate root for convenience
pub use baseline::{BaselineFinancials, CategoryShares, StoreBaseline};
pub use calculator::{compute_impact, compute_impact_raw, ImpactFigures, ProbabilityModel};
pub use config::EngineConfig;
pub use error::{ScenarioError, ScenarioResult, ValidationError};
pub use manager::{CreateScenario, ScenarioManager, ScenarioPatch, SimulationRequest};
pub use parameters::{
    Category, CostOptimizationParams, CostType, NewStoreParams, PriceChangeParams, PromoType, PromotionParams,
    ScenarioParameters, ServiceImpact, SimulationType,
};
pub use projector::{project_evolution, project_store_impact, EvolutionPoint, RampProfile, StoreImpact};
pub use scenario::{ImpactResult, InputsDigest, Period, Scenario, ScenarioId, ScenarioStatus, ScenarioType};
pub use storage::{InMemoryScenarioStore, ScenarioStore, StorageError};
