//! Engine configuration.

use std::path::Path;

use crate::baseline::BaselineFinancials;
use crate::calculator::ProbabilityModel;
use crate::error::{ScenarioError, ScenarioResult, ValidationError};

/// Author recorded when a request does not name one.
pub const DEFAULT_AUTHOR: &str = "system";

/// Configuration of a [`crate::manager::ScenarioManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Reference financials impacts are measured against.
    pub baseline: BaselineFinancials,
    /// Probability assignment for projections.
    pub probability_model: ProbabilityModel,
    /// Author recorded when a request does not name one.
    pub default_created_by: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            baseline: BaselineFinancials::default(),
            probability_model: ProbabilityModel::default(),
            default_created_by: DEFAULT_AUTHOR.to_string(),
        }
    }
}

impl EngineConfig {
    /// Configuration with the given baseline and default settings otherwise.
    #[must_use]
    pub fn with_baseline(baseline: BaselineFinancials) -> Self {
        Self {
            baseline,
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// `Validation` describing the first invalid setting.
    pub fn validate(&self) -> ScenarioResult<()> {
        self.baseline.validate()?;
        if self.default_created_by.trim().is_empty() {
            return Err(ValidationError::missing("default_created_by").into());
        }
        Ok(())
    }
}

/// Load baseline financials from a JSON file and validate them.
///
/// # Errors
/// `Internal` if the file cannot be read, `Validation` if it does not parse or
/// holds out-of-range figures.
pub fn load_baseline_file(path: impl AsRef<Path>) -> ScenarioResult<BaselineFinancials> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| ScenarioError::internal(format!("failed to read baseline file {}: {e}", path.display())))?;
    let baseline: BaselineFinancials = serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::invalid("baseline", format!("{}: {e}", path.display())))?;
    baseline.validate()?;
    Ok(baseline)
}
