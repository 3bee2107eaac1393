//! Simulation result projector.
//!
//! Expands one impact computation into the auxiliary views consumers need:
//! a month-by-month evolution series and a per-store distribution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::baseline::StoreBaseline;
use crate::calculator::ImpactFigures;
use crate::error::ValidationError;

/// How the revenue impact is spread across the months of the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampProfile {
    /// Same share every month.
    #[default]
    Even,
    /// Month k weighs k; the effect builds up over the period.
    Linear,
}

impl RampProfile {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Even => "even",
            Self::Linear => "linear",
        }
    }

    /// Fraction of the total impact landing in `month` (1-based) of `months`.
    fn weight(self, month: u32, months: u32) -> f64 {
        match self {
            Self::Even => 1.0 / f64::from(months),
            Self::Linear => {
                let total = f64::from(months) * f64::from(months + 1) / 2.0;
                f64::from(month) / total
            }
        }
    }
}

impl fmt::Display for RampProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RampProfile {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "even" => Ok(Self::Even),
            "linear" => Ok(Self::Linear),
            other => Err(ValidationError::invalid(
                "ramp_profile",
                format!("unknown ramp profile '{other}', expected even or linear"),
            )),
        }
    }
}

/// One month of the evolution series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvolutionPoint {
    /// Month index, starting at 1.
    pub month: u32,
    /// Revenue without the simulation.
    pub baseline: f64,
    /// Revenue with the simulation.
    pub with_simulation: f64,
}

/// Revenue impact attributed to one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreImpact {
    /// Store display name.
    pub store_name: String,
    /// Allocated revenue impact.
    pub impact: f64,
}

/// Month-by-month revenue over the period, with and without the simulation.
///
/// The baseline is flat; the per-month shares of `revenue_impact` follow the
/// ramp profile and always sum to the full impact.
#[must_use]
pub fn project_evolution(
    figures: &ImpactFigures,
    period_months: u32,
    baseline_monthly_revenue: f64,
    profile: RampProfile,
) -> Vec<EvolutionPoint> {
    (1..=period_months)
        .map(|month| EvolutionPoint {
            month,
            baseline: baseline_monthly_revenue,
            with_simulation: baseline_monthly_revenue
                + figures.revenue_impact * profile.weight(month, period_months),
        })
        .collect()
}

/// Allocate the revenue impact across stores, pro rata to baseline revenue.
///
/// Falls back to a uniform split when the stores carry no revenue.
#[must_use]
pub fn project_store_impact(figures: &ImpactFigures, stores: &[StoreBaseline]) -> Vec<StoreImpact> {
    if stores.is_empty() {
        return Vec::new();
    }

    let total: f64 = stores.iter().map(|s| s.monthly_revenue).sum();
    #[allow(clippy::cast_precision_loss)]
    let uniform = 1.0 / stores.len() as f64;

    stores
        .iter()
        .map(|store| {
            let share = if total > 0.0 {
                store.monthly_revenue / total
            } else {
                uniform
            };
            StoreImpact {
                store_name: store.name.clone(),
                impact: figures.revenue_impact * share,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineFinancials;
    use crate::calculator::{compute_impact, ProbabilityModel};
    use crate::parameters::ScenarioParameters;
    use crate::scenario::Period;
    use serde_json::json;

    fn figures(revenue_impact: f64) -> ImpactFigures {
        let params = ScenarioParameters::decode(
            "price_change",
            &json!({"category": "all", "price_change_pct": -10}),
        )
        .unwrap();
        let mut f = compute_impact(
            &params,
            Period::OneMonth,
            &BaselineFinancials::default(),
            ProbabilityModel::default(),
        )
        .unwrap();
        f.revenue_impact = revenue_impact;
        f
    }

    #[test]
    fn evolution_has_one_point_per_month() {
        let f = figures(300.0);
        assert_eq!(project_evolution(&f, 3, 1000.0, RampProfile::Even).len(), 3);
        assert_eq!(project_evolution(&f, 12, 1000.0, RampProfile::Even).len(), 12);
    }

    #[test]
    fn even_profile_spreads_evenly() {
        let points = project_evolution(&figures(300.0), 3, 1000.0, RampProfile::Even);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.month as usize, i + 1);
            assert_eq!(p.baseline, 1000.0);
            assert!((p.with_simulation - 1100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn linear_profile_ramps_and_sums_to_impact() {
        let points = project_evolution(&figures(600.0), 3, 0.0, RampProfile::Linear);
        let deltas: Vec<f64> = points.iter().map(|p| p.with_simulation - p.baseline).collect();
        assert!((deltas[0] - 100.0).abs() < 1e-9);
        assert!((deltas[1] - 200.0).abs() < 1e-9);
        assert!((deltas[2] - 300.0).abs() < 1e-9);
        assert!((deltas.iter().sum::<f64>() - 600.0).abs() < 1e-9);
    }

    #[test]
    fn stores_get_pro_rata_shares() {
        let stores = vec![StoreBaseline::new("A", 300.0), StoreBaseline::new("B", 100.0)];
        let impact = project_store_impact(&figures(1000.0), &stores);
        assert_eq!(impact.len(), 2);
        assert_eq!(impact[0].store_name, "A");
        assert!((impact[0].impact - 750.0).abs() < 1e-9);
        assert!((impact[1].impact - 250.0).abs() < 1e-9);
    }

    #[test]
    fn zero_revenue_stores_split_uniformly() {
        let stores = vec![StoreBaseline::new("A", 0.0), StoreBaseline::new("B", 0.0)];
        let impact = project_store_impact(&figures(1000.0), &stores);
        assert!((impact[0].impact - 500.0).abs() < 1e-9);
        assert!(project_store_impact(&figures(1000.0), &[]).is_empty());
    }

    #[test]
    fn ramp_profile_parsing() {
        assert_eq!("linear".parse::<RampProfile>().unwrap(), RampProfile::Linear);
        assert!("s_curve".parse::<RampProfile>().is_err());
    }
}
