//! Financial impact calculator.
//!
//! Pure, deterministic mapping from (parameters, period, baseline) to impact
//! figures. No shared state, no I/O; safe to call from any thread.
//!
//! Sign convention: a positive `cost_impact` is additional spend, a negative
//! one is a saving.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::baseline::BaselineFinancials;
use crate::error::{ScenarioError, ScenarioResult, ValidationError};
use crate::parameters::{
    Category, CostOptimizationParams, NewStoreParams, PriceChangeParams, PromotionParams,
    ScenarioParameters, ServiceImpact,
};
use crate::scenario::Period;

/// Optimistic band multiplier.
pub const OPTIMISTIC_MULTIPLIER: f64 = 1.20;

/// Pessimistic band multiplier.
pub const PESSIMISTIC_MULTIPLIER: f64 = 0.85;

/// Probability attached to a projection when no model overrides it.
pub const DEFAULT_PROBABILITY: f64 = 0.75;

/// Margin-rate points lost per discount point during a promotion.
pub const PROMO_MARGIN_EROSION_PER_POINT: f64 = 0.3;

/// Straight-line amortization horizon of a new store investment.
pub const NEW_STORE_AMORTIZATION_MONTHS: u32 = 36;

/// Revenue lost per month, as a fraction of baseline, under moderate service impact.
pub const MODERATE_SERVICE_REVENUE_PENALTY: f64 = 0.01;

/// Smallest cost magnitude used as ROI denominator.
const ROI_COST_FLOOR: f64 = 1.0;

/// How the probability of a projection is assigned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbabilityModel {
    /// Same probability for every projection.
    Fixed(f64),
    /// 0.85 above an ROI of 2, 0.60 below an ROI of 1, 0.75 otherwise.
    RoiBanded,
}

impl Default for ProbabilityModel {
    fn default() -> Self {
        Self::Fixed(DEFAULT_PROBABILITY)
    }
}

impl ProbabilityModel {
    /// Probability for a projection with the given ROI.
    #[must_use]
    pub fn probability(self, roi: f64) -> f64 {
        match self {
            Self::Fixed(p) => p.clamp(0.0, 1.0),
            Self::RoiBanded => {
                if roi > 2.0 {
                    0.85
                } else if roi < 1.0 {
                    0.60
                } else {
                    DEFAULT_PROBABILITY
                }
            }
        }
    }
}

impl fmt::Display for ProbabilityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(p) => write!(f, "fixed:{p}"),
            Self::RoiBanded => write!(f, "roi-banded"),
        }
    }
}

impl FromStr for ProbabilityModel {
    type Err = ValidationError;

    /// Accepts `fixed`, `fixed:<p>` and `roi-banded`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("roi-banded") || s.eq_ignore_ascii_case("roi_banded") {
            return Ok(Self::RoiBanded);
        }
        if s.eq_ignore_ascii_case("fixed") {
            return Ok(Self::Fixed(DEFAULT_PROBABILITY));
        }
        if let Some(p) = s.strip_prefix("fixed:") {
            let p: f64 = p
                .trim()
                .parse()
                .map_err(|_| ValidationError::invalid("probability_model", "fixed probability must be a number"))?;
            if !(0.0..=1.0).contains(&p) {
                return Err(ValidationError::invalid("probability_model", "fixed probability must be within [0, 1]"));
            }
            return Ok(Self::Fixed(p));
        }
        Err(ValidationError::invalid(
            "probability_model",
            format!("unknown model '{s}', expected fixed, fixed:<p> or roi-banded"),
        ))
    }
}

/// Headline figures of one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImpactFigures {
    /// Revenue delta over the period.
    pub revenue_impact: f64,
    /// Cost delta over the period (positive = spend).
    pub cost_impact: f64,
    /// Gross margin delta over the period.
    pub margin_impact: f64,
    /// Revenue delta in percent of baseline revenue over the period.
    pub revenue_percent: f64,
    /// Margin delta in percent of baseline margin over the period.
    pub margin_percent: f64,
    /// Cost delta in percent of the baseline cost base over the period.
    pub cost_percent: f64,
    /// Change of the margin rate, in percentage points.
    pub margin_rate_change_pts: f64,
    /// `margin_impact / max(|cost_impact|, 1)`.
    pub roi: f64,
    /// Likelihood attached to the realistic projection.
    pub probability: f64,
    /// Revenue impact, optimistic band.
    pub optimistic_revenue: f64,
    /// Margin impact, optimistic band.
    pub optimistic_margin: f64,
    /// Revenue impact, realistic band.
    pub realistic_revenue: f64,
    /// Margin impact, realistic band.
    pub realistic_margin: f64,
    /// Revenue impact, pessimistic band.
    pub pessimistic_revenue: f64,
    /// Margin impact, pessimistic band.
    pub pessimistic_margin: f64,
}

impl ImpactFigures {
    /// Every figure with its wire name.
    fn named(&self) -> [(&'static str, f64); 15] {
        [
            ("revenue_impact", self.revenue_impact),
            ("cost_impact", self.cost_impact),
            ("margin_impact", self.margin_impact),
            ("revenue_percent", self.revenue_percent),
            ("margin_percent", self.margin_percent),
            ("cost_percent", self.cost_percent),
            ("margin_rate_change_pts", self.margin_rate_change_pts),
            ("roi", self.roi),
            ("probability", self.probability),
            ("optimistic_revenue", self.optimistic_revenue),
            ("optimistic_margin", self.optimistic_margin),
            ("realistic_revenue", self.realistic_revenue),
            ("realistic_margin", self.realistic_margin),
            ("pessimistic_revenue", self.pessimistic_revenue),
            ("pessimistic_margin", self.pessimistic_margin),
        ]
    }

    /// Reject figures that overflowed to infinity or NaN.
    ///
    /// # Errors
    /// `InvalidParameter` naming the first non-finite figure.
    pub fn ensure_finite(&self) -> ScenarioResult<()> {
        match self.named().into_iter().find(|(_, v)| !v.is_finite()) {
            Some((field, value)) => Err(ScenarioError::InvalidParameter {
                field,
                value,
                reason: "inputs overflow the representable range",
            }),
            None => Ok(()),
        }
    }
}

/// Return on investment with a guarded denominator.
///
/// A zero cost never faults; the denominator is floored at one currency unit.
#[must_use]
pub fn roi(margin_impact: f64, cost_impact: f64) -> f64 {
    margin_impact / cost_impact.abs().max(ROI_COST_FLOOR)
}

/// Price elasticity of demand assumed per category.
#[must_use]
pub const fn price_elasticity(category: Category) -> f64 {
    match category {
        Category::All => 1.5,
        Category::Clothing => 1.6,
        Category::Shoes => 1.2,
        Category::LeatherGoods => 0.7,
    }
}

/// Raw deltas before percentages and bands are derived.
struct Deltas {
    revenue: f64,
    cost: f64,
    margin: f64,
    margin_rate_pts: f64,
}

fn promotion(p: &PromotionParams, months: f64, baseline: &BaselineFinancials) -> Deltas {
    let revenue = baseline.monthly_revenue * months * (p.discount / 100.0) * (1.0 + p.traffic_increase_pct / 100.0);
    let cost = p.marketing_budget;
    Deltas {
        revenue,
        cost,
        margin: revenue * baseline.margin_rate - cost,
        margin_rate_pts: -(p.discount * PROMO_MARGIN_EROSION_PER_POINT),
    }
}

fn new_store(p: &NewStoreParams, period: Period, baseline: &BaselineFinancials) -> Deltas {
    let revenue = p.monthly_revenue * f64::from(period.months());
    let amortized_months = period.months().min(NEW_STORE_AMORTIZATION_MONTHS);
    let amortized = p.investment * f64::from(amortized_months) / f64::from(NEW_STORE_AMORTIZATION_MONTHS);
    Deltas {
        revenue,
        cost: p.investment,
        margin: revenue * baseline.margin_rate - amortized,
        margin_rate_pts: 0.0,
    }
}

fn cost_optimization(p: &CostOptimizationParams, months: f64, baseline: &BaselineFinancials) -> Deltas {
    let savings = baseline.monthly_cost_base() * months * (p.cost_reduction_pct / 100.0);
    let cost = -savings + p.implementation_cost;
    let revenue = match p.service_impact {
        ServiceImpact::Moderate => -(baseline.monthly_revenue * months * MODERATE_SERVICE_REVENUE_PENALTY),
        ServiceImpact::None | ServiceImpact::Minimal => 0.0,
    };
    Deltas {
        revenue,
        cost,
        margin: -cost,
        margin_rate_pts: 0.0,
    }
}

fn price_change(p: &PriceChangeParams, months: f64, baseline: &BaselineFinancials) -> Deltas {
    let elasticity_factor = 1.0 - price_elasticity(p.category);
    let revenue = baseline.category_revenue(p.category) * months * (p.price_change_pct / 100.0) * elasticity_factor;
    Deltas {
        revenue,
        cost: 0.0,
        margin: revenue * baseline.margin_rate,
        margin_rate_pts: 0.0,
    }
}

fn percent_of(value: f64, reference: f64) -> f64 {
    if reference.abs() > f64::EPSILON {
        value / reference * 100.0
    } else {
        0.0
    }
}

/// Compute the impact of a simulation.
///
/// # Errors
/// `InvalidParameter` when a numeric field is out of range.
pub fn compute_impact(
    parameters: &ScenarioParameters,
    period: Period,
    baseline: &BaselineFinancials,
    model: ProbabilityModel,
) -> ScenarioResult<ImpactFigures> {
    parameters.check_ranges()?;

    let months = f64::from(period.months());
    let deltas = match parameters {
        ScenarioParameters::Promotion(p) => promotion(p, months, baseline),
        ScenarioParameters::NewStore(p) => new_store(p, period, baseline),
        ScenarioParameters::CostOptimization(p) => cost_optimization(p, months, baseline),
        ScenarioParameters::PriceChange(p) => price_change(p, months, baseline),
    };

    let roi = roi(deltas.margin, deltas.cost);
    let figures = ImpactFigures {
        revenue_impact: deltas.revenue,
        cost_impact: deltas.cost,
        margin_impact: deltas.margin,
        revenue_percent: percent_of(deltas.revenue, baseline.monthly_revenue * months),
        margin_percent: percent_of(deltas.margin, baseline.monthly_margin() * months),
        cost_percent: percent_of(deltas.cost, baseline.monthly_cost_base() * months),
        margin_rate_change_pts: deltas.margin_rate_pts,
        roi,
        probability: model.probability(roi),
        optimistic_revenue: deltas.revenue * OPTIMISTIC_MULTIPLIER,
        optimistic_margin: deltas.margin * OPTIMISTIC_MULTIPLIER,
        realistic_revenue: deltas.revenue,
        realistic_margin: deltas.margin,
        pessimistic_revenue: deltas.revenue * PESSIMISTIC_MULTIPLIER,
        pessimistic_margin: deltas.margin * PESSIMISTIC_MULTIPLIER,
    };
    figures.ensure_finite()?;
    Ok(figures)
}

/// Decode a tagged raw payload and compute its impact.
///
/// The period defaults per simulation kind when omitted.
///
/// # Errors
/// `UnsupportedSimulationType`, `Validation`, or `InvalidParameter`.
pub fn compute_impact_raw(
    simulation_type: &str,
    raw: &Value,
    period: Option<Period>,
    baseline: &BaselineFinancials,
    model: ProbabilityModel,
) -> ScenarioResult<ImpactFigures> {
    let parameters = ScenarioParameters::decode(simulation_type, raw)?;
    let period = period.unwrap_or_else(|| parameters.simulation_type().default_period());
    compute_impact(&parameters, period, baseline, model)
}
