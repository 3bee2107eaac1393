//! Scenario parameter model.
//!
//! Each simulation kind carries its own strongly-typed field set. Raw
//! key-value payloads from the wire are decoded here, and only here, into a
//! [`ScenarioParameters`] value: missing, mistyped, or unknown fields are
//! rejected instead of silently defaulted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ScenarioError, ScenarioResult, ValidationError};
use crate::scenario::Period;

/// The four what-if simulation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationType {
    /// Retail price change on a product category.
    PriceChange,
    /// Promotional campaign.
    Promotion,
    /// Opening of a new store.
    NewStore,
    /// Cost reduction program.
    CostOptimization,
}

impl SimulationType {
    /// All kinds, in wire order.
    pub const ALL: [Self; 4] = [
        Self::PriceChange,
        Self::Promotion,
        Self::NewStore,
        Self::CostOptimization,
    ];

    /// Wire tag of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceChange => "price_change",
            Self::Promotion => "promotion",
            Self::NewStore => "new_store",
            Self::CostOptimization => "cost_optimization",
        }
    }

    /// Projection period used when a request omits one.
    #[must_use]
    pub const fn default_period(self) -> Period {
        match self {
            Self::PriceChange => Period::ThreeMonths,
            Self::Promotion | Self::CostOptimization => Period::SixMonths,
            Self::NewStore => Period::TwelveMonths,
        }
    }
}

impl fmt::Display for SimulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulationType {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| ScenarioError::UnsupportedSimulationType {
                tag: tag.to_string(),
            })
    }
}

/// Closed string enumerations decoded from parameter payloads.
trait WireEnum: Sized + Copy + 'static {
    const VALUES: &'static [(&'static str, Self)];

    fn wire_name(self) -> &'static str;

    fn from_wire(s: &str) -> Option<Self> {
        Self::VALUES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s.trim()))
            .map(|(_, v)| *v)
    }

    fn expected() -> String {
        let names: Vec<&str> = Self::VALUES.iter().map(|(name, _)| *name).collect();
        format!("expected one of: {}", names.join(", "))
    }
}

macro_rules! wire_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl WireEnum for $ty {
            const VALUES: &'static [(&'static str, Self)] = &[$(($name, Self::$variant)),+];

            fn wire_name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.wire_name())
            }
        }
    };
}

/// Product category targeted by a price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Whole catalogue.
    All,
    /// Clothing.
    Clothing,
    /// Shoes.
    Shoes,
    /// Leather goods.
    LeatherGoods,
}

wire_enum!(Category {
    All => "all",
    Clothing => "clothing",
    Shoes => "shoes",
    LeatherGoods => "leather_goods",
});

/// Promotion mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoType {
    /// Percentage off.
    Percentage,
    /// Fixed amount off.
    Fixed,
    /// Buy X, get Y.
    BuyXGetY,
}

wire_enum!(PromoType {
    Percentage => "percentage",
    Fixed => "fixed",
    BuyXGetY => "buy_x_get_y",
});

/// Cost line targeted by an optimization program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostType {
    /// Operational costs.
    Operational,
    /// Staff costs.
    Staff,
    /// Marketing costs.
    Marketing,
    /// Rent.
    Rent,
}

wire_enum!(CostType {
    Operational => "operational",
    Staff => "staff",
    Marketing => "marketing",
    Rent => "rent",
});

/// Expected effect of a cost program on customer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceImpact {
    /// No visible effect.
    None,
    /// Barely noticeable.
    Minimal,
    /// Noticeable; costs some revenue.
    Moderate,
}

wire_enum!(ServiceImpact {
    None => "none",
    Minimal => "minimal",
    Moderate => "moderate",
});

/// Parameters of a price change simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChangeParams {
    /// Targeted category.
    pub category: Category,
    /// Price change in percent (negative for a price cut).
    pub price_change_pct: f64,
}

/// Parameters of a promotion simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionParams {
    /// Promotion mechanics.
    pub promo_type: PromoType,
    /// Discount in percent.
    pub discount: f64,
    /// Marketing spend for the campaign.
    pub marketing_budget: f64,
    /// Expected store traffic uplift in percent.
    pub traffic_increase_pct: f64,
}

/// Parameters of a new store simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStoreParams {
    /// City of the new store.
    pub city: String,
    /// Sales surface in square meters.
    pub surface_sqm: f64,
    /// One-time opening investment.
    pub investment: f64,
    /// Expected monthly revenue once open.
    pub monthly_revenue: f64,
}

/// Parameters of a cost optimization simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostOptimizationParams {
    /// Targeted cost line.
    pub cost_type: CostType,
    /// Cost reduction in percent of the cost base.
    pub cost_reduction_pct: f64,
    /// One-time cost of putting the program in place.
    pub implementation_cost: f64,
    /// Expected service degradation.
    pub service_impact: ServiceImpact,
}

/// Simulation parameters, one variant per simulation kind.
///
/// Serializes as the bare field set of the active variant; the kind travels
/// next to it as `simulation_type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScenarioParameters {
    /// Price change.
    PriceChange(PriceChangeParams),
    /// Promotion.
    Promotion(PromotionParams),
    /// New store.
    NewStore(NewStoreParams),
    /// Cost optimization.
    CostOptimization(CostOptimizationParams),
}

impl ScenarioParameters {
    /// The simulation kind of this payload.
    #[must_use]
    pub const fn simulation_type(&self) -> SimulationType {
        match self {
            Self::PriceChange(_) => SimulationType::PriceChange,
            Self::Promotion(_) => SimulationType::Promotion,
            Self::NewStore(_) => SimulationType::NewStore,
            Self::CostOptimization(_) => SimulationType::CostOptimization,
        }
    }

    /// Decode a raw payload whose kind is given as a wire tag.
    ///
    /// # Errors
    /// `UnsupportedSimulationType` for an unknown tag, otherwise see
    /// [`ScenarioParameters::from_raw`].
    pub fn decode(tag: &str, raw: &Value) -> ScenarioResult<Self> {
        let kind: SimulationType = tag.parse()?;
        Ok(Self::from_raw(kind, raw)?)
    }

    /// Decode a raw payload for the declared simulation kind.
    ///
    /// # Errors
    /// `ValidationError` naming the first missing, mistyped, or unknown field.
    pub fn from_raw(kind: SimulationType, raw: &Value) -> Result<Self, ValidationError> {
        let mut fields = FieldReader::new(raw)?;
        let params = match kind {
            SimulationType::PriceChange => Self::PriceChange(PriceChangeParams {
                category: fields.choice("category")?,
                price_change_pct: fields.number("price_change_pct", &["price_change"])?,
            }),
            SimulationType::Promotion => Self::Promotion(PromotionParams {
                promo_type: fields.choice("promo_type")?,
                discount: fields.number("discount", &[])?,
                marketing_budget: fields.number("marketing_budget", &[])?,
                traffic_increase_pct: fields.number("traffic_increase_pct", &["traffic_increase"])?,
            }),
            SimulationType::NewStore => Self::NewStore(NewStoreParams {
                city: fields.text("city")?,
                surface_sqm: fields.number("surface_sqm", &["surface"])?,
                investment: fields.number("investment", &[])?,
                monthly_revenue: fields.number("monthly_revenue", &[])?,
            }),
            SimulationType::CostOptimization => Self::CostOptimization(CostOptimizationParams {
                cost_type: fields.choice("cost_type")?,
                cost_reduction_pct: fields.number("cost_reduction_pct", &["cost_reduction"])?,
                implementation_cost: fields.number("implementation_cost", &[])?,
                service_impact: fields.choice("service_impact")?,
            }),
        };
        fields.finish()?;
        Ok(params)
    }

    /// Wire representation of the field set, as `Serialize` renders it.
    #[must_use]
    pub fn to_raw(&self) -> Value {
        let fields: Vec<(&str, Value)> = match self {
            Self::PriceChange(p) => vec![
                ("category", p.category.wire_name().into()),
                ("price_change_pct", p.price_change_pct.into()),
            ],
            Self::Promotion(p) => vec![
                ("promo_type", p.promo_type.wire_name().into()),
                ("discount", p.discount.into()),
                ("marketing_budget", p.marketing_budget.into()),
                ("traffic_increase_pct", p.traffic_increase_pct.into()),
            ],
            Self::NewStore(p) => vec![
                ("city", p.city.clone().into()),
                ("surface_sqm", p.surface_sqm.into()),
                ("investment", p.investment.into()),
                ("monthly_revenue", p.monthly_revenue.into()),
            ],
            Self::CostOptimization(p) => vec![
                ("cost_type", p.cost_type.wire_name().into()),
                ("cost_reduction_pct", p.cost_reduction_pct.into()),
                ("implementation_cost", p.implementation_cost.into()),
                ("service_impact", p.service_impact.wire_name().into()),
            ],
        };
        Value::Object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// Overlay a partial payload on these parameters and re-validate the whole.
    ///
    /// # Errors
    /// Same as [`ScenarioParameters::from_raw`]; the patch must be an object.
    pub fn merged_with(&self, patch: &Value) -> Result<Self, ValidationError> {
        let Value::Object(patch) = patch else {
            return Err(ValidationError::invalid("parameters", "expected an object"));
        };
        let mut merged = match self.to_raw() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            // A patch may use a wire alias; drop the canonical key it replaces.
            if let Some(canonical) = canonical_name(key) {
                merged.remove(canonical);
            }
            merged.insert(key.clone(), value.clone());
        }
        Self::from_raw(self.simulation_type(), &Value::Object(merged))
    }

    /// Check value ranges that the type system cannot express.
    ///
    /// # Errors
    /// `InvalidParameter` naming the offending field.
    pub fn check_ranges(&self) -> ScenarioResult<()> {
        match self {
            Self::PriceChange(p) => {
                at_least("price_change_pct", p.price_change_pct, -100.0)?;
            }
            Self::Promotion(p) => {
                percentage("discount", p.discount)?;
                non_negative("marketing_budget", p.marketing_budget)?;
                at_least("traffic_increase_pct", p.traffic_increase_pct, -100.0)?;
            }
            Self::NewStore(p) => {
                finite("surface_sqm", p.surface_sqm)?;
                if p.surface_sqm <= 0.0 {
                    return Err(ScenarioError::InvalidParameter {
                        field: "surface_sqm",
                        value: p.surface_sqm,
                        reason: "must be greater than zero",
                    });
                }
                non_negative("investment", p.investment)?;
                non_negative("monthly_revenue", p.monthly_revenue)?;
            }
            Self::CostOptimization(p) => {
                percentage("cost_reduction_pct", p.cost_reduction_pct)?;
                non_negative("implementation_cost", p.implementation_cost)?;
            }
        }
        Ok(())
    }
}

fn canonical_name(alias: &str) -> Option<&'static str> {
    match alias {
        "price_change" => Some("price_change_pct"),
        "traffic_increase" => Some("traffic_increase_pct"),
        "surface" => Some("surface_sqm"),
        "cost_reduction" => Some("cost_reduction_pct"),
        _ => None,
    }
}

fn finite(field: &'static str, value: f64) -> ScenarioResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ScenarioError::InvalidParameter {
            field,
            value,
            reason: "must be a finite number",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> ScenarioResult<()> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ScenarioError::InvalidParameter {
            field,
            value,
            reason: "must not be negative",
        });
    }
    Ok(())
}

fn at_least(field: &'static str, value: f64, min: f64) -> ScenarioResult<()> {
    finite(field, value)?;
    if value < min {
        return Err(ScenarioError::InvalidParameter {
            field,
            value,
            reason: "must not be below -100 percent",
        });
    }
    Ok(())
}

fn percentage(field: &'static str, value: f64) -> ScenarioResult<()> {
    finite(field, value)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(ScenarioError::InvalidParameter {
            field,
            value,
            reason: "must be within [0, 100]",
        });
    }
    Ok(())
}

/// Consumes fields from a raw object; whatever is left over is unknown.
struct FieldReader {
    fields: Map<String, Value>,
}

impl FieldReader {
    fn new(raw: &Value) -> Result<Self, ValidationError> {
        match raw {
            Value::Object(map) => Ok(Self { fields: map.clone() }),
            Value::Null => Err(ValidationError::missing("parameters")),
            _ => Err(ValidationError::invalid("parameters", "expected an object")),
        }
    }

    fn take(&mut self, name: &'static str, aliases: &[&'static str]) -> Result<Option<Value>, ValidationError> {
        let mut found = self.fields.remove(name);
        for alias in aliases {
            if let Some(value) = self.fields.remove(*alias) {
                if found.is_some() {
                    return Err(ValidationError::invalid(
                        name,
                        format!("given both as '{name}' and '{alias}'"),
                    ));
                }
                found = Some(value);
            }
        }
        Ok(found.filter(|v| !v.is_null()))
    }

    fn number(&mut self, name: &'static str, aliases: &[&'static str]) -> Result<f64, ValidationError> {
        let value = self.take(name, aliases)?.ok_or_else(|| ValidationError::missing(name))?;
        value
            .as_f64()
            .ok_or_else(|| ValidationError::invalid(name, "expected a number"))
    }

    fn text(&mut self, name: &'static str) -> Result<String, ValidationError> {
        let value = self.take(name, &[])?.ok_or_else(|| ValidationError::missing(name))?;
        let Value::String(s) = value else {
            return Err(ValidationError::invalid(name, "expected a string"));
        };
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::missing(name));
        }
        Ok(s.to_string())
    }

    fn choice<E: WireEnum>(&mut self, name: &'static str) -> Result<E, ValidationError> {
        let value = self.take(name, &[])?.ok_or_else(|| ValidationError::missing(name))?;
        value
            .as_str()
            .and_then(E::from_wire)
            .ok_or_else(|| ValidationError::invalid(name, E::expected()))
    }

    fn finish(self) -> Result<(), ValidationError> {
        match self.fields.into_iter().next() {
            Some((field, _)) => Err(ValidationError::UnknownField { field }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_form_matches_serialized_form() {
        let samples = [
            ScenarioParameters::from_raw(SimulationType::Promotion, &promotion_raw()).unwrap(),
            ScenarioParameters::from_raw(
                SimulationType::NewStore,
                &json!({"city": "Nice", "surface": 280, "investment": 300000, "monthly_revenue": 90000}),
            )
            .unwrap(),
            ScenarioParameters::from_raw(
                SimulationType::CostOptimization,
                &json!({"cost_type": "staff", "cost_reduction": 4, "implementation_cost": 10000, "service_impact": "minimal"}),
            )
            .unwrap(),
            ScenarioParameters::from_raw(
                SimulationType::PriceChange,
                &json!({"category": "leather_goods", "price_change_pct": -3.5}),
            )
            .unwrap(),
        ];
        for params in samples {
            let raw = params.to_raw();
            assert_eq!(raw, serde_json::to_value(&params).unwrap());
            assert_eq!(ScenarioParameters::from_raw(params.simulation_type(), &raw).unwrap(), params);
        }
    }

    fn promotion_raw() -> Value {
        json!({
            "promo_type": "percentage",
            "discount": 30,
            "marketing_budget": 100000,
            "traffic_increase_pct": 40
        })
    }

    #[test]
    fn decodes_promotion_payload() {
        let params = ScenarioParameters::decode("promotion", &promotion_raw()).unwrap();
        let ScenarioParameters::Promotion(p) = &params else {
            panic!("expected promotion parameters");
        };
        assert_eq!(p.promo_type, PromoType::Percentage);
        assert_eq!(p.discount, 30.0);
        assert_eq!(p.marketing_budget, 100_000.0);
        assert_eq!(p.traffic_increase_pct, 40.0);
        assert_eq!(params.simulation_type(), SimulationType::Promotion);
    }

    #[test]
    fn accepts_legacy_field_names() {
        let raw = json!({
            "promo_type": "buy_x_get_y",
            "discount": 10,
            "marketing_budget": 0,
            "traffic_increase": 5
        });
        let params = ScenarioParameters::decode("promotion", &raw).unwrap();
        let ScenarioParameters::Promotion(p) = params else {
            panic!("expected promotion parameters");
        };
        assert_eq!(p.traffic_increase_pct, 5.0);

        let raw = json!({"city": "Lille", "surface": 350, "investment": 250000, "monthly_revenue": 120000});
        let params = ScenarioParameters::from_raw(SimulationType::NewStore, &raw).unwrap();
        assert!(matches!(params, ScenarioParameters::NewStore(ref p) if p.surface_sqm == 350.0));
    }

    #[test]
    fn rejects_both_spellings_of_a_field() {
        let raw = json!({"category": "all", "price_change": 5, "price_change_pct": 5});
        let err = ScenarioParameters::from_raw(SimulationType::PriceChange, &raw).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { ref field, .. } if field == "price_change_pct"));
    }

    #[test]
    fn missing_field_is_named() {
        let raw = json!({"promo_type": "percentage", "discount": 30, "traffic_increase_pct": 40});
        let err = ScenarioParameters::from_raw(SimulationType::Promotion, &raw).unwrap_err();
        assert_eq!(err, ValidationError::missing("marketing_budget"));
    }

    #[test]
    fn null_counts_as_missing() {
        let raw = json!({"category": "shoes", "price_change_pct": null});
        let err = ScenarioParameters::from_raw(SimulationType::PriceChange, &raw).unwrap_err();
        assert_eq!(err, ValidationError::missing("price_change_pct"));
    }

    #[test]
    fn field_of_another_kind_is_rejected() {
        let mut raw = promotion_raw();
        raw["city"] = json!("Paris");
        let err = ScenarioParameters::from_raw(SimulationType::Promotion, &raw).unwrap_err();
        assert_eq!(err, ValidationError::UnknownField { field: "city".to_string() });
    }

    #[test]
    fn wrong_types_are_rejected() {
        let raw = json!({"category": "all", "price_change_pct": "10"});
        let err = ScenarioParameters::from_raw(SimulationType::PriceChange, &raw).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { ref field, .. } if field == "price_change_pct"));

        let raw = json!({"category": "hats", "price_change_pct": 10});
        let err = ScenarioParameters::from_raw(SimulationType::PriceChange, &raw).unwrap_err();
        let ValidationError::InvalidField { field, reason } = err else {
            panic!("expected invalid field");
        };
        assert_eq!(field, "category");
        assert!(reason.contains("leather_goods"));

        let err = ScenarioParameters::from_raw(SimulationType::PriceChange, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { ref field, .. } if field == "parameters"));
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let err = ScenarioParameters::decode("stock_clearance", &promotion_raw()).unwrap_err();
        assert!(matches!(err, ScenarioError::UnsupportedSimulationType { ref tag } if tag == "stock_clearance"));
    }

    #[test]
    fn serializes_as_bare_field_set() {
        let params = ScenarioParameters::decode("promotion", &promotion_raw()).unwrap();
        let raw = params.to_raw();
        assert_eq!(raw["discount"], json!(30.0));
        assert_eq!(raw["promo_type"], json!("percentage"));
        assert!(raw.get("simulation_type").is_none());
        assert_eq!(ScenarioParameters::from_raw(SimulationType::Promotion, &raw).unwrap(), params);
    }

    #[test]
    fn merge_overlays_and_revalidates() {
        let params = ScenarioParameters::decode("promotion", &promotion_raw()).unwrap();
        let merged = params.merged_with(&json!({"traffic_increase": 10})).unwrap();
        let ScenarioParameters::Promotion(p) = merged else {
            panic!("expected promotion parameters");
        };
        assert_eq!(p.traffic_increase_pct, 10.0);
        assert_eq!(p.discount, 30.0);

        let err = params.merged_with(&json!({"surface_sqm": 12})).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownField { .. }));
    }

    #[test]
    fn range_checks() {
        let raw = json!({"city": "Nice", "surface_sqm": -5, "investment": 1, "monthly_revenue": 1});
        let params = ScenarioParameters::from_raw(SimulationType::NewStore, &raw).unwrap();
        let err = params.check_ranges().unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidParameter { field: "surface_sqm", .. }));

        let raw = json!({"city": "Nice", "surface_sqm": 200, "investment": -1, "monthly_revenue": 1});
        let params = ScenarioParameters::from_raw(SimulationType::NewStore, &raw).unwrap();
        let err = params.check_ranges().unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidParameter { field: "investment", .. }));

        let raw = json!({
            "cost_type": "rent",
            "cost_reduction_pct": 120,
            "implementation_cost": 0,
            "service_impact": "none"
        });
        let params = ScenarioParameters::from_raw(SimulationType::CostOptimization, &raw).unwrap();
        assert!(params.check_ranges().is_err());

        let params = ScenarioParameters::decode("promotion", &promotion_raw()).unwrap();
        assert!(params.check_ranges().is_ok());
    }

    #[test]
    fn default_periods() {
        assert_eq!(SimulationType::Promotion.default_period(), Period::SixMonths);
        assert_eq!(SimulationType::NewStore.default_period(), Period::TwelveMonths);
        assert_eq!(SimulationType::CostOptimization.default_period(), Period::SixMonths);
        assert_eq!(SimulationType::PriceChange.default_period(), Period::ThreeMonths);
    }
}
