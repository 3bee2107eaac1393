//! Baseline financials.
//!
//! The reference trajectory every impact is measured against. Callers source
//! it from the current period's actuals and pass it in; the calculator never
//! reads global state.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::parameters::Category;

/// Default monthly company revenue (3,800 thousand currency units).
pub const DEFAULT_MONTHLY_REVENUE: f64 = 3_800_000.0;

/// Default gross margin rate.
pub const DEFAULT_MARGIN_RATE: f64 = 0.27;

/// Revenue share of each product category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryShares {
    /// Clothing share of revenue.
    pub clothing: f64,
    /// Shoes share of revenue.
    pub shoes: f64,
    /// Leather goods share of revenue.
    pub leather_goods: f64,
}

impl Default for CategoryShares {
    fn default() -> Self {
        Self {
            clothing: 0.55,
            shoes: 0.25,
            leather_goods: 0.20,
        }
    }
}

/// Baseline monthly revenue of one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreBaseline {
    /// Store display name.
    pub name: String,
    /// Baseline monthly revenue.
    pub monthly_revenue: f64,
}

impl StoreBaseline {
    /// Creates a store baseline.
    #[must_use]
    pub fn new(name: impl Into<String>, monthly_revenue: f64) -> Self {
        Self {
            name: name.into(),
            monthly_revenue,
        }
    }
}

fn default_stores() -> Vec<StoreBaseline> {
    vec![
        StoreBaseline::new("Paris", 935_000.0),
        StoreBaseline::new("Lyon", 750_000.0),
        StoreBaseline::new("Marseille", 590_000.0),
        StoreBaseline::new("Nice", 560_000.0),
        StoreBaseline::new("Toulouse", 510_000.0),
        StoreBaseline::new("Bordeaux", 455_000.0),
    ]
}

/// Reference financials for one month of activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaselineFinancials {
    /// Company revenue per month.
    pub monthly_revenue: f64,
    /// Gross margin rate in (0, 1).
    pub margin_rate: f64,
    /// Revenue split by category.
    #[serde(default)]
    pub category_shares: CategoryShares,
    /// Known stores, in display order.
    #[serde(default = "default_stores")]
    pub stores: Vec<StoreBaseline>,
}

impl Default for BaselineFinancials {
    fn default() -> Self {
        Self {
            monthly_revenue: DEFAULT_MONTHLY_REVENUE,
            margin_rate: DEFAULT_MARGIN_RATE,
            category_shares: CategoryShares::default(),
            stores: default_stores(),
        }
    }
}

impl BaselineFinancials {
    /// Baseline with the given headline figures and the default stores.
    #[must_use]
    pub fn new(monthly_revenue: f64, margin_rate: f64) -> Self {
        Self {
            monthly_revenue,
            margin_rate,
            ..Self::default()
        }
    }

    /// Replace the store list.
    #[must_use]
    pub fn with_stores(mut self, stores: Vec<StoreBaseline>) -> Self {
        self.stores = stores;
        self
    }

    /// Monthly gross margin.
    #[must_use]
    pub fn monthly_margin(&self) -> f64 {
        self.monthly_revenue * self.margin_rate
    }

    /// Monthly cost base (revenue not kept as margin).
    #[must_use]
    pub fn monthly_cost_base(&self) -> f64 {
        self.monthly_revenue * (1.0 - self.margin_rate)
    }

    /// Monthly revenue of a category.
    #[must_use]
    pub fn category_revenue(&self, category: Category) -> f64 {
        let share = match category {
            Category::All => 1.0,
            Category::Clothing => self.category_shares.clothing,
            Category::Shoes => self.category_shares.shoes,
            Category::LeatherGoods => self.category_shares.leather_goods,
        };
        self.monthly_revenue * share
    }

    /// Validates the figures.
    ///
    /// # Errors
    /// `InvalidField` naming the first out-of-range figure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.monthly_revenue.is_finite() || self.monthly_revenue <= 0.0 {
            return Err(ValidationError::invalid("monthly_revenue", "must be a positive number"));
        }
        if !(self.margin_rate > 0.0 && self.margin_rate < 1.0) {
            return Err(ValidationError::invalid("margin_rate", "must be within (0, 1)"));
        }
        let shares = [
            ("category_shares.clothing", self.category_shares.clothing),
            ("category_shares.shoes", self.category_shares.shoes),
            ("category_shares.leather_goods", self.category_shares.leather_goods),
        ];
        for (field, share) in shares {
            if !share.is_finite() || share < 0.0 {
                return Err(ValidationError::invalid(field, "must not be negative"));
            }
        }
        for store in &self.stores {
            if store.name.trim().is_empty() {
                return Err(ValidationError::missing("stores.name"));
            }
            if !store.monthly_revenue.is_finite() || store.monthly_revenue < 0.0 {
                return Err(ValidationError::invalid(
                    format!("stores[{}].monthly_revenue", store.name),
                    "must not be negative",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_figures() {
        let b = BaselineFinancials::default();
        assert_eq!(b.monthly_revenue, 3_800_000.0);
        assert_eq!(b.margin_rate, 0.27);
        assert_eq!(b.stores.len(), 6);
        let store_total: f64 = b.stores.iter().map(|s| s.monthly_revenue).sum();
        assert!((store_total - b.monthly_revenue).abs() < 1e-6);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn derived_figures() {
        let b = BaselineFinancials::new(1_000_000.0, 0.25);
        assert!((b.monthly_margin() - 250_000.0).abs() < 1e-9);
        assert!((b.monthly_cost_base() - 750_000.0).abs() < 1e-9);
        assert!((b.category_revenue(Category::All) - 1_000_000.0).abs() < 1e-9);
        assert!((b.category_revenue(Category::Shoes) - 250_000.0).abs() < 1e-9);
    }

    #[test]
    fn validation_rejects_bad_figures() {
        assert!(BaselineFinancials::new(0.0, 0.27).validate().is_err());
        assert!(BaselineFinancials::new(1.0, 1.5).validate().is_err());
        let b = BaselineFinancials::default().with_stores(vec![StoreBaseline::new("Lille", -1.0)]);
        assert!(b.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let b: BaselineFinancials =
            serde_json::from_str(r#"{"monthly_revenue": 2400000, "margin_rate": 0.35}"#).unwrap();
        assert_eq!(b.stores.len(), 6);
        assert_eq!(b.category_shares, CategoryShares::default());
        assert!(serde_json::from_str::<BaselineFinancials>(r#"{"monthly_revenue": 1, "margin_rate": 0.3, "x": 1}"#).is_err());
    }
}
