//! User preferences supplied alongside a portfolio snapshot

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::portfolio::AllocationMap;

fn default_target_allocation() -> AllocationMap {
    [
        ("equity", 60.0),
        ("bonds", 30.0),
        ("real_estate", 5.0),
        ("commodities", 0.0),
        ("cash", 5.0),
    ]
    .into_iter()
    .collect()
}

fn default_rebalance_threshold() -> f64 {
    5.0
}

fn default_rebalance_strategy() -> String {
    "threshold_based".to_string()
}

fn default_tax_sensitivity() -> String {
    "high".to_string()
}

fn default_risk_tolerance() -> String {
    "moderate".to_string()
}

fn default_target_volatility() -> f64 {
    12.0
}

fn default_investment_horizon() -> u32 {
    20
}

fn default_current_age() -> u32 {
    40
}

fn default_tax_bracket() -> f64 {
    24.0
}

fn default_state_tax_rate() -> f64 {
    5.0
}

fn default_filing_status() -> String {
    "married_filing_jointly".to_string()
}

fn default_target_retirement_income() -> f64 {
    80_000.0
}

/// Investment and tax preferences of the portfolio owner
///
/// Every field is optional in input data and falls back to the documented
/// default. Percent-valued fields use a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Target percent per asset class (`equity`, `bonds`, `real_estate`, `commodities`, `cash`)
    #[serde(default = "default_target_allocation")]
    pub target_allocation: AllocationMap,

    /// Minimum absolute drift, in percentage points, that triggers a trade
    #[serde(default = "default_rebalance_threshold")]
    pub rebalance_threshold: f64,

    #[serde(default = "default_rebalance_strategy")]
    pub rebalance_strategy: String,

    #[serde(default = "default_tax_sensitivity")]
    pub tax_sensitivity: String,

    #[serde(default = "default_risk_tolerance")]
    pub risk_tolerance: String,

    /// Target annual volatility in percent
    #[serde(default = "default_target_volatility")]
    pub target_volatility: f64,

    /// Investment horizon in years
    #[serde(default = "default_investment_horizon")]
    pub investment_horizon: u32,

    #[serde(default = "default_current_age")]
    pub current_age: u32,

    /// Federal marginal bracket in percent
    #[serde(default = "default_tax_bracket")]
    pub tax_bracket: f64,

    /// State income tax rate in percent
    #[serde(default = "default_state_tax_rate")]
    pub state_tax_rate: f64,

    #[serde(default = "default_filing_status")]
    pub filing_status: String,

    /// Desired annual withdrawal in retirement
    #[serde(default = "default_target_retirement_income")]
    pub target_retirement_income: f64,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            target_allocation: default_target_allocation(),
            rebalance_threshold: default_rebalance_threshold(),
            rebalance_strategy: default_rebalance_strategy(),
            tax_sensitivity: default_tax_sensitivity(),
            risk_tolerance: default_risk_tolerance(),
            target_volatility: default_target_volatility(),
            investment_horizon: default_investment_horizon(),
            current_age: default_current_age(),
            tax_bracket: default_tax_bracket(),
            state_tax_rate: default_state_tax_rate(),
            filing_status: default_filing_status(),
            target_retirement_income: default_target_retirement_income(),
        }
    }
}

impl UserPreferences {
    /// Parse and validate preferences from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let preferences: Self = serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("Invalid user preferences: {e}")))?;
        preferences.validate()?;
        Ok(preferences)
    }

    /// Convert and validate preferences from a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let preferences: Self = serde_json::from_value(value)
            .map_err(|e| Error::Validation(format!("Invalid user preferences: {e}")))?;
        preferences.validate()?;
        Ok(preferences)
    }

    /// Federal plus state rate, as a fraction
    pub fn combined_tax_rate(&self) -> f64 {
        self.tax_bracket / 100.0 + self.state_tax_rate / 100.0
    }

    /// Validate the numeric preferences
    pub fn validate(&self) -> Result<()> {
        if !self.rebalance_threshold.is_finite() || self.rebalance_threshold <= 0.0 {
            return Err(Error::invalid_field(
                "rebalance_threshold",
                "must be a positive number",
            ));
        }

        for (field, value) in [
            ("target_volatility", self.target_volatility),
            ("tax_bracket", self.tax_bracket),
            ("state_tax_rate", self.state_tax_rate),
            ("target_retirement_income", self.target_retirement_income),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::invalid_field(field, "must be a non-negative number"));
            }
        }

        for (class, pct) in self.target_allocation.iter() {
            if !pct.is_finite() || pct < 0.0 {
                return Err(Error::invalid_field(
                    format!("target_allocation.{class}"),
                    "must be a non-negative number",
                ));
            }
        }

        Ok(())
    }
}
