//! Policy tables consumed by the analyzers
//!
//! These are the fixed assumptions the closed-form formulas run on: per-class
//! volatilities, VaR z-scores, the withdrawal tax schedule and the risk flag
//! thresholds. Each table is a plain value with a `STANDARD` instance so a
//! caller can substitute its own without touching the formulas.

use serde::{Deserialize, Serialize};

/// Number of holdings reported in concentration analysis
pub const TOP_HOLDINGS_LIMIT: usize = 10;

/// Number of harvestable positions reported in tax-loss harvesting
pub const HARVEST_LIMIT: usize = 10;

/// Hard cap on the length of a withdrawal schedule
pub const MAX_WITHDRAWAL_YEARS: u32 = 10;

/// Asset classes reported by the allocation aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Bonds,
    RealEstate,
    Commodities,
    Cash,
}

impl AssetClass {
    /// All classes in reporting order
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Equity,
        AssetClass::Bonds,
        AssetClass::RealEstate,
        AssetClass::Commodities,
        AssetClass::Cash,
    ];

    /// Key used in allocation outputs and target allocations
    pub fn key(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Bonds => "bonds",
            AssetClass::RealEstate => "real_estate",
            AssetClass::Commodities => "commodities",
            AssetClass::Cash => "cash",
        }
    }

    /// Key this class carries on an instrument's asset-class breakdown
    ///
    /// Cash has no instrument key: it only comes from account balances.
    pub fn instrument_key(&self) -> Option<&'static str> {
        match self {
            AssetClass::Equity => Some("equity"),
            AssetClass::Bonds => Some("fixed_income"),
            AssetClass::RealEstate => Some("real_estate"),
            AssetClass::Commodities => Some("commodities"),
            AssetClass::Cash => None,
        }
    }
}

/// Typical annual volatility per asset class, as fractions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityTable {
    pub equity: f64,
    pub bonds: f64,
    pub real_estate: f64,
    pub commodities: f64,
    pub cash: f64,
}

impl VolatilityTable {
    pub const STANDARD: VolatilityTable = VolatilityTable {
        equity: 0.18,
        bonds: 0.05,
        real_estate: 0.12,
        commodities: 0.20,
        cash: 0.01,
    };

    /// Volatility for a reporting asset class
    pub fn for_class(&self, class: AssetClass) -> f64 {
        match class {
            AssetClass::Equity => self.equity,
            AssetClass::Bonds => self.bonds,
            AssetClass::RealEstate => self.real_estate,
            AssetClass::Commodities => self.commodities,
            AssetClass::Cash => self.cash,
        }
    }

    /// Volatility for an instrument allocation key
    ///
    /// Accepts the reporting keys plus `fixed_income`, which reads the bonds
    /// entry. Unknown keys return `None` and take no part in the variance.
    pub fn for_allocation_key(&self, key: &str) -> Option<f64> {
        let class = match key {
            "equity" => AssetClass::Equity,
            "bonds" | "fixed_income" => AssetClass::Bonds,
            "real_estate" => AssetClass::RealEstate,
            "commodities" => AssetClass::Commodities,
            "cash" => AssetClass::Cash,
            _ => return None,
        };
        Some(self.for_class(class))
    }
}

impl Default for VolatilityTable {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Normal-approximation z-scores for Value-at-Risk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreTable {
    /// Used when confidence is exactly 0.95
    pub confidence_95: f64,
    /// Used for every other confidence level
    pub fallback: f64,
}

impl ZScoreTable {
    pub const STANDARD: ZScoreTable = ZScoreTable {
        confidence_95: 1.65,
        fallback: 2.33,
    };

    /// z-score for a confidence level; no interpolation between levels
    pub fn z_score(&self, confidence: f64) -> f64 {
        if confidence == 0.95 {
            self.confidence_95
        } else {
            self.fallback
        }
    }
}

impl Default for ZScoreTable {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// One phase of the withdrawal schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WithdrawalPhase {
    /// Last year (1-based, inclusive) covered by this phase
    pub through_year: u32,
    pub source: &'static str,
    /// Tax rate as a fraction
    pub tax_rate: f64,
}

/// Taxable accounts first at capital-gains rates, then tax-deferred at
/// ordinary income rates
pub static WITHDRAWAL_PHASES: [WithdrawalPhase; 2] = [
    WithdrawalPhase {
        through_year: 5,
        source: "Taxable accounts",
        tax_rate: 0.15,
    },
    WithdrawalPhase {
        through_year: MAX_WITHDRAWAL_YEARS,
        source: "Tax-deferred accounts (IRA/401k)",
        tax_rate: 0.22,
    },
];

/// Phase that applies to a given (1-based) year
pub fn withdrawal_phase(year: u32) -> &'static WithdrawalPhase {
    WITHDRAWAL_PHASES
        .iter()
        .find(|phase| year <= phase.through_year)
        .unwrap_or(&WITHDRAWAL_PHASES[WITHDRAWAL_PHASES.len() - 1])
}

/// Concentration and volatility limits that raise risk flags (percent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub max_position_pct: f64,
    pub max_sector_pct: f64,
    pub max_region_pct: f64,
    pub max_top_10_pct: f64,
    /// Allowed excess of volatility over the user's target, in points
    pub volatility_margin: f64,
}

impl RiskThresholds {
    pub const STANDARD: RiskThresholds = RiskThresholds {
        max_position_pct: 10.0,
        max_sector_pct: 30.0,
        max_region_pct: 60.0,
        max_top_10_pct: 70.0,
        volatility_margin: 3.0,
    };
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self::STANDARD
    }
}
