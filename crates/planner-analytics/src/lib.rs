//! Portfolio analyzers
//!
//! Three independent analyzers share the snapshot model from `planner-core`:
//!
//! - [`Rebalancer`]: drift against a target allocation, prioritized trades
//!   and a transaction cost estimate
//! - [`RiskAnalyzer`]: weighted volatility, concentration by position, sector
//!   and region, and Value-at-Risk
//! - [`TaxOptimizer`]: unrealized gains, tax-loss harvesting, asset location
//!   and a withdrawal tax schedule
//!
//! Each module exposes its formulas as free functions alongside the
//! [`Analyzer`](planner_core::Analyzer) implementation that assembles them
//! into a report.
//!
//! # Example
//!
//! ```
//! use planner_analytics::Rebalancer;
//! use planner_core::{Analyzer, PortfolioSnapshot, UserPreferences};
//!
//! let snapshot = PortfolioSnapshot::from_json(r#"{"accounts": [{"cash_balance": 1000}]}"#)?;
//! let report = Rebalancer::default().analyze(&snapshot, &UserPreferences::default())?;
//! assert_eq!(report.current_allocation.get("cash"), 100.0);
//! # Ok::<(), planner_core::Error>(())
//! ```

pub mod rebalancer;
pub mod risk;
pub mod tax;

pub use rebalancer::{
    CostEstimate, DriftRow, RebalanceReport, Rebalancer, Trade, TradeAction, allocation_drift,
    estimate_transaction_costs, rebalancing_trades,
};
pub use risk::{
    ConcentrationReport, HoldingValue, RiskAnalyzer, RiskFlag, RiskFlagKind, RiskReport, concentration_risk,
    portfolio_volatility, risk_flags, value_at_risk,
};
pub use tax::{
    AccountTypeCount, AssetLocation, HarvestCandidate, HarvestSummary, LocationBuckets,
    LocationInefficiencies, PositionGain, TaxOptimizer, TaxReport, YearPlan, account_summary,
    asset_location, tax_loss_harvesting, unrealized_gains, withdrawal_sequence,
};
