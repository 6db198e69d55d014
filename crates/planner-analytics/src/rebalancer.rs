//! Allocation drift and rebalancing trades

use planner_core::numeric::{ensure_finite, round_to};
use planner_core::{
    AllocationMap, Analyzer, AssetClass, PortfolioSnapshot, Result, UserPreferences,
    current_allocation,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Direction of a rebalancing trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
        }
    }
}

/// A dollar trade that moves one asset class back toward its target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub asset_class: String,
    pub action: TradeAction,
    /// Dollar amount, always non-negative
    pub amount: f64,
    pub current_pct: f64,
    pub target_pct: f64,
    /// `current_pct - target_pct`
    pub drift_pct: f64,
    /// `|drift| / threshold`; larger drifts trade first
    pub priority: f64,
}

/// Trades needed to bring `current` back to `target`
///
/// Only classes present in `target` are considered, in target order. A class
/// trades when its absolute drift reaches `threshold`. The result is sorted
/// by descending priority; the sort is stable, so equal priorities keep
/// target order. A threshold that is not positive yields no trades.
pub fn rebalancing_trades(
    current: &AllocationMap,
    target: &AllocationMap,
    total_value: f64,
    threshold: f64,
) -> Vec<Trade> {
    if !(threshold > 0.0 && threshold.is_finite()) {
        return Vec::new();
    }

    let mut trades: Vec<Trade> = target
        .iter()
        .filter_map(|(asset_class, target_pct)| {
            let current_pct = current.get(asset_class);
            let drift = current_pct - target_pct;

            if drift.abs() < threshold {
                return None;
            }

            Some(Trade {
                asset_class: asset_class.to_string(),
                action: if drift > 0.0 {
                    TradeAction::Sell
                } else {
                    TradeAction::Buy
                },
                amount: (total_value * drift / 100.0).abs(),
                current_pct,
                target_pct,
                drift_pct: drift,
                priority: drift.abs() / threshold,
            })
        })
        .collect();

    trades.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    trades
}

/// Commission estimate for a set of trades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub number_of_trades: usize,
    pub total_transaction_cost: f64,
    pub total_volume: f64,
    /// Cost as a percent of traded volume, 0 when nothing trades
    pub cost_percentage: f64,
}

/// Flat per-trade cost model
pub fn estimate_transaction_costs(trades: &[Trade], cost_per_trade: f64) -> CostEstimate {
    let number_of_trades = trades.len();
    let total_transaction_cost = number_of_trades as f64 * cost_per_trade;
    let total_volume: f64 = trades.iter().map(|t| t.amount).sum();

    let cost_percentage = if total_volume > 0.0 {
        round_to(total_transaction_cost / total_volume * 100.0, 4)
    } else {
        0.0
    };

    CostEstimate {
        number_of_trades,
        total_transaction_cost: round_to(total_transaction_cost, 2),
        total_volume: round_to(total_volume, 2),
        cost_percentage,
    }
}

/// Current versus target for one asset class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftRow {
    pub asset_class: String,
    pub current_pct: f64,
    pub target_pct: f64,
    pub drift_pct: f64,
    pub within_threshold: bool,
}

/// Drift for every reporting asset class, whether or not it trades
pub fn allocation_drift(
    current: &AllocationMap,
    target: &AllocationMap,
    threshold: f64,
) -> Vec<DriftRow> {
    AssetClass::ALL
        .iter()
        .map(|class| {
            let current_pct = current.get(class.key());
            let target_pct = target.get(class.key());
            let drift_pct = current_pct - target_pct;
            DriftRow {
                asset_class: class.key().to_string(),
                current_pct,
                target_pct,
                drift_pct,
                within_threshold: drift_pct.abs() < threshold,
            }
        })
        .collect()
}

/// Rebalancing metrics bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebalanceReport {
    pub total_value: f64,
    pub available_cash: f64,
    pub strategy: String,
    pub threshold: f64,
    pub tax_sensitivity: String,
    pub current_allocation: AllocationMap,
    pub target_allocation: AllocationMap,
    pub drift: Vec<DriftRow>,
    pub trades: Vec<Trade>,
    pub cost_estimate: CostEstimate,
}

/// Threshold-based rebalancing analyzer
#[derive(Debug, Clone, Default)]
pub struct Rebalancer {
    cost_per_trade: f64,
}

impl Rebalancer {
    /// Create a rebalancer charging `cost_per_trade` per trade
    pub fn new(cost_per_trade: f64) -> Self {
        Self { cost_per_trade }
    }
}

impl Analyzer for Rebalancer {
    type Report = RebalanceReport;

    fn name(&self) -> &'static str {
        "portfolio_rebalancer"
    }

    fn description(&self) -> &'static str {
        "Compare the current asset allocation with the target allocation and \
         produce prioritized buy/sell trades with a transaction cost estimate."
    }

    fn analyze(
        &self,
        snapshot: &PortfolioSnapshot,
        preferences: &UserPreferences,
    ) -> Result<RebalanceReport> {
        let threshold = preferences.rebalance_threshold;
        let target = &preferences.target_allocation;
        let total_value = snapshot.checked_total_value()?;
        let current = current_allocation(snapshot);

        let trades = rebalancing_trades(&current, target, total_value, threshold);
        let cost_estimate = estimate_transaction_costs(&trades, self.cost_per_trade);
        ensure_finite("rebalancing trade volume", cost_estimate.total_volume)?;

        debug!(
            total_value,
            threshold,
            targets = target.len(),
            "Computed allocation drift"
        );
        info!(
            trades = trades.len(),
            volume = cost_estimate.total_volume,
            "Rebalancing analysis complete"
        );

        Ok(RebalanceReport {
            total_value,
            available_cash: snapshot.available_cash(),
            strategy: preferences.rebalance_strategy.clone(),
            threshold,
            tax_sensitivity: preferences.tax_sensitivity.clone(),
            drift: allocation_drift(&current, target, threshold),
            current_allocation: current,
            target_allocation: target.clone(),
            trades,
            cost_estimate,
        })
    }
}
