//! Asset-class allocation of a portfolio snapshot

use crate::numeric::round_to;
use crate::policy::AssetClass;
use crate::portfolio::{AllocationMap, PortfolioSnapshot};

/// Dollar exposure per asset class, in [`AssetClass::ALL`] order
///
/// Cash balances count wholly toward `cash`. Each position's market value is
/// split by its instrument's asset-class percentages; a position without any
/// asset-class entry adds nothing to any class.
pub fn asset_class_values(snapshot: &PortfolioSnapshot) -> AllocationMap {
    let mut values: AllocationMap = AssetClass::ALL.iter().map(|c| (c.key(), 0.0)).collect();

    for account in &snapshot.accounts {
        values.add(AssetClass::Cash.key(), account.cash_balance);

        for position in &account.positions {
            let value = position.market_value();
            let breakdown = &position.instrument.allocation_asset_class;
            for class in AssetClass::ALL {
                if let Some(key) = class.instrument_key() {
                    values.add(class.key(), value * breakdown.get(key) / 100.0);
                }
            }
        }
    }

    values
}

/// Percent of total portfolio value held in each asset class
///
/// The denominator is the full portfolio value, including positions that
/// carry no asset-class breakdown, so the percentages may sum to less than
/// 100. A zero-value portfolio returns the (all-zero) dollar map as is.
pub fn current_allocation(snapshot: &PortfolioSnapshot) -> AllocationMap {
    let values = asset_class_values(snapshot);
    let total_value = snapshot.total_value();

    if total_value == 0.0 {
        return values;
    }

    values.map_values(|v| round_to(v / total_value * 100.0, 2))
}
