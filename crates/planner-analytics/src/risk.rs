//! Volatility, concentration and Value-at-Risk

use planner_core::numeric::{ensure_finite, percent_of, round_to};
use planner_core::policy::{RiskThresholds, TOP_HOLDINGS_LIMIT, VolatilityTable, ZScoreTable};
use planner_core::{
    AllocationMap, Analyzer, AssetClass, PortfolioSnapshot, Result, UserPreferences,
};
use serde::Serialize;
use tracing::{debug, info};

/// Estimated annual portfolio volatility, in percent rounded to 2 places
///
/// The accumulation runs in snapshot order against a running portfolio total:
///
/// - each account's cash adds `cash * vol_cash²` to the variance, scaled by
///   the dollar amount rather than a weight;
/// - each position adds its value to the running total, then for every
///   asset-class entry known to `volatilities` adds `(weight * vol)²` with
///   `weight = value * pct / 100 / running_total`.
///
/// There are no cross terms. An empty variance yields 0.
pub fn portfolio_volatility(snapshot: &PortfolioSnapshot, volatilities: &VolatilityTable) -> f64 {
    let cash_volatility = volatilities.for_class(AssetClass::Cash);
    let mut running_total = 0.0;
    let mut variance = 0.0;

    for account in &snapshot.accounts {
        running_total += account.cash_balance;
        variance += account.cash_balance * cash_volatility.powi(2);

        for position in &account.positions {
            let value = position.market_value();
            running_total += value;

            for (key, pct) in position.instrument.allocation_asset_class.iter() {
                let Some(volatility) = volatilities.for_allocation_key(key) else {
                    continue;
                };
                let weight = if running_total > 0.0 {
                    value * pct / 100.0 / running_total
                } else {
                    0.0
                };
                variance += (weight * volatility).powi(2);
            }
        }
    }

    if variance > 0.0 {
        round_to(variance.sqrt() * 100.0, 2)
    } else {
        0.0
    }
}

/// `round2(value * volatility_pct / 100 * z)` using the standard z-scores
///
/// The z-score is 1.65 for a confidence of exactly 0.95 and 2.33 for any
/// other confidence.
pub fn value_at_risk(portfolio_value: f64, volatility_pct: f64, confidence: f64) -> f64 {
    value_at_risk_with(&ZScoreTable::STANDARD, portfolio_value, volatility_pct, confidence)
}

fn value_at_risk_with(
    z_scores: &ZScoreTable,
    portfolio_value: f64,
    volatility_pct: f64,
    confidence: f64,
) -> f64 {
    round_to(
        portfolio_value * (volatility_pct / 100.0) * z_scores.z_score(confidence),
        2,
    )
}

/// One position's market value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingValue {
    pub symbol: String,
    pub name: String,
    pub value: f64,
    /// Share of total portfolio value, in percent
    pub weight_pct: f64,
}

/// Concentration by position, sector and region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationReport {
    pub top_10_holdings: Vec<HoldingValue>,
    pub top_10_concentration_pct: f64,
    pub top_sector: String,
    pub top_sector_pct: f64,
    pub top_region: String,
    pub top_region_pct: f64,
    pub number_of_positions: usize,
}

/// Concentration metrics for a snapshot
///
/// Cash is left out of the holdings list but stays in the total-value
/// denominator. Holdings are ranked by value with a stable sort. Sector and
/// region exposure accumulate in first-encounter order and the first of
/// equal maxima wins; with no exposure at all the top entry is `"None"`.
pub fn concentration_risk(snapshot: &PortfolioSnapshot) -> ConcentrationReport {
    let total_value = snapshot.total_value();
    let mut holdings = Vec::with_capacity(snapshot.position_count());
    let mut sectors = AllocationMap::new();
    let mut regions = AllocationMap::new();

    for (_, position) in snapshot.holdings() {
        let value = position.market_value();

        holdings.push(HoldingValue {
            symbol: position.symbol.clone(),
            name: position.display_name().to_string(),
            value,
            weight_pct: round_to(percent_of(value, total_value), 2),
        });

        for (sector, pct) in position.instrument.allocation_sectors.iter() {
            sectors.add(sector, value * pct / 100.0);
        }
        for (region, pct) in position.instrument.allocation_regions.iter() {
            regions.add(region, value * pct / 100.0);
        }
    }

    holdings.sort_by(|a, b| b.value.total_cmp(&a.value));
    let number_of_positions = holdings.len();
    holdings.truncate(TOP_HOLDINGS_LIMIT);

    let top_10_value: f64 = holdings.iter().map(|h| h.value).sum();
    let (top_sector, top_sector_value) = sectors.largest().unwrap_or(("None", 0.0));
    let (top_region, top_region_value) = regions.largest().unwrap_or(("None", 0.0));

    ConcentrationReport {
        top_10_concentration_pct: round_to(percent_of(top_10_value, total_value), 2),
        top_sector: top_sector.to_string(),
        top_sector_pct: round_to(percent_of(top_sector_value, total_value), 2),
        top_region: top_region.to_string(),
        top_region_pct: round_to(percent_of(top_region_value, total_value), 2),
        number_of_positions,
        top_10_holdings: holdings,
    }
}

/// What a risk flag refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlagKind {
    Position,
    Sector,
    Region,
    TopHoldings,
    Volatility,
}

impl RiskFlagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFlagKind::Position => "position",
            RiskFlagKind::Sector => "sector",
            RiskFlagKind::Region => "region",
            RiskFlagKind::TopHoldings => "top_holdings",
            RiskFlagKind::Volatility => "volatility",
        }
    }
}

/// A metric that exceeds its limit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFlag {
    pub kind: RiskFlagKind,
    /// Symbol, sector or region name; empty for portfolio-wide flags
    pub subject: String,
    pub value_pct: f64,
    pub limit_pct: f64,
}

/// Evaluate concentration and volatility against the thresholds
///
/// Position flags are raised from the top holdings list only.
pub fn risk_flags(
    concentration: &ConcentrationReport,
    volatility: f64,
    target_volatility: f64,
    thresholds: &RiskThresholds,
) -> Vec<RiskFlag> {
    let mut flags: Vec<RiskFlag> = concentration
        .top_10_holdings
        .iter()
        .filter(|h| h.weight_pct > thresholds.max_position_pct)
        .map(|h| RiskFlag {
            kind: RiskFlagKind::Position,
            subject: h.symbol.clone(),
            value_pct: h.weight_pct,
            limit_pct: thresholds.max_position_pct,
        })
        .collect();

    if concentration.top_sector_pct > thresholds.max_sector_pct {
        flags.push(RiskFlag {
            kind: RiskFlagKind::Sector,
            subject: concentration.top_sector.clone(),
            value_pct: concentration.top_sector_pct,
            limit_pct: thresholds.max_sector_pct,
        });
    }
    if concentration.top_region_pct > thresholds.max_region_pct {
        flags.push(RiskFlag {
            kind: RiskFlagKind::Region,
            subject: concentration.top_region.clone(),
            value_pct: concentration.top_region_pct,
            limit_pct: thresholds.max_region_pct,
        });
    }
    if concentration.top_10_concentration_pct > thresholds.max_top_10_pct {
        flags.push(RiskFlag {
            kind: RiskFlagKind::TopHoldings,
            subject: String::new(),
            value_pct: concentration.top_10_concentration_pct,
            limit_pct: thresholds.max_top_10_pct,
        });
    }

    let volatility_limit = target_volatility + thresholds.volatility_margin;
    if volatility > volatility_limit {
        flags.push(RiskFlag {
            kind: RiskFlagKind::Volatility,
            subject: String::new(),
            value_pct: volatility,
            limit_pct: volatility_limit,
        });
    }

    flags
}

/// Risk metrics bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub total_value: f64,
    /// Annualised volatility, percent
    pub volatility: f64,
    pub target_volatility: f64,
    /// Absolute distance between volatility and target, percent points
    pub volatility_gap: f64,
    pub above_target: bool,
    pub confidence: f64,
    pub value_at_risk: f64,
    /// VaR as a percent of portfolio value
    pub max_expected_loss_pct: f64,
    pub concentration: ConcentrationReport,
    pub flags: Vec<RiskFlag>,
    pub risk_tolerance: String,
    pub investment_horizon: u32,
    pub current_age: u32,
}

/// Closed-form risk analyzer
#[derive(Debug, Clone)]
pub struct RiskAnalyzer {
    confidence: f64,
    volatilities: VolatilityTable,
    z_scores: ZScoreTable,
    thresholds: RiskThresholds,
}

impl Default for RiskAnalyzer {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            volatilities: VolatilityTable::STANDARD,
            z_scores: ZScoreTable::STANDARD,
            thresholds: RiskThresholds::STANDARD,
        }
    }
}

impl RiskAnalyzer {
    /// Create an analyzer reporting VaR at `confidence`
    pub fn new(confidence: f64) -> Self {
        Self {
            confidence,
            ..Self::default()
        }
    }

    /// Use a different volatility table
    pub fn with_volatilities(mut self, volatilities: VolatilityTable) -> Self {
        self.volatilities = volatilities;
        self
    }

    /// Use different VaR z-scores
    pub fn with_z_scores(mut self, z_scores: ZScoreTable) -> Self {
        self.z_scores = z_scores;
        self
    }

    /// Use different flag thresholds
    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

impl Analyzer for RiskAnalyzer {
    type Report = RiskReport;

    fn name(&self) -> &'static str {
        "risk_analyzer"
    }

    fn description(&self) -> &'static str {
        "Estimate portfolio volatility, Value-at-Risk and concentration by \
         position, sector and region, and flag limits that are exceeded."
    }

    fn analyze(
        &self,
        snapshot: &PortfolioSnapshot,
        preferences: &UserPreferences,
    ) -> Result<RiskReport> {
        let total_value = snapshot.checked_total_value()?;
        let volatility = ensure_finite(
            "portfolio volatility",
            portfolio_volatility(snapshot, &self.volatilities),
        )?;
        let concentration = concentration_risk(snapshot);
        ensure_finite("sector exposure", concentration.top_sector_pct)?;
        ensure_finite("region exposure", concentration.top_region_pct)?;
        let var = ensure_finite(
            "value at risk",
            value_at_risk_with(&self.z_scores, total_value, volatility, self.confidence),
        )?;
        let target_volatility = preferences.target_volatility;

        debug!(
            total_value,
            volatility,
            positions = concentration.number_of_positions,
            "Computed risk metrics"
        );

        let flags = risk_flags(&concentration, volatility, target_volatility, &self.thresholds);
        info!(
            volatility,
            value_at_risk = var,
            flags = flags.len(),
            "Risk analysis complete"
        );

        Ok(RiskReport {
            total_value,
            volatility,
            target_volatility,
            volatility_gap: round_to((volatility - target_volatility).abs(), 2),
            above_target: volatility > target_volatility,
            confidence: self.confidence,
            value_at_risk: var,
            max_expected_loss_pct: round_to(percent_of(var, total_value), 2),
            concentration,
            flags,
            risk_tolerance: preferences.risk_tolerance.clone(),
            investment_horizon: preferences.investment_horizon,
            current_age: preferences.current_age,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_core::policy::{RiskThresholds, VolatilityTable, ZScoreTable};
    use planner_core::{Account, Error, Instrument, Position};

    fn position(symbol: &str, quantity: f64, price: f64) -> Position {
        Position {
            symbol: symbol.to_string(),
            quantity,
            cost_basis: price,
            instrument: Instrument {
                current_price: price,
                ..Instrument::default()
            },
        }
    }

    fn with_classes(mut position: Position, classes: &[(&str, f64)]) -> Position {
        position.instrument.allocation_asset_class = classes.iter().copied().collect();
        position
    }

    fn with_exposure(
        mut position: Position,
        sectors: &[(&str, f64)],
        regions: &[(&str, f64)],
    ) -> Position {
        position.instrument.allocation_sectors = sectors.iter().copied().collect();
        position.instrument.allocation_regions = regions.iter().copied().collect();
        position
    }

    fn snapshot(cash: f64, positions: Vec<Position>) -> PortfolioSnapshot {
        PortfolioSnapshot::new(vec![Account {
            cash_balance: cash,
            positions,
            ..Account::default()
        }])
    }

    #[test]
    fn test_volatility_all_equity() {
        let snapshot = snapshot(0.0, vec![with_classes(position("VTI", 100.0, 100.0), &[("equity", 100.0)])]);
        assert_eq!(portfolio_volatility(&snapshot, &VolatilityTable::STANDARD), 18.0);
    }

    #[test]
    fn test_volatility_cash_term_is_dollar_scaled() {
        // 10_000 * 0.01² = 1.0 from cash, (0.5 * 0.18)² from equity
        let snapshot = snapshot(
            10_000.0,
            vec![with_classes(position("VTI", 100.0, 100.0), &[("equity", 100.0)])],
        );
        assert_eq!(portfolio_volatility(&snapshot, &VolatilityTable::STANDARD), 100.4);
    }

    #[test]
    fn test_volatility_fixed_income_uses_bond_volatility() {
        let snapshot = snapshot(
            0.0,
            vec![with_classes(position("BND", 100.0, 100.0), &[("fixed_income", 100.0)])],
        );
        assert_eq!(portfolio_volatility(&snapshot, &VolatilityTable::STANDARD), 5.0);
    }

    #[test]
    fn test_volatility_uses_running_total() {
        // the first position is weighed against 5_000, the second against 10_000
        let snapshot = snapshot(
            0.0,
            vec![
                with_classes(position("A", 50.0, 100.0), &[("equity", 100.0)]),
                with_classes(position("B", 50.0, 100.0), &[("equity", 100.0)]),
            ],
        );
        // sqrt(0.18² + (0.5 * 0.18)²) ≈ 0.2012
        assert_eq!(portfolio_volatility(&snapshot, &VolatilityTable::STANDARD), 20.12);
    }

    #[test]
    fn test_volatility_degenerate_inputs() {
        assert_eq!(
            portfolio_volatility(&PortfolioSnapshot::default(), &VolatilityTable::STANDARD),
            0.0
        );
        let unknown = snapshot(0.0, vec![with_classes(position("BTC", 1.0, 100.0), &[("crypto", 100.0)])]);
        assert_eq!(portfolio_volatility(&unknown, &VolatilityTable::STANDARD), 0.0);
    }

    #[test]
    fn test_value_at_risk() {
        assert_eq!(value_at_risk(1_000_000.0, 10.0, 0.95), 165_000.0);
        assert_eq!(value_at_risk(1_000_000.0, 10.0, 0.99), 233_000.0);
        assert_eq!(value_at_risk(1_000_000.0, 10.0, 0.975), 233_000.0);
        assert_eq!(value_at_risk(123_456.0, 0.0, 0.95), 0.0);
        assert_eq!(value_at_risk(0.0, 15.0, 0.95), 0.0);
    }

    #[test]
    fn test_concentration_ranking() {
        let positions = (1..=12)
            .map(|i| position(&format!("P{i}"), f64::from(i), 100.0))
            .collect();
        let report = concentration_risk(&snapshot(2_200.0, positions));

        assert_eq!(report.number_of_positions, 12);
        assert_eq!(report.top_10_holdings.len(), 10);
        assert_eq!(report.top_10_holdings[0].symbol, "P12");
        assert_eq!(report.top_10_holdings[9].symbol, "P3");
        // (12+...+3) * 100 = 7_500 of 10_000
        assert_eq!(report.top_10_concentration_pct, 75.0);
        assert_eq!(report.top_10_holdings[0].weight_pct, 12.0);
        assert_eq!(report.top_sector, "None");
        assert_eq!(report.top_sector_pct, 0.0);
    }

    #[test]
    fn test_concentration_stable_ties() {
        let report = concentration_risk(&snapshot(
            0.0,
            vec![position("AAA", 10.0, 10.0), position("BBB", 10.0, 10.0)],
        ));
        assert_eq!(report.top_10_holdings[0].symbol, "AAA");
        assert_eq!(report.top_10_holdings[1].symbol, "BBB");
        assert_eq!(report.top_10_holdings[0].name, "AAA");
    }

    #[test]
    fn test_sector_and_region_exposure() {
        let report = concentration_risk(&snapshot(
            1_000.0,
            vec![
                with_exposure(
                    position("QQQ", 30.0, 100.0),
                    &[("technology", 60.0), ("communication", 40.0)],
                    &[("north_america", 100.0)],
                ),
                with_exposure(
                    position("VXUS", 60.0, 100.0),
                    &[("financials", 30.0), ("technology", 20.0)],
                    &[("europe", 50.0), ("asia", 50.0)],
                ),
            ],
        ));

        // technology: 1_800 + 1_200 of 10_000
        assert_eq!(report.top_sector, "technology");
        assert_eq!(report.top_sector_pct, 30.0);
        // north_america 3_000 ties europe and asia; first encountered wins
        assert_eq!(report.top_region, "north_america");
        assert_eq!(report.top_region_pct, 30.0);
    }

    #[test]
    fn test_risk_flags() {
        let report = concentration_risk(&snapshot(
            0.0,
            vec![
                with_exposure(position("NVDA", 80.0, 100.0), &[("technology", 100.0)], &[("us", 100.0)]),
                position("CASHLIKE", 20.0, 100.0),
            ],
        ));

        let flags = risk_flags(&report, 16.0, 12.0, &RiskThresholds::STANDARD);
        let kinds: Vec<_> = flags.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            [
                RiskFlagKind::Position,
                RiskFlagKind::Position,
                RiskFlagKind::Sector,
                RiskFlagKind::Region,
                RiskFlagKind::TopHoldings,
                RiskFlagKind::Volatility,
            ]
        );
        assert_eq!(flags[0].subject, "NVDA");
        assert_eq!(flags[5].limit_pct, 15.0);

        assert!(risk_flags(&report, 15.0, 12.0, &RiskThresholds {
            max_position_pct: 100.0,
            max_sector_pct: 100.0,
            max_region_pct: 100.0,
            max_top_10_pct: 100.0,
            volatility_margin: 3.0,
        })
        .is_empty());
    }

    #[test]
    fn test_analyze_report() {
        let snapshot = snapshot(
            0.0,
            vec![with_classes(position("VTI", 1_000.0, 100.0), &[("equity", 100.0)])],
        );
        let prefs = UserPreferences::default();

        let report = RiskAnalyzer::default().analyze(&snapshot, &prefs).unwrap();
        assert_eq!(report.volatility, 18.0);
        assert!(report.above_target);
        assert_eq!(report.volatility_gap, 6.0);
        // 100_000 * 0.18 * 1.65
        assert_eq!(report.value_at_risk, 29_700.0);
        assert_eq!(report.max_expected_loss_pct, 29.7);
        assert_eq!(report.concentration.number_of_positions, 1);

        let again = RiskAnalyzer::default().analyze(&snapshot, &prefs).unwrap();
        assert_eq!(report, again);

        let stressed = RiskAnalyzer::new(0.99).analyze(&snapshot, &prefs).unwrap();
        assert_eq!(stressed.value_at_risk, 41_940.0);
    }

    #[test]
    fn test_analyze_overflowing_portfolio_fails() {
        let snapshot = PortfolioSnapshot::new(vec![Account {
            positions: vec![Position {
                symbol: "HUGE".to_string(),
                quantity: 1e300,
                instrument: Instrument {
                    current_price: 1e300,
                    ..Instrument::default()
                },
                ..Position::default()
            }],
            ..Account::default()
        }]);
        assert!(snapshot.validate().is_ok());

        let err = RiskAnalyzer::default()
            .analyze(&snapshot, &UserPreferences::default())
            .unwrap_err();
        assert!(matches!(err, Error::AnalysisFailed(_)));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_analyze_overflowing_exposure_fails() {
        // total value is finite, the sector sum is not
        let snapshot = snapshot(
            0.0,
            vec![with_exposure(
                position("WIDE", 1e154, 1e153),
                &[("Technology", 1e5)],
                &[],
            )],
        );
        assert!(snapshot.total_value().is_finite());

        let err = RiskAnalyzer::default()
            .analyze(&snapshot, &UserPreferences::default())
            .unwrap_err();
        assert!(matches!(err, Error::AnalysisFailed(_)));
    }

    #[test]
    fn test_custom_tables_change_report() {
        let snapshot = snapshot(
            0.0,
            vec![with_classes(position("VTI", 1_000.0, 100.0), &[("equity", 100.0)])],
        );
        let prefs = UserPreferences::default();

        let calm = VolatilityTable {
            equity: 0.10,
            ..VolatilityTable::STANDARD
        };
        let report = RiskAnalyzer::default()
            .with_volatilities(calm)
            .analyze(&snapshot, &prefs)
            .unwrap();
        assert_eq!(report.volatility, 10.0);
        assert!(!report.above_target);
        // 100_000 * 0.10 * 1.65
        assert_eq!(report.value_at_risk, 16_500.0);

        let z_scores = ZScoreTable {
            confidence_95: 2.0,
            fallback: 3.0,
        };
        let report = RiskAnalyzer::default()
            .with_z_scores(z_scores)
            .analyze(&snapshot, &prefs)
            .unwrap();
        // 100_000 * 0.18 * 2.0
        assert_eq!(report.value_at_risk, 36_000.0);

        let default_flags = RiskAnalyzer::default().analyze(&snapshot, &prefs).unwrap().flags;
        assert!(default_flags.iter().any(|f| f.kind == RiskFlagKind::Volatility));

        let relaxed = RiskThresholds {
            volatility_margin: 10.0,
            ..RiskThresholds::STANDARD
        };
        let report = RiskAnalyzer::default()
            .with_thresholds(relaxed)
            .analyze(&snapshot, &prefs)
            .unwrap();
        assert!(!report.flags.iter().any(|f| f.kind == RiskFlagKind::Volatility));
        assert_eq!(report.flags.len(), default_flags.len() - 1);
    }

    #[test]
    fn test_analyze_empty_portfolio() {
        let report = RiskAnalyzer::default()
            .analyze(&PortfolioSnapshot::default(), &UserPreferences::default())
            .unwrap();
        assert_eq!(report.total_value, 0.0);
        assert_eq!(report.volatility, 0.0);
        assert_eq!(report.value_at_risk, 0.0);
        assert_eq!(report.max_expected_loss_pct, 0.0);
        assert!(report.flags.is_empty());
    }
}
