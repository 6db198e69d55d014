//! Unrealized gains, tax-loss harvesting, asset location and withdrawal
//! sequencing

use planner_core::numeric::{ensure_finite, round_to};
use planner_core::policy::{
    AssetClass, HARVEST_LIMIT, MAX_WITHDRAWAL_YEARS, WITHDRAWAL_PHASES, withdrawal_phase,
};
use planner_core::{AccountType, AllocationMap, Analyzer, PortfolioSnapshot, Result, UserPreferences};
use serde::Serialize;
use tracing::{debug, info};

/// Unrealized gain or loss on one position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionGain {
    pub symbol: String,
    /// Inherited from the owning account
    pub account_type: AccountType,
    pub quantity: f64,
    pub cost_basis: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub total_cost: f64,
    pub unrealized_gain: f64,
    /// Gain relative to total cost, 0 when the position has no cost
    pub gain_pct: f64,
    #[serde(skip)]
    asset_classes: AllocationMap,
}

impl PositionGain {
    pub fn is_loss(&self) -> bool {
        self.unrealized_gain < 0.0
    }
}

/// Gain or loss for every position, in snapshot order
pub fn unrealized_gains(snapshot: &PortfolioSnapshot) -> Vec<PositionGain> {
    snapshot
        .holdings()
        .map(|(account, position)| {
            let market_value = position.market_value();
            let total_cost = position.total_cost();
            let unrealized_gain = market_value - total_cost;
            let gain_pct = if total_cost > 0.0 {
                unrealized_gain / total_cost * 100.0
            } else {
                0.0
            };

            PositionGain {
                symbol: position.symbol.clone(),
                account_type: account.account_type.clone(),
                quantity: position.quantity,
                cost_basis: position.cost_basis,
                current_price: position.instrument.current_price,
                market_value: round_to(market_value, 2),
                total_cost: round_to(total_cost, 2),
                unrealized_gain: round_to(unrealized_gain, 2),
                gain_pct: round_to(gain_pct, 2),
                asset_classes: position.instrument.allocation_asset_class.clone(),
            }
        })
        .collect()
}

/// A taxable position whose loss can be realized
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestCandidate {
    pub symbol: String,
    pub loss_amount: f64,
    pub market_value: f64,
    pub gain_pct: f64,
}

/// Tax-loss harvesting opportunities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestSummary {
    /// Largest losses first, at most ten
    pub harvestable_positions: Vec<HarvestCandidate>,
    pub total_harvestable_loss: f64,
    pub potential_tax_savings: f64,
    /// All harvestable positions, including those beyond the top ten
    pub number_of_positions: usize,
}

/// Losses in taxable accounts and the tax they could offset
///
/// Losses in any non-taxable account are not harvestable and are skipped.
/// `combined_tax_rate` is a fraction.
pub fn tax_loss_harvesting(gains: &[PositionGain], combined_tax_rate: f64) -> HarvestSummary {
    let mut candidates: Vec<HarvestCandidate> = gains
        .iter()
        .filter(|g| g.account_type.is_taxable() && g.is_loss())
        .map(|g| HarvestCandidate {
            symbol: g.symbol.clone(),
            loss_amount: g.unrealized_gain.abs(),
            market_value: g.market_value,
            gain_pct: g.gain_pct,
        })
        .collect();

    let total_loss: f64 = candidates.iter().map(|c| c.loss_amount).sum();
    let number_of_positions = candidates.len();

    candidates.sort_by(|a, b| b.loss_amount.total_cmp(&a.loss_amount));
    candidates.truncate(HARVEST_LIMIT);

    HarvestSummary {
        harvestable_positions: candidates,
        total_harvestable_loss: round_to(total_loss, 2),
        potential_tax_savings: round_to(total_loss * combined_tax_rate, 2),
        number_of_positions,
    }
}

/// Dollar holdings of the location-sensitive classes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LocationBuckets {
    pub equity: f64,
    pub bonds: f64,
    pub reits: f64,
}

impl LocationBuckets {
    fn accumulate(&mut self, market_value: f64, asset_classes: &AllocationMap) {
        let share = |class: AssetClass| {
            class
                .instrument_key()
                .map_or(0.0, |key| asset_classes.get(key) / 100.0)
        };
        self.equity += market_value * share(AssetClass::Equity);
        self.bonds += market_value * share(AssetClass::Bonds);
        self.reits += market_value * share(AssetClass::RealEstate);
    }

    fn rounded(self) -> Self {
        Self {
            equity: round_to(self.equity, 2),
            bonds: round_to(self.bonds, 2),
            reits: round_to(self.reits, 2),
        }
    }
}

/// Tax-inefficient holdings sitting in taxable accounts
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationInefficiencies {
    pub bonds_in_taxable: f64,
    pub reits_in_taxable: f64,
    pub total_inefficient: f64,
}

/// Where each class is held, by tax treatment
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssetLocation {
    pub taxable_accounts: LocationBuckets,
    /// Every account that is not `taxable`
    pub tax_deferred_accounts: LocationBuckets,
    pub inefficiencies: LocationInefficiencies,
}

/// Asset location analysis
///
/// Bonds and REITs held in taxable accounts count as inefficient. Equities in
/// taxable accounts are not penalized.
pub fn asset_location(gains: &[PositionGain]) -> AssetLocation {
    let mut taxable = LocationBuckets::default();
    let mut deferred = LocationBuckets::default();

    for gain in gains {
        let bucket = if gain.account_type.is_taxable() {
            &mut taxable
        } else {
            &mut deferred
        };
        bucket.accumulate(gain.market_value, &gain.asset_classes);
    }

    AssetLocation {
        taxable_accounts: taxable.rounded(),
        tax_deferred_accounts: deferred.rounded(),
        inefficiencies: LocationInefficiencies {
            bonds_in_taxable: round_to(taxable.bonds, 2),
            reits_in_taxable: round_to(taxable.reits, 2),
            total_inefficient: round_to(taxable.bonds + taxable.reits, 2),
        },
    }
}

/// One year of the withdrawal plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPlan {
    pub year: u32,
    pub withdrawal_amount: f64,
    pub source: String,
    pub estimated_tax: f64,
    pub net_amount: f64,
    /// Whole-percent label, e.g. `"15%"`
    pub tax_rate: String,
}

/// Fixed two-phase withdrawal schedule
///
/// Returns `min(years, 10)` entries: taxable accounts at 15% for years 1-5,
/// then tax-deferred accounts at 22%. The schedule does not depend on the
/// portfolio's composition.
pub fn withdrawal_sequence(annual_withdrawal: f64, years: u32) -> Vec<YearPlan> {
    (1..=years.min(MAX_WITHDRAWAL_YEARS))
        .map(|year| {
            let phase = withdrawal_phase(year);
            let tax = annual_withdrawal * phase.tax_rate;
            YearPlan {
                year,
                withdrawal_amount: annual_withdrawal,
                source: phase.source.to_string(),
                estimated_tax: round_to(tax, 2),
                net_amount: round_to(annual_withdrawal - tax, 2),
                tax_rate: format!("{:.0}%", phase.tax_rate * 100.0),
            }
        })
        .collect()
}

/// Number of accounts of one type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTypeCount {
    pub account_type: String,
    pub count: usize,
}

/// Account counts per type, in first-encounter order
pub fn account_summary(snapshot: &PortfolioSnapshot) -> Vec<AccountTypeCount> {
    let mut summary: Vec<AccountTypeCount> = Vec::new();
    for account in &snapshot.accounts {
        let tag = account.account_type.as_str();
        match summary.iter_mut().find(|s| s.account_type == tag) {
            Some(entry) => entry.count += 1,
            None => summary.push(AccountTypeCount {
                account_type: tag.to_string(),
                count: 1,
            }),
        }
    }
    summary
}

/// Fail when any gain or location total overflowed
fn ensure_finite_totals(gains: &[PositionGain], location: &AssetLocation) -> Result<()> {
    for gain in gains {
        ensure_finite("position cost", gain.total_cost)?;
        ensure_finite("unrealized gain", gain.unrealized_gain)?;
        ensure_finite("gain percentage", gain.gain_pct)?;
    }
    for bucket in [location.taxable_accounts, location.tax_deferred_accounts] {
        ensure_finite("asset location total", bucket.equity + bucket.bonds + bucket.reits)?;
    }
    ensure_finite(
        "asset location total",
        location.inefficiencies.total_inefficient,
    )?;
    Ok(())
}

/// Tax optimization metrics bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxReport {
    /// Federal plus state rate, as a fraction
    pub combined_tax_rate: f64,
    pub filing_status: String,
    pub investment_horizon: u32,
    pub account_summary: Vec<AccountTypeCount>,
    pub positions: Vec<PositionGain>,
    pub harvesting: HarvestSummary,
    pub asset_location: AssetLocation,
    pub withdrawal_plan: Vec<YearPlan>,
    /// Estimated tax over the taxable-account phase of the plan
    pub first_phase_tax: f64,
}

/// Tax optimization analyzer
#[derive(Debug, Clone)]
pub struct TaxOptimizer {
    withdrawal_years: u32,
}

impl Default for TaxOptimizer {
    fn default() -> Self {
        Self {
            withdrawal_years: MAX_WITHDRAWAL_YEARS,
        }
    }
}

impl TaxOptimizer {
    /// Create an optimizer planning `withdrawal_years` of withdrawals (capped at 10)
    pub fn new(withdrawal_years: u32) -> Self {
        Self { withdrawal_years }
    }
}

impl Analyzer for TaxOptimizer {
    type Report = TaxReport;

    fn name(&self) -> &'static str {
        "tax_optimizer"
    }

    fn description(&self) -> &'static str {
        "Compute unrealized gains, tax-loss harvesting opportunities, asset \
         location inefficiencies and a tax-aware withdrawal schedule."
    }

    fn analyze(
        &self,
        snapshot: &PortfolioSnapshot,
        preferences: &UserPreferences,
    ) -> Result<TaxReport> {
        snapshot.checked_total_value()?;
        let combined_tax_rate = preferences.combined_tax_rate();
        let positions = unrealized_gains(snapshot);
        let harvesting = tax_loss_harvesting(&positions, combined_tax_rate);
        let location = asset_location(&positions);
        ensure_finite_totals(&positions, &location)?;
        ensure_finite("harvestable loss", harvesting.total_harvestable_loss)?;

        debug!(
            positions = positions.len(),
            harvestable = harvesting.number_of_positions,
            inefficient = location.inefficiencies.total_inefficient,
            "Computed position gains"
        );

        let withdrawal_plan =
            withdrawal_sequence(preferences.target_retirement_income, self.withdrawal_years);
        let first_phase_years = WITHDRAWAL_PHASES[0].through_year as usize;
        let first_phase_tax = round_to(
            withdrawal_plan
                .iter()
                .take(first_phase_years)
                .map(|p| p.estimated_tax)
                .sum(),
            2,
        );

        info!(
            combined_tax_rate,
            tax_savings = harvesting.potential_tax_savings,
            years = withdrawal_plan.len(),
            "Tax analysis complete"
        );

        Ok(TaxReport {
            combined_tax_rate,
            filing_status: preferences.filing_status.clone(),
            investment_horizon: preferences.investment_horizon,
            account_summary: account_summary(snapshot),
            positions,
            harvesting,
            asset_location: location,
            withdrawal_plan,
            first_phase_tax,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_core::{Account, Error, Instrument, Position};

    fn position(
        symbol: &str,
        quantity: f64,
        cost_basis: f64,
        price: f64,
        classes: &[(&str, f64)],
    ) -> Position {
        Position {
            symbol: symbol.to_string(),
            quantity,
            cost_basis,
            instrument: Instrument {
                current_price: price,
                allocation_asset_class: classes.iter().copied().collect(),
                ..Instrument::default()
            },
        }
    }

    fn account(account_type: &str, positions: Vec<Position>) -> Account {
        Account {
            account_type: AccountType::from(account_type),
            positions,
            ..Account::default()
        }
    }

    fn sample_snapshot() -> PortfolioSnapshot {
        PortfolioSnapshot::new(vec![
            account(
                "taxable",
                vec![
                    position("VTI", 50.0, 200.0, 220.0, &[("equity", 100.0)]),
                    position("BND", 100.0, 80.0, 75.0, &[("fixed_income", 100.0)]),
                    position("VNQ", 20.0, 100.0, 90.0, &[("real_estate", 100.0)]),
                ],
            ),
            account(
                "tax_deferred",
                vec![position("AGG", 40.0, 110.0, 100.0, &[("fixed_income", 100.0)])],
            ),
            account("roth_ira", vec![position("VXUS", 10.0, 0.0, 60.0, &[("equity", 100.0)])]),
            account("taxable", vec![]),
        ])
    }

    #[test]
    fn test_unrealized_gain_on_winner() {
        let gains = unrealized_gains(&sample_snapshot());
        let vti = &gains[0];
        assert_eq!(vti.symbol, "VTI");
        assert_eq!(vti.market_value, 11_000.0);
        assert_eq!(vti.total_cost, 10_000.0);
        assert_eq!(vti.unrealized_gain, 1_000.0);
        assert_eq!(vti.gain_pct, 10.0);
        assert_eq!(vti.account_type, AccountType::Taxable);
        assert!(!vti.is_loss());
    }

    #[test]
    fn test_zero_cost_position_has_zero_gain_pct() {
        let gains = unrealized_gains(&sample_snapshot());
        let vxus = gains.iter().find(|g| g.symbol == "VXUS").unwrap();
        assert_eq!(vxus.unrealized_gain, 600.0);
        assert_eq!(vxus.gain_pct, 0.0);
        assert_eq!(vxus.account_type.as_str(), "roth_ira");
    }

    #[test]
    fn test_harvesting_only_taxable_losses() {
        let gains = unrealized_gains(&sample_snapshot());
        let summary = tax_loss_harvesting(&gains, 0.29);

        // AGG lost 400 in a tax-deferred account and is not harvestable
        assert_eq!(summary.number_of_positions, 2);
        let symbols: Vec<_> = summary
            .harvestable_positions
            .iter()
            .map(|c| c.symbol.as_str())
            .collect();
        assert_eq!(symbols, ["BND", "VNQ"]);
        assert_eq!(summary.harvestable_positions[0].loss_amount, 500.0);
        assert_eq!(summary.harvestable_positions[0].gain_pct, -6.25);
        assert_eq!(summary.total_harvestable_loss, 700.0);
        assert_eq!(summary.potential_tax_savings, 203.0);
    }

    #[test]
    fn test_harvesting_caps_list_at_ten() {
        let positions = (1..=12)
            .map(|i| position(&format!("L{i}"), 1.0, 100.0 + f64::from(i), 100.0, &[]))
            .collect();
        let gains = unrealized_gains(&PortfolioSnapshot::new(vec![account("taxable", positions)]));

        let summary = tax_loss_harvesting(&gains, 0.2);
        assert_eq!(summary.number_of_positions, 12);
        assert_eq!(summary.harvestable_positions.len(), 10);
        assert_eq!(summary.harvestable_positions[0].symbol, "L12");
        // 1 + 2 + ... + 12
        assert_eq!(summary.total_harvestable_loss, 78.0);
        assert_eq!(summary.potential_tax_savings, 15.6);
    }

    #[test]
    fn test_asset_location() {
        let gains = unrealized_gains(&sample_snapshot());
        let location = asset_location(&gains);

        assert_eq!(location.taxable_accounts.equity, 11_000.0);
        assert_eq!(location.taxable_accounts.bonds, 7_500.0);
        assert_eq!(location.taxable_accounts.reits, 1_800.0);
        // roth_ira buckets with tax_deferred
        assert_eq!(location.tax_deferred_accounts.bonds, 4_000.0);
        assert_eq!(location.tax_deferred_accounts.equity, 600.0);

        assert_eq!(location.inefficiencies.bonds_in_taxable, 7_500.0);
        assert_eq!(location.inefficiencies.reits_in_taxable, 1_800.0);
        assert_eq!(location.inefficiencies.total_inefficient, 9_300.0);
    }

    #[test]
    fn test_withdrawal_sequence_phases() {
        let plan = withdrawal_sequence(80_000.0, 10);
        assert_eq!(plan.len(), 10);

        assert_eq!(plan[0].year, 1);
        assert_eq!(plan[0].source, "Taxable accounts");
        assert_eq!(plan[0].estimated_tax, 12_000.0);
        assert_eq!(plan[0].net_amount, 68_000.0);
        assert_eq!(plan[0].tax_rate, "15%");

        assert_eq!(plan[4].tax_rate, "15%");
        assert_eq!(plan[5].year, 6);
        assert_eq!(plan[5].tax_rate, "22%");
        assert_eq!(plan[5].estimated_tax, 17_600.0);
        assert_eq!(plan[5].source, "Tax-deferred accounts (IRA/401k)");
    }

    #[test]
    fn test_withdrawal_sequence_is_capped() {
        assert_eq!(withdrawal_sequence(50_000.0, 30).len(), 10);
        assert_eq!(withdrawal_sequence(50_000.0, 3).len(), 3);
        assert!(withdrawal_sequence(50_000.0, 0).is_empty());
        for years in 6..=40 {
            let plan = withdrawal_sequence(1_000.0, years);
            assert_eq!(plan.len(), years.min(10) as usize);
            assert_eq!(plan[5].tax_rate, "22%");
        }
    }

    #[test]
    fn test_account_summary() {
        let summary = account_summary(&sample_snapshot());
        assert_eq!(
            summary,
            [
                AccountTypeCount { account_type: "taxable".to_string(), count: 2 },
                AccountTypeCount { account_type: "tax_deferred".to_string(), count: 1 },
                AccountTypeCount { account_type: "roth_ira".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_analyze_report() {
        let report = TaxOptimizer::default()
            .analyze(&sample_snapshot(), &UserPreferences::default())
            .unwrap();

        assert_eq!(report.positions.len(), 5);
        assert_eq!(report.harvesting.potential_tax_savings, 203.0);
        assert_eq!(report.withdrawal_plan.len(), 10);
        assert_eq!(report.first_phase_tax, 60_000.0);
        assert_eq!(report.filing_status, "married_filing_jointly");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["positions"][0].get("asset_classes").is_none());
        assert_eq!(json["positions"][0]["account_type"], "taxable");

        let short = TaxOptimizer::new(3)
            .analyze(&sample_snapshot(), &UserPreferences::default())
            .unwrap();
        assert_eq!(short.first_phase_tax, 36_000.0);
    }

    #[test]
    fn test_analyze_large_position_keeps_finite_values() {
        let snapshot = PortfolioSnapshot::new(vec![account(
            "taxable",
            vec![position("HUGE", 1e154, 1.0, 1e153, &[("equity", 100.0)])],
        )]);

        let report = TaxOptimizer::default()
            .analyze(&snapshot, &UserPreferences::default())
            .unwrap();
        let huge = &report.positions[0];
        assert_eq!(huge.market_value, 1e154 * 1e153);
        assert!(huge.unrealized_gain.is_finite());
        assert!(huge.gain_pct.is_finite());
        assert!(report.asset_location.taxable_accounts.equity.is_finite());
    }

    #[test]
    fn test_analyze_overflowing_portfolio_fails() {
        let prefs = UserPreferences::default();

        let snapshot = PortfolioSnapshot::new(vec![account(
            "taxable",
            vec![position("HUGE", 1e300, 0.0, 1e300, &[("equity", 100.0)])],
        )]);
        assert!(snapshot.validate().is_ok());
        let err = TaxOptimizer::default().analyze(&snapshot, &prefs).unwrap_err();
        assert!(matches!(err, Error::AnalysisFailed(_)));
        assert!(!err.is_input_error());

        // market value is tiny, the cost basis total is not
        let snapshot = PortfolioSnapshot::new(vec![account(
            "taxable",
            vec![position("DEEP", 1e300, 1e300, 1e-300, &[("equity", 100.0)])],
        )]);
        assert!(snapshot.total_value().is_finite());
        let err = TaxOptimizer::default().analyze(&snapshot, &prefs).unwrap_err();
        assert!(matches!(err, Error::AnalysisFailed(_)));
    }

    #[test]
    fn test_analyze_is_repeatable() {
        let optimizer = TaxOptimizer::default();
        let prefs = UserPreferences::default();
        let first = optimizer.analyze(&sample_snapshot(), &prefs).unwrap();
        let second = optimizer.analyze(&sample_snapshot(), &prefs).unwrap();
        assert_eq!(first, second);
    }
}
