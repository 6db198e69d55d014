//! Table rendering for analyzer reports

use std::sync::Arc;

use comfy_table::{Table, presets::UTF8_FULL};
use planner_analytics::{RebalanceReport, RiskReport, TaxReport};
use planner_tools::Tool;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header.to_vec());
    table
}

fn money(value: f64) -> String {
    format!("${value:.2}")
}

fn pct(value: f64) -> String {
    format!("{value:.2}%")
}

/// Allocation drift, trades and cost summary
pub fn rebalance(report: &RebalanceReport) -> String {
    let mut drift = table(&["Asset class", "Current", "Target", "Drift", "Status"]);
    for row in &report.drift {
        drift.add_row(vec![
            row.asset_class.clone(),
            pct(row.current_pct),
            pct(row.target_pct),
            format!("{:+.2}", row.drift_pct),
            if row.within_threshold { "ok" } else { "rebalance" }.to_string(),
        ]);
    }

    let mut out = format!(
        "Portfolio value: {} (cash {})\nStrategy: {} (threshold {}%)\n{drift}\n",
        money(report.total_value),
        money(report.available_cash),
        report.strategy,
        report.threshold,
    );

    if report.trades.is_empty() {
        out.push_str("Portfolio is within rebalancing threshold\n");
        return out;
    }

    let mut trades = table(&["Action", "Asset class", "Amount", "Priority"]);
    for trade in &report.trades {
        trades.add_row(vec![
            trade.action.as_str().to_uppercase(),
            trade.asset_class.clone(),
            money(trade.amount),
            format!("{:.2}", trade.priority),
        ]);
    }

    let cost = &report.cost_estimate;
    out.push_str(&format!(
        "{trades}\nTrades: {} | Volume: {} | Cost: {} ({}% of volume)\n",
        cost.number_of_trades,
        money(cost.total_volume),
        money(cost.total_transaction_cost),
        cost.cost_percentage,
    ));
    out
}

/// Volatility, VaR, concentration and flags
pub fn risk(report: &RiskReport) -> String {
    let mut summary = table(&["Metric", "Value"]);
    let concentration = &report.concentration;
    summary.add_row(vec!["Portfolio value".to_string(), money(report.total_value)]);
    summary.add_row(vec!["Volatility".to_string(), pct(report.volatility)]);
    summary.add_row(vec!["Target volatility".to_string(), pct(report.target_volatility)]);
    summary.add_row(vec![
        format!("VaR ({:.0}%)", report.confidence * 100.0),
        money(report.value_at_risk),
    ]);
    summary.add_row(vec!["Max expected loss".to_string(), pct(report.max_expected_loss_pct)]);
    summary.add_row(vec![
        "Top 10 concentration".to_string(),
        pct(concentration.top_10_concentration_pct),
    ]);
    summary.add_row(vec![
        format!("Top sector ({})", concentration.top_sector),
        pct(concentration.top_sector_pct),
    ]);
    summary.add_row(vec![
        format!("Top region ({})", concentration.top_region),
        pct(concentration.top_region_pct),
    ]);

    let mut holdings = table(&["Symbol", "Name", "Value", "Weight"]);
    for holding in &concentration.top_10_holdings {
        holdings.add_row(vec![
            holding.symbol.clone(),
            holding.name.clone(),
            money(holding.value),
            pct(holding.weight_pct),
        ]);
    }

    let mut out = format!("{summary}\n{holdings}\n");
    if report.flags.is_empty() {
        out.push_str("No risk flags\n");
        return out;
    }

    let mut flags = table(&["Flag", "Subject", "Value", "Limit"]);
    for flag in &report.flags {
        flags.add_row(vec![
            flag.kind.as_str().to_string(),
            flag.subject.clone(),
            pct(flag.value_pct),
            pct(flag.limit_pct),
        ]);
    }
    out.push_str(&format!("{flags}\n"));
    out
}

/// Harvesting, asset location and withdrawal plan
pub fn tax(report: &TaxReport) -> String {
    let harvesting = &report.harvesting;
    let mut out = format!(
        "Combined tax rate: {:.1}% ({})\nHarvestable losses: {} across {} positions, potential savings {}\n",
        report.combined_tax_rate * 100.0,
        report.filing_status,
        money(harvesting.total_harvestable_loss),
        harvesting.number_of_positions,
        money(harvesting.potential_tax_savings),
    );

    if !harvesting.harvestable_positions.is_empty() {
        let mut losses = table(&["Symbol", "Loss", "Market value", "Gain"]);
        for candidate in &harvesting.harvestable_positions {
            losses.add_row(vec![
                candidate.symbol.clone(),
                money(candidate.loss_amount),
                money(candidate.market_value),
                pct(candidate.gain_pct),
            ]);
        }
        out.push_str(&format!("{losses}\n"));
    }

    let location = &report.asset_location;
    let mut placement = table(&["Account", "Equity", "Bonds", "REITs"]);
    for (label, bucket) in [
        ("Taxable", &location.taxable_accounts),
        ("Tax-deferred", &location.tax_deferred_accounts),
    ] {
        placement.add_row(vec![
            label.to_string(),
            money(bucket.equity),
            money(bucket.bonds),
            money(bucket.reits),
        ]);
    }
    out.push_str(&format!(
        "{placement}\nTax-inefficient holdings in taxable accounts: {}\n",
        money(location.inefficiencies.total_inefficient),
    ));

    let mut plan = table(&["Year", "Source", "Withdrawal", "Tax", "Net", "Rate"]);
    for year in &report.withdrawal_plan {
        plan.add_row(vec![
            year.year.to_string(),
            year.source.clone(),
            money(year.withdrawal_amount),
            money(year.estimated_tax),
            money(year.net_amount),
            year.tax_rate.clone(),
        ]);
    }
    out.push_str(&format!(
        "{plan}\nEstimated tax, first phase: {}\n",
        money(report.first_phase_tax)
    ));
    out
}

/// Registered tools
pub fn tools(tools: &[Arc<dyn Tool>]) -> String {
    let mut list = table(&["Tool", "Description"]);
    for tool in tools {
        list.add_row(vec![tool.name().to_string(), tool.description().to_string()]);
    }
    list.to_string()
}
