//! Command-line interface for planner-rs

mod input;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use planner_analytics::{Rebalancer, RiskAnalyzer, TaxOptimizer};
use planner_core::Analyzer;
use planner_tools::default_registry;
use planner_utils::{Config, LogFormat};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "planner")]
#[command(about = "Portfolio rebalancing, risk and tax analytics", long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Log format (text or json); overrides PLANNER_LOG_FORMAT
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Args, Debug)]
struct AnalysisArgs {
    /// Portfolio snapshot JSON file
    #[arg(short, long)]
    portfolio: PathBuf,

    /// User preferences JSON file (defaults apply when omitted)
    #[arg(long)]
    preferences: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare allocation with target and propose trades
    Rebalance(AnalysisArgs),
    /// Volatility, Value-at-Risk and concentration
    Risk(AnalysisArgs),
    /// Gains, tax-loss harvesting, asset location and withdrawals
    Tax(AnalysisArgs),
    /// List registered tools
    Tools,
    /// Run a tool with a raw JSON request
    Call {
        /// Tool name
        tool: String,

        /// Request JSON file: {"portfolio": ..., "preferences": ...}
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_analyzer<A: Analyzer>(
    analyzer: &A,
    args: &AnalysisArgs,
    format: OutputFormat,
    render: impl Fn(&A::Report) -> String,
) -> Result<()> {
    let snapshot = input::load_snapshot(&args.portfolio)?;
    let preferences = input::load_preferences(args.preferences.as_deref())?;

    info!(
        analyzer = analyzer.name(),
        portfolio = %args.portfolio.display(),
        "Running analysis"
    );

    let report = analyzer
        .analyze(&snapshot, &preferences)
        .with_context(|| format!("{} failed", analyzer.name()))?;

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            print!("{}", render(&report));
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::default().with_env()?;
    if let Some(log_format) = cli.log_format {
        config.log_format = log_format;
    }
    planner_utils::init_tracing_with(config.log_format);

    info!(
        app = %config.app_name,
        environment = %config.environment,
        "Starting planner"
    );

    match &cli.command {
        Commands::Rebalance(args) => run_analyzer(
            &Rebalancer::new(config.cost_per_trade),
            args,
            cli.format,
            render::rebalance,
        ),
        Commands::Risk(args) => run_analyzer(
            &RiskAnalyzer::new(config.var_confidence),
            args,
            cli.format,
            render::risk,
        ),
        Commands::Tax(args) => run_analyzer(
            &TaxOptimizer::new(config.withdrawal_years),
            args,
            cli.format,
            render::tax,
        ),
        Commands::Tools => {
            let registry = default_registry(&config);
            let tools = registry.list_tools();
            match cli.format {
                OutputFormat::Json => {
                    let listing: Vec<_> = tools
                        .iter()
                        .map(|t| {
                            serde_json::json!({
                                "name": t.name(),
                                "description": t.description(),
                                "input_schema": t.input_schema(),
                            })
                        })
                        .collect();
                    print_json(&listing)
                }
                OutputFormat::Table => {
                    println!("{}", render::tools(&tools));
                    Ok(())
                }
            }
        }
        Commands::Call {
            tool,
            input: request,
        } => {
            let registry = default_registry(&config);
            let params = input::load_json(request)?;
            let output = registry
                .execute(tool, params)
                .with_context(|| format!("Tool {tool} failed"))?;
            print_json(&output)
        }
    }
}
