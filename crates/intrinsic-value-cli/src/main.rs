mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing::debug;

use commands::discount::{BetaArgs, WaccArgs};
use commands::multiples::{PbArgs, PeArgs};
use commands::valuation::{DcfArgs, RecommendArgs};

/// Discounted cash flow intrinsic value estimates
#[derive(Parser)]
#[command(
    name = "ivx",
    version,
    about = "Discounted cash flow intrinsic value estimates",
    long_about = "Project free cash flow over a multi-stage growth schedule, discount it, \
                  add a Gordon growth terminal value, bridge to equity and derive a \
                  per-share intrinsic value with model-error bands, a margin-of-safety \
                  buy target and a buy/hold/avoid signal."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a DCF valuation and optionally a recommendation against a market price
    Dcf(DcfArgs),
    /// Classify a market price against a known intrinsic value
    Recommend(RecommendArgs),
    /// Value a stock from EPS and a growth-adjusted industry P/E
    Pe(PeArgs),
    /// Value a stock from book value per share and an industry P/B
    Pb(PbArgs),
    /// Derive a discount rate via CAPM and debt-to-equity weights
    Wacc(WaccArgs),
    /// Estimate equity beta from paired stock and market returns
    Beta(BetaArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Dcf(args) => commands::valuation::run_dcf(args),
        Commands::Recommend(args) => commands::valuation::run_recommend(args),
        Commands::Pe(args) => commands::multiples::run_pe(args),
        Commands::Pb(args) => commands::multiples::run_pb(args),
        Commands::Wacc(args) => commands::discount::run_wacc(args),
        Commands::Beta(args) => commands::discount::run_beta(args),
        Commands::Version => {
            println!("ivx {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            debug!(format = ?cli.output, "rendering output");
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
