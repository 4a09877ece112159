//! Command-line interface for comps
//!
//! # Usage
//!
//! ```bash
//! # List a peer group and save it
//! comps symbols --region us --sector Technology --peer-group "Software & Services" -o symbols.json
//!
//! # Multiples for every symbol in a saved table
//! comps batch --input symbols.json --metric PER --metric EV/EBITDA
//!
//! # Both steps at once, rendered as a table
//! comps --format table screen
//!
//! # Quarterly statements
//! comps statements MSFT --freq Q
//! ```

mod output;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use comps_screen::{
    Multiple, MultipleCalculator, SymbolLister, SymbolTable, YahooFinanceClient,
    get_financial_statements,
};
use comps_utils::{LogFormat, init_tracing};
use output::OutputFormat;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "comps")]
#[command(about = "Screen a peer group and compare valuation multiples", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format for results on stdout
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Format of log lines on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Region code
    #[arg(long, default_value = "us")]
    region: String,

    /// Sector name
    #[arg(long, default_value = "Technology")]
    sector: String,

    /// Peer group name
    #[arg(long, default_value = "Software & Services")]
    peer_group: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the symbols of a peer group
    Symbols {
        #[command(flatten)]
        filter: FilterArgs,

        /// Save the table as JSON instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Valuation multiples for one symbol
    Multiples {
        /// Ticker symbol
        symbol: String,

        /// Multiple to compute (repeatable, defaults to all)
        #[arg(short, long = "metric")]
        metrics: Vec<String>,
    },

    /// Valuation multiples for every symbol of a saved JSON table
    Batch {
        /// JSON array of {"symbol", "shortName"} objects
        #[arg(short, long)]
        input: PathBuf,

        /// Multiple to compute (repeatable, defaults to all)
        #[arg(short, long = "metric")]
        metrics: Vec<String>,

        /// Save the result as JSON instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List a peer group, then compute multiples for all of it
    Screen {
        #[command(flatten)]
        filter: FilterArgs,

        /// Multiple to compute (repeatable, defaults to all)
        #[arg(short, long = "metric")]
        metrics: Vec<String>,

        /// Save the result as JSON instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Balance sheet, income statement and cash flow for one symbol
    Statements {
        /// Ticker symbol
        symbol: String,

        /// Q (quarterly) or Y (annual)
        #[arg(short, long, default_value = "Q")]
        freq: String,
    },

    /// List supported multiples
    Metrics,
}

fn requested(metrics: &[String]) -> Option<Vec<&str>> {
    (!metrics.is_empty()).then(|| metrics.iter().map(String::as_str).collect())
}

fn emit(rendered: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn client() -> anyhow::Result<Arc<YahooFinanceClient>> {
    let client = YahooFinanceClient::from_env().context("invalid COMPS_* environment")?;
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.log_format, "warn,comps=info,comps_screen=info");

    match cli.command {
        Commands::Symbols { filter, output } => {
            let provider = client()?;
            let symbols = SymbolLister::new(provider.clone())
                .with_config(provider.config())
                .list_symbols(&filter.region, &filter.sector, &filter.peer_group)
                .await
                .context("symbol listing failed")?;
            info!(count = symbols.len(), "Listed symbols");

            let format = if output.is_some() {
                OutputFormat::Json
            } else {
                cli.format
            };
            emit(&output::render_symbols(&symbols, format)?, output.as_deref())
        }
        Commands::Multiples { symbol, metrics } => {
            let names = requested(&metrics)
                .unwrap_or_else(|| Multiple::ALL.iter().map(|m| m.name()).collect());
            let multiples = MultipleCalculator::new(client()?)
                .get_multiples(&symbol, &names)
                .await
                .with_context(|| format!("failed to fetch info for {symbol}"))?;
            emit(
                &output::render_multiples(&symbol, &multiples, cli.format)?,
                None,
            )
        }
        Commands::Batch {
            input,
            metrics,
            output,
        } => {
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let symbols = SymbolTable::from_json(&raw)?;
            let names = requested(&metrics);
            let results = MultipleCalculator::new(client()?)
                .get_multiples_for_symbols(&symbols, names.as_deref())
                .await
                .context("batch calculation failed")?;

            let format = if output.is_some() {
                OutputFormat::Json
            } else {
                cli.format
            };
            emit(&output::render_results(&results, format)?, output.as_deref())
        }
        Commands::Screen {
            filter,
            metrics,
            output,
        } => {
            let provider = client()?;
            let symbols = SymbolLister::new(provider.clone())
                .with_config(provider.config())
                .list_symbols(&filter.region, &filter.sector, &filter.peer_group)
                .await
                .context("symbol listing failed")?;
            info!(count = symbols.len(), "Listed symbols, computing multiples");

            let names = requested(&metrics);
            let results = MultipleCalculator::new(provider)
                .get_multiples_for_symbols(&symbols, names.as_deref())
                .await
                .context("batch calculation failed")?;

            let format = if output.is_some() {
                OutputFormat::Json
            } else {
                cli.format
            };
            emit(&output::render_results(&results, format)?, output.as_deref())
        }
        Commands::Statements { symbol, freq } => {
            let provider = client()?;
            let statements = get_financial_statements(provider.as_ref(), &symbol, &freq)
                .await
                .with_context(|| format!("failed to fetch statements for {symbol}"))?;
            emit(&output::render_statements(&statements, cli.format)?, None)
        }
        Commands::Metrics => emit(&output::render_metric_catalog(cli.format)?, None),
    }
}
