mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::kpi::{KpisArgs, ReturnArgs, SeriesArgs};

/// Trailing-return stock KPIs
#[derive(Parser)]
#[command(
    name = "stock-kpi",
    version,
    about = "Trailing 1/3/5-year stock return KPIs",
    long_about = "Computes trailing 1, 3 and 5-year returns per entity from daily \
                  price rows (JSON or CSV) and an entity catalog. Returns that \
                  cannot be computed are reported as N/A."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter (e.g. "debug", "stock_kpi_core=debug"); defaults to RUST_LOG or "warn"
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute trailing-return KPIs for every catalogued entity
    Kpis(KpisArgs),
    /// Show one entity's price series, sorted by date
    Series(SeriesArgs),
    /// Percentage return between an anchor price and a latest price
    Return(ReturnArgs),
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

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Kpis(args) => commands::kpi::run_kpis(args),
        Commands::Series(args) => commands::kpi::run_series(args),
        Commands::Return(args) => commands::kpi::run_return(args),
        Commands::Version => {
            println!("stock-kpi {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
