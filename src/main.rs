//! Swing trade simulator - main entry point
//!
//! Runs every scenario of an exit plan and prints the results:
//! - single sell, gradual sell and partial exits
//! - backtests over a rising and a falling price path (plus an optional CSV path)
//! - the strategy payload for the trading service
//!
//! The plan comes from the built-in default, a JSON config file, or the
//! interactive prompts; individual flags override it.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::simulate::Overrides;

#[derive(Parser, Debug)]
#[command(name = "swing-sim")]
#[command(about = "Simulate swing trade exits: TP/SL with and without gradual selling", long_about = None)]
#[command(version)]
struct Cli {
    /// Prompt for every setting instead of using flags
    #[arg(short, long)]
    interactive: bool,

    /// Path to a JSON simulation config (flags override it)
    #[arg(short, long)]
    config: Option<String>,

    /// Trading pair, e.g. "SOL/USDT"
    #[arg(long)]
    token: Option<String>,

    /// Exchange name, e.g. "OKX"
    #[arg(long)]
    exchange: Option<String>,

    /// Unit entry price
    #[arg(long)]
    entry_price: Option<f64>,

    /// Position size in units of the traded asset
    #[arg(long)]
    quantity: Option<f64>,

    /// Take profit (%)
    #[arg(long)]
    tp: Option<f64>,

    /// Stop loss (%)
    #[arg(long)]
    sl: Option<f64>,

    /// Exchange fee (%)
    #[arg(long)]
    fee: Option<f64>,

    /// Monitoring interval of the live strategy (minutes)
    #[arg(long)]
    check_interval: Option<u32>,

    /// Gradual sell percentages (comma-separated, must sum to 100). E.g., "30,30,20,20"
    #[arg(long)]
    stages: Option<String>,

    /// Stage TP thresholds (comma-separated). Defaults to tp, tp+5, tp+10, ...
    #[arg(long)]
    stage_tps: Option<String>,

    /// Exchange id for the strategy payload (falls back to EXCHANGE_ID)
    #[arg(long)]
    exchange_id: Option<String>,

    /// CSV file with a recorded price path to backtest
    #[arg(long)]
    prices: Option<String>,

    /// Print results as JSON instead of the console report
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // File appender
    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    // Console layer goes to stderr so the report (or JSON) owns stdout
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    setup_logging(cli.verbose, "simulate")?;

    let overrides = Overrides {
        token: cli.token,
        exchange: cli.exchange,
        entry_price: cli.entry_price,
        quantity: cli.quantity,
        tp: cli.tp,
        sl: cli.sl,
        fee: cli.fee,
        check_interval: cli.check_interval,
        stages: cli.stages,
        stage_tps: cli.stage_tps,
        exchange_id: cli.exchange_id,
    };

    let run = if cli.interactive {
        match commands::simulate::prompt()? {
            Some(run) => run,
            None => return Ok(()),
        }
    } else {
        commands::simulate::load(cli.config, overrides)?
    };

    commands::simulate::run(run, cli.prices, cli.json)
}
