//! Trailstop CLI: aggregate, fetch, backtest, sweep and signal commands.
//!
//! Commands:
//! - `aggregate`: normalize a JSON/CSV candle or trade file into canonical bars
//! - `fetch`: download OHLCV candles from Birdeye and save them as bars
//! - `backtest`: replay one trailing-stop position from a TOML config
//! - `sweep`: rank a grid of take-profit / trailing-stop settings
//! - `signal`: replay the live controller's entry/exit decisions over history

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use trailstop_core::data::{Canonicalizer, FileSource};
use trailstop_core::domain::{Bar, Interval, Side};
use trailstop_core::position_management::Decision;
use trailstop_core::status::StatusReport;
use trailstop_runner::export::{save_artifacts, save_sweep_artifacts};
use trailstop_runner::{
    format_summary, load_bars, replay_controller, run_single_backtest, run_sweep,
    BacktestConfig, DataSection, LoadOptions, SourceKind, SweepOutcome,
};

#[derive(Parser)]
#[command(
    name = "trailstop",
    about = "Trailstop CLI: trailing-stop / take-profit backtester"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a candle or trade file into canonical bars.
    Aggregate {
        /// JSON or CSV input file.
        #[arg(long)]
        input: PathBuf,

        /// Bucket width for trade files (1m, 5m, 15m, 30m, 1h, 4h, 1d).
        #[arg(long, default_value = "5m")]
        interval: Interval,

        /// Write bars here as JSON. Prints to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Download OHLCV candles from Birdeye.
    Fetch {
        /// Token mint address.
        #[arg(long)]
        token: String,

        #[arg(long, default_value = "5m")]
        interval: Interval,

        /// Start (YYYY-MM-DD or RFC 3339). Defaults to three days before --end.
        #[arg(long)]
        start: Option<String>,

        /// End (YYYY-MM-DD or RFC 3339). Defaults to now.
        #[arg(long)]
        end: Option<String>,

        /// API key. Defaults to $BIRDEYE_API_KEY.
        #[arg(long)]
        api_key: Option<String>,

        /// Chain header value.
        #[arg(long)]
        chain: Option<String>,

        /// Output file for the bars (JSON).
        #[arg(long, default_value = "data/bars.json")]
        output: PathBuf,
    },
    /// Run a single backtest from a TOML config file.
    Backtest {
        #[command(flatten)]
        run: RunArgs,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the full report as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Sweep the `[sweep]` grid of a TOML config file.
    Sweep {
        #[command(flatten)]
        run: RunArgs,

        /// Run combinations one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Number of ranked rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Replay the live controller over historical bars.
    Signal {
        #[command(flatten)]
        run: RunArgs,
    },
}

/// Config file plus command-line overrides. Flags win over file values.
#[derive(Args)]
struct RunArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: PathBuf,

    /// API key for Birdeye sources. Defaults to $BIRDEYE_API_KEY.
    #[arg(long)]
    api_key: Option<String>,

    #[arg(long)]
    side: Option<Side>,

    #[arg(long)]
    amount: Option<Decimal>,

    #[arg(long)]
    entry_price: Option<Decimal>,

    #[arg(long)]
    take_profit: Option<Decimal>,

    #[arg(long)]
    activation: Option<Decimal>,

    #[arg(long)]
    trailing: Option<Decimal>,

    /// Read bars from this JSON/CSV file instead of the configured source.
    #[arg(long)]
    data_file: Option<PathBuf>,

    #[arg(long)]
    interval: Option<Interval>,

    #[arg(long)]
    start: Option<String>,

    #[arg(long)]
    end: Option<String>,
}

impl RunArgs {
    fn load_config(&self) -> Result<BacktestConfig> {
        let mut config = BacktestConfig::from_file(&self.config)?;
        let b = &mut config.backtest;
        if let Some(side) = self.side {
            b.side = side;
        }
        if let Some(amount) = self.amount {
            b.amount = amount;
        }
        if let Some(entry_price) = self.entry_price {
            b.entry_price = Some(entry_price);
        }
        if let Some(tp) = self.take_profit {
            b.take_profit_pct = tp;
        }
        if let Some(activation) = self.activation {
            b.trailing_activation_delta = activation;
        }
        if let Some(trailing) = self.trailing {
            b.trailing_delta = trailing;
        }

        let data = &mut config.data;
        if let Some(path) = &self.data_file {
            data.source = SourceKind::File;
            data.path = Some(path.clone());
        }
        if let Some(interval) = self.interval {
            data.interval = interval;
        }
        if self.start.is_some() {
            data.start = self.start.clone();
        }
        if self.end.is_some() {
            data.end = self.end.clone();
        }

        config.validate()?;
        debug!(
            config = %self.config.display(),
            pair = %config.backtest.trading_pair,
            source = ?config.data.source,
            "config loaded"
        );
        Ok(config)
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            api_key: self.api_key.clone(),
            ..LoadOptions::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    match cli.command {
        Commands::Aggregate {
            input,
            interval,
            output,
        } => run_aggregate(&input, interval, output.as_deref()),
        Commands::Fetch {
            token,
            interval,
            start,
            end,
            api_key,
            chain,
            output,
        } => run_fetch(token, interval, start, end, api_key, chain, &output),
        Commands::Backtest {
            run,
            output_dir,
            json,
        } => run_backtest_cmd(&run, &output_dir, json),
        Commands::Sweep {
            run,
            sequential,
            top,
            output_dir,
        } => run_sweep_cmd(&run, sequential, top, &output_dir),
        Commands::Signal { run } => run_signal_cmd(&run),
    }
}

/// Logs go to stderr so stdout stays clean for reports.
fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("trailstop=info"))
        .context("invalid log filter")?;
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
    Ok(())
}

fn run_aggregate(input: &Path, interval: Interval, output: Option<&Path>) -> Result<()> {
    let payload = FileSource::new(input)
        .load()
        .with_context(|| format!("failed to load {}", input.display()))?;
    let (bars, report) = Canonicalizer::aggregate(payload, interval);

    println!("Input records:        {}", report.input_records);
    println!("Dropped (missing):    {}", report.dropped_missing);
    println!("Dropped (invalid):    {}", report.dropped_invalid);
    println!("Duplicates collapsed: {}", report.duplicates_collapsed);
    println!("Trades folded:        {}", report.trades_folded);
    println!("Max trades per bar:   {}", report.max_trades_per_bar);
    println!("Output bars:          {}", report.output_bars);

    match output {
        Some(path) => {
            write_bars(&bars, path)?;
            println!("Bars saved to: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&bars)?),
    }
    Ok(())
}

fn run_fetch(
    token: String,
    interval: Interval,
    start: Option<String>,
    end: Option<String>,
    api_key: Option<String>,
    chain: Option<String>,
    output: &Path,
) -> Result<()> {
    let data = DataSection {
        source: SourceKind::Birdeye,
        token,
        interval,
        start,
        end,
        chain,
        ..DataSection::default()
    };
    let opts = LoadOptions {
        api_key,
        ..LoadOptions::default()
    };
    let loaded = load_bars(&data, &opts)?;
    if loaded.bars.is_empty() {
        println!("No data for {} in the requested window.", data.token);
        return Ok(());
    }

    write_bars(&loaded.bars, output)?;
    println!(
        "Fetched {} bars ({} dropped) -> {}",
        loaded.bars.len(),
        loaded.report.dropped(),
        output.display()
    );
    Ok(())
}

fn run_backtest_cmd(run: &RunArgs, output_dir: &Path, json: bool) -> Result<()> {
    let config = run.load_config()?;
    let report = run_single_backtest(&config, &run.load_options())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("{}", format_summary(&report));
        println!();
    }

    let run_dir = save_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_sweep_cmd(run: &RunArgs, sequential: bool, top: usize, output_dir: &Path) -> Result<()> {
    let mut config = run.load_config()?;
    let Some(sweep) = config.sweep.as_mut() else {
        bail!("config {} has no [sweep] table", run.config.display());
    };
    if sequential {
        sweep.parallel = false;
    }

    let loaded = load_bars(&config.data, &run.load_options())?;
    let report = run_sweep(&config, &loaded.bars, None)?;

    println!();
    println!(
        "=== Sweep: {} ({} combinations, {} failed) ===",
        report.trading_pair, report.total, report.failed
    );
    println!(
        "{:>4}  {:>8}  {:>10}  {:>10}  {:>12}  {:>10}  {:<13}",
        "Rank", "TP", "Activation", "Trailing", "Final PnL", "PnL %", "Exit"
    );
    println!("{}", "-".repeat(79));
    for (rank, entry) in report.top_n(top).into_iter().enumerate() {
        let Some(m) = entry.outcome.metrics() else {
            continue;
        };
        let p = &entry.params;
        println!(
            "{:>4}  {:>8}  {:>10}  {:>10}  {:>12}  {:>10}  {:<13}",
            rank + 1,
            p.take_profit_pct.normalize(),
            p.trailing_activation_delta.normalize(),
            p.trailing_delta.normalize(),
            m.final_pnl.round_dp(4),
            m.final_pnl_pct.round_dp(2),
            m.exit_reason.as_str(),
        );
    }
    for entry in &report.entries {
        if let SweepOutcome::Failed { error } = &entry.outcome {
            eprintln!("Combination {} failed: {error}", entry.index);
        }
    }
    println!();
    println!("{}", report.status().render());

    let run_dir = save_sweep_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_signal_cmd(run: &RunArgs) -> Result<()> {
    let config = run.load_config()?;
    let loaded = load_bars(&config.data, &run.load_options())?;
    let replay = replay_controller(&config, &loaded.bars)?;

    for step in &replay.steps {
        let when = chrono::DateTime::from_timestamp_millis(step.timestamp)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| step.timestamp.to_string());
        match &step.decision {
            Decision::Enter { side, amount, price } => {
                println!("{when}  ENTER {side} {amount} @ {price}");
            }
            Decision::Exit { reason, price, pnl } => {
                println!("{when}  EXIT  {reason} @ {price} pnl={}", pnl.round_dp(6));
            }
            Decision::NoAction => {}
        }
    }
    println!();
    println!(
        "{} bars, {} entries, {} exits",
        replay.bars_seen,
        replay.entries(),
        replay.exits()
    );
    println!("{}", replay.status.render());
    Ok(())
}

fn write_bars(bars: &[Bar], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(bars).context("failed to serialize bars")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
