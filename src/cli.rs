//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::constant_oracle::ConstantOracle;
use crate::adapters::csv_adapter::{write_bars, CsvAdapter};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::logistic_oracle::{LogisticOracle, LogisticParams};
use crate::adapters::synthetic_feed::SyntheticFeed;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult, RunStatus};
use crate::domain::config_validation::validate_config;
use crate::domain::error::AitraderError;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::ohlcv::{parse_timestamp, Bar};
use crate::domain::position::{RiskParams, TradeKind};
use crate::domain::signal::{CombinePolicy, Signal, SignalThresholds};
use crate::domain::sizing::SizingParams;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::oracle_port::SignalOracle;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "aitrader", about = "Signal-gated trading strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV bar file; overrides [backtest] data
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Use this many synthetic bars instead of a file
        #[arg(long, conflicts_with = "data")]
        synthetic: Option<usize>,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Directory for trades.csv, equity.csv and metrics.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write synthetic bars to a CSV file
    Generate {
        #[arg(short, long)]
        bars: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            synthetic,
            seed,
            output,
        } => run_backtest_command(&config, data.as_deref(), synthetic, seed, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Generate {
            bars,
            seed,
            output,
        } => run_generate(bars, seed, &output),
    }
}

fn fail(err: AitraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Validate `adapter` and build the run configuration from it.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, AitraderError> {
    validate_config(adapter)?;

    let s = "indicators";
    let indicators = IndicatorConfig {
        rsi_period: adapter.get_int(s, "rsi_period", 14) as usize,
        macd_fast: adapter.get_int(s, "macd_fast", 12) as usize,
        macd_slow: adapter.get_int(s, "macd_slow", 26) as usize,
        macd_signal: adapter.get_int(s, "macd_signal", 9) as usize,
        bb_period: adapter.get_int(s, "bb_period", 20) as usize,
        bb_std: adapter.get_double(s, "bb_std", 2.0),
        ma_period: adapter.get_int(s, "ma_period", 20) as usize,
        ma_fast: adapter.get_int(s, "ma_fast", 10) as usize,
        ma_slow: adapter.get_int(s, "ma_slow", 30) as usize,
        atr_period: adapter.get_int(s, "atr_period", 14) as usize,
        volatility_window: adapter.get_int(s, "volatility_window", 20) as usize,
        volume_profile_bins: adapter.get_int(s, "volume_profile_bins", 20) as usize,
    };

    let thresholds = SignalThresholds {
        rsi_overbought: adapter.get_double(s, "rsi_overbought", 70.0),
        rsi_oversold: adapter.get_double(s, "rsi_oversold", 30.0),
    };

    let risk = RiskParams {
        stop_loss_pct: adapter.get_double("risk", "stop_loss_pct", 0.03),
        take_profit_pct: adapter.get_double("risk", "take_profit_pct", 0.06),
        max_drawdown_pct: adapter.get_double("risk", "max_drawdown_pct", 0.05),
        use_atr_stop: adapter.get_bool("risk", "use_atr_stop", false),
        cooldown_bars: adapter.get_int("risk", "cooldown_bars", 0) as usize,
        scale_by_exposure: adapter.get_bool("risk", "scale_by_exposure", false),
    };

    let sizing = SizingParams {
        max_position_fraction: adapter.get_double("sizing", "max_position_fraction", 0.1),
        volatility_threshold: adapter.get_double("sizing", "volatility_threshold", 0.03),
        atr_multiplier: adapter.get_double(s, "atr_multiplier", 2.0),
    };

    let policy = match adapter
        .get_string("signal", "policy")
        .map(|p| p.trim().to_lowercase())
        .as_deref()
    {
        Some("weighted") => CombinePolicy::Weighted {
            oracle_weight: adapter.get_double("signal", "weighted_oracle_weight", 0.5),
            threshold: adapter.get_double("signal", "weighted_threshold", 0.35),
        },
        Some("majority") => CombinePolicy::Majority,
        Some("technical") => CombinePolicy::TechnicalOnly,
        _ => CombinePolicy::Conjunctive,
    };

    Ok(BacktestConfig {
        initial_balance: adapter.get_double("backtest", "initial_balance", 10_000.0),
        indicators,
        thresholds,
        policy,
        risk,
        sizing,
        oracle_train_bars: adapter.get_int("oracle", "train_bars", 0) as usize,
        oracle_window: adapter.get_int("oracle", "window", 11) as usize,
        horizon: adapter.get_int("oracle", "horizon", 5) as usize,
    })
}

/// Oracle named by `[oracle] kind`, constant Hold when absent.
pub fn build_oracle(
    adapter: &dyn ConfigPort,
    config: &BacktestConfig,
) -> Result<Box<dyn SignalOracle>, AitraderError> {
    let kind = adapter
        .get_string("oracle", "kind")
        .map(|k| k.trim().to_lowercase())
        .unwrap_or_else(|| "constant".to_string());

    match kind.as_str() {
        "constant" => {
            let vote = match adapter.get_string("oracle", "vote") {
                Some(raw) => raw
                    .parse::<Signal>()
                    .map_err(|reason| AitraderError::invalid("oracle", "vote", reason))?,
                None => Signal::Hold,
            };
            Ok(Box::new(ConstantOracle::new(vote)))
        }
        "logistic" => Ok(Box::new(LogisticOracle::new(LogisticParams {
            window: config.oracle_window,
            horizon: config.horizon,
            label_threshold: adapter.get_double("oracle", "label_threshold", 0.01),
            epochs: adapter.get_int("oracle", "epochs", 200) as usize,
            learning_rate: adapter.get_double("oracle", "learning_rate", 0.1),
        }))),
        other => Err(AitraderError::invalid(
            "oracle",
            "kind",
            format!("unknown oracle '{other}'"),
        )),
    }
}

/// Bars for a run: synthetic when requested, else the CLI path, else
/// `[backtest] data`. `[backtest] start`/`end` bound the range.
pub fn load_bars(
    adapter: &dyn ConfigPort,
    data: Option<&Path>,
    synthetic: Option<usize>,
    seed: u64,
) -> Result<Vec<Bar>, AitraderError> {
    let start = adapter
        .get_string("backtest", "start")
        .and_then(|s| parse_timestamp(&s));
    let end = adapter
        .get_string("backtest", "end")
        .and_then(|s| parse_timestamp(&s));

    if let Some(n) = synthetic {
        eprintln!("Generating {} synthetic bars (seed {})", n, seed);
        return SyntheticFeed::new(n, seed).fetch_bars(start, end);
    }

    let path = match data {
        Some(p) => p.to_path_buf(),
        None => adapter
            .get_string("backtest", "data")
            .map(PathBuf::from)
            .ok_or_else(|| AitraderError::ConfigMissing {
                section: "backtest".into(),
                key: "data".into(),
            })?,
    };
    eprintln!("Loading bars from {}", path.display());
    CsvAdapter::new(path).fetch_bars(start, end)
}

fn run_backtest_command(
    config_path: &Path,
    data: Option<&Path>,
    synthetic: Option<usize>,
    seed: u64,
    output: Option<&Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let mut oracle = match build_oracle(&adapter, &config) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };
    let bars = match load_bars(&adapter, data, synthetic, seed) {
        Ok(b) => b,
        Err(e) => return fail(e),
    };

    eprintln!(
        "Running backtest: {} bars, policy {}, oracle {}",
        bars.len(),
        config.policy.name(),
        oracle.name()
    );
    let result = match run_backtest(&bars, &config, oracle.as_mut()) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    print_summary(&result);

    if let Some(dir) = output {
        if let Err(e) = CsvReportAdapter::new().write(&result, dir) {
            return fail(e);
        }
        eprintln!("\nReports written to: {}", dir.display());
    }
    ExitCode::SUCCESS
}

fn print_summary(result: &BacktestResult) {
    if let RunStatus::InsufficientData { bars, required } = result.status {
        eprintln!(
            "\nInsufficient data: {} bars, at least {} required. Nothing simulated.",
            bars, required
        );
        return;
    }

    let m = &result.metrics;
    eprintln!("\n=== Backtest Results ===");
    eprintln!("Initial Balance:  {:.2}", result.initial_balance);
    eprintln!("Final Balance:    {:.2}", result.final_balance);
    eprintln!("Total Return:     {:.2}%", m.total_return);
    eprintln!("Max Drawdown:     -{:.2}%", m.max_drawdown);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Win Rate:         {:.1}%", m.win_rate);
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Avg Holding:      {:.1}h", m.avg_holding_time);

    let a = &result.analysis;
    eprintln!("\n=== Trade Analysis ===");
    for kind in TradeKind::ALL {
        eprintln!("  {:<18} {}", kind.to_string(), a.count(kind));
    }
    if let Some(price) = a.avg_long_entry {
        eprintln!("  avg long entry     {:.2}", price);
    }
    if let Some(price) = a.avg_short_entry {
        eprintln!("  avg short entry    {:.2}", price);
    }

    eprintln!("\n=== Oracle ===");
    match &result.training {
        Some(t) => eprintln!(
            "  trained on {} samples (buy {}, sell {}, hold {}), accuracy {:.1}%",
            t.sample_count,
            t.class_counts.buy,
            t.class_counts.sell,
            t.class_counts.hold,
            t.accuracy * 100.0
        ),
        None => eprintln!("  not trained"),
    }
    eprintln!(
        "  unavailable on {} of {} bars",
        result.oracle_unavailable,
        result.equity_curve.len()
    );
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let oracle = match build_oracle(&adapter, &config) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    eprintln!("  initial balance:  {:.2}", config.initial_balance);
    eprintln!("  policy:           {}", config.policy.name());
    eprintln!("  oracle:           {}", oracle.name());
    eprintln!("  warmup bars:      {}", config.indicators.warmup_bars());
    eprintln!("  required bars:    {}", config.required_bars());
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_generate(bars: usize, seed: u64, output: &Path) -> ExitCode {
    let generated = match SyntheticFeed::new(bars, seed).generate() {
        Ok(b) => b,
        Err(e) => return fail(e),
    };
    if let Err(e) = write_bars(output, &generated) {
        return fail(e);
    }
    eprintln!("Wrote {} bars to {}", generated.len(), output.display());
    ExitCode::SUCCESS
}
