//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{
    CsvAdapter, CsvHead, DEFAULT_CLOSE_COLUMN, DEFAULT_TIMESTAMP_COLUMN,
};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{
    self as backtest_engine, BacktestConfig, BacktestResult, DEFAULT_INITIAL_CASH,
    DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW, DegeneratePricePolicy,
};
use crate::domain::config_validation::{parse_window, validate_config};
use crate::domain::error::CrossoverError;
use crate::domain::metrics::Metrics;
use crate::domain::price::PriceSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_PREVIEW_ROWS: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "crosstrader", about = "Moving-average crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a crossover backtest
    Backtest {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Price CSV; overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        short_window: Option<NonZeroUsize>,
        #[arg(long)]
        long_window: Option<NonZeroUsize>,
        #[arg(long)]
        initial_cash: Option<f64>,
        /// Write every computed series to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Replay through non-positive closes instead of aborting
        #[arg(long)]
        propagate_degenerate: bool,
    },
    /// Show the first rows of a price file
    Preview {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
        rows: usize,
        #[arg(long, default_value = DEFAULT_TIMESTAMP_COLUMN)]
        timestamp_column: String,
        #[arg(long, default_value = DEFAULT_CLOSE_COLUMN)]
        close_column: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Values given on the command line; each one wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data: Option<PathBuf>,
    pub short_window: Option<NonZeroUsize>,
    pub long_window: Option<NonZeroUsize>,
    pub initial_cash: Option<f64>,
    pub output: Option<PathBuf>,
    pub propagate_degenerate: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            short_window,
            long_window,
            initial_cash,
            output,
            propagate_degenerate,
        } => {
            let overrides = Overrides {
                data,
                short_window,
                long_window,
                initial_cash,
                output,
                propagate_degenerate,
            };
            run_backtest(config.as_ref(), &overrides)
        }
        Command::Preview {
            data,
            rows,
            timestamp_column,
            close_column,
        } => run_preview(&data, rows, &timestamp_column, &close_column),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = CrossoverError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest(config_path: Option<&PathBuf>, overrides: &Overrides) -> ExitCode {
    // Stage 1: Load and validate config
    let adapter = match config_path {
        Some(path) => {
            log::info!("loading config from {}", path.display());
            match load_config(path) {
                Ok(a) => a,
                Err(code) => return code,
            }
        }
        None => FileConfigAdapter::empty(),
    };

    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 2: Resolve parameters
    let bt_config = match build_backtest_config(&adapter, overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data_port = match build_data_adapter(&adapter, overrides.data.as_deref()) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let output = overrides.output.clone().or_else(|| {
        adapter
            .get_string("report", "output")
            .map(PathBuf::from)
    });
    let preview_rows = resolve_preview_rows(&adapter);

    // Stages 3-6: Data port dependent pipeline
    run_backtest_pipeline(
        &data_port,
        &bt_config,
        output.as_deref(),
        preview_rows,
    )
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<BacktestConfig, CrossoverError> {
    let short_window = match overrides.short_window {
        Some(w) => w,
        None => window_or_default(adapter, "short_window", DEFAULT_SHORT_WINDOW)?,
    };
    let long_window = match overrides.long_window {
        Some(w) => w,
        None => window_or_default(adapter, "long_window", DEFAULT_LONG_WINDOW)?,
    };

    let initial_cash = overrides.initial_cash.unwrap_or_else(|| {
        adapter.get_double("backtest", "initial_cash", DEFAULT_INITIAL_CASH)
    });
    if !initial_cash.is_finite() || initial_cash < 0.0 {
        return Err(CrossoverError::ConfigInvalid {
            section: "backtest".into(),
            key: "initial_cash".into(),
            reason: "initial_cash must be a finite non-negative number".into(),
        });
    }

    let degenerate_prices = if overrides.propagate_degenerate {
        DegeneratePricePolicy::Propagate
    } else {
        match adapter.get_string("backtest", "degenerate_prices") {
            Some(raw) => raw
                .parse::<DegeneratePricePolicy>()
                .map_err(|reason| CrossoverError::ConfigInvalid {
                    section: "backtest".into(),
                    key: "degenerate_prices".into(),
                    reason,
                })?,
            None => DegeneratePricePolicy::default(),
        }
    };

    if short_window >= long_window {
        log::warn!(
            "short window {} is not shorter than long window {}",
            short_window,
            long_window
        );
    }

    Ok(BacktestConfig {
        short_window,
        long_window,
        initial_cash,
        degenerate_prices,
    })
}

fn window_or_default(
    adapter: &dyn ConfigPort,
    key: &str,
    default: usize,
) -> Result<NonZeroUsize, CrossoverError> {
    let value = parse_window(adapter, key)?.unwrap_or(default);
    NonZeroUsize::new(value).ok_or_else(|| CrossoverError::ConfigInvalid {
        section: "strategy".into(),
        key: key.into(),
        reason: format!("{} must be a positive integer", key),
    })
}

pub fn build_data_adapter(
    adapter: &dyn ConfigPort,
    data_override: Option<&Path>,
) -> Result<CsvAdapter, CrossoverError> {
    let path = match data_override {
        Some(p) => p.to_path_buf(),
        None => adapter
            .get_string("data", "path")
            .map(PathBuf::from)
            .ok_or_else(|| CrossoverError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?,
    };
    let timestamp_column = adapter
        .get_string("data", "timestamp_column")
        .unwrap_or_else(|| DEFAULT_TIMESTAMP_COLUMN.to_string());
    let close_column = adapter
        .get_string("data", "close_column")
        .unwrap_or_else(|| DEFAULT_CLOSE_COLUMN.to_string());

    Ok(CsvAdapter::new(path, &timestamp_column, &close_column))
}

fn resolve_preview_rows(adapter: &dyn ConfigPort) -> usize {
    let rows = adapter.get_int("report", "preview_rows", DEFAULT_PREVIEW_ROWS as i64);
    usize::try_from(rows).unwrap_or(DEFAULT_PREVIEW_ROWS)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    bt_config: &BacktestConfig,
    output_path: Option<&Path>,
    preview_rows: usize,
) -> ExitCode {
    // Stage 3: Load prices
    let prices = match data_port.load_prices() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let (Some(first), Some(last)) = (prices.first(), prices.last()) {
        log::info!(
            "loaded {} prices, {} to {}",
            prices.len(),
            first.timestamp,
            last.timestamp
        );
    }

    // Stage 4: Generate signals and replay
    log::info!(
        "running backtest: SMA({}) / SMA({}), initial cash {:.2}, degenerate prices: {}",
        bt_config.short_window,
        bt_config.long_window,
        bt_config.initial_cash,
        bt_config.degenerate_prices
    );
    let result = match backtest_engine::run_backtest(&prices, bt_config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 5: Print strategy table and summary
    let metrics = Metrics::compute(&result.portfolio);
    if preview_rows > 0 {
        eprintln!("\n=== Strategy Signals (last {} rows) ===", preview_rows);
        eprint!("{}", format_signal_table(&prices, &result, preview_rows));
    }
    eprint!("\n{}", format_summary(&result, &metrics));

    // Stage 6: Export series
    if let Some(path) = output_path {
        let path_str = path.display().to_string();
        if let Err(e) = CsvReportAdapter::new().write(&prices, &result, &path_str) {
            eprintln!("error: failed to write report: {e}");
            return (&e).into();
        }
        eprintln!("\nSeries written to: {}", path_str);
    }

    ExitCode::SUCCESS
}

/// Tail of the strategy table: timestamp, close, both averages and signal.
pub fn format_signal_table(prices: &PriceSeries, result: &BacktestResult, rows: usize) -> String {
    let signals = &result.signals;
    let start = prices.len().saturating_sub(rows);
    let short_label = signals.short_ma.to_string();
    let long_label = signals.long_ma.to_string();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:>14} {:>14} {:>14} {:>6}",
        "timestamp", "close", short_label, long_label, "signal"
    );
    for (i, price) in prices.iter().enumerate().skip(start) {
        let _ = writeln!(
            out,
            "{:<20} {:>14.4} {:>14} {:>14} {:>6}",
            price.timestamp.format("%Y-%m-%d %H:%M:%S"),
            price.close,
            format_optional(signals.short_ma.get(i)),
            format_optional(signals.long_ma.get(i)),
            signals.signals[i].as_i8()
        );
    }
    out
}

pub fn format_summary(result: &BacktestResult, metrics: &Metrics) -> String {
    let signals = &result.signals;
    let mut out = String::new();
    let _ = writeln!(out, "=== Results ===");
    let _ = writeln!(out, "Initial Cash:          ${:.2}", metrics.initial_cash);
    let _ = writeln!(out, "Final Portfolio Value: ${:.2}", metrics.final_value);
    let _ = writeln!(out, "Total Return:          {:.2}%", metrics.total_return_pct());
    let _ = writeln!(out, "Max Drawdown:          -{:.1}%", metrics.max_drawdown * 100.0);
    let _ = writeln!(out, "Fills:                 {}", metrics.total_fills);
    let _ = writeln!(
        out,
        "Round Trips:           {} ({:.1}% winning)",
        metrics.round_trips,
        metrics.win_rate() * 100.0
    );
    let _ = writeln!(out, "Exposure:              {:.1}%", metrics.exposure * 100.0);
    let _ = writeln!(
        out,
        "Buy Bars:              {} of {}",
        signals.buy_count(),
        signals.len()
    );
    if let Some(last) = signals.signals.last() {
        let _ = writeln!(out, "Last Signal:           {}", last);
    }
    if metrics.non_finite_points > 0 {
        let _ = writeln!(
            out,
            "warning: {} portfolio values are not finite (degenerate prices)",
            metrics.non_finite_points
        );
    }
    out
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "NaN".to_string(),
    }
}

pub fn run_preview(
    data_path: &Path,
    rows: usize,
    timestamp_column: &str,
    close_column: &str,
) -> ExitCode {
    let adapter = CsvAdapter::new(data_path.to_path_buf(), timestamp_column, close_column);
    let prices = match adapter.load_prices() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let head = match adapter.head(rows) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print!("{}", format_preview(&head, &prices));
    ExitCode::SUCCESS
}

/// Leading rows with every column of the file, then the series size and
/// time range.
pub fn format_preview(head: &CsvHead, prices: &PriceSeries) -> String {
    let mut widths: Vec<usize> = head.headers.iter().map(|h| h.len()).collect();
    for row in &head.rows {
        for (i, field) in row.iter().enumerate() {
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(field.len()),
                None => widths.push(field.len()),
            }
        }
    }

    let mut out = String::new();
    for fields in std::iter::once(&head.headers).chain(&head.rows) {
        let line: Vec<String> = fields
            .iter()
            .zip(&widths)
            .map(|(field, width)| format!("{:<width$}", field, width = *width))
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    }
    if let (Some(first), Some(last)) = (prices.first(), prices.last()) {
        let _ = writeln!(
            out,
            "{} rows, {} to {}",
            prices.len(),
            first.timestamp,
            last.timestamp
        );
    }
    out
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let bt_config = match build_backtest_config(&adapter, &Overrides::default()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nStrategy:");
    eprintln!("  short window:      {}", bt_config.short_window);
    eprintln!("  long window:       {}", bt_config.long_window);
    eprintln!("  initial cash:      {:.2}", bt_config.initial_cash);
    eprintln!("  degenerate prices: {}", bt_config.degenerate_prices);

    match adapter.get_string("data", "path") {
        Some(path) => eprintln!("  data:              {}", path),
        None => eprintln!("  data:              (none, pass --data)"),
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
