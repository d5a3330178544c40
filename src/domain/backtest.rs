//! Backtest orchestration: signal generation followed by portfolio replay.
//!
//! BacktestConfig carries the parameters the dashboard used to hold as
//! global slider state.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use super::error::CrossoverError;
use super::portfolio::{PortfolioValueSeries, simulate};
use super::price::PriceSeries;
use super::signal::{CrossoverSignals, generate};

pub const DEFAULT_SHORT_WINDOW: usize = 10;
pub const DEFAULT_LONG_WINDOW: usize = 100;
pub const DEFAULT_INITIAL_CASH: f64 = 10_000.0;

/// What to do with closes that cannot size a position (`close <= 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegeneratePricePolicy {
    /// Fail before replay at the first non-positive close.
    #[default]
    Abort,
    /// Replay anyway and let non-finite values reach the output.
    Propagate,
}

impl DegeneratePricePolicy {
    pub fn check(self, prices: &PriceSeries) -> Result<(), CrossoverError> {
        if self == DegeneratePricePolicy::Propagate {
            return Ok(());
        }
        match prices.iter().position(|p| p.close <= 0.0) {
            Some(index) => {
                let point = prices.points()[index];
                Err(CrossoverError::DegeneratePrice {
                    index,
                    timestamp: point.timestamp,
                    close: point.close,
                })
            }
            None => Ok(()),
        }
    }
}

impl FromStr for DegeneratePricePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(DegeneratePricePolicy::Abort),
            "propagate" => Ok(DegeneratePricePolicy::Propagate),
            other => Err(format!(
                "unknown policy '{}', expected 'abort' or 'propagate'",
                other
            )),
        }
    }
}

impl fmt::Display for DegeneratePricePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegeneratePricePolicy::Abort => write!(f, "abort"),
            DegeneratePricePolicy::Propagate => write!(f, "propagate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub short_window: NonZeroUsize,
    pub long_window: NonZeroUsize,
    pub initial_cash: f64,
    pub degenerate_prices: DegeneratePricePolicy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            short_window: NonZeroUsize::new(DEFAULT_SHORT_WINDOW).unwrap_or(NonZeroUsize::MIN),
            long_window: NonZeroUsize::new(DEFAULT_LONG_WINDOW).unwrap_or(NonZeroUsize::MIN),
            initial_cash: DEFAULT_INITIAL_CASH,
            degenerate_prices: DegeneratePricePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub signals: CrossoverSignals,
    pub portfolio: PortfolioValueSeries,
}

pub fn run_backtest(
    prices: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, CrossoverError> {
    config.degenerate_prices.check(prices)?;

    log::debug!(
        "generating signals: SMA({}) vs SMA({}) over {} points",
        config.short_window,
        config.long_window,
        prices.len()
    );
    let signals = generate(prices, config.short_window, config.long_window);

    log::debug!("replaying portfolio from {:.2}", config.initial_cash);
    let portfolio = simulate(prices, &signals.signals, config.initial_cash)?;

    Ok(BacktestResult { signals, portfolio })
}
