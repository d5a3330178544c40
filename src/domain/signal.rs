//! Moving-average crossover signal generation.
//!
//! # Signal Rule
//!
//! At every index the signal is `Buy` when the short average is strictly
//! above the long average, and `SellOrFlat` otherwise. "Otherwise" includes:
//! - equal averages (ties never buy)
//! - an undefined short average (warmup)
//! - an undefined long average (warmup)
//!
//! The rule lives in [`crossover_signal`] and never relies on NaN comparison
//! semantics.

use std::fmt;
use std::num::NonZeroUsize;

use crate::domain::indicator::MovingAverage;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::price::PriceSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    SellOrFlat,
}

impl Signal {
    /// Numeric column encoding: `1` for buy, `-1` for sell/flat.
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::SellOrFlat => -1,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::SellOrFlat => write!(f, "SELL"),
        }
    }
}

/// Output of [`generate`]: both averages and the signal, all aligned with
/// the input series.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossoverSignals {
    pub short_ma: MovingAverage,
    pub long_ma: MovingAverage,
    pub signals: Vec<Signal>,
}

impl CrossoverSignals {
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn buy_count(&self) -> usize {
        self.signals.iter().filter(|s| **s == Signal::Buy).count()
    }
}

pub fn crossover_signal(short: Option<f64>, long: Option<f64>) -> Signal {
    match (short, long) {
        (Some(s), Some(l)) if s > l => Signal::Buy,
        _ => Signal::SellOrFlat,
    }
}

pub fn generate(
    prices: &PriceSeries,
    short_window: NonZeroUsize,
    long_window: NonZeroUsize,
) -> CrossoverSignals {
    let closes = prices.closes();
    let short_ma = calculate_sma(&closes, short_window);
    let long_ma = calculate_sma(&closes, long_window);

    let signals = short_ma
        .values
        .iter()
        .zip(&long_ma.values)
        .map(|(&s, &l)| crossover_signal(s, l))
        .collect();

    CrossoverSignals {
        short_ma,
        long_ma,
        signals,
    }
}
