//! Simple Moving Average.
//!
//! SMA(n)[i] = (C[i-n+1] + ... + C[i]) / n
//! Warmup: first (n-1) positions are undefined.
//!
//! Each defined value is summed from its own window rather than carried as a
//! running total, so a value never depends on anything outside its `n` closes.

use std::num::NonZeroUsize;

use super::MovingAverage;

pub fn calculate_sma(closes: &[f64], window: NonZeroUsize) -> MovingAverage {
    let n = window.get();
    let divisor = n as f64;

    let values = (0..closes.len())
        .map(|i| {
            if i + 1 < n {
                None
            } else {
                let start = i + 1 - n;
                Some(closes[start..=i].iter().sum::<f64>() / divisor)
            }
        })
        .collect();

    MovingAverage { window, values }
}
