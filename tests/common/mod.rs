#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use crosstrader::domain::backtest::{BacktestConfig, DegeneratePricePolicy};
use crosstrader::domain::error::CrossoverError;
pub use crosstrader::domain::price::{PricePoint, PriceSeries};
use crosstrader::ports::data_port::DataPort;
use std::num::NonZeroUsize;

pub struct MockDataPort {
    pub closes: Vec<f64>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(closes: &[f64]) -> Self {
        Self {
            closes: closes.to_vec(),
            error: None,
        }
    }

    pub fn with_error(reason: &str) -> Self {
        Self {
            closes: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn load_prices(&self) -> Result<PriceSeries, CrossoverError> {
        if let Some(reason) = &self.error {
            return Err(CrossoverError::Data {
                reason: reason.clone(),
            });
        }
        Ok(make_series(&self.closes))
    }
}

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// One close per minute starting at 2024-01-01 00:00.
pub fn make_series(closes: &[f64]) -> PriceSeries {
    PriceSeries::new(
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                timestamp: start_time() + Duration::minutes(i as i64),
                close,
            })
            .collect(),
    )
    .unwrap()
}

pub fn window(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

pub fn make_config(short: usize, long: usize, initial_cash: f64) -> BacktestConfig {
    BacktestConfig {
        short_window: window(short),
        long_window: window(long),
        initial_cash,
        degenerate_prices: DegeneratePricePolicy::Abort,
    }
}

/// Minute-bar CSV text with the default `open_time` / `close` columns.
pub fn price_csv(closes: &[f64]) -> String {
    let mut out = String::from("open_time,open,high,low,close,volume\n");
    for (i, close) in closes.iter().enumerate() {
        let ts = start_time() + Duration::minutes(i as i64);
        out.push_str(&format!(
            "{},{},{},{},{},100\n",
            ts.format("%Y-%m-%d %H:%M:%S"),
            close,
            close,
            close,
            close
        ));
    }
    out
}
