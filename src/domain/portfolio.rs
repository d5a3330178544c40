//! All-in/all-out portfolio replay.
//!
//! The simulator threads a single [`PortfolioState`] through the series in
//! ascending index order. Each step depends on the state left by every
//! earlier step, so the replay is a strict sequential fold.

use chrono::NaiveDateTime;

use super::error::CrossoverError;
use super::price::PriceSeries;
use super::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub position_units: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl PortfolioState {
    pub fn new(initial_cash: f64) -> Self {
        PortfolioState {
            cash: initial_cash,
            position_units: 0.0,
        }
    }

    /// Apply one index's signal at `close`. Returns the side executed, or
    /// `None` when the signal matches the current exposure.
    ///
    /// A non-positive `close` is not guarded: the division result (infinite
    /// or NaN units) is carried forward as-is.
    pub fn apply(&mut self, signal: Signal, close: f64) -> Option<Side> {
        match signal {
            Signal::Buy if self.cash > 0.0 => {
                self.position_units = self.cash / close;
                self.cash = 0.0;
                Some(Side::Buy)
            }
            Signal::SellOrFlat if self.is_invested() => {
                self.cash = self.position_units * close;
                self.position_units = 0.0;
                Some(Side::Sell)
            }
            _ => None,
        }
    }

    pub fn value(&self, close: f64) -> f64 {
        self.cash + self.position_units * close
    }

    pub fn is_invested(&self) -> bool {
        self.position_units > 0.0
    }
}

/// An executed switch between cash and the asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub side: Side,
    pub price: f64,
    pub units: f64,
    /// Cash spent (buy) or received (sell).
    pub notional: f64,
}

/// Portfolio state recorded after processing one index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub cash: f64,
    pub position_units: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioValueSeries {
    pub initial_cash: f64,
    pub points: Vec<ValuePoint>,
    pub fills: Vec<Fill>,
}

impl PortfolioValueSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Ending portfolio value, or `None` for an empty series.
    pub fn final_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }
}

pub fn simulate(
    prices: &PriceSeries,
    signals: &[Signal],
    initial_cash: f64,
) -> Result<PortfolioValueSeries, CrossoverError> {
    if prices.len() != signals.len() {
        return Err(CrossoverError::LengthMismatch {
            prices: prices.len(),
            signals: signals.len(),
        });
    }
    if !initial_cash.is_finite() || initial_cash < 0.0 {
        return Err(CrossoverError::InvalidInitialCash {
            value: initial_cash,
        });
    }

    let mut state = PortfolioState::new(initial_cash);
    let mut points = Vec::with_capacity(prices.len());
    let mut fills = Vec::new();

    for (index, (price, &signal)) in prices.iter().zip(signals).enumerate() {
        let before = state;
        if let Some(side) = state.apply(signal, price.close) {
            let (units, notional) = match side {
                Side::Buy => (state.position_units, before.cash),
                Side::Sell => (before.position_units, state.cash),
            };
            log::trace!(
                "{} {:?} {} units at {}",
                price.timestamp,
                side,
                units,
                price.close
            );
            fills.push(Fill {
                index,
                timestamp: price.timestamp,
                side,
                price: price.close,
                units,
                notional,
            });
        }

        points.push(ValuePoint {
            timestamp: price.timestamp,
            close: price.close,
            cash: state.cash,
            position_units: state.position_units,
            value: state.value(price.close),
        });
    }

    Ok(PortfolioValueSeries {
        initial_cash,
        points,
        fills,
    })
}
