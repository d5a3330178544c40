//! Moving-average indicator types.
//!
//! A [`MovingAverage`] is aligned index-for-index with the price series it
//! was computed from. Warmup positions hold `None` rather than a sentinel.

pub mod sma;

use std::fmt;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverage {
    pub window: NonZeroUsize,
    pub values: Vec<Option<f64>>,
}

impl MovingAverage {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`; `None` both for warmup and out-of-range positions.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

impl fmt::Display for MovingAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SMA({})", self.window)
    }
}
