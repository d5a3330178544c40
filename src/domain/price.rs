//! Close-price time series.
//!
//! A [`PriceSeries`] is the only input of the engine. Its timestamps are
//! unique and strictly increasing; construction fails otherwise, so every
//! consumer can rely on positional order being time order.

use chrono::NaiveDateTime;

use super::error::CrossoverError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting any timestamp that does not strictly follow
    /// its predecessor. `row` in the error is the 0-based position.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, CrossoverError> {
        for (i, pair) in points.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(CrossoverError::NonIncreasingTimestamp {
                    row: i + 1,
                    timestamp: pair[1].timestamp,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PricePoint> {
        self.points.get(index)
    }

    /// Position of `timestamp` in the series, if present.
    pub fn index_of(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.points
            .binary_search_by(|p| p.timestamp.cmp(&timestamp))
            .ok()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.points.iter()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

impl<'a> IntoIterator for &'a PriceSeries {
    type Item = &'a PricePoint;
    type IntoIter = std::slice::Iter<'a, PricePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
