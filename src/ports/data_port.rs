//! Price data access port trait.

use crate::domain::error::CrossoverError;
use crate::domain::price::PriceSeries;

pub trait DataPort {
    /// Load the full close-price series in ascending timestamp order.
    fn load_prices(&self) -> Result<PriceSeries, CrossoverError>;
}
