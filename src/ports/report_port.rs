//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CrossoverError;
use crate::domain::price::PriceSeries;

/// Port for exporting the computed series of a backtest run.
pub trait ReportPort {
    fn write(
        &self,
        prices: &PriceSeries,
        result: &BacktestResult,
        output_path: &str,
    ) -> Result<(), CrossoverError>;
}
