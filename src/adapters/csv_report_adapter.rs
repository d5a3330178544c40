//! CSV export of every computed series, one row per price point.
//!
//! Columns: `timestamp, close, ma_short, ma_long, signal, cash,
//! position_units, portfolio_value`. Undefined averages are empty fields;
//! the signal uses the `1` / `-1` encoding.

use std::fs::File;
use std::io::Write;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CrossoverError;
use crate::domain::price::PriceSeries;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_to<W: Write>(
        &self,
        writer: W,
        prices: &PriceSeries,
        result: &BacktestResult,
    ) -> Result<(), CrossoverError> {
        let signals = &result.signals;
        let points = &result.portfolio.points;
        if signals.len() != prices.len() {
            return Err(CrossoverError::LengthMismatch {
                prices: prices.len(),
                signals: signals.len(),
            });
        }
        if points.len() != prices.len() {
            return Err(CrossoverError::ValueLengthMismatch {
                prices: prices.len(),
                points: points.len(),
            });
        }

        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record([
            "timestamp",
            "close",
            "ma_short",
            "ma_long",
            "signal",
            "cash",
            "position_units",
            "portfolio_value",
        ])
        .map_err(csv_error)?;

        for (i, price) in prices.iter().enumerate() {
            let point = &points[i];
            wtr.write_record([
                price.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                price.close.to_string(),
                format_optional(signals.short_ma.get(i)),
                format_optional(signals.long_ma.get(i)),
                signals.signals[i].as_i8().to_string(),
                point.cash.to_string(),
                point.position_units.to_string(),
                point.value.to_string(),
            ])
            .map_err(csv_error)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        prices: &PriceSeries,
        result: &BacktestResult,
        output_path: &str,
    ) -> Result<(), CrossoverError> {
        let file = File::create(output_path)?;
        self.write_to(file, prices, result)?;
        log::info!("wrote {} rows to {}", prices.len(), output_path);
        Ok(())
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_error(e: csv::Error) -> CrossoverError {
    CrossoverError::Data {
        reason: format!("CSV write error: {}", e),
    }
}
