//! CSV price data adapter.
//!
//! Reads a headered CSV, picks the timestamp and close columns by name and
//! ignores the rest. Row numbers in errors are 1-based data rows (the
//! header is not counted).

use crate::domain::error::CrossoverError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

pub const DEFAULT_TIMESTAMP_COLUMN: &str = "open_time";
pub const DEFAULT_CLOSE_COLUMN: &str = "close";

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// The header and leading records of a CSV file, every column as written.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvHead {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug)]
pub struct CsvAdapter {
    path: PathBuf,
    timestamp_column: String,
    close_column: String,
}

impl CsvAdapter {
    pub fn new(path: PathBuf, timestamp_column: &str, close_column: &str) -> Self {
        Self {
            path,
            timestamp_column: timestamp_column.to_string(),
            close_column: close_column.to_string(),
        }
    }

    pub fn with_default_columns(path: PathBuf) -> Self {
        Self::new(path, DEFAULT_TIMESTAMP_COLUMN, DEFAULT_CLOSE_COLUMN)
    }

    /// Parse a price series from any reader using this adapter's column names.
    pub fn read_from<R: Read>(&self, reader: R) -> Result<PriceSeries, CrossoverError> {
        let mut rdr = csv::Reader::from_reader(reader);

        let headers = rdr.headers().map_err(|e| CrossoverError::Data {
            reason: format!("CSV header error: {}", e),
        })?;
        let ts_idx = column_index(headers, &self.timestamp_column)?;
        let close_idx = column_index(headers, &self.close_column)?;

        let mut points = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let row = i + 1;
            let record = result.map_err(|e| CrossoverError::Data {
                reason: format!("CSV parse error at row {}: {}", row, e),
            })?;

            let ts_str = record.get(ts_idx).unwrap_or_default().trim();
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| {
                CrossoverError::InvalidTimestamp {
                    row,
                    value: ts_str.to_string(),
                }
            })?;

            let close_str = record.get(close_idx).unwrap_or_default().trim();
            let close = close_str
                .parse::<f64>()
                .ok()
                .filter(|c| c.is_finite())
                .ok_or_else(|| CrossoverError::InvalidPrice {
                    row,
                    value: close_str.to_string(),
                })?;

            points.push(PricePoint { timestamp, close });
        }

        if points.is_empty() {
            return Err(CrossoverError::EmptyData);
        }

        log::debug!("parsed {} price rows", points.len());
        PriceSeries::new(points).map_err(|e| match e {
            // series positions are 0-based; report data rows like the parser does
            CrossoverError::NonIncreasingTimestamp { row, timestamp } => {
                CrossoverError::NonIncreasingTimestamp {
                    row: row + 1,
                    timestamp,
                }
            }
            other => other,
        })
    }
}

impl CsvAdapter {
    /// Raw header and first `rows` records of the file, without parsing
    /// any field.
    pub fn head(&self, rows: usize) -> Result<CsvHead, CrossoverError> {
        let file = File::open(&self.path).map_err(|e| CrossoverError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        Self::head_from(file, rows)
    }

    pub fn head_from<R: Read>(reader: R, rows: usize) -> Result<CsvHead, CrossoverError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| CrossoverError::Data {
                reason: format!("CSV header error: {}", e),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut head = Vec::with_capacity(rows);
        for (i, result) in rdr.records().take(rows).enumerate() {
            let record = result.map_err(|e| CrossoverError::Data {
                reason: format!("CSV parse error at row {}: {}", i + 1, e),
            })?;
            head.push(record.iter().map(|f| f.trim().to_string()).collect());
        }

        Ok(CsvHead {
            headers,
            rows: head,
        })
    }
}

impl DataPort for CsvAdapter {
    fn load_prices(&self) -> Result<PriceSeries, CrossoverError> {
        log::info!("loading prices from {}", self.path.display());
        let file = File::open(&self.path).map_err(|e| CrossoverError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        self.read_from(file)
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, CrossoverError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| CrossoverError::MissingColumn {
            column: name.to_string(),
        })
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM:SS[.f]`,
/// `YYYY-MM-DD`, or integer epoch milliseconds. Offsets are normalised to UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(millis) = value.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc());
    }
    None
}
