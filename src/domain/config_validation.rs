//! Configuration validation.
//!
//! Checks every config field the backtest reads before any data is loaded.
//! Absent keys are fine (defaults apply); present keys must be well-formed.

use crate::domain::backtest::DegeneratePricePolicy;
use crate::domain::error::CrossoverError;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), CrossoverError> {
    validate_columns(config)?;
    validate_window(config, "short_window")?;
    validate_window(config, "long_window")?;
    validate_initial_cash(config)?;
    validate_degenerate_policy(config)?;
    validate_preview_rows(config)?;
    Ok(())
}

/// Parse a `[strategy]` window as a positive integer. `Ok(None)` when absent.
pub fn parse_window(config: &dyn ConfigPort, key: &str) -> Result<Option<usize>, CrossoverError> {
    let Some(raw) = config.get_string("strategy", key) else {
        return Ok(None);
    };
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(Some(n)),
        _ => Err(CrossoverError::ConfigInvalid {
            section: "strategy".to_string(),
            key: key.to_string(),
            reason: format!("{} must be a positive integer, got '{}'", key, raw),
        }),
    }
}

fn validate_window(config: &dyn ConfigPort, key: &str) -> Result<(), CrossoverError> {
    parse_window(config, key).map(|_| ())
}

fn validate_columns(config: &dyn ConfigPort) -> Result<(), CrossoverError> {
    for key in ["timestamp_column", "close_column"] {
        if config.has_key("data", key) && config.get_string("data", key).is_none() {
            return Err(CrossoverError::ConfigInvalid {
                section: "data".to_string(),
                key: key.to_string(),
                reason: "column name must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), CrossoverError> {
    let Some(raw) = config.get_string("backtest", "initial_cash") else {
        return Ok(());
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(()),
        _ => Err(CrossoverError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_cash".to_string(),
            reason: "initial_cash must be a finite non-negative number".to_string(),
        }),
    }
}

fn validate_degenerate_policy(config: &dyn ConfigPort) -> Result<(), CrossoverError> {
    match config.get_string("backtest", "degenerate_prices") {
        None => Ok(()),
        Some(raw) => raw
            .parse::<DegeneratePricePolicy>()
            .map(|_| ())
            .map_err(|reason| CrossoverError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "degenerate_prices".to_string(),
                reason,
            }),
    }
}

fn validate_preview_rows(config: &dyn ConfigPort) -> Result<(), CrossoverError> {
    let Some(raw) = config.get_string("report", "preview_rows") else {
        return Ok(());
    };
    if raw.parse::<usize>().is_err() {
        return Err(CrossoverError::ConfigInvalid {
            section: "report".to_string(),
            key: "preview_rows".to_string(),
            reason: "preview_rows must be a non-negative integer".to_string(),
        });
    }
    Ok(())
}
