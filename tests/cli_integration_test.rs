//! CLI integration tests for the backtest command orchestration.
//!
//! Tests cover:
//! - Config resolution (build_backtest_config, build_data_adapter)
//! - Command-line overrides winning over the INI file
//! - Full pipeline against CSV files on disk, with and without export
//! - Exit codes for bad data and degenerate prices
//! - Table and summary formatting

mod common;

use common::*;
use crosstrader::adapters::csv_adapter::CsvAdapter;
use crosstrader::adapters::file_config_adapter::FileConfigAdapter;
use crosstrader::cli::{self, Cli, Command, Overrides};
use crosstrader::domain::backtest::{DegeneratePricePolicy, run_backtest};
use crosstrader::domain::error::CrossoverError;
use crosstrader::domain::metrics::Metrics;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[data]
path = data/BTCUSDT_minute_data.csv
timestamp_column = open_time
close_column = close

[strategy]
short_window = 5
long_window = 50

[backtest]
initial_cash = 25000
degenerate_prices = propagate

[report]
preview_rows = 3
"#;

mod config_loading {
    use super::*;

    #[test]
    fn build_backtest_config_from_ini() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_backtest_config(&adapter, &Overrides::default()).unwrap();

        assert_eq!(config.short_window.get(), 5);
        assert_eq!(config.long_window.get(), 50);
        assert!((config.initial_cash - 25_000.0).abs() < f64::EPSILON);
        assert_eq!(config.degenerate_prices, DegeneratePricePolicy::Propagate);
    }

    #[test]
    fn build_backtest_config_uses_defaults() {
        let adapter = FileConfigAdapter::empty();
        let config = cli::build_backtest_config(&adapter, &Overrides::default()).unwrap();

        assert_eq!(config.short_window.get(), 10);
        assert_eq!(config.long_window.get(), 100);
        assert!((config.initial_cash - 10_000.0).abs() < f64::EPSILON);
        assert_eq!(config.degenerate_prices, DegeneratePricePolicy::Abort);
    }

    #[test]
    fn overrides_win_over_ini() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let overrides = Overrides {
            short_window: Some(window(2)),
            long_window: Some(window(3)),
            initial_cash: Some(1.0),
            ..Overrides::default()
        };
        let config = cli::build_backtest_config(&adapter, &overrides).unwrap();

        assert_eq!(config.short_window.get(), 2);
        assert_eq!(config.long_window.get(), 3);
        assert!((config.initial_cash - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn propagate_flag_overrides_policy() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ndegenerate_prices = abort\n")
            .unwrap();
        let overrides = Overrides {
            propagate_degenerate: true,
            ..Overrides::default()
        };
        let config = cli::build_backtest_config(&adapter, &overrides).unwrap();
        assert_eq!(config.degenerate_prices, DegeneratePricePolicy::Propagate);
    }

    #[test]
    fn negative_cash_override_rejected() {
        let overrides = Overrides {
            initial_cash: Some(-5.0),
            ..Overrides::default()
        };
        let err = cli::build_backtest_config(&FileConfigAdapter::empty(), &overrides).unwrap_err();
        assert!(matches!(err, CrossoverError::ConfigInvalid { key, .. } if key == "initial_cash"));
    }

    #[test]
    fn zero_window_in_ini_rejected() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nlong_window = 0\n").unwrap();
        let err = cli::build_backtest_config(&adapter, &Overrides::default()).unwrap_err();
        assert!(matches!(err, CrossoverError::ConfigInvalid { key, .. } if key == "long_window"));
    }

    #[test]
    fn data_adapter_requires_path() {
        let err = cli::build_data_adapter(&FileConfigAdapter::empty(), None).unwrap_err();
        assert!(matches!(
            err,
            CrossoverError::ConfigMissing { section, key } if section == "data" && key == "path"
        ));
    }

    #[test]
    fn data_adapter_uses_configured_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, "time,last\n2024-01-01,5\n2024-01-02,6\n").unwrap();

        let ini = format!(
            "[data]\npath = {}\ntimestamp_column = time\nclose_column = last\n",
            path.display()
        );
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let data = cli::build_data_adapter(&adapter, None).unwrap();

        use crosstrader::ports::data_port::DataPort;
        assert_eq!(data.load_prices().unwrap().closes(), vec![5.0, 6.0]);
    }
}

mod pipeline {
    use super::*;

    fn write_prices(dir: &TempDir, closes: &[f64]) -> PathBuf {
        let path = dir.path().join("prices.csv");
        fs::write(&path, price_csv(closes)).unwrap();
        path
    }

    #[test]
    fn pipeline_writes_series_csv() {
        let dir = TempDir::new().unwrap();
        let data = write_prices(&dir, &[100.0, 110.0, 90.0, 120.0]);
        let output = dir.path().join("out.csv");

        let code = cli::run_backtest_pipeline(
            &CsvAdapter::with_default_columns(data),
            &make_config(1, 2, 1000.0),
            Some(output.as_path()),
            2,
        );
        assert_eq!(code, ExitCode::SUCCESS);

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("timestamp,close,ma_short,ma_long,signal"));
        assert!(lines[3].contains(",-1,"));
    }

    #[test]
    fn pipeline_without_output_succeeds() {
        let port = MockDataPort::new(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let code = cli::run_backtest_pipeline(&port, &make_config(2, 3, 100.0), None, 0);
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn pipeline_bad_data_exit_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, "open_time,close\nnot-a-time,1\n").unwrap();

        let code = cli::run_backtest_pipeline(
            &CsvAdapter::with_default_columns(path),
            &make_config(1, 2, 100.0),
            None,
            0,
        );
        assert_eq!(code, ExitCode::from(3));
    }

    #[test]
    fn pipeline_degenerate_price_aborts() {
        let port = MockDataPort::new(&[10.0, 0.0, 12.0]);
        let code = cli::run_backtest_pipeline(&port, &make_config(1, 2, 100.0), None, 0);
        assert_eq!(code, ExitCode::from(5));
    }

    #[test]
    fn pipeline_degenerate_price_propagates_when_asked() {
        let port = MockDataPort::new(&[10.0, 0.0, 12.0]);
        let mut config = make_config(1, 2, 100.0);
        config.degenerate_prices = DegeneratePricePolicy::Propagate;
        let code = cli::run_backtest_pipeline(&port, &config, None, 0);
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn run_backtest_command_with_config_file() {
        let dir = TempDir::new().unwrap();
        let data = write_prices(&dir, &[100.0, 110.0, 90.0, 120.0, 130.0]);
        let output = dir.path().join("series.csv");
        let ini = write_temp_ini(&format!(
            "[data]\npath = {}\n\n[strategy]\nshort_window = 1\nlong_window = 2\n\n[backtest]\ninitial_cash = 1000\n\n[report]\noutput = {}\n",
            data.display(),
            output.display()
        ));

        let cli_args = Cli {
            command: Command::Backtest {
                config: Some(ini.path().to_path_buf()),
                data: None,
                short_window: None,
                long_window: None,
                initial_cash: None,
                output: None,
                propagate_degenerate: false,
            },
        };
        assert_eq!(cli::run(cli_args), ExitCode::SUCCESS);
        assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 6);
    }

    #[test]
    fn run_backtest_command_missing_data_path() {
        let cli_args = Cli {
            command: Command::Backtest {
                config: None,
                data: None,
                short_window: None,
                long_window: None,
                initial_cash: None,
                output: None,
                propagate_degenerate: false,
            },
        };
        assert_eq!(cli::run(cli_args), ExitCode::from(2));
    }

    #[test]
    fn validate_command_rejects_bad_window() {
        let ini = write_temp_ini("[strategy]\nshort_window = zero\n");
        let cli_args = Cli {
            command: Command::Validate {
                config: ini.path().to_path_buf(),
            },
        };
        assert_eq!(cli::run(cli_args), ExitCode::from(2));
    }

    #[test]
    fn validate_command_rejects_blank_column() {
        let ini = write_temp_ini("[data]\npath = prices.csv\nclose_column =\n");
        let cli_args = Cli {
            command: Command::Validate {
                config: ini.path().to_path_buf(),
            },
        };
        assert_eq!(cli::run(cli_args), ExitCode::from(2));
    }

    #[test]
    fn validate_command_accepts_valid_ini() {
        let ini = write_temp_ini(VALID_INI);
        let cli_args = Cli {
            command: Command::Validate {
                config: ini.path().to_path_buf(),
            },
        };
        assert_eq!(cli::run(cli_args), ExitCode::SUCCESS);
    }

    #[test]
    fn preview_command_reads_file() {
        let dir = TempDir::new().unwrap();
        let data = write_prices(&dir, &[1.0, 2.0, 3.0]);
        let code = cli::run_preview(&data, 2, "open_time", "close");
        assert_eq!(code, ExitCode::SUCCESS);

        let code = cli::run_preview(&data, 2, "open_time", "price");
        assert_eq!(code, ExitCode::from(3));
    }
}

mod formatting {
    use super::*;

    #[test]
    fn signal_table_shows_tail() {
        let prices = make_series(&[100.0, 110.0, 90.0, 120.0]);
        let result = run_backtest(&prices, &make_config(1, 2, 1000.0)).unwrap();
        let table = cli::format_signal_table(&prices, &result, 2);

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("SMA(1)"));
        assert!(lines[0].contains("SMA(2)"));
        assert!(lines[1].starts_with("2024-01-01 00:02:00"));
        assert!(lines[1].trim_end().ends_with("-1"));
        assert!(lines[2].trim_end().ends_with('1'));
    }

    #[test]
    fn signal_table_marks_undefined_average() {
        let prices = make_series(&[100.0, 110.0]);
        let result = run_backtest(&prices, &make_config(1, 2, 1000.0)).unwrap();
        let table = cli::format_signal_table(&prices, &result, 5);
        let first_row = table.lines().nth(1).unwrap();
        assert!(first_row.contains("NaN"));
    }

    #[test]
    fn summary_reports_final_value_and_return() {
        let prices = make_series(&[100.0, 110.0, 90.0, 120.0]);
        let result = run_backtest(&prices, &make_config(1, 2, 1000.0)).unwrap();
        let summary = cli::format_summary(&result, &Metrics::compute(&result.portfolio));

        assert!(summary.contains("Final Portfolio Value: $818.18"));
        assert!(summary.contains("Total Return:          -18.18%"));
        assert!(summary.contains("Buy Bars:              2 of 4"));
        assert!(summary.contains("Last Signal:           BUY"));
        assert!(!summary.contains("warning"));
    }

    #[test]
    fn summary_last_signal_when_flat() {
        let prices = make_series(&[120.0, 110.0, 100.0]);
        let result = run_backtest(&prices, &make_config(1, 2, 1000.0)).unwrap();
        let summary = cli::format_summary(&result, &Metrics::compute(&result.portfolio));

        assert!(summary.contains("Buy Bars:              0 of 3"));
        assert!(summary.contains("Last Signal:           SELL"));
    }

    #[test]
    fn preview_lists_every_column_and_range() {
        let csv_text = price_csv(&[1.0, 2.0, 3.0]);
        let head = CsvAdapter::head_from(csv_text.as_bytes(), 2).unwrap();
        let prices = make_series(&[1.0, 2.0, 3.0]);
        let preview = cli::format_preview(&head, &prices);
        let lines: Vec<&str> = preview.lines().collect();

        assert_eq!(lines.len(), 4);
        let header: Vec<&str> = lines[0].split_whitespace().collect();
        assert_eq!(header, vec!["open_time", "open", "high", "low", "close", "volume"]);
        assert!(lines[1].starts_with("2024-01-01 00:00:00"));
        assert!(lines[1].ends_with("100"));
        assert_eq!(lines[3], "3 rows, 2024-01-01 00:00:00 to 2024-01-01 00:02:00");
    }
}
