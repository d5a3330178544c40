use clap::Parser;
use crosstrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    env_logger::Builder::new()
        .filter(None, log::LevelFilter::Warn)
        .filter(Some("crosstrader"), log::LevelFilter::Info)
        .parse_default_env()
        .init();

    run(Cli::parse())
}
