use std::path::PathBuf;
use std::str::FromStr;
use clap::Parser;
use log::{info, LevelFilter};
use msgbox::IconType;
use band_data_recorder::{init_logging, run};
use band_data_recorder::error::{error_msgbox, AppRunError, ConfigError};

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Connects to a Bluetooth wearable and records its sensors", long_about = None)]
struct Args {
    /// Path to the config file. By default <executable>.json is used if it exists, otherwise a
    /// file in the config directory of the OS.
    #[arg(long)]
    config: Option<PathBuf>,

    /// One of: off, error, warn, info, debug, trace
    #[arg(long, default_value = "info", value_parser = parse_level_filter)]
    log_level: LevelFilter,
}

fn parse_level_filter(value: &str) -> Result<LevelFilter, String> {
    LevelFilter::from_str(value).map_err(|_| format!("invalid log level: {}", value))
}

fn main() -> Result<(), AppRunError> {
    let args = Args::parse();

    if let Err(err) = init_logging(args.log_level) {
        eprintln!("Failed to initialize logger: {}", err);
    }
    info!(concat!("Band Data Recorder ", env!("CARGO_PKG_VERSION")));

    match run(args.config) {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            if let Err(err) = msgbox::create(
                concat!("Band Data Recorder ", env!("CARGO_PKG_VERSION")),
                "This application has already been started",
                IconType::Error,
            ) {
                eprintln!("Failed to create msgbox: {:?}", err);
            }
            Ok(())
        },
        Err(err) => {
            error_msgbox("Unexpected error", &err);
            Err(err)
        }
        Ok(_) => Ok(())
    }
}
