//! Logger initialization.

use std::str::FromStr;

use log::{LevelFilter, SetLoggerError};

/// Initializes `env_logger` at the configured level.
///
/// `RUST_LOG` is read first so per-module filters still apply, e.g.
/// `RUST_LOG=herald_tlsrpt::message=debug`. An unrecognised level falls back
/// to `info`.
pub fn init(level: &str) -> Result<(), SetLoggerError> {
	let level = parse_level(level);

	let mut builder = env_logger::Builder::new();
	builder.filter_level(level);
	builder.filter_module("mailparse", LevelFilter::Warn);
	builder.parse_default_env();
	builder.try_init()
}

fn parse_level(level: &str) -> LevelFilter {
	LevelFilter::from_str(level).unwrap_or(LevelFilter::Info)
}
