use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config<'a> {
	#[serde(borrow)]
	pub tlsrpt: ReportConfig<'a>,

	#[serde(borrow)]
	pub log: LogConfig<'a>
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReportConfig<'a> {
	/// Directory holding one raw message per file.
	pub maildir: &'a str,
	/// authserv-id that must open the last Authentication-Results header.
	pub trusted_identifier: &'a str,
	pub retention_days: u32,
	/// Seconds between passes; 0 runs a single pass.
	pub interval_secs: u64,
	pub remove_expired: bool
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogConfig<'a> {
	pub level: &'a str
}

pub const DEFAULT: Config = Config{
	tlsrpt: ReportConfig{
		maildir: "maildir",
		trusted_identifier: "example.com",
		retention_days: 7,
		interval_secs: 60,
		remove_expired: true
	},
	log: LogConfig{
		level: "info"
	}
};

impl ReportConfig<'_> {
	pub fn retention_window(&self) -> Duration {
		Duration::days(i64::from(self.retention_days))
	}

	pub fn interval(&self) -> Option<StdDuration> {
		match self.interval_secs {
			0 => None,
			secs => Some(StdDuration::from_secs(secs)),
		}
	}
}

/// Reads the config file text, writing the defaults first if it does not exist.
///
/// The flag is set when the default file was just created.
pub fn read_or_create(config_path: &Path) -> Result<(String, bool), Box<dyn Error>> {
	let created = !config_path.exists();
	if created {
		fs::write(config_path, toml::to_string(&DEFAULT)?)?;
	}

	Ok((fs::read_to_string(config_path)?, created))
}

pub fn parse(config_text: &str) -> Result<Config<'_>, toml::de::Error> {
	toml::from_str(config_text)
}
