use std::error::Error;
use std::path::Path;
use std::thread;

use chrono::Utc;
use log::{error, info};

use herald_tlsrpt::aggregate::{Aggregate, Published};
use herald_tlsrpt::{config, logger, maildir};

fn log_summary(aggregate: &Aggregate) {
	for (domain, submitters) in aggregate.domains() {
		for (submitter, result) in submitters {
			for (policy_type, statistics) in &result.statistics {
				let success = match statistics.success_percent() {
					Some(percent) => format!("{}%", percent),
					None => "no data".to_string(),
				};
				info!(
					"{} <- {} ({}): {} {} sessions, {} success, {} reports",
					domain, submitter, result.organization_name, policy_type,
					statistics.total_count(), success, result.num_reports
				);
			}
		}
	}
}

fn main() -> Result<(), Box<dyn Error>> {
	/*
	 * config parsing
	 */
	let config_path = Path::new("config.toml");
	let (config_text, created) = config::read_or_create(config_path)?;
	let config = config::parse(&config_text)?;

	logger::init(config.log.level)?;
	if created {
		info!("Could not find config, created default at {}", config_path.display());
	}

	/*
	 * ingestion loop
	 */
	let ingester = maildir::Ingester::new(&config.tlsrpt)?;
	let published = Published::new();
	loop {
		if let Err(e) = ingester.update(&published, Utc::now()) {
			error!("failed to read mail directory {}: {}", config.tlsrpt.maildir, e);
		}

		let current = published.current();
		if current.is_empty() {
			info!("no reports within the retention window");
		}
		log_summary(&current);

		match config.tlsrpt.interval() {
			Some(interval) => thread::sleep(interval),
			None => return Ok(()),
		}
	}
}
