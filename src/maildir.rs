//! One ingestion pass over a directory of raw report messages.

use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use mailparse::MailHeaderMap;
use regex::Regex;
use simple_error::bail;

use crate::aggregate::{self, Published};
use crate::config::ReportConfig;
use crate::message::{self, ExtractedReport};

const AUTH_RESULTS_HEADER: &str = "Authentication-Results";

/// One message file as read from disk.
#[derive(Debug)]
pub struct RawMessage {
	pub path: PathBuf,
	pub bytes: Vec<u8>
}

/// Counts from a single pass, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
	pub accepted: usize,
	pub rejected: usize,
	pub expired: usize,
	pub removed: usize
}

/// Accepts only messages whose last Authentication-Results header was
/// written by the trusted authserv-id.
///
/// DKIM itself is assumed to have been verified upstream.
pub struct ProvenanceGate {
	pattern: Regex
}

impl ProvenanceGate {
	pub fn new(identifier: &str) -> Result<ProvenanceGate, regex::Error> {
		let pattern = Regex::new(&format!(r"^\s*{}\s*;", regex::escape(identifier)))?;
		Ok(ProvenanceGate { pattern })
	}

	pub fn check(&self, raw: &[u8]) -> Result<(), Box<dyn Error>> {
		let (headers, _) = mailparse::parse_headers(raw)?;
		let results = headers.get_all_values(AUTH_RESULTS_HEADER);

		match results.last() {
			None => bail!("no {} header found", AUTH_RESULTS_HEADER),
			Some(last) if self.pattern.is_match(last) => Ok(()),
			Some(last) => bail!("untrusted {} header: {}", AUTH_RESULTS_HEADER, last),
		}
	}
}

/// Lists the regular files in `dir`, ordered by path.
pub fn list_messages(dir: &Path) -> io::Result<Vec<PathBuf>> {
	let mut paths = Vec::new();
	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		if entry.file_type()?.is_file() {
			paths.push(entry.path());
		}
	}
	paths.sort();
	Ok(paths)
}

impl RawMessage {
	pub fn read(path: &Path) -> io::Result<RawMessage> {
		Ok(RawMessage { path: path.to_path_buf(), bytes: fs::read(path)? })
	}
}

fn remove(path: &Path) -> bool {
	match fs::remove_file(path) {
		Ok(()) => {
			info!("removed: {}", path.display());
			true
		},
		Err(e) => {
			warn!("failed to remove {}: {}", path.display(), e);
			false
		},
	}
}

/// What happened to a single message file during a pass.
#[derive(Debug)]
enum Outcome {
	Accepted(ExtractedReport),
	Rejected,
	Expired { removed: bool }
}

/// Runs ingestion passes for one configuration.
///
/// Built once and reused, so the provenance pattern is compiled only once.
pub struct Ingester<'a> {
	config: &'a ReportConfig<'a>,
	gate: ProvenanceGate
}

impl<'a> Ingester<'a> {
	pub fn new(config: &'a ReportConfig<'a>) -> Result<Ingester<'a>, regex::Error> {
		let gate = ProvenanceGate::new(config.trusted_identifier)?;
		Ok(Ingester { config, gate })
	}

	// The raw bytes are dropped before the next file is read.
	fn read_message(&self, path: &Path) -> Result<ExtractedReport, Box<dyn Error>> {
		let message = RawMessage::read(path)?;
		self.gate.check(&message.bytes)?;
		Ok(message::extract(&message.bytes)?)
	}

	fn process(&self, path: &Path, now: DateTime<Utc>) -> Outcome {
		let extracted = match self.read_message(path) {
			Ok(extracted) => extracted,
			Err(e) => {
				warn!("failed to read message {}: {}", path.display(), e);
				return Outcome::Rejected;
			},
		};

		if aggregate::is_expired(&extracted.report, now, self.config.retention_window()) {
			let removed = self.config.remove_expired && remove(path);
			return Outcome::Expired { removed };
		}

		debug!(
			"accepted report {} for {} from {}",
			extracted.report.report_id, extracted.domain, extracted.submitter
		);
		Outcome::Accepted(extracted)
	}

	/// Runs one pass: list the maildir, extract every trusted message file by
	/// file, drop expired ones (deleting their files if configured), then build
	/// and publish a new aggregate.
	///
	/// Only a failure to list the directory aborts the pass; bad messages are
	/// logged and skipped.
	pub fn update(&self, published: &Published, now: DateTime<Utc>) -> Result<PassSummary, Box<dyn Error>> {
		let paths = list_messages(Path::new(self.config.maildir))?;

		let mut summary = PassSummary::default();
		let mut reports = Vec::with_capacity(paths.len());

		for path in paths {
			match self.process(&path, now) {
				Outcome::Accepted(extracted) => {
					summary.accepted += 1;
					reports.push(extracted);
				},
				Outcome::Rejected => summary.rejected += 1,
				Outcome::Expired { removed } => {
					summary.expired += 1;
					if removed {
						summary.removed += 1;
					}
				},
			}
		}

		published.publish(aggregate::build(reports, now, self.config.retention_window()));
		info!(
			"pass complete: {} accepted, {} rejected, {} expired ({} removed)",
			summary.accepted, summary.rejected, summary.expired, summary.removed
		);

		Ok(summary)
	}
}
