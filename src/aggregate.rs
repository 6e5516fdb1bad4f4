//! Rolls extracted reports up into per-domain, per-submitter statistics.
//!
//! An [`Aggregate`] is built from scratch on every ingestion pass and handed
//! to [`Published`], which swaps it in for readers. A published aggregate is
//! never mutated again.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Serialize;

use crate::message::ExtractedReport;
use crate::tlsrpt::types::{PolicyType, Report};

/// Session counts for one policy type of one (domain, submitter) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
	pub success_count: u64,
	/// Failed sessions keyed by result type. A missing key means zero.
	pub failure_count_by_reason: BTreeMap<String, u64>
}

impl Statistics {
	// Counts are reporter-supplied u64s, so every sum saturates.
	pub fn failure_count(&self) -> u64 {
		self.failure_count_by_reason.values().fold(0u64, |sum, n| sum.saturating_add(*n))
	}

	pub fn total_count(&self) -> u64 {
		self.success_count.saturating_add(self.failure_count())
	}

	/// Share of successful sessions, rounded down.
	///
	/// `None` when no sessions were reported at all.
	pub fn success_percent(&self) -> Option<u64> {
		match self.total_count() {
			0 => None,
			total => Some((u128::from(self.success_count) * 100 / u128::from(total)) as u64),
		}
	}

	pub fn failure_percent(&self) -> Option<u64> {
		self.success_percent().map(|success| 100 - success)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitterResult {
	pub submitter: String,
	pub organization_name: String,
	pub contact_info: String,
	pub report_id: String,
	pub num_reports: u32,
	/// Earliest date-range start across the folded reports.
	pub start: DateTime<Utc>,
	/// Latest date-range end across the folded reports.
	pub end: DateTime<Utc>,
	pub statistics: BTreeMap<PolicyType, Statistics>
}

impl SubmitterResult {
	fn new(submitter: String, report: Report) -> SubmitterResult {
		let mut result = SubmitterResult {
			submitter,
			organization_name: String::new(),
			contact_info: String::new(),
			report_id: String::new(),
			num_reports: 0,
			start: report.date_range.start,
			end: report.date_range.end,
			statistics: BTreeMap::new()
		};
		result.take_identity(&report);
		result.add_statistics(report);
		result
	}

	/// Sessions summed over every policy type.
	pub fn total_count(&self) -> u64 {
		self.statistics.values().fold(0u64, |sum, statistics| sum.saturating_add(statistics.total_count()))
	}

	fn add(&mut self, report: Report) {
		if report.date_range.start < self.start {
			self.start = report.date_range.start;
		}
		if self.is_superseded_by(&report) {
			self.end = report.date_range.end;
			self.take_identity(&report);
		}
		self.add_statistics(report);
	}

	// The latest end wins. Equal ends fall back to comparing the identity
	// fields so the outcome does not depend on fold order.
	fn is_superseded_by(&self, report: &Report) -> bool {
		let current = (&self.end, &self.report_id, &self.organization_name, &self.contact_info);
		let candidate = (&report.date_range.end, &report.report_id, &report.organization_name, &report.contact_info);
		candidate > current
	}

	fn take_identity(&mut self, report: &Report) {
		self.organization_name = report.organization_name.clone();
		self.contact_info = report.contact_info.clone();
		self.report_id = report.report_id.clone();
	}

	fn add_statistics(&mut self, report: Report) {
		self.num_reports = self.num_reports.saturating_add(1);
		for policy in report.policies {
			let statistics = self.statistics.entry(policy.policy.policy_type).or_default();
			statistics.success_count = statistics.success_count.saturating_add(policy.summary.total_successful_session_count);
			for details in policy.failure_details {
				let count = statistics.failure_count_by_reason.entry(details.result_type).or_insert(0);
				*count = count.saturating_add(details.failed_session_count);
			}
		}
	}
}

pub type DomainResult = BTreeMap<String, SubmitterResult>;

/// Recipient domain -> submitter -> rolled-up results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Aggregate {
	domains: BTreeMap<String, DomainResult>
}

impl Aggregate {
	/// Results for a domain, or `None` if it never reported.
	pub fn domain(&self, domain: &str) -> Option<&DomainResult> {
		self.domains.get(domain)
	}

	pub fn domains(&self) -> impl Iterator<Item = (&String, &DomainResult)> {
		self.domains.iter()
	}

	pub fn len(&self) -> usize {
		self.domains.len()
	}

	pub fn is_empty(&self) -> bool {
		self.domains.is_empty()
	}
}

/// Whether a report ended at or before `as_of - retention`.
pub fn is_expired(report: &Report, as_of: DateTime<Utc>, retention: Duration) -> bool {
	report.date_range.end <= as_of - retention
}

/// Folds one pass worth of reports into a fresh aggregate.
///
/// Reports past the retention horizon are skipped. The result depends only on
/// the set of reports and `as_of`, not on their order.
pub fn build<I>(reports: I, as_of: DateTime<Utc>, retention: Duration) -> Aggregate
where
	I: IntoIterator<Item = ExtractedReport>,
{
	let mut domains: BTreeMap<String, DomainResult> = BTreeMap::new();

	for extracted in reports {
		if is_expired(&extracted.report, as_of, retention) {
			debug!("skipping expired report {} from {}", extracted.report.report_id, extracted.submitter);
			continue;
		}

		let ExtractedReport { domain, submitter, report } = extracted;
		let domain_result = domains.entry(domain).or_default();
		match domain_result.get_mut(&submitter) {
			Some(result) => result.add(report),
			None => {
				let result = SubmitterResult::new(submitter.clone(), report);
				domain_result.insert(submitter, result);
			},
		}
	}

	Aggregate { domains }
}

/// Holds the aggregate readers currently see.
///
/// The lock only ever guards the pointer swap; building happens elsewhere.
#[derive(Debug, Default)]
pub struct Published {
	current: Mutex<Arc<Aggregate>>
}

impl Published {
	pub fn new() -> Published {
		Published::default()
	}

	/// Replaces the current aggregate. The last call wins.
	pub fn publish(&self, aggregate: Aggregate) {
		let next = Arc::new(aggregate);
		let previous = std::mem::replace(&mut *self.lock(), next);
		// dropped outside the lock
		drop(previous);
	}

	pub fn current(&self) -> Arc<Aggregate> {
		Arc::clone(&self.lock())
	}

	fn lock(&self) -> MutexGuard<'_, Arc<Aggregate>> {
		// the guarded value is only ever a complete Arc, so a poisoned lock is still consistent
		self.current.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
