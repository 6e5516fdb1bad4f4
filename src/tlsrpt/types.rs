use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReportDateRange {
	#[serde(rename = "start-datetime")]
	pub start: DateTime<Utc>,
	#[serde(rename = "end-datetime")]
	pub end: DateTime<Utc>
}

/// The TLS policy mechanism a policy entry was evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyType {
	Tlsa,
	Sts,
	NoPolicyFound
}

impl PolicyType {
	pub fn as_str(&self) -> &'static str {
		match self {
			PolicyType::Tlsa => "tlsa",
			PolicyType::Sts => "sts",
			PolicyType::NoPolicyFound => "no-policy-found",
		}
	}
}

impl fmt::Display for PolicyType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyDescriptor {
	pub policy_type: PolicyType,
	#[serde(default)]
	pub policy_string: Vec<String>,
	pub policy_domain: String,
	#[serde(default)]
	pub mx_host: Vec<String>
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicySummary {
	pub total_successful_session_count: u64,
	pub total_failure_session_count: u64
}

/// One failure category within a policy, e.g. `certificate-expired`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FailureDetail {
	pub result_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sending_mta_ip: Option<IpAddr>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub receiving_mx_hostname: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub receiving_mx_helo: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub receiving_ip: Option<IpAddr>,
	pub failed_session_count: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub additional_information: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub failure_reason_code: Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Policy {
	pub policy: PolicyDescriptor,
	pub summary: PolicySummary,
	#[serde(default)]
	pub failure_details: Vec<FailureDetail>
}

/// The JSON body of a TLS-RPT report (RFC 8460 section 4).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Report {
	pub organization_name: String,
	pub date_range: ReportDateRange,
	pub contact_info: String,
	pub report_id: String,
	pub policies: Vec<Policy>
}

/// The media types a report attachment can be sent as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFileType {
	Json,
	Gzip
}

impl ReportFileType {
	pub fn from_media_type(media_type: &str) -> Option<ReportFileType> {
		match media_type {
			"application/tlsrpt+json" => Some(ReportFileType::Json),
			"application/tlsrpt+gzip" => Some(ReportFileType::Gzip),
			_ => None,
		}
	}
}
