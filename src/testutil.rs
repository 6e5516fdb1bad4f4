//! Builders for synthetic TLS-RPT messages used across the unit tests.

use std::io::Write;

use chrono::{DateTime, TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::message::ExtractedReport;
use crate::tlsrpt::types::{
	FailureDetail, Policy, PolicyDescriptor, PolicySummary, PolicyType, Report, ReportDateRange
};

const BOUNDARY: &str = "tlsrpt-boundary-42";

#[derive(Debug, Clone, Copy)]
pub enum Encoding {
	Json,
	Base64Json,
	Gzip,
	Base64Gzip
}

pub struct Part {
	media_type: String,
	transfer_encoding: Option<&'static str>,
	body: Vec<u8>
}

impl Part {
	pub fn text(text: &str) -> Part {
		Part::raw("text/plain; charset=us-ascii", None, text.as_bytes().to_vec())
	}

	pub fn raw(media_type: &str, transfer_encoding: Option<&'static str>, body: Vec<u8>) -> Part {
		Part { media_type: media_type.to_string(), transfer_encoding, body }
	}

	pub fn report(report: &Report, encoding: Encoding) -> Part {
		let json = serde_json::to_vec_pretty(report).unwrap();
		match encoding {
			Encoding::Json => Part::raw("application/tlsrpt+json", None, json),
			Encoding::Base64Json => Part::raw("application/tlsrpt+json", Some("base64"), wrapped_base64(&json)),
			Encoding::Gzip => Part::raw("application/tlsrpt+gzip", Some("binary"), gzip(&json)),
			Encoding::Base64Gzip => Part::raw("application/tlsrpt+gzip", Some("base64"), wrapped_base64(&gzip(&json))),
		}
	}
}

fn gzip(data: &[u8]) -> Vec<u8> {
	let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
	encoder.write_all(data).unwrap();
	encoder.finish().unwrap()
}

fn wrapped_base64(data: &[u8]) -> Vec<u8> {
	let encoded = base64::encode(data);
	encoded.as_bytes()
		.chunks(76)
		.map(|line| [line, &b"\r\n"[..]].concat())
		.collect::<Vec<_>>()
		.concat()
}

pub fn message(domain: &str, submitter: &str, parts: &[Part]) -> Vec<u8> {
	message_with_type(domain, submitter, "multipart/report; report-type=\"tlsrpt\"", parts)
}

pub fn message_with_type(domain: &str, submitter: &str, content_type: &str, parts: &[Part]) -> Vec<u8> {
	message_with_headers(&format!(
		"Authentication-Results: example.com; dkim=pass header.d={}\r\n\
		TLS-Report-Domain: {}\r\n\
		TLS-Report-Submitter: {}\r\n\
		Subject: Report Domain: {} Submitter: {}\r\n\
		MIME-Version: 1.0\r\n\
		Content-Type: {}; boundary=\"{}\"\r\n",
		submitter, domain, submitter, domain, submitter, content_type, BOUNDARY
	), parts)
}

/// Assembles a message from a literal header block and the given parts.
pub fn message_with_headers(headers: &str, parts: &[Part]) -> Vec<u8> {
	let mut raw = headers.as_bytes().to_vec();
	raw.extend_from_slice(b"\r\nThis is a multipart message in MIME format.\r\n");
	for part in parts {
		raw.extend_from_slice(format!("--{}\r\nContent-Type: {}\r\n", BOUNDARY, part.media_type).as_bytes());
		if let Some(encoding) = part.transfer_encoding {
			raw.extend_from_slice(format!("Content-Transfer-Encoding: {}\r\n", encoding).as_bytes());
		}
		raw.extend_from_slice(b"\r\n");
		raw.extend_from_slice(&part.body);
		raw.extend_from_slice(b"\r\n");
	}
	raw.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
	raw
}

pub fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
	Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// A one-day report with a single sts policy and no failures.
pub fn report(report_id: &str, contact_info: &str, end: DateTime<Utc>) -> Report {
	Report {
		organization_name: "Example Mail".to_string(),
		date_range: ReportDateRange { start: end - chrono::Duration::days(1), end },
		contact_info: contact_info.to_string(),
		report_id: report_id.to_string(),
		policies: vec![policy(PolicyType::Sts, 1, &[])]
	}
}

/// A report with every optional field populated.
pub fn full_report(submitter: &str) -> Report {
	let mut expired = failure("certificate-expired", 2);
	expired.sending_mta_ip = Some("2001:db8:abcd:12::1".parse().unwrap());
	expired.receiving_mx_hostname = Some("mx1.example.net".to_string());
	expired.receiving_mx_helo = Some("mx1".to_string());
	expired.receiving_ip = Some("203.0.113.56".parse().unwrap());
	expired.additional_information = Some("https://reports.example/info?id=1".to_string());
	expired.failure_reason_code = Some("X509_V_ERR_CERT_HAS_EXPIRED".to_string());

	let mut sts = policy(PolicyType::Sts, 5326, &[]);
	sts.policy.policy_string = vec!["version: STSv1".to_string(), "mode: enforce".to_string()];
	sts.policy.mx_host = vec!["*.example.net".to_string()];
	sts.failure_details = vec![expired, failure("validation-failure", 3)];
	sts.summary.total_failure_session_count = 5;

	Report {
		organization_name: "Example Mail Inc.".to_string(),
		date_range: ReportDateRange { start: ts(2024, 3, 1), end: ts(2024, 3, 2) },
		contact_info: format!("tlsrpt@{}", submitter),
		report_id: "2024-03-01T00:00:00Z_example.net".to_string(),
		policies: vec![sts, policy(PolicyType::NoPolicyFound, 12, &[])]
	}
}

pub fn failure(result_type: &str, count: u64) -> FailureDetail {
	FailureDetail {
		result_type: result_type.to_string(),
		sending_mta_ip: None,
		receiving_mx_hostname: None,
		receiving_mx_helo: None,
		receiving_ip: None,
		failed_session_count: count,
		additional_information: None,
		failure_reason_code: None
	}
}

pub fn policy(policy_type: PolicyType, successes: u64, failures: &[(&str, u64)]) -> Policy {
	Policy {
		policy: PolicyDescriptor {
			policy_type,
			policy_string: Vec::new(),
			policy_domain: "example.net".to_string(),
			mx_host: Vec::new()
		},
		summary: PolicySummary {
			total_successful_session_count: successes,
			total_failure_session_count: failures.iter().fold(0u64, |sum, (_, n)| sum.saturating_add(*n))
		},
		failure_details: failures.iter().map(|(result_type, n)| failure(result_type, *n)).collect()
	}
}

pub fn extracted(domain: &str, submitter: &str, report: Report) -> ExtractedReport {
	ExtractedReport { domain: domain.to_string(), submitter: submitter.to_string(), report }
}
