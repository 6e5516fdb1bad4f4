use std::io::{prelude::*, Cursor};

use flate2::read::GzDecoder;
use mailparse::body::Body;
use mailparse::{MailHeaderMap, ParsedMail};

use crate::error::{BodyError, ExtractError};
use crate::tlsrpt::types::{Report, ReportFileType};

pub const DOMAIN_HEADER: &str = "TLS-Report-Domain";
pub const SUBMITTER_HEADER: &str = "TLS-Report-Submitter";

const CONTAINER_MEDIA_TYPE: &str = "multipart/report";
const REPORT_TYPE: &str = "tlsrpt";

/// A validated report together with the identity declared in the message
/// headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReport {
	pub domain: String,
	pub submitter: String,
	pub report: Report
}

/// Parses one raw email into a validated TLS-RPT report.
///
/// Checks run cheapest first: identity headers, then the container media type,
/// then the part layout, and only then is the attachment decoded. Any failure
/// discards the whole message.
pub fn extract(raw: &[u8]) -> Result<ExtractedReport, ExtractError> {
	let mail = mailparse::parse_mail(raw).map_err(ExtractError::MalformedMessage)?;

	let domain = identity(&mail, DOMAIN_HEADER)?;
	let submitter = identity(&mail, SUBMITTER_HEADER)?;
	check_container(&mail)?;

	let (part, report_type) = find_report(&mail)?;
	let data = decode_transfer(part)?;
	let report = read_report(report_type, data)?;

	check_contact(&report.contact_info, &submitter)?;

	Ok(ExtractedReport { domain, submitter, report })
}

fn identity(mail: &ParsedMail, header: &'static str) -> Result<String, ExtractError> {
	match mail.get_headers().get_first_value(header) {
		Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
		_ => Err(ExtractError::MissingIdentity(header)),
	}
}

fn check_container(mail: &ParsedMail) -> Result<(), ExtractError> {
	// mailparse falls back to text/plain when the header is absent
	if mail.get_headers().get_first_value("Content-Type").is_none() {
		return Err(ExtractError::InvalidContentType("missing Content-Type header".to_string()));
	}

	let ctype = &mail.ctype;
	if ctype.mimetype != CONTAINER_MEDIA_TYPE {
		return Err(ExtractError::InvalidContentType(format!(
			"expected media type to be '{}', got '{}'", CONTAINER_MEDIA_TYPE, ctype.mimetype
		)));
	}

	match ctype.params.get("report-type") {
		Some(report_type) if report_type.eq_ignore_ascii_case(REPORT_TYPE) => Ok(()),
		other => Err(ExtractError::InvalidContentType(format!(
			"expected report type to be '{}', got '{}'", REPORT_TYPE, other.map(String::as_str).unwrap_or("")
		))),
	}
}

/// Searches the parts of the message for the single report attachment.
///
/// Parts that are not a report (the human-readable companion) are skipped.
pub fn find_report<'m, 'a>(mail: &'m ParsedMail<'a>) -> Result<(&'m ParsedMail<'a>, ReportFileType), ExtractError> {
	let mut found = None;

	for part in mail.subparts.iter() {
		let report_type = match ReportFileType::from_media_type(&part.ctype.mimetype) {
			Some(report_type) => report_type,
			None => continue,
		};

		if found.is_some() {
			return Err(ExtractError::DuplicateReportPart);
		}
		found = Some((part, report_type));
	}

	found.ok_or(ExtractError::NoReportFound)
}

fn decode_transfer(part: &ParsedMail) -> Result<Vec<u8>, BodyError> {
	match part.get_body_encoded() {
		Body::Base64(body) => {
			let text = body.get_raw()
				.iter()
				.copied()
				.filter(|b| !b.is_ascii_whitespace())
				.collect::<Vec<_>>();
			Ok(base64::decode(&text)?)
		},
		Body::QuotedPrintable(body) => body.get_decoded().map_err(BodyError::TransferEncoding),
		Body::SevenBit(body) | Body::EightBit(body) => Ok(body.get_raw().to_vec()),
		Body::Binary(body) => Ok(body.get_raw().to_vec()),
	}
}

/// Given a report type and the transfer-decoded bytes, decompresses and parses the report.
pub fn read_report(report_type: ReportFileType, data: Vec<u8>) -> Result<Report, BodyError> {
	let json = match report_type {
		ReportFileType::Gzip => {
			let mut d = GzDecoder::new(Cursor::new(data));
			let mut result = Vec::new();
			d.read_to_end(&mut result).map_err(BodyError::Gzip)?;
			result
		},
		ReportFileType::Json => data,
	};

	Ok(serde_json::from_slice(&json)?)
}

/// contact-info must hold exactly one address whose domain is the submitter.
///
/// The domain comparison ignores ASCII case.
fn check_contact(contact_info: &str, submitter: &str) -> Result<(), ExtractError> {
	let mut pieces = contact_info.split('@');
	match (pieces.next(), pieces.next(), pieces.next()) {
		(Some(_), Some(domain), None) if domain.eq_ignore_ascii_case(submitter) => Ok(()),
		_ => Err(ExtractError::ContactMismatch {
			contact_info: contact_info.to_string(),
			submitter: submitter.to_string()
		}),
	}
}
