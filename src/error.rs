//! Error types for report extraction.

use mailparse::MailParseError;
use thiserror::Error;

/// Why a single message could not be turned into a report.
///
/// Every variant describes one bad input message; none of them is fatal to an
/// ingestion pass.
#[derive(Error, Debug)]
pub enum ExtractError {
	#[error("malformed message: {0}")]
	MalformedMessage(#[source] MailParseError),

	/// The named header was absent or empty.
	#[error("empty {0} field")]
	MissingIdentity(&'static str),

	#[error("invalid Content-Type: {0}")]
	InvalidContentType(String),

	#[error("more than one report included")]
	DuplicateReportPart,

	#[error("invalid report body: {0}")]
	InvalidReportBody(#[from] BodyError),

	#[error("contact-info {contact_info:?} does not match TLS-Report-Submitter {submitter:?}")]
	ContactMismatch {
		contact_info: String,
		submitter: String
	},

	#[error("no report attachment found")]
	NoReportFound,
}

/// The underlying cause of an [`ExtractError::InvalidReportBody`].
#[derive(Error, Debug)]
pub enum BodyError {
	#[error("failed to decode base64 body: {0}")]
	Base64(#[from] base64::DecodeError),

	#[error("failed to decode transfer encoding: {0}")]
	TransferEncoding(#[source] MailParseError),

	#[error("failed to read gzip-compressed report body: {0}")]
	Gzip(#[source] std::io::Error),

	#[error("failed to read JSON report body: {0}")]
	Json(#[from] serde_json::Error),
}
