//! Receives SMTP TLS reports (RFC 8460) delivered by email and rolls them up
//! per recipient domain and reporting organization.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod logger;
pub mod maildir;
pub mod message;
pub mod tlsrpt;

#[cfg(test)]
mod testutil;

pub use aggregate::{Aggregate, Published, Statistics, SubmitterResult};
pub use error::{BodyError, ExtractError};
pub use message::{extract, ExtractedReport};
