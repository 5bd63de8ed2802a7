//! EHR identifier utilities.
//!
//! openEHR servers identify an EHR by a `HIER_OBJECT_ID` whose value is a UUID. The conformance
//! suite needs to handle three kinds of identifier:
//! - well-formed ids of EHRs that exist on the server (provisioned by the session fixture),
//! - well-formed ids that the server has never seen (freshly generated, expected to yield 404),
//! - malformed ids such as `invalid_Ehr_ID` (expected to yield 400).
//!
//! This crate provides [`EhrId`], a wrapper type that *guarantees* a well-formed identifier once
//! constructed.
//!
//! ## Accepted forms
//! - Hyphenated: `550e8400-e29b-41d4-a716-446655440000` (the openEHR wire form)
//! - Simple: `550e8400e29b41d4a716446655440000`
//!
//! Both are case-insensitive on input. [`EhrId`] always displays in lowercase hyphenated form.
//! Braced and URN forms are rejected: they are not valid in a REST path segment.

mod service;

pub use service::{EhrId, Uuid};

/// Error type for EHR identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for EHR identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
