//! openEHR REST boundary support.
//!
//! This crate holds the openEHR vocabulary shared by the conformance client and the stub server:
//! - REST header names, media types and resource paths ([`rest`])
//! - `OBJECT_VERSION_ID` parsing for composition version identifiers, and the rule for system
//!   ids stamped into new ones ([`version_id`])
//! - Composition payloads loaded from fixture files ([`composition`])
//!
//! Payloads are treated as opaque JSON. Clinical validation is the server's job.

pub mod composition;
pub mod rest;
pub mod rm_1_1_0;
pub mod version_id;

pub use composition::CompositionPayload;
pub use version_id::ObjectVersionId;

use thiserror::Error;

/// Errors returned by the `openehr` boundary crate.
#[derive(Debug, Error)]
pub enum OpenEhrError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("failed to read composition file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("invalid composition: {0}")]
    InvalidComposition(String),

    #[error("invalid object version id: {0}")]
    InvalidVersionId(String),
}

pub type OpenEhrResult<T> = std::result::Result<T, OpenEhrError>;
