//! # Conformance Core
//!
//! Conformance checks for the composition endpoints of an openEHR REST server.
//!
//! This crate contains:
//! - Run configuration resolved once at startup ([`config`])
//! - An HTTP client that attaches the mandatory openEHR headers ([`client`])
//! - The session fixture that provisions a known-good EHR ([`session`])
//! - The checks themselves ([`checks`]) and a sequential runner with a JSON report ([`runner`])
//! - An optional transcript of every HTTP exchange ([`transcript`])
//!
//! **No server concerns**: the in-process stub server used for local runs lives in `openehr-stub`.

pub mod checks;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod response;
pub mod runner;
pub mod session;
pub mod transcript;

pub use checks::Check;
pub use client::OpenEhrClient;
pub use config::ConformanceConfig;
pub use error::{ConformanceError, ConformanceResult};
pub use response::ResponseEnvelope;
pub use runner::{run_checks, CheckOutcome, RunReport};
pub use session::Session;
pub use transcript::{Transcript, TranscriptEntry};
