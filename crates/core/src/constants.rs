//! Constants used throughout the conformance core crate.
//!
//! Environment variable names and configuration defaults live here so the config loader, the
//! CLI help text and the tests agree on them.

/// Server base URL, e.g. `http://localhost:8080/ehrbase/rest/openehr/v1`.
pub const ENV_BASE_URL: &str = "EHR_CONFORMANCE_BASE_URL";

/// Known-good EHR id. When unset the session provisions a new EHR.
pub const ENV_EHR_ID: &str = "EHR_CONFORMANCE_EHR_ID";

/// Path to the composition fixture JSON file.
pub const ENV_COMPOSITION: &str = "EHR_CONFORMANCE_COMPOSITION";

/// HTTP request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "EHR_CONFORMANCE_TIMEOUT_SECS";

/// Value for the `openEHR-VERSION` header.
pub const ENV_OPENEHR_VERSION: &str = "EHR_CONFORMANCE_OPENEHR_VERSION";

/// Committer name for the `openEHR-AUDIT_DETAILS` header.
pub const ENV_AUDIT_COMMITTER: &str = "EHR_CONFORMANCE_AUDIT_COMMITTER";

/// Creating system id used when stamping fresh composition uids.
pub const ENV_SYSTEM_ID: &str = "EHR_CONFORMANCE_SYSTEM_ID";

/// Whether create checks stamp a fresh uid on the fixture (`true`/`false` or `1`/`0`).
pub const ENV_FRESH_UIDS: &str = "EHR_CONFORMANCE_FRESH_UIDS";

/// Optional YAML configuration file, layered under the environment.
pub const ENV_CONFIG_FILE: &str = "EHR_CONFORMANCE_CONFIG";

/// Default server base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/openehr/v1";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default creating system id.
pub const DEFAULT_SYSTEM_ID: &str = "conformance.local";

/// Malformed EHR id used by the invalid-id check.
pub const INVALID_EHR_ID: &str = "invalid_Ehr_ID";

/// Syntactically invalid composition body (missing closing brace).
pub const MALFORMED_COMPOSITION: &str = r#"{"_type":"XYZ","value":"Vital signs""#;

/// Composition fixture bundled with the crate, used when no fixture path is configured.
pub const BUNDLED_COMPOSITION: &str = include_str!("../fixtures/composition.json");

/// Maximum number of response body characters quoted in assertion failures.
pub const BODY_EXCERPT_LEN: usize = 512;
