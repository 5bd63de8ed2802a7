//! openEHR REST API vocabulary.
//!
//! Header names and resource paths follow the openEHR REST API (EHR and composition
//! resources). Path builders take plain string segments rather than validated ids: the
//! conformance checks deliberately address malformed EHR ids.

/// Media type for canonical JSON payloads.
pub const MEDIA_TYPE_JSON: &str = "application/json";

/// `Prefer` header name.
pub const HEADER_PREFER: &str = "Prefer";

/// Ask the server to return the created resource in the response body.
pub const PREFER_RETURN_REPRESENTATION: &str = "return=representation";

/// openEHR REST API version header.
pub const HEADER_OPENEHR_VERSION: &str = "openEHR-VERSION";

/// openEHR audit details header, sent on mutating requests.
pub const HEADER_OPENEHR_AUDIT_DETAILS: &str = "openEHR-AUDIT_DETAILS";

/// `change_type` code for "creation" in the openEHR terminology.
pub const AUDIT_CHANGE_TYPE_CREATION: &str = "249";

/// Path of the EHR collection.
pub fn ehr_path() -> String {
    "ehr".to_string()
}

/// Path of a single EHR.
pub fn ehr_by_id_path(ehr_id: &str) -> String {
    format!("ehr/{}", ehr_id)
}

/// Path of the composition collection under an EHR.
pub fn composition_path(ehr_id: &str) -> String {
    format!("ehr/{}/composition", ehr_id)
}

/// Path of a single composition version under an EHR.
pub fn composition_version_path(ehr_id: &str, version_uid: &str) -> String {
    format!("ehr/{}/composition/{}", ehr_id, version_uid)
}

/// Builds an `openEHR-AUDIT_DETAILS` header value for a creation by `committer_name`.
///
/// Double quotes in the name are escaped so the value stays a single quoted token.
pub fn audit_details_for_creation(committer_name: &str) -> String {
    let escaped = committer_name.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "change_type.code_string=\"{}\",committer.name=\"{}\"",
        AUDIT_CHANGE_TYPE_CREATION, escaped
    )
}

/// Joins a base URL and a relative resource path with exactly one `/` between them.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Extracts the last path segment of a URL or path, ignoring query and fragment.
///
/// Used to read an identifier back out of a `Location` header.
pub fn last_path_segment(location: &str) -> Option<&str> {
    let without_query = location.split(['?', '#']).next().unwrap_or(location);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}
