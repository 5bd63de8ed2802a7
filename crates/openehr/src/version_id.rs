//! openEHR `OBJECT_VERSION_ID`.
//!
//! Composition versions are identified by `{object_id}::{creating_system_id}::{version_tree_id}`,
//! for example `8849182c-82ad-4088-a07f-48ead4180515::conformance.local::1`. Servers return this
//! identifier in the `ETag` header (quoted) and as the last segment of the `Location` header.
//!
//! Ids read from a server are parsed leniently: any three non-empty `::` separated parts.
//! Ids this workspace stamps itself go through [`ObjectVersionId::fresh`], whose creating
//! system id must also satisfy [`check_stamped_system_id`].

use crate::rm_1_1_0::constants::RM_TYPE_OBJECT_VERSION_ID;
use crate::{OpenEhrError, OpenEhrResult};
use std::{fmt, str::FromStr};

const SEPARATOR: &str = "::";

/// Longest system id accepted for stamping: the length of a DNS name.
const MAX_STAMPED_SYSTEM_ID_LEN: usize = 253;

/// Checks a creating system id before it is stamped into new version uids.
///
/// Stamped uids travel in request paths and `ETag` values, so the id is limited to ASCII
/// letters, digits, `.`, `-` and `_`, and to 253 characters.
///
/// # Errors
///
/// Returns `OpenEhrError::InvalidInput` naming the first offending character, or the length.
pub fn check_stamped_system_id(system_id: &str) -> OpenEhrResult<()> {
    if system_id.is_empty() {
        return Err(OpenEhrError::InvalidInput("system id is empty".into()));
    }
    if system_id.len() > MAX_STAMPED_SYSTEM_ID_LEN {
        return Err(OpenEhrError::InvalidInput(format!(
            "system id is {} bytes long, limit is {}",
            system_id.len(),
            MAX_STAMPED_SYSTEM_ID_LEN
        )));
    }
    match system_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
    {
        Some(c) => Err(OpenEhrError::InvalidInput(format!(
            "system id '{}' contains {:?}; use letters, digits, '.', '-' or '_'",
            system_id, c
        ))),
        None => Ok(()),
    }
}

/// Parsed `OBJECT_VERSION_ID`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectVersionId {
    object_id: String,
    creating_system_id: String,
    version_tree_id: String,
}

impl ObjectVersionId {
    /// First version of a new object with a random UUID object id.
    ///
    /// # Errors
    ///
    /// Returns `OpenEhrError::InvalidVersionId` if `creating_system_id` fails
    /// [`check_stamped_system_id`].
    pub fn fresh(creating_system_id: &str) -> OpenEhrResult<Self> {
        check_stamped_system_id(creating_system_id)
            .map_err(|e| OpenEhrError::InvalidVersionId(e.to_string()))?;
        Ok(Self {
            object_id: uuid::Uuid::new_v4().to_string(),
            creating_system_id: creating_system_id.to_string(),
            version_tree_id: "1".to_string(),
        })
    }

    /// Parses `{object_id}::{creating_system_id}::{version_tree_id}`.
    ///
    /// Only the shape is checked: exactly three parts, none empty or blank. A server may use
    /// any creating system id, including one with `:` or spaces.
    pub fn parse(input: &str) -> OpenEhrResult<Self> {
        let parts: Vec<&str> = input.split(SEPARATOR).collect();
        let [object_id, system_id, version] = parts.as_slice() else {
            return Err(OpenEhrError::InvalidVersionId(format!(
                "expected 'object_id::system_id::version', got '{}'",
                input
            )));
        };
        if [object_id, system_id, version]
            .iter()
            .any(|part| part.trim().is_empty())
        {
            return Err(OpenEhrError::InvalidVersionId(format!(
                "empty part in '{}'",
                input
            )));
        }
        Ok(Self {
            object_id: object_id.to_string(),
            creating_system_id: system_id.to_string(),
            version_tree_id: version.to_string(),
        })
    }

    /// Parses the value of an `ETag` header, tolerating a weak prefix and surrounding quotes.
    pub fn from_etag(etag: &str) -> OpenEhrResult<Self> {
        let trimmed = etag.trim();
        let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(trimmed);
        Self::parse(unquoted)
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn creating_system_id(&self) -> &str {
        &self.creating_system_id
    }

    pub fn version_tree_id(&self) -> &str {
        &self.version_tree_id
    }

    /// Canonical JSON form, as embedded in a composition's `uid` attribute.
    pub fn to_rm_json(&self) -> serde_json::Value {
        serde_json::json!({
            "_type": RM_TYPE_OBJECT_VERSION_ID,
            "value": self.to_string(),
        })
    }
}

impl fmt::Display for ObjectVersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.object_id, self.creating_system_id, self.version_tree_id
        )
    }
}

impl FromStr for ObjectVersionId {
    type Err = OpenEhrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectVersionId::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "8849182c-82ad-4088-a07f-48ead4180515::conformance.local::1";

    #[test]
    fn test_parse_round_trips_through_display() {
        let id = ObjectVersionId::parse(SAMPLE).unwrap();
        assert_eq!(id.object_id(), "8849182c-82ad-4088-a07f-48ead4180515");
        assert_eq!(id.creating_system_id(), "conformance.local");
        assert_eq!(id.version_tree_id(), "1");
        assert_eq!(id.to_string(), SAMPLE);
    }

    #[test]
    fn test_parse_accepts_branch_versions() {
        let id = ObjectVersionId::parse("abc::sys::1.2.3").unwrap();
        assert_eq!(id.version_tree_id(), "1.2.3");
    }

    #[test]
    fn test_parse_accepts_any_server_system_id() {
        let with_port = ObjectVersionId::parse(
            "8849182c-82ad-4088-a07f-48ead4180515::ehr.example.org:8443::1",
        )
        .unwrap();
        assert_eq!(with_port.creating_system_id(), "ehr.example.org:8443");

        let with_space =
            ObjectVersionId::parse("8849182c-82ad-4088-a07f-48ead4180515::EHR Server::2").unwrap();
        assert_eq!(with_space.creating_system_id(), "EHR Server");
        assert_eq!(with_space.version_tree_id(), "2");
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for input in [
            "",
            "abc",
            "abc::sys",
            "abc::sys::1::extra",
            "::sys::1",
            "abc::::1",
            "abc::sys::",
            "abc:: ::1",
        ] {
            assert!(
                matches!(ObjectVersionId::parse(input), Err(OpenEhrError::InvalidVersionId(_))),
                "expected '{}' to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_from_etag_strips_quotes_and_weak_prefix() {
        let strong = ObjectVersionId::from_etag(&format!("\"{}\"", SAMPLE)).unwrap();
        let weak = ObjectVersionId::from_etag(&format!("W/\"{}\"", SAMPLE)).unwrap();
        let bare = ObjectVersionId::from_etag(SAMPLE).unwrap();
        assert_eq!(strong, weak);
        assert_eq!(strong, bare);
    }

    #[test]
    fn test_fresh_ids_are_first_versions_with_distinct_object_ids() {
        let a = ObjectVersionId::fresh("conformance.local").unwrap();
        let b = ObjectVersionId::fresh("conformance.local").unwrap();
        assert_eq!(a.version_tree_id(), "1");
        assert_ne!(a.object_id(), b.object_id());
        assert!(ObjectVersionId::fresh("not valid").is_err());
        assert!(ObjectVersionId::fresh("ehr.example.org:8443").is_err());
    }

    #[test]
    fn test_check_stamped_system_id() {
        for ok in ["conformance.local", "openehr-stub_1", "a"] {
            assert!(check_stamped_system_id(ok).is_ok(), "{}", ok);
        }
        for bad in ["", "bad/system", "bad::system", "bad system", "syst\u{e8}me"] {
            assert!(
                matches!(check_stamped_system_id(bad), Err(OpenEhrError::InvalidInput(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
        let err = check_stamped_system_id(&"a".repeat(254)).unwrap_err();
        assert!(err.to_string().contains("limit is 253"));
    }

    #[test]
    fn test_to_rm_json() {
        let id = ObjectVersionId::parse(SAMPLE).unwrap();
        let json = id.to_rm_json();
        assert_eq!(json["_type"], "OBJECT_VERSION_ID");
        assert_eq!(json["value"], SAMPLE);
    }
}
