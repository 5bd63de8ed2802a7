//! Composition payloads.
//!
//! A composition is submitted as canonical openEHR JSON. The conformance suite does not model
//! the Reference Model: it loads a known-good document from a fixture file, optionally stamps a
//! fresh `uid` on it, and posts it verbatim. [`CompositionPayload`] is immutable; derived copies
//! are new values.

use crate::rm_1_1_0::constants::RM_TYPE_COMPOSITION;
use crate::{ObjectVersionId, OpenEhrError, OpenEhrResult};
use serde_json::{Map, Value};
use std::path::Path;

/// A composition document in canonical JSON form.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPayload {
    document: Map<String, Value>,
}

impl CompositionPayload {
    /// Parses a composition from JSON text.
    ///
    /// # Errors
    ///
    /// - `OpenEhrError::InvalidJson` if the text is not JSON.
    /// - `OpenEhrError::InvalidComposition` if the document is not a JSON object, declares a
    ///   `_type` other than `COMPOSITION`, or has no `name`.
    pub fn from_json_str(input: &str) -> OpenEhrResult<Self> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(value)
    }

    /// Wraps an already-parsed JSON value.
    pub fn from_value(value: Value) -> OpenEhrResult<Self> {
        let Value::Object(document) = value else {
            return Err(OpenEhrError::InvalidComposition(
                "composition must be a JSON object".into(),
            ));
        };

        if let Some(rm_type) = document.get("_type") {
            if rm_type.as_str() != Some(RM_TYPE_COMPOSITION) {
                return Err(OpenEhrError::InvalidComposition(format!(
                    "expected _type '{}', got {}",
                    RM_TYPE_COMPOSITION, rm_type
                )));
            }
        }

        if document.get("name").map_or(true, Value::is_null) {
            return Err(OpenEhrError::InvalidComposition(
                "composition must have a name".into(),
            ));
        }

        Ok(Self { document })
    }

    /// Loads a composition fixture from disk.
    pub fn from_path(path: &Path) -> OpenEhrResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// The composition's `name.value`, if it is a plain text name.
    pub fn name(&self) -> Option<&str> {
        self.document
            .get("name")
            .and_then(|name| name.get("value"))
            .and_then(Value::as_str)
    }

    /// The composition's `uid`, if present and well-formed.
    pub fn uid(&self) -> Option<ObjectVersionId> {
        self.document
            .get("uid")
            .and_then(|uid| uid.get("value"))
            .and_then(Value::as_str)
            .and_then(|value| ObjectVersionId::parse(value).ok())
    }

    /// Returns a copy of this composition carrying `uid`, replacing any existing one.
    pub fn with_uid(&self, uid: &ObjectVersionId) -> Self {
        let mut document = self.document.clone();
        document.insert("uid".to_string(), uid.to_rm_json());
        Self { document }
    }

    /// Returns a copy of this composition without a `uid`.
    pub fn without_uid(&self) -> Self {
        let mut document = self.document.clone();
        document.remove("uid");
        Self { document }
    }

    /// The request body to post.
    pub fn to_body(&self) -> String {
        Value::Object(self.document.clone()).to_string()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.document)
    }
}
