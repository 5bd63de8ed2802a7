//! Response envelope returned by every client call.

use crate::constants::BODY_EXCERPT_LEN;
use crate::{ConformanceError, ConformanceResult};
use openehr::ObjectVersionId;
use reqwest::header::{HeaderMap, ETAG, LOCATION};
use reqwest::StatusCode;
use serde_json::Value;

/// Status, headers and body of one HTTP exchange.
///
/// The body is kept as text; `json` holds the parsed form when the text is valid JSON.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
    pub json: Option<Value>,
}

impl ResponseEnvelope {
    pub fn new(status: StatusCode, headers: HeaderMap, body: String) -> Self {
        let json = if body.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&body).ok()
        };
        Self {
            status,
            headers,
            body,
            json,
        }
    }

    /// Header value as text. Header names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Assert the status code, naming `context` in the failure.
    pub fn expect_status(&self, expected: StatusCode, context: &str) -> ConformanceResult<()> {
        if self.status == expected {
            return Ok(());
        }
        Err(ConformanceError::unexpected_status(
            context,
            expected,
            self.status,
            &self.body,
        ))
    }

    /// Assert a 4xx status code.
    pub fn expect_client_error(&self, context: &str) -> ConformanceResult<()> {
        if self.status.is_client_error() {
            return Ok(());
        }
        Err(ConformanceError::Assertion {
            context: context.to_string(),
            expected: "a 4xx client error".to_string(),
            actual: self.status.to_string(),
            body: excerpt(&self.body),
        })
    }

    /// Assert a header is present.
    pub fn expect_header(&self, name: &str, context: &str) -> ConformanceResult<()> {
        if self.has_header(name) {
            return Ok(());
        }
        Err(ConformanceError::Assertion {
            context: context.to_string(),
            expected: format!("response header '{}'", name),
            actual: "header missing".to_string(),
            body: excerpt(&self.body),
        })
    }

    /// The parsed body, or an assertion failure if the body is not JSON.
    pub fn expect_json(&self, context: &str) -> ConformanceResult<&Value> {
        self.json.as_ref().ok_or_else(|| ConformanceError::Assertion {
            context: context.to_string(),
            expected: "a JSON body".to_string(),
            actual: if self.body.trim().is_empty() {
                "an empty body".to_string()
            } else {
                "a body that does not parse as JSON".to_string()
            },
            body: excerpt(&self.body),
        })
    }

    /// Version id of a created composition.
    ///
    /// Read from `ETag`, then the last `Location` segment, then the body's `uid.value`.
    pub fn version_id(&self) -> Option<ObjectVersionId> {
        let from_etag = || {
            self.header(ETAG.as_str())
                .and_then(|etag| ObjectVersionId::from_etag(etag).ok())
        };
        let from_location = || {
            self.header(LOCATION.as_str())
                .and_then(openehr::rest::last_path_segment)
                .and_then(|segment| ObjectVersionId::parse(segment).ok())
        };
        let from_body = || {
            self.json
                .as_ref()
                .and_then(|json| json.pointer("/uid/value"))
                .and_then(Value::as_str)
                .and_then(|value| ObjectVersionId::parse(value).ok())
        };

        from_etag().or_else(from_location).or_else(from_body)
    }
}

/// Truncate a response body for error messages.
pub fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_LEN {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(BODY_EXCERPT_LEN).collect();
    format!("{}...", cut)
}
