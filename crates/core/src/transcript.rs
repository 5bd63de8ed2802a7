//! HTTP exchange transcript.
//!
//! When enabled the client appends one entry per request. The transcript is shared between
//! clones of the client, so a session and its checks write into the same log.

use crate::{ConformanceError, ConformanceResult};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One recorded request/response exchange.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub sequence: u64,
    pub method: String,
    pub url: String,
    pub request_body: Option<Value>,
    pub status: Option<u16>,
    pub response_body: Option<Value>,
    pub error: Option<String>,
}

/// Append-only transcript shared across client clones.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Arc<Mutex<Vec<TranscriptEntry>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an exchange. Sequence numbers start at 1.
    pub fn record(
        &self,
        method: &str,
        url: &str,
        request_body: Option<&str>,
        outcome: Result<(u16, &str), &str>,
    ) {
        let mut guard = self.lock();
        let sequence = u64::try_from(guard.len()).unwrap_or(u64::MAX).saturating_add(1);
        let (status, response_body, error) = match outcome {
            Ok((status, body)) => (Some(status), Some(body_value(body)), None),
            Err(error) => (None, None, Some(error.to_string())),
        };
        guard.push(TranscriptEntry {
            sequence,
            method: method.to_string(),
            url: url.to_string(),
            request_body: request_body.map(body_value),
            status,
            response_body,
            error,
        });
    }

    /// Snapshot of the recorded entries.
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A panic while recording leaves the log intact, so a poisoned lock is still used.
    fn lock(&self) -> MutexGuard<'_, Vec<TranscriptEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the transcript as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> ConformanceResult<()> {
        let json = serde_json::to_string_pretty(&self.entries()).map_err(|source| {
            ConformanceError::Serialization {
                what: "transcript",
                source,
            }
        })?;
        std::fs::write(path, json).map_err(|source| ConformanceError::FileWrite {
            what: "transcript",
            source,
        })
    }
}

/// Bodies that parse as JSON are stored structured; anything else as a JSON string.
fn body_value(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_numbered_in_order() {
        let transcript = Transcript::new();
        transcript.record("POST", "http://h/ehr", None, Ok((201, r#"{"ehr_id":{"value":"x"}}"#)));
        transcript.record("GET", "http://h/ehr/x", None, Err("connection refused"));

        let entries = transcript.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sequence, 1);
        assert_eq!(entries[0].status, Some(201));
        assert_eq!(entries[0].response_body.as_ref().unwrap()["ehr_id"]["value"], "x");
        assert_eq!(entries[1].sequence, 2);
        assert!(entries[1].status.is_none());
        assert_eq!(entries[1].error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_clones_share_entries() {
        let transcript = Transcript::new();
        let clone = transcript.clone();
        clone.record("GET", "http://h/", None, Ok((200, "")));
        assert_eq!(transcript.len(), 1);
        assert!(!transcript.is_empty());
    }

    #[test]
    fn test_non_json_bodies_are_kept_as_text() {
        let transcript = Transcript::new();
        transcript.record(
            "POST",
            "http://h/ehr/e/composition",
            Some(r#"{"_type":"XYZ""#),
            Ok((400, "Bad Request")),
        );
        let entry = &transcript.entries()[0];
        assert_eq!(entry.request_body, Some(Value::String(r#"{"_type":"XYZ""#.into())));
        assert_eq!(entry.response_body, Some(Value::String("Bad Request".into())));
    }

    #[test]
    fn test_recording_continues_after_poisoned_lock() {
        let transcript = Transcript::new();
        transcript.record("GET", "http://h/a", None, Ok((200, "")));

        let clone = transcript.clone();
        let _ = std::thread::spawn(move || {
            let _guard = clone.entries.lock().unwrap();
            panic!("poison the transcript lock");
        })
        .join();
        assert!(transcript.entries.is_poisoned());

        transcript.record("GET", "http://h/b", None, Ok((200, "")));
        let entries = transcript.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].sequence, 2);
        assert_eq!(entries[1].url, "http://h/b");
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.json");
        let transcript = Transcript::new();
        transcript.record("GET", "http://h/ehr/x", None, Ok((404, r#"{"message":"not found"}"#)));

        transcript.write_json(&path).unwrap();

        let written: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0]["status"], 404);
        assert_eq!(written[0]["method"], "GET");
    }
}
