//! Sequential check runner and run report.

use crate::checks::Check;
use crate::session::Session;
use crate::{ConformanceError, ConformanceResult};
use chrono::{DateTime, Utc};
use ehr_uuid::EhrId;
use serde::Serialize;
use std::time::Instant;

/// Result of one check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub check: Check,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Outcomes of one run against one server.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub ehr_id: EhrId,
    pub outcomes: Vec<CheckOutcome>,
}

impl RunReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.passed).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed)
    }

    pub fn outcome(&self, check: Check) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|outcome| outcome.check == check)
    }

    pub fn to_json_pretty(&self) -> ConformanceResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| ConformanceError::Serialization {
            what: "run report",
            source,
        })
    }
}

/// Run `checks` in order against `session`.
///
/// A failing check is logged and recorded; the remaining checks still run.
pub async fn run_checks(session: &Session, checks: &[Check]) -> RunReport {
    let started_at = Utc::now();
    let mut outcomes = Vec::with_capacity(checks.len());

    for &check in checks {
        let start = Instant::now();
        let result = check.run(session).await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let outcome = match result {
            Ok(()) => {
                tracing::info!("PASS {} ({} ms)", check, duration_ms);
                CheckOutcome {
                    check,
                    passed: true,
                    message: None,
                    duration_ms,
                }
            }
            Err(e) => {
                tracing::warn!("FAIL {} ({} ms): {}", check, duration_ms, e);
                CheckOutcome {
                    check,
                    passed: false,
                    message: Some(e.to_string()),
                    duration_ms,
                }
            }
        };
        outcomes.push(outcome);
    }

    RunReport {
        started_at,
        base_url: session.base_url().to_string(),
        ehr_id: session.ehr_id(),
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(check: Check, passed: bool) -> CheckOutcome {
        CheckOutcome {
            check,
            passed,
            message: (!passed).then(|| "expected 400, got 201".to_string()),
            duration_ms: 3,
        }
    }

    fn report(outcomes: Vec<CheckOutcome>) -> RunReport {
        RunReport {
            started_at: Utc::now(),
            base_url: "http://localhost:8080/openehr/v1".into(),
            ehr_id: EhrId::parse("7d44b88c-4199-4bad-97dc-d78268e01398").unwrap(),
            outcomes,
        }
    }

    #[test]
    fn test_counts() {
        let report = report(vec![
            outcome(Check::CreateComposition, true),
            outcome(Check::RejectDuplicateComposition, false),
        ]);
        assert!(!report.all_passed());
        assert_eq!(report.passed_count(), 1);
        assert_eq!(
            report.failed().map(|o| o.check).collect::<Vec<_>>(),
            vec![Check::RejectDuplicateComposition]
        );
        assert!(report.outcome(Check::CreateComposition).unwrap().passed);
        assert!(report.outcome(Check::GetComposition).is_none());
    }

    #[test]
    fn test_empty_report_passes() {
        assert!(report(Vec::new()).all_passed());
    }

    #[test]
    fn test_report_json_shape() {
        let report = report(vec![
            outcome(Check::CreateComposition, true),
            outcome(Check::RejectMissingContentType, false),
        ]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["outcomes"][0]["check"], "create_composition");
        assert!(json["outcomes"][0].get("message").is_none());
        assert_eq!(json["outcomes"][1]["check"], "reject_missing_content_type");
        assert_eq!(json["outcomes"][1]["passed"], false);
        assert!(json["started_at"].is_string());
        assert_eq!(json["ehr_id"], "7d44b88c-4199-4bad-97dc-d78268e01398");
    }
}
