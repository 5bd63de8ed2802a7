//! Composition conformance checks.
//!
//! Each check builds a request, sends it through the session's client and asserts the outcome.
//! Checks are independent of one another; the only shared state is the read-only [`Session`].
//! Create checks leave compositions behind on the server.

use crate::constants::{INVALID_EHR_ID, MALFORMED_COMPOSITION};
use crate::session::Session;
use crate::{ConformanceError, ConformanceResult};
use ehr_uuid::EhrId;
use openehr::{rest, ObjectVersionId};
use reqwest::header::{CONTENT_TYPE, ETAG, LOCATION};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A named conformance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    CreateComposition,
    GetComposition,
    RejectMalformedComposition,
    RejectInvalidEhrId,
    RejectUnknownEhrId,
    RejectDuplicateComposition,
    RejectMalformedCompositionForUnknownEhr,
    RejectMissingContentType,
}

impl Check {
    /// Every check, in run order.
    pub const ALL: [Check; 8] = [
        Check::CreateComposition,
        Check::GetComposition,
        Check::RejectMalformedComposition,
        Check::RejectInvalidEhrId,
        Check::RejectUnknownEhrId,
        Check::RejectDuplicateComposition,
        Check::RejectMalformedCompositionForUnknownEhr,
        Check::RejectMissingContentType,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Check::CreateComposition => "create_composition",
            Check::GetComposition => "get_composition",
            Check::RejectMalformedComposition => "reject_malformed_composition",
            Check::RejectInvalidEhrId => "reject_invalid_ehr_id",
            Check::RejectUnknownEhrId => "reject_unknown_ehr_id",
            Check::RejectDuplicateComposition => "reject_duplicate_composition",
            Check::RejectMalformedCompositionForUnknownEhr => {
                "reject_malformed_composition_for_unknown_ehr"
            }
            Check::RejectMissingContentType => "reject_missing_content_type",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Check::CreateComposition => {
                "POST a valid composition: 201 with Location, Content-Type and ETag"
            }
            Check::GetComposition => "GET a created composition version: 200 with a name",
            Check::RejectMalformedComposition => "POST syntactically invalid JSON: 400",
            Check::RejectInvalidEhrId => "POST to a malformed EHR id: 400",
            Check::RejectUnknownEhrId => "POST to a well-formed but unknown EHR id: 404",
            Check::RejectDuplicateComposition => "POST the same composition twice: 201 then 400",
            Check::RejectMalformedCompositionForUnknownEhr => {
                "POST invalid JSON to an unknown EHR id: 400"
            }
            Check::RejectMissingContentType => "POST without Content-Type: 4xx",
        }
    }

    /// Run this check against `session`.
    pub async fn run(self, session: &Session) -> ConformanceResult<()> {
        match self {
            Check::CreateComposition => create_composition(session).await,
            Check::GetComposition => get_composition(session).await,
            Check::RejectMalformedComposition => reject_malformed_composition(session).await,
            Check::RejectInvalidEhrId => reject_invalid_ehr_id(session).await,
            Check::RejectUnknownEhrId => reject_unknown_ehr_id(session).await,
            Check::RejectDuplicateComposition => reject_duplicate_composition(session).await,
            Check::RejectMalformedCompositionForUnknownEhr => {
                reject_malformed_composition_for_unknown_ehr(session).await
            }
            Check::RejectMissingContentType => reject_missing_content_type(session).await,
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Check {
    type Err = ConformanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Check::ALL
            .into_iter()
            .find(|check| check.name() == s.trim())
            .ok_or_else(|| ConformanceError::UnknownCheck(s.to_string()))
    }
}

/// POST a valid composition and require 201 with `Location`, `Content-Type`, `ETag` and a
/// JSON body.
pub async fn create_composition(session: &Session) -> ConformanceResult<()> {
    let context = "create composition";
    let payload = session.composition_for_create()?;
    let path = rest::composition_path(&session.ehr_id().to_string());

    let response = session.client().post_json(&path, &payload.to_body()).await?;

    response.expect_status(StatusCode::CREATED, context)?;
    response.expect_header(LOCATION.as_str(), context)?;
    response.expect_header(CONTENT_TYPE.as_str(), context)?;
    response.expect_header(ETAG.as_str(), context)?;
    response.expect_json(context)?;
    Ok(())
}

/// Create a composition, then GET the returned version and require 200 with a non-null `name`.
pub async fn get_composition(session: &Session) -> ConformanceResult<()> {
    let context = "get composition";
    let version_id = create_composition_version(session).await?;
    let path =
        rest::composition_version_path(&session.ehr_id().to_string(), &version_id.to_string());

    let response = session.client().get(&path).await?;

    response.expect_status(StatusCode::OK, context)?;
    let body = response.expect_json(context)?;
    if body.get("name").map_or(true, Value::is_null) {
        return Err(ConformanceError::Assertion {
            context: context.to_string(),
            expected: "a body with a 'name' field".to_string(),
            actual: "no 'name' field".to_string(),
            body: crate::response::excerpt(&response.body),
        });
    }
    Ok(())
}

/// POST syntactically invalid JSON to the session EHR and require 400.
pub async fn reject_malformed_composition(session: &Session) -> ConformanceResult<()> {
    let path = rest::composition_path(&session.ehr_id().to_string());
    let response = session.client().post_json(&path, MALFORMED_COMPOSITION).await?;
    response.expect_status(StatusCode::BAD_REQUEST, "malformed composition")
}

/// POST a valid composition to a malformed EHR id and require 400.
pub async fn reject_invalid_ehr_id(session: &Session) -> ConformanceResult<()> {
    let payload = session.composition_for_create()?;
    let path = rest::composition_path(INVALID_EHR_ID);
    let response = session.client().post_json(&path, &payload.to_body()).await?;
    response.expect_status(StatusCode::BAD_REQUEST, "invalid EHR id")
}

/// POST a valid composition to a freshly generated EHR id and require 404.
pub async fn reject_unknown_ehr_id(session: &Session) -> ConformanceResult<()> {
    let payload = session.composition_for_create()?;
    let path = rest::composition_path(&EhrId::new().to_string());
    let response = session.client().post_json(&path, &payload.to_body()).await?;
    response.expect_status(StatusCode::NOT_FOUND, "unknown EHR id")
}

/// POST the same composition twice and require 201 then 400.
pub async fn reject_duplicate_composition(session: &Session) -> ConformanceResult<()> {
    let payload = session.composition_for_create()?;
    let body = payload.to_body();
    let path = rest::composition_path(&session.ehr_id().to_string());

    let first = session.client().post_json(&path, &body).await?;
    first.expect_status(StatusCode::CREATED, "first submission")?;

    let second = session.client().post_json(&path, &body).await?;
    second.expect_status(StatusCode::BAD_REQUEST, "duplicate submission")
}

/// POST invalid JSON to an unknown EHR id and require 400: body validity wins over existence.
pub async fn reject_malformed_composition_for_unknown_ehr(
    session: &Session,
) -> ConformanceResult<()> {
    let path = rest::composition_path(&EhrId::new().to_string());
    let response = session.client().post_json(&path, MALFORMED_COMPOSITION).await?;
    response.expect_status(
        StatusCode::BAD_REQUEST,
        "malformed composition for unknown EHR",
    )
}

/// POST a valid composition without `Content-Type` and require a client error.
pub async fn reject_missing_content_type(session: &Session) -> ConformanceResult<()> {
    let payload = session.composition_for_create()?;
    let path = rest::composition_path(&session.ehr_id().to_string());
    let response = session
        .client()
        .post_without_content_type(&path, &payload.to_body())
        .await?;
    response.expect_client_error("missing content type")
}

/// Create a composition and return the version id the server assigned.
pub async fn create_composition_version(session: &Session) -> ConformanceResult<ObjectVersionId> {
    let context = "create composition for retrieval";
    let payload = session.composition_for_create()?;
    let path = rest::composition_path(&session.ehr_id().to_string());

    let response = session.client().post_json(&path, &payload.to_body()).await?;
    response.expect_status(StatusCode::CREATED, context)?;

    response.version_id().ok_or_else(|| ConformanceError::Assertion {
        context: context.to_string(),
        expected: "a version id in ETag, Location or body uid".to_string(),
        actual: "none found".to_string(),
        body: crate::response::excerpt(&response.body),
    })
}
