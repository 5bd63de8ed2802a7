//! Request handlers for the EHR and composition resources.

use crate::error::{StubError, StubResult};
use crate::state::{EhrRecord, StoredComposition};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{
        header::{CONTENT_TYPE, ETAG, LOCATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use ehr_uuid::EhrId;
use openehr::rest::{self, MEDIA_TYPE_JSON};
use openehr::rm_1_1_0::constants::{
    DEFAULT_EHR_STATUS_ARCHETYPE_NODE_ID, DEFAULT_EHR_STATUS_NAME, RM_TYPE_COMPOSITION,
    RM_TYPE_DV_TEXT, RM_TYPE_EHR_STATUS, RM_TYPE_HIER_OBJECT_ID,
};
use openehr::CompositionPayload;
use serde_json::{json, Value};

/// `POST /ehr`: create an EHR. Any request body is ignored.
#[axum::debug_handler]
pub async fn create_ehr(State(state): State<AppState>) -> StubResult<Response> {
    let (record, system_id) = {
        let mut store = state.store.write().await;
        let record = store.create_ehr();
        (record, store.system_id().to_string())
    };
    tracing::info!("created EHR {}", record.ehr_id);

    let location = state.location(&rest::ehr_by_id_path(&record.ehr_id.to_string()));
    let etag = format!("\"{}\"", record.ehr_id);
    Ok(created(
        &location,
        &etag,
        ehr_summary(&record, &system_id),
    ))
}

/// `GET /ehr/{ehr_id}`
#[axum::debug_handler]
pub async fn get_ehr(
    State(state): State<AppState>,
    Path(ehr_id): Path<String>,
) -> StubResult<Json<Value>> {
    let ehr_id = parse_ehr_id(&ehr_id)?;
    let store = state.store.read().await;
    let record = store
        .ehr(&ehr_id)
        .ok_or_else(|| StubError::EhrNotFound(ehr_id.to_string()))?;
    Ok(Json(ehr_summary(record, store.system_id())))
}

/// `POST /ehr/{ehr_id}/composition`
///
/// Checks run in a fixed order: EHR id syntax, content type, body syntax, EHR existence,
/// duplicates. Body errors therefore win over an unknown EHR.
#[axum::debug_handler]
pub async fn create_composition(
    State(state): State<AppState>,
    Path(ehr_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StubResult<Response> {
    let options = &state.options;
    let ehr_id = match parse_ehr_id(&ehr_id) {
        Ok(ehr_id) => ehr_id,
        Err(_) if !options.reject_malformed_ehr_ids => {
            return Err(StubError::EhrNotFound(ehr_id));
        }
        Err(e) => return Err(e),
    };

    if options.require_content_type {
        check_content_type(&headers)?;
    }

    let composition = match serde_json::from_slice::<Value>(&body) {
        Ok(value) => CompositionPayload::from_value(value)
            .map_err(|e| StubError::InvalidComposition(e.to_string()))?,
        Err(_) if !options.reject_malformed_json => placeholder_composition()?,
        Err(e) => return Err(StubError::InvalidJson(e.to_string())),
    };

    let stored = {
        let mut store = state.store.write().await;
        if !options.reject_unknown_ehrs && store.ensure_ehr(ehr_id) {
            tracing::info!("created EHR {} on first composition", ehr_id);
        }
        store.insert_composition(&ehr_id, composition, options.reject_duplicates)?
    };
    tracing::info!("stored composition {} in EHR {}", stored.version_uid, ehr_id);

    Ok(composition_created(&state, &ehr_id, stored))
}

/// `GET /ehr/{ehr_id}/composition/{version_uid}`
///
/// Accepts a full version uid or a bare object id.
#[axum::debug_handler]
pub async fn get_composition(
    State(state): State<AppState>,
    Path((ehr_id, version_uid)): Path<(String, String)>,
) -> StubResult<Response> {
    let ehr_id = parse_ehr_id(&ehr_id)?;
    let store = state.store.read().await;
    let stored = store.composition(&ehr_id, &version_uid)?;

    let mut body = stored.composition.clone().into_value();
    if !state.options.return_composition_name {
        if let Some(document) = body.as_object_mut() {
            document.remove("name");
        }
    }

    let mut response = Json(body).into_response();
    if let Ok(etag) = HeaderValue::from_str(&format!("\"{}\"", stored.version_uid)) {
        response.headers_mut().insert(ETAG, etag);
    }
    Ok(response)
}

fn parse_ehr_id(raw: &str) -> StubResult<EhrId> {
    EhrId::parse(raw).map_err(|_| StubError::MalformedEhrId(raw.to_string()))
}

/// Stored in place of a body that did not parse, when malformed JSON is accepted.
fn placeholder_composition() -> StubResult<CompositionPayload> {
    CompositionPayload::from_value(json!({
        "_type": RM_TYPE_COMPOSITION,
        "name": { "_type": RM_TYPE_DV_TEXT, "value": "unparsed submission" },
    }))
    .map_err(|e| StubError::InvalidComposition(e.to_string()))
}

fn check_content_type(headers: &HeaderMap) -> StubResult<()> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Err(StubError::UnsupportedMediaType("no Content-Type".into()));
    };
    let media_type = value
        .to_str()
        .ok()
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    if media_type.eq_ignore_ascii_case(MEDIA_TYPE_JSON) {
        Ok(())
    } else {
        Err(StubError::UnsupportedMediaType(format!("'{}'", media_type)))
    }
}

fn ehr_summary(record: &EhrRecord, system_id: &str) -> Value {
    json!({
        "system_id": { "value": system_id },
        "ehr_id": { "value": record.ehr_id.to_string() },
        "ehr_status": {
            "_type": RM_TYPE_EHR_STATUS,
            "archetype_node_id": DEFAULT_EHR_STATUS_ARCHETYPE_NODE_ID,
            "name": { "_type": RM_TYPE_DV_TEXT, "value": DEFAULT_EHR_STATUS_NAME },
            "uid": {
                "_type": RM_TYPE_HIER_OBJECT_ID,
                "value": format!("{}::{}::1", record.ehr_id, system_id),
            },
            "is_queryable": true,
            "is_modifiable": true,
        },
        "time_created": { "value": record.time_created.to_rfc3339() },
    })
}

fn composition_created(state: &AppState, ehr_id: &EhrId, stored: StoredComposition) -> Response {
    let version_uid = stored.version_uid.to_string();
    let location = state.location(&rest::composition_version_path(
        &ehr_id.to_string(),
        &version_uid,
    ));
    let etag = format!("\"{}\"", version_uid);
    created(&location, &etag, stored.composition.into_value())
}

fn created(location: &str, etag: &str, body: Value) -> Response {
    let mut response = (StatusCode::CREATED, Json(body)).into_response();
    let headers = response.headers_mut();
    if let Ok(location) = HeaderValue::from_str(location) {
        headers.insert(LOCATION, location);
    }
    if let Ok(etag) = HeaderValue::from_str(etag) {
        headers.insert(ETAG, etag);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(content_type: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        headers
    }

    #[test]
    fn test_content_type_accepts_json_with_parameters() {
        assert!(check_content_type(&headers_with(Some("application/json"))).is_ok());
        assert!(check_content_type(&headers_with(Some("application/json; charset=utf-8"))).is_ok());
        assert!(check_content_type(&headers_with(Some("Application/JSON"))).is_ok());
    }

    #[test]
    fn test_content_type_rejects_missing_or_foreign() {
        assert!(matches!(
            check_content_type(&headers_with(None)),
            Err(StubError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            check_content_type(&headers_with(Some("text/plain"))),
            Err(StubError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_placeholder_composition_is_named() {
        let placeholder = placeholder_composition().unwrap();
        assert_eq!(placeholder.name(), Some("unparsed submission"));
    }

    #[test]
    fn test_parse_ehr_id() {
        assert!(parse_ehr_id("7d44b88c-4199-4bad-97dc-d78268e01398").is_ok());
        assert!(matches!(
            parse_ehr_id("invalid_Ehr_ID"),
            Err(StubError::MalformedEhrId(_))
        ));
    }
}
