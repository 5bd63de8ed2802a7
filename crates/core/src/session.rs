//! Conformance session.
//!
//! A [`Session`] is established once per run. It owns the HTTP client, the composition fixture
//! and a known-good EHR id on the target server, and is read-only afterwards. Checks borrow it.
//!
//! Provisioning:
//! - a configured EHR id is confirmed with `GET /ehr/{ehr_id}`, which must return 200
//! - otherwise a new EHR is created with `POST /ehr`; the id is read from `ehr_id.value` in the
//!   body, falling back to the last segment of the `Location` header
//!
//! Failure to provision is fatal to the whole run.

use crate::client::OpenEhrClient;
use crate::config::ConformanceConfig;
use crate::response::ResponseEnvelope;
use crate::{ConformanceError, ConformanceResult};
use ehr_uuid::EhrId;
use openehr::{rest, CompositionPayload, ObjectVersionId};
use reqwest::header::LOCATION;
use reqwest::StatusCode;
use serde_json::Value;

/// Read-only state shared by every check in a run.
#[derive(Debug)]
pub struct Session {
    config: ConformanceConfig,
    client: OpenEhrClient,
    ehr_id: EhrId,
    composition: CompositionPayload,
}

impl Session {
    /// Build a client from `config` and provision the EHR.
    pub async fn establish(config: ConformanceConfig) -> ConformanceResult<Self> {
        let client = OpenEhrClient::new(&config)?;
        Self::establish_with_client(config, client).await
    }

    /// Provision the EHR using a prepared client, e.g. one recording a transcript.
    pub async fn establish_with_client(
        config: ConformanceConfig,
        client: OpenEhrClient,
    ) -> ConformanceResult<Self> {
        let composition = config.load_composition()?;

        let ehr_id = match config.ehr_id() {
            Some(ehr_id) => {
                confirm_ehr(&client, ehr_id).await?;
                tracing::info!("using configured EHR {}", ehr_id);
                ehr_id
            }
            None => {
                let ehr_id = create_ehr(&client).await?;
                tracing::info!("provisioned EHR {}", ehr_id);
                ehr_id
            }
        };

        Ok(Self {
            config,
            client,
            ehr_id,
            composition,
        })
    }

    pub fn config(&self) -> &ConformanceConfig {
        &self.config
    }

    pub fn client(&self) -> &OpenEhrClient {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn ehr_id(&self) -> EhrId {
        self.ehr_id
    }

    /// The fixture exactly as loaded.
    pub fn composition(&self) -> &CompositionPayload {
        &self.composition
    }

    /// The fixture to submit for a create: stamped with a fresh uid when configured.
    pub fn composition_for_create(&self) -> ConformanceResult<CompositionPayload> {
        if !self.config.fresh_uids() {
            return Ok(self.composition.clone());
        }
        let uid = ObjectVersionId::fresh(self.config.system_id())?;
        Ok(self.composition.with_uid(&uid))
    }
}

/// Create an EHR on the server and return its id.
pub async fn create_ehr(client: &OpenEhrClient) -> ConformanceResult<EhrId> {
    let response = client.post_empty(&rest::ehr_path()).await?;
    if response.status != StatusCode::CREATED {
        return Err(ConformanceError::Provisioning(format!(
            "POST {} returned {}: {}",
            client.url(&rest::ehr_path()),
            response.status,
            crate::response::excerpt(&response.body)
        )));
    }

    let raw = ehr_id_from_response(&response).ok_or_else(|| {
        ConformanceError::Provisioning(
            "EHR created but no id found in body or Location header".to_string(),
        )
    })?;

    EhrId::parse(&raw).map_err(|e| {
        ConformanceError::Provisioning(format!("server returned malformed EHR id '{}': {}", raw, e))
    })
}

async fn confirm_ehr(client: &OpenEhrClient, ehr_id: EhrId) -> ConformanceResult<()> {
    let path = rest::ehr_by_id_path(&ehr_id.to_string());
    let response = client.get(&path).await?;
    if response.status == StatusCode::OK {
        return Ok(());
    }
    Err(ConformanceError::Provisioning(format!(
        "configured EHR {} is not available: GET {} returned {}",
        ehr_id,
        client.url(&path),
        response.status
    )))
}

fn ehr_id_from_response(response: &ResponseEnvelope) -> Option<String> {
    let from_body = response
        .json
        .as_ref()
        .and_then(|json| json.pointer("/ehr_id/value"))
        .and_then(Value::as_str)
        .map(str::to_string);

    from_body.or_else(|| {
        response
            .header(LOCATION.as_str())
            .and_then(rest::last_path_segment)
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn created(headers: &[(&'static str, &str)], body: &str) -> ResponseEnvelope {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        ResponseEnvelope::new(StatusCode::CREATED, map, body.to_string())
    }

    #[test]
    fn test_ehr_id_read_from_body_first() {
        let response = created(
            &[("location", "http://h/openehr/v1/ehr/from-location")],
            r#"{"ehr_id":{"value":"from-body"}}"#,
        );
        assert_eq!(ehr_id_from_response(&response).as_deref(), Some("from-body"));
    }

    #[test]
    fn test_ehr_id_falls_back_to_location() {
        let response = created(
            &[("location", "http://h/openehr/v1/ehr/7d44b88c-4199-4bad-97dc-d78268e01398")],
            "",
        );
        assert_eq!(
            ehr_id_from_response(&response).as_deref(),
            Some("7d44b88c-4199-4bad-97dc-d78268e01398")
        );
        assert!(ehr_id_from_response(&created(&[], "{}")).is_none());
    }
}
