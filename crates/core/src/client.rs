//! HTTP client for the openEHR REST API.
//!
//! Wraps one reusable `reqwest::Client` bound to the configured base URL. Every request carries
//! `Accept: application/json`; mutating requests also carry `Content-Type`, `Prefer` and the
//! openEHR headers when configured.

use crate::config::ConformanceConfig;
use crate::response::ResponseEnvelope;
use crate::transcript::Transcript;
use crate::{ConformanceError, ConformanceResult};
use openehr::rest::{
    audit_details_for_creation, join_url, HEADER_OPENEHR_AUDIT_DETAILS, HEADER_OPENEHR_VERSION,
    HEADER_PREFER, MEDIA_TYPE_JSON, PREFER_RETURN_REPRESENTATION,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};

/// Client bound to one openEHR server.
#[derive(Clone, Debug)]
pub struct OpenEhrClient {
    base_url: String,
    client: Client,
    openehr_version: Option<String>,
    audit_details: Option<String>,
    transcript: Option<Transcript>,
}

impl OpenEhrClient {
    pub fn new(config: &ConformanceConfig) -> ConformanceResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ConformanceError::ClientBuild)?;

        Ok(Self {
            base_url: config.base_url().trim_end_matches('/').to_string(),
            client,
            openehr_version: config.openehr_version().map(str::to_string),
            audit_details: config.audit_committer().map(audit_details_for_creation),
            transcript: None,
        })
    }

    /// Record every exchange into `transcript`.
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }

    /// Absolute URL for a resource path relative to the base URL.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// GET a resource.
    pub async fn get(&self, path: &str) -> ConformanceResult<ResponseEnvelope> {
        self.send(Method::GET, path, None, true).await
    }

    /// POST a JSON body with the mandatory headers.
    pub async fn post_json(&self, path: &str, body: &str) -> ConformanceResult<ResponseEnvelope> {
        self.send(Method::POST, path, Some(body), true).await
    }

    /// POST without a body, e.g. to create an EHR with a server-assigned status.
    pub async fn post_empty(&self, path: &str) -> ConformanceResult<ResponseEnvelope> {
        self.send(Method::POST, path, None, false).await
    }

    /// POST a body with the mandatory headers except `Content-Type`.
    pub async fn post_without_content_type(
        &self,
        path: &str,
        body: &str,
    ) -> ConformanceResult<ResponseEnvelope> {
        self.send(Method::POST, path, Some(body), false).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&str>,
        with_content_type: bool,
    ) -> ConformanceResult<ResponseEnvelope> {
        let url = self.url(path);
        let request = self.build_request(method.clone(), &url, body, with_content_type);

        tracing::debug!("{} {}", method, url);

        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => {
                self.record(&method, &url, body, Err(&source.to_string()));
                return Err(ConformanceError::Request {
                    method: method.to_string(),
                    url,
                    source,
                });
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let text = match response.text().await {
            Ok(text) => text,
            Err(source) => {
                self.record(&method, &url, body, Err(&source.to_string()));
                return Err(ConformanceError::ResponseBody { url, source });
            }
        };

        tracing::debug!("{} {} -> {}: {}", method, url, status, text);
        self.record(&method, &url, body, Ok((status.as_u16(), &text)));

        Ok(ResponseEnvelope::new(status, headers, text))
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        with_content_type: bool,
    ) -> RequestBuilder {
        let mutating = method == Method::POST;
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, MEDIA_TYPE_JSON);

        if let Some(version) = &self.openehr_version {
            request = request.header(HEADER_OPENEHR_VERSION, version);
        }

        if mutating {
            request = request.header(HEADER_PREFER, PREFER_RETURN_REPRESENTATION);
            if let Some(audit) = &self.audit_details {
                request = request.header(HEADER_OPENEHR_AUDIT_DETAILS, audit);
            }
        }

        if let Some(body) = body {
            if with_content_type {
                request = request.header(CONTENT_TYPE, MEDIA_TYPE_JSON);
            }
            request = request.body(body.to_string());
        }

        request
    }

    fn record(&self, method: &Method, url: &str, body: Option<&str>, outcome: Result<(u16, &str), &str>) {
        if let Some(transcript) = &self.transcript {
            transcript.record(method.as_str(), url, body, outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(config: ConformanceConfig) -> OpenEhrClient {
        OpenEhrClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let c = client(ConformanceConfig::new("http://localhost:8080/openehr/v1/").unwrap());
        assert_eq!(c.base_url(), "http://localhost:8080/openehr/v1");
        assert_eq!(
            c.url("/ehr/abc/composition"),
            "http://localhost:8080/openehr/v1/ehr/abc/composition"
        );
    }

    #[test]
    fn test_mutating_requests_carry_mandatory_headers() {
        let config = ConformanceConfig::new("http://localhost:8080/openehr/v1")
            .unwrap()
            .with_openehr_version("1.0.3")
            .with_audit_committer("Conformance Bot");
        let c = client(config);

        let request = c
            .build_request(Method::POST, &c.url("ehr/e/composition"), Some("{}"), true)
            .build()
            .unwrap();
        let headers = request.headers();

        assert_eq!(headers[CONTENT_TYPE], MEDIA_TYPE_JSON);
        assert_eq!(headers[ACCEPT], MEDIA_TYPE_JSON);
        assert_eq!(headers[HEADER_PREFER], PREFER_RETURN_REPRESENTATION);
        assert_eq!(headers[HEADER_OPENEHR_VERSION], "1.0.3");
        assert!(headers[HEADER_OPENEHR_AUDIT_DETAILS]
            .to_str()
            .unwrap()
            .contains("committer.name=\"Conformance Bot\""));
    }

    #[test]
    fn test_get_has_no_body_headers() {
        let c = client(ConformanceConfig::new("http://localhost:8080/openehr/v1").unwrap());
        let request = c
            .build_request(Method::GET, &c.url("ehr/e"), None, true)
            .build()
            .unwrap();
        let headers = request.headers();

        assert_eq!(headers[ACCEPT], MEDIA_TYPE_JSON);
        assert!(!headers.contains_key(CONTENT_TYPE));
        assert!(!headers.contains_key(HEADER_PREFER));
        assert!(!headers.contains_key(HEADER_OPENEHR_VERSION));
    }

    #[test]
    fn test_content_type_can_be_omitted() {
        let c = client(ConformanceConfig::new("http://localhost:8080/openehr/v1").unwrap());
        let request = c
            .build_request(Method::POST, &c.url("ehr/e/composition"), Some("{}"), false)
            .build()
            .unwrap();
        assert!(!request.headers().contains_key(CONTENT_TYPE));
        assert_eq!(request.headers()[HEADER_PREFER], PREFER_RETURN_REPRESENTATION);
    }
}
