#![allow(dead_code)]

use conformance_core::{ConformanceConfig, OpenEhrClient, Session, Transcript};
use openehr_stub::{StubOptions, StubServer};

/// Set to `1` together with `EHR_CONFORMANCE_BASE_URL` to run against a real server.
pub const ENV_LIVE: &str = "EHR_CONFORMANCE_LIVE";

/// A session plus the stub backing it, if any. The stub stops when this is dropped.
pub struct TestTarget {
    pub session: Session,
    pub transcript: Transcript,
    _server: Option<StubServer>,
}

/// Configuration for a live server, when one is requested through the environment.
pub fn live_config() -> Option<ConformanceConfig> {
    let live = std::env::var(ENV_LIVE).map(|v| v == "1").unwrap_or(false);
    let has_base_url = std::env::var(conformance_core::constants::ENV_BASE_URL)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    if !(live && has_base_url) {
        return None;
    }
    Some(ConformanceConfig::load().expect("live configuration must be valid"))
}

/// A conforming target: the live server when configured, else a default stub.
pub async fn conforming_target() -> TestTarget {
    match live_config() {
        Some(config) => {
            let transcript = Transcript::new();
            let client = OpenEhrClient::new(&config)
                .unwrap()
                .with_transcript(transcript.clone());
            let session = Session::establish_with_client(config, client)
                .await
                .expect("live session must be established");
            TestTarget {
                session,
                transcript,
                _server: None,
            }
        }
        None => stub_target(StubOptions::default()).await,
    }
}

/// A session against a fresh in-process stub started with `options`.
pub async fn stub_target(options: StubOptions) -> TestTarget {
    let server = StubServer::start(options).await.unwrap();
    let config = ConformanceConfig::new(server.base_url()).unwrap();
    stub_target_with_config(server, config).await
}

/// A session against `server` using `config`.
pub async fn stub_target_with_config(server: StubServer, config: ConformanceConfig) -> TestTarget {
    let transcript = Transcript::new();
    let client = OpenEhrClient::new(&config)
        .unwrap()
        .with_transcript(transcript.clone());
    let session = Session::establish_with_client(config, client).await.unwrap();
    TestTarget {
        session,
        transcript,
        _server: Some(server),
    }
}
