//! # openEHR Stub
//!
//! In-memory openEHR REST server implementing the EHR and composition resources exercised by
//! the conformance checks. It is a test double: nothing is persisted and only the composition
//! semantics the checks rely on are implemented.
//!
//! Routes (relative to the mount path, `/openehr/v1` by default):
//! - `POST /ehr`
//! - `GET /ehr/:ehr_id`
//! - `POST /ehr/:ehr_id/composition`
//! - `GET /ehr/:ehr_id/composition/:version_uid`
//!
//! Error responses carry `{ "message": ..., "code": ... }`.

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{StubError, StubResult};

use axum::{
    routing::{get, post},
    Router,
};
use state::Store;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Default mount path of the REST API.
pub const DEFAULT_MOUNT_PATH: &str = "/openehr/v1";

/// Default creating system id for uids the stub assigns.
pub const DEFAULT_SYSTEM_ID: &str = "openehr-stub.local";

/// Server behaviour switches.
///
/// The defaults describe a conforming server. Turning a switch off produces a lenient server,
/// which is how the conformance suite's own tests prove a check can fail.
#[derive(Clone, Debug)]
pub struct StubOptions {
    pub mount_path: String,
    /// Base used for `Location` headers. When unset, `Location` is the mount-relative path.
    pub public_base_url: Option<String>,
    pub system_id: String,
    pub reject_duplicates: bool,
    pub require_content_type: bool,
    /// Off: an unparseable composition body is answered with 201 and a placeholder is stored.
    pub reject_malformed_json: bool,
    /// Off: a malformed EHR id is treated as an unknown one (404).
    pub reject_malformed_ehr_ids: bool,
    /// Off: posting to an unknown EHR id creates that EHR.
    pub reject_unknown_ehrs: bool,
    /// Off: `name` is removed from compositions returned by GET.
    pub return_composition_name: bool,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
            public_base_url: None,
            system_id: DEFAULT_SYSTEM_ID.to_string(),
            reject_duplicates: true,
            require_content_type: true,
            reject_malformed_json: true,
            reject_malformed_ehr_ids: true,
            reject_unknown_ehrs: true,
            return_composition_name: true,
        }
    }
}

impl StubOptions {
    /// Mount path with a leading `/` and no trailing `/`. The root mount is the empty string.
    pub fn normalized_mount_path(&self) -> String {
        let trimmed = self.mount_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    fn validate(&self) -> StubResult<()> {
        openehr::version_id::check_stamped_system_id(&self.system_id)
            .map_err(|e| StubError::InvalidOptions(e.to_string()))
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    options: Arc<StubOptions>,
    store: Arc<RwLock<Store>>,
}

impl AppState {
    pub fn new(options: StubOptions) -> StubResult<Self> {
        options.validate()?;
        Ok(Self {
            store: Arc::new(RwLock::new(Store::new(options.system_id.clone()))),
            options: Arc::new(options),
        })
    }

    pub fn options(&self) -> &StubOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<RwLock<Store>> {
        &self.store
    }

    /// `Location` value for a resource path relative to the mount path.
    fn location(&self, path: &str) -> String {
        match &self.options.public_base_url {
            Some(base) => openehr::rest::join_url(base, path),
            None => format!("{}/{}", self.options.normalized_mount_path(), path),
        }
    }
}

/// Build the router for `state`, nested under the configured mount path.
pub fn router(state: AppState) -> Router {
    let mount_path = state.options.normalized_mount_path();

    let api = Router::new()
        .route("/ehr", post(handlers::create_ehr))
        .route("/ehr/:ehr_id", get(handlers::get_ehr))
        .route("/ehr/:ehr_id/composition", post(handlers::create_composition))
        .route(
            "/ehr/:ehr_id/composition/:version_uid",
            get(handlers::get_composition),
        )
        .with_state(state);

    let app = if mount_path.is_empty() {
        api
    } else {
        Router::new().nest(&mount_path, api)
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// A stub server running on an ephemeral local port. Stops when dropped.
pub struct StubServer {
    addr: SocketAddr,
    base_url: String,
    state: AppState,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Bind `127.0.0.1:0` and serve in a background task.
    pub async fn start(options: StubOptions) -> StubResult<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|source| StubError::Bind {
                addr: "127.0.0.1:0".to_string(),
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| StubError::Bind {
            addr: "127.0.0.1:0".to_string(),
            source,
        })?;

        let base_url = format!("http://{}{}", addr, options.normalized_mount_path());
        let options = StubOptions {
            public_base_url: options.public_base_url.clone().or(Some(base_url.clone())),
            ..options
        };
        let state = AppState::new(options)?;
        let app = router(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("stub server stopped: {}", e);
            }
        });
        tracing::debug!("stub server listening on {}", base_url);

        Ok(Self {
            addr,
            base_url,
            state,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the REST API, including the mount path.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
