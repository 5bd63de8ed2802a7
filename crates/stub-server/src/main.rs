//! Standalone stub server binary.
//!
//! ## Purpose
//! Runs the in-memory openEHR stub on a fixed address so the conformance CLI (or any other
//! client) can be pointed at it.
//!
//! # Environment Variables
//! - `OPENEHR_STUB_ADDR`: listen address (default: "127.0.0.1:8080")
//! - `OPENEHR_STUB_MOUNT_PATH`: REST mount path (default: "/openehr/v1")
//! - `OPENEHR_STUB_PUBLIC_BASE_URL`: base URL used in `Location` headers

use anyhow::Context;
use openehr_stub::{router, AppState, StubOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("openehr_stub=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("OPENEHR_STUB_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());

    let mut options = StubOptions::default();
    if let Ok(mount_path) = std::env::var("OPENEHR_STUB_MOUNT_PATH") {
        options.mount_path = mount_path;
    }
    let public_base_url = std::env::var("OPENEHR_STUB_PUBLIC_BASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| format!("http://{}{}", addr, options.normalized_mount_path()));
    options.public_base_url = Some(public_base_url.clone());

    let state = AppState::new(options)?;
    let app = router(state);

    tracing::info!("-- Starting openEHR stub on {} (base URL {})", addr, public_base_url);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
