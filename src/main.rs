use std::process::ExitCode;

use anyhow::Context;
use conformance_core::{Check, ConformanceConfig, Session, run_checks};
use openehr_stub::{StubOptions, StubServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Self-test entry point
///
/// Starts the in-memory openEHR stub on an ephemeral port, runs every conformance check
/// against it and prints the run report as JSON. Exits non-zero if any check fails.
///
/// # Environment Variables
/// - `EHR_CONFORMANCE_COMPOSITION`: composition fixture file (default: bundled fixture)
/// - `RUST_LOG`: log filter (default directive: `conformance_core=info`)
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("conformance_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let server = StubServer::start(StubOptions::default())
        .await
        .context("failed to start stub server")?;
    tracing::info!("++ Stub openEHR server on {}", server.base_url());

    let mut config = ConformanceConfig::new(server.base_url())?;
    if let Ok(path) = std::env::var(conformance_core::constants::ENV_COMPOSITION) {
        if !path.trim().is_empty() {
            config = config.with_composition_path(path);
        }
    }

    let session = Session::establish(config)
        .await
        .context("failed to establish conformance session")?;
    let report = run_checks(&session, &Check::ALL).await;

    println!("{}", report.to_json_pretty()?);
    tracing::info!(
        "{} of {} checks passed",
        report.passed_count(),
        report.outcomes.len()
    );

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
