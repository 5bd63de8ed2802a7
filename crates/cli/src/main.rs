use anyhow::Context;
use clap::{Parser, Subcommand};
use conformance_core::{
    run_checks, session::create_ehr, Check, ConformanceConfig, OpenEhrClient, RunReport, Session,
    Transcript,
};
use ehr_uuid::EhrId;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ehr-conformance")]
#[command(about = "openEHR REST composition conformance checks")]
struct Cli {
    /// Server base URL (overrides EHR_CONFORMANCE_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Known-good EHR id (overrides EHR_CONFORMANCE_EHR_ID)
    #[arg(long, global = true)]
    ehr_id: Option<String>,
    /// Composition fixture file (overrides EHR_CONFORMANCE_COMPOSITION)
    #[arg(long, global = true)]
    composition: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available checks
    List,
    /// Run checks against the configured server
    Run {
        /// Check to run (repeatable); all checks when omitted
        #[arg(long = "check")]
        checks: Vec<String>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
        /// Write every HTTP exchange to this file as JSON
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// Create an EHR on the configured server and print its id
    ProvisionEhr,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("conformance_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            for check in Check::ALL {
                println!("{:<46} {}", check.name(), check.description());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            ref checks,
            json,
            ref transcript,
        } => {
            let selected = select_checks(checks)?;
            let config = resolve_config(&cli)?;
            let report = run(config, &selected, transcript.as_deref()).await?;

            if json {
                println!("{}", report.to_json_pretty()?);
            } else {
                print_report(&report);
            }

            Ok(if report.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::ProvisionEhr => {
            let config = resolve_config(&cli)?;
            let client = OpenEhrClient::new(&config)?;
            tracing::info!("++ Creating EHR on {}", client.base_url());
            let ehr_id = create_ehr(&client)
                .await
                .context("failed to create EHR")?;
            tracing::info!("created EHR {}", ehr_id);
            println!("{}", ehr_id);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Establish a session and run `checks`. With `transcript_path`, every exchange is written
/// there, including those of a session that could not be established.
async fn run(
    config: ConformanceConfig,
    checks: &[Check],
    transcript_path: Option<&Path>,
) -> anyhow::Result<RunReport> {
    tracing::info!(
        "++ Running {} checks against {}",
        checks.len(),
        config.base_url()
    );
    let recorder = Transcript::new();
    let mut client = OpenEhrClient::new(&config)?;
    if transcript_path.is_some() {
        client = client.with_transcript(recorder.clone());
    }

    let report = match Session::establish_with_client(config, client).await {
        Ok(session) => Ok(run_checks(&session, checks).await),
        Err(e) => Err(anyhow::Error::new(e).context("failed to establish conformance session")),
    };

    if let Some(path) = transcript_path {
        recorder
            .write_json(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("wrote {} exchanges to {}", recorder.len(), path.display());
    }

    report
}

fn resolve_config(cli: &Cli) -> anyhow::Result<ConformanceConfig> {
    let mut config = ConformanceConfig::load().context("invalid conformance configuration")?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.as_str())?;
    }
    if let Some(ehr_id) = &cli.ehr_id {
        config = config.with_ehr_id(EhrId::parse(ehr_id)?);
    }
    if let Some(path) = &cli.composition {
        config = config.with_composition_path(path);
    }
    Ok(config)
}

fn select_checks(names: &[String]) -> anyhow::Result<Vec<Check>> {
    if names.is_empty() {
        return Ok(Check::ALL.to_vec());
    }
    names
        .iter()
        .map(|name| name.parse::<Check>().map_err(anyhow::Error::from))
        .collect()
}

fn print_report(report: &RunReport) {
    println!("Target: {}", report.base_url);
    println!("EHR:    {}", report.ehr_id);
    for outcome in &report.outcomes {
        let status = if outcome.passed { "PASS" } else { "FAIL" };
        println!("{} {} ({} ms)", status, outcome.check, outcome.duration_ms);
        if let Some(message) = &outcome.message {
            println!("     {}", message);
        }
    }
    println!(
        "{} of {} checks passed",
        report.passed_count(),
        report.outcomes.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_select_checks() {
        assert_eq!(select_checks(&[]).unwrap(), Check::ALL.to_vec());
        assert_eq!(
            select_checks(&["reject_unknown_ehr_id".to_string()]).unwrap(),
            vec![Check::RejectUnknownEhrId]
        );
        assert!(select_checks(&["nope".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_transcript_is_written_when_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.json");
        let config = ConformanceConfig::new("http://127.0.0.1:9/openehr/v1")
            .unwrap()
            .with_timeout(std::time::Duration::from_secs(2));

        let err = run(config, &Check::ALL, Some(path.as_path())).await.unwrap_err();
        assert!(err.to_string().contains("failed to establish"));

        let written: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0]["method"], "POST");
        assert!(written[0]["url"].as_str().unwrap().ends_with("/ehr"));
        assert!(written[0]["error"].is_string());
    }

    #[test]
    fn test_run_arguments_parse() {
        let cli = Cli::parse_from([
            "ehr-conformance",
            "run",
            "--check",
            "create_composition",
            "--check",
            "get_composition",
            "--json",
            "--base-url",
            "http://localhost:8080/openehr/v1",
        ]);
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:8080/openehr/v1"));
        match cli.command {
            Commands::Run { checks, json, transcript } => {
                assert_eq!(checks, vec!["create_composition", "get_composition"]);
                assert!(json);
                assert!(transcript.is_none());
            }
            _ => panic!("expected run"),
        }
    }
}
