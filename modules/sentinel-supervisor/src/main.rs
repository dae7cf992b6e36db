use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sentinel_common::{Config, ScannerSettings};
use sentinel_supervisor::deps::open_store;
use sentinel_supervisor::retention::{self, RetentionPolicy};
use sentinel_supervisor::{ScannerDeps, Supervisor};

#[derive(Parser)]
#[command(name = "sentinel", about = "Crisis and rumor triage engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the supervisor loop until Ctrl-C
    Run,
    /// Verify a single claim and print the verdict
    Verify {
        claim: String,
        #[arg(long)]
        location: Option<String>,
    },
    /// Run the retention sweeps once
    Sweep {
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sentinel=info".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run => run().await,
        Command::Verify { claim, location } => verify(&claim, location).await,
        Command::Sweep { database_url } => sweep(database_url.as_deref()).await,
    }
}

async fn run() -> Result<()> {
    info!("Sentinel supervisor starting...");
    let config = Config::from_env()?;
    config.log_redacted();

    let deps = ScannerDeps::from_config(&config).await?;
    let cancel = CancellationToken::new();

    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, finishing current phase"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
        on_signal.cancel();
    });

    Supervisor::new(deps, cancel)?.run().await;
    info!("Sentinel supervisor stopped");
    Ok(())
}

async fn verify(claim: &str, location: Option<String>) -> Result<()> {
    let config = Config::from_env()?;
    let deps = ScannerDeps::from_config(&config).await?;

    let (analysis_id, report) = deps.verifier().verify_adhoc(claim, location).await?;
    info!(
        %analysis_id,
        status = %report.verdict.status,
        retries = report.retries,
        final_query = %report.final_query,
        "Ad hoc analysis complete"
    );
    println!("{}", serde_json::to_string_pretty(&report.verdict)?);
    Ok(())
}

async fn sweep(database_url: Option<&str>) -> Result<()> {
    let settings = ScannerSettings::from_env()?;
    let store = open_store(database_url).await?;
    let report = retention::sweep(
        store.as_ref(),
        &RetentionPolicy::from_settings(&settings),
        Utc::now(),
    )
    .await;
    info!(%report, "Sweep complete");
    Ok(())
}
