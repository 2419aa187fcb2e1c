use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use a3s_trail::{RunMode, RunSummary, TrailConfig, TrailService};

#[derive(Parser)]
#[command(
    name = "a3s-trail",
    version,
    about = "a3s-trail: ingest CloudTrail logs from SQS/S3 and republish them"
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "a3s-trail.yml")]
    config: PathBuf,

    /// Name of S3 bucket used for backfilling (selects backfill mode)
    #[arg(short, long)]
    bucket: Option<String>,

    /// Prefix to be used when listing objects from the backfill bucket
    #[arg(short, long, requires = "bucket")]
    prefix: Option<String>,

    /// Log filter, overrides `log_level` from the config file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config errors are reported after logging is up, so fall back to info
    let config = TrailConfig::from_file(&cli.config);
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.log_level.clone()))
        .unwrap_or_else(|| "info".into());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let result = match config {
        Ok(config) => run(config, RunMode::from_args(cli.bucket, cli.prefix)).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "a3s-trail failed");
        std::process::exit(1);
    }
}

async fn run(config: TrailConfig, mode: RunMode) -> a3s_trail::Result<()> {
    let service = TrailService::connect(config).await?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    tracing::info!("a3s-trail is running! Hit CTRL-C to stop it.");
    match service.run(mode, cancel).await? {
        RunSummary::Backfilled(report) => {
            tracing::info!(enqueued = report.enqueued, "Backfill finished");
        }
        RunSummary::Ingested(totals) => {
            tracing::info!(records = totals.records_published, "Shut down cleanly");
        }
    }
    Ok(())
}

async fn shutdown_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received, finishing current batch");
    cancel.cancel();
}
