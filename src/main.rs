mod config;
mod dispatcher;
mod engine;
mod error;
mod events;
mod handlers;
mod model;
mod online;
mod policy;
mod scan;
mod service;
mod sync_cache;
mod transfer;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use config::{Cli, Config};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use service::{ServiceBackend, ServiceClient};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(parse_log_level(&cli.log_level).into())
                .from_env_lossy(),
        )
        .init();

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            error!("Configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn parse_log_level(level: &str) -> Level {
    level.parse().unwrap_or(Level::INFO)
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!(
        "Sync [{:?}] - working off {}: dry_run={}",
        config.sync,
        config.base_dir.display(),
        config.dry_run
    );

    let params = &config.connection_params;
    let client: Arc<dyn ServiceBackend> = Arc::new(
        ServiceClient::connect(
            &params.account,
            &params.consumer_key,
            &params.consumer_secret,
            &params.access_token,
            &params.access_token_secret,
            params.test_upload,
        )
        .await?,
    );

    let on_disk = scan::local::scan(&config.base_dir)?;
    info!("Disk: {}", on_disk.stats);

    let on_line = scan::remote::scan(&client).await?;
    info!("Service: {}", on_line.stats);

    let summary = engine::synchronize(
        on_disk.folder,
        on_line.folder,
        &config.sync,
        Arc::clone(&client),
        config.dry_run,
        config.force_refresh,
    )
    .await?;

    print_summary(&on_disk.stats, &on_line.stats, &summary);

    Ok(())
}

fn print_summary(on_disk: &model::Stats, on_line: &model::Stats, summary: &dispatcher::PassSummary) {
    println!();
    println!("Scan Results");
    println!("{}", "=".repeat(50));
    println!("On disk                : {on_disk}");
    println!("Service                : {on_line}");
    println!("Actions:");
    println!("  {:<21}:               : {} / {}", "Total", summary.total_processed, summary.total_submitted);

    let mut kinds: Vec<_> = summary.event_counts.iter().collect();
    kinds.sort_by_key(|(kind, _)| **kind);
    for (kind, count) in kinds {
        println!("  {kind:<21}:               : {count}");
    }
    println!();
}
