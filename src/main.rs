use clap::Parser;
use polypull::cli::commands::{Cli, Commands};
use polypull::config::{IngestConfig, ParsePolicy, VolumeFilter};
use polypull::domain::ports::checkpoint_repository::CheckpointRepository;
use polypull::infrastructure::markets::load_markets;
use polypull::infrastructure::sqlite::checkpoint_repo::SqliteCheckpointRepo;
use polypull::infrastructure::sqlite::migrations::run_migrations;
use polypull::Polypull;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = std::env::var("POLYPULL_DB").unwrap_or_else(|_| "./polypull.db".into());

    if let Err(e) = run_command(&db_path, cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_command(db_path: &str, cmd: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Run {
            markets,
            out_dir,
            window_hours,
            limit,
            chunk_size,
            min_lifetime_trades,
            min_recent_trades,
            filter_amount,
            stagnation_limit,
            request_delay_ms,
            retry_delay_secs,
            concurrency,
            strict_parsing,
            base_url,
        } => {
            let config = IngestConfig {
                window_hours,
                page_limit: limit,
                chunk_size,
                min_lifetime_trades,
                min_recent_trades,
                volume_filter: filter_amount.map(VolumeFilter::cash),
                stagnation_limit,
                request_delay: Duration::from_millis(request_delay_ms),
                retry_delay: Duration::from_secs(retry_delay_secs),
                concurrency,
                parse_policy: if strict_parsing {
                    ParsePolicy::Strict
                } else {
                    ParsePolicy::Lenient
                },
                ..Default::default()
            };

            let engine = Polypull::new(db_path, &out_dir, &base_url, config)?;
            let market_list = load_markets(&markets)?;

            // Ctrl-C requests cancellation; the run is still awaited to
            // completion so every finished market's checkpoint is on disk.
            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("cancellation requested; draining in-flight market loops");
                    signal_cancel.cancel();
                }
            });

            let report = engine.run(market_list, cancel).await?;
            println!("{}", serde_json::to_string_pretty(&report).unwrap());
        }
        Commands::Status {
            window_hours,
            filter_amount,
        } => {
            let window_key = IngestConfig {
                window_hours,
                volume_filter: filter_amount.map(VolumeFilter::cash),
                ..Default::default()
            }
            .window_key();

            let conn = rusqlite::Connection::open(db_path)?;
            run_migrations(&conn)?;
            let repo = SqliteCheckpointRepo::new(conn);
            let summary = repo.summary(&window_key)?;
            println!("{}", serde_json::to_string_pretty(&summary).unwrap());
        }
    }
    Ok(())
}
