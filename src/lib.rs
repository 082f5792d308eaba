pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use crate::application::engine::IngestionEngine;
use crate::application::enrichment::EnrichmentService;
use crate::config::IngestConfig;
use crate::domain::entities::market::MarketDescriptor;
use crate::domain::error::DomainError;
use crate::domain::ports::checkpoint_repository::{CheckpointRepository, CheckpointSummary};
use crate::domain::ports::stats_cache::StatsCache;
use crate::domain::ports::trade_sink::TradeSink;
use crate::domain::ports::trade_source::TradeSource;
use crate::domain::ports::wallet_stats::WalletStatsSource;
use crate::domain::values::outcome::RunReport;
use crate::infrastructure::cache::memory::InMemoryStatsCache;
use crate::infrastructure::http::data_api::DataApiClient;
use crate::infrastructure::http::rate_limit::TokenBucketLimiter;
use crate::infrastructure::sink::csv::CsvDirSink;
use crate::infrastructure::sqlite::checkpoint_repo::SqliteCheckpointRepo;
use crate::infrastructure::sqlite::migrations::run_migrations;
use rusqlite::Connection;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Facade wiring the engine's ports to the real infrastructure: the data
/// API behind a shared rate limiter, SQLite checkpoints, a per-market CSV
/// sink and an in-memory wallet-stats cache.
pub struct Polypull {
    engine: IngestionEngine,
    checkpoints: Arc<dyn CheckpointRepository>,
}

impl Polypull {
    pub fn new(
        db_path: &str,
        out_dir: &str,
        base_url: &str,
        config: IngestConfig,
    ) -> Result<Self, DomainError> {
        let limiter = TokenBucketLimiter::from_request_delay(config.request_delay);
        let client = Arc::new(DataApiClient::new(base_url, limiter, &config)?);
        let cache: Arc<dyn StatsCache> = Arc::new(InMemoryStatsCache::unbounded());
        Self::with_sources(
            db_path,
            out_dir,
            client.clone() as Arc<dyn TradeSource>,
            client as Arc<dyn WalletStatsSource>,
            cache,
            config,
        )
    }

    /// Wiring seam for tests and alternative transports: any trade source,
    /// stats source and cache over the standard SQLite + CSV storage.
    pub fn with_sources(
        db_path: &str,
        out_dir: &str,
        source: Arc<dyn TradeSource>,
        stats: Arc<dyn WalletStatsSource>,
        cache: Arc<dyn StatsCache>,
        config: IngestConfig,
    ) -> Result<Self, DomainError> {
        let conn = Connection::open(db_path)
            .map_err(|e| DomainError::Checkpoint(format!("DB error: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| DomainError::Checkpoint(format!("WAL error: {e}")))?;
        run_migrations(&conn)?;

        let checkpoints: Arc<dyn CheckpointRepository> = Arc::new(SqliteCheckpointRepo::new(conn));
        let sink: Arc<dyn TradeSink> = Arc::new(CsvDirSink::new(out_dir)?);
        let enrichment = Arc::new(EnrichmentService::new(stats, cache));

        Ok(Self {
            engine: IngestionEngine::new(source, enrichment, checkpoints.clone(), sink, config),
            checkpoints,
        })
    }

    pub async fn run(
        &self,
        markets: Vec<MarketDescriptor>,
        cancel: CancellationToken,
    ) -> Result<RunReport, DomainError> {
        self.engine.run(markets, cancel).await
    }

    pub fn status(&self, window_key: &str) -> Result<CheckpointSummary, DomainError> {
        self.checkpoints.summary(window_key)
    }
}
