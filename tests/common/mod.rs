//! Shared test helpers: scripted in-process ports standing in for the
//! remote API, and harness wiring over an in-memory checkpoint store and a
//! temp-dir CSV sink.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use polypull::config::IngestConfig;
use polypull::domain::entities::market::MarketDescriptor;
use polypull::domain::entities::trade::{TradeRecord, WalletStats};
use polypull::domain::error::DomainError;
use polypull::domain::ports::trade_source::TradeSource;
use polypull::domain::ports::wallet_stats::WalletStatsSource;
use polypull::infrastructure::cache::memory::InMemoryStatsCache;
use polypull::Polypull;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted response from the trades endpoint.
pub enum Step {
    Page(Vec<TradeRecord>),
    Transient,
    Permanent,
}

/// Trade source that replays a per-market script in call order and records
/// every (market, offset) it was asked for. An exhausted script answers
/// with empty pages.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<(String, u64)>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, market_id: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(market_id.to_string(), steps.into());
    }

    pub fn call_log(&self) -> Vec<(String, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeSource for ScriptedSource {
    async fn fetch_page(
        &self,
        market_id: &str,
        offset: u64,
        _limit: u64,
    ) -> Result<Vec<TradeRecord>, DomainError> {
        self.calls
            .lock()
            .unwrap()
            .push((market_id.to_string(), offset));
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(market_id)
            .and_then(|queue| queue.pop_front());
        match step {
            Some(Step::Page(page)) => Ok(page),
            Some(Step::Transient) => Err(DomainError::Transient("scripted timeout".into())),
            Some(Step::Permanent) => Err(DomainError::PermanentClient {
                status: 404,
                message: "scripted not-found".into(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

/// Wallet-stats source that counts lookups; optionally always fails.
pub struct CountingStatsSource {
    pub calls: AtomicUsize,
    fail: bool,
}

impl CountingStatsSource {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletStatsSource for CountingStatsSource {
    async fn fetch_stats(&self, _wallet: &str) -> Result<WalletStats, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DomainError::Transient("scripted stats failure".into()));
        }
        Ok(WalletStats {
            total_value: 1000.0,
            total_trades: 42,
        })
    }
}

pub struct Harness {
    pub engine: Polypull,
    pub source: Arc<ScriptedSource>,
    pub stats: Arc<CountingStatsSource>,
    pub out_dir: tempfile::TempDir,
}

pub fn setup(config: IngestConfig) -> Harness {
    let out_dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::new());
    let stats = Arc::new(CountingStatsSource::new());
    let engine = wire(":memory:", out_dir.path(), source.clone(), stats.clone(), config);
    Harness {
        engine,
        source,
        stats,
        out_dir,
    }
}

/// Wiring against a file-backed checkpoint DB, for resume scenarios that
/// span engine instances.
pub fn wire(
    db_path: &str,
    out_dir: &Path,
    source: Arc<ScriptedSource>,
    stats: Arc<CountingStatsSource>,
    config: IngestConfig,
) -> Polypull {
    Polypull::with_sources(
        db_path,
        out_dir.to_str().unwrap(),
        source,
        stats,
        Arc::new(InMemoryStatsCache::unbounded()),
        config,
    )
    .unwrap()
}

/// Fast-retry config for tests; remote-pacing knobs are irrelevant against
/// scripted sources.
pub fn test_config() -> IngestConfig {
    IngestConfig {
        retry_delay: std::time::Duration::from_millis(10),
        ..Default::default()
    }
}

pub fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

pub fn market(id: &str, close: &str) -> MarketDescriptor {
    MarketDescriptor::new(
        id.to_string(),
        format!("Question for {id}"),
        ts(close),
        ts(close),
    )
}

pub fn trade(market_id: &str, wallet: &str, timestamp: &str) -> TradeRecord {
    TradeRecord {
        market_id: market_id.to_string(),
        timestamp: ts(timestamp),
        wallet: wallet.to_string(),
        side: "BUY".to_string(),
        size: 10.0,
        price: 0.5,
    }
}

/// A page of `count` trades in the API's newest-first order, one second
/// apart, starting at `newest`.
pub fn page_descending(
    market_id: &str,
    wallet_prefix: &str,
    newest: &str,
    count: usize,
) -> Vec<TradeRecord> {
    let newest = ts(newest);
    (0..count)
        .map(|i| TradeRecord {
            market_id: market_id.to_string(),
            timestamp: newest - Duration::seconds(i as i64),
            wallet: format!("{wallet_prefix}{i}"),
            side: "BUY".to_string(),
            size: 10.0,
            price: 0.5,
        })
        .collect()
}

/// Rows of a market's output CSV, header excluded.
pub fn csv_rows(out_dir: &Path, market_id: &str) -> Vec<String> {
    let path = out_dir.join(format!("trades_{market_id}.csv"));
    if !path.exists() {
        return Vec::new();
    }
    let contents = std::fs::read_to_string(path).unwrap();
    contents.lines().skip(1).map(str::to_string).collect()
}
