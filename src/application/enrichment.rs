use crate::domain::entities::trade::{EnrichedTrade, TradeRecord, WalletStats};
use crate::domain::ports::stats_cache::StatsCache;
use crate::domain::ports::wallet_stats::WalletStatsSource;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Joins trades with their wallet's stats, going to the remote source at
/// most once per wallet per process.
///
/// Lookup failures are cached as zeros, so a flaky stats endpoint cannot
/// cause repeated re-fetching of the same wallet. The cost is that a cached
/// zero is indistinguishable from a genuine zero; downstream consumers of
/// the output already accept that.
pub struct EnrichmentService {
    source: Arc<dyn WalletStatsSource>,
    cache: Arc<dyn StatsCache>,
}

impl EnrichmentService {
    pub fn new(source: Arc<dyn WalletStatsSource>, cache: Arc<dyn StatsCache>) -> Self {
        Self { source, cache }
    }

    pub async fn stats_for(&self, wallet: &str) -> WalletStats {
        if let Some(hit) = self.cache.get(wallet) {
            return hit;
        }
        let stats = match self.source.fetch_stats(wallet).await {
            Ok(stats) => stats,
            Err(e) => {
                debug!(wallet, error = %e, "wallet stats lookup failed; caching zeros");
                WalletStats::default()
            }
        };
        self.cache.put(wallet, stats);
        stats
    }

    /// Enriches a page of trades. Wallets are deduplicated within the page
    /// before any lookup, matching the per-page unique-then-map shape of
    /// the upstream collector.
    pub async fn enrich(&self, trades: &[TradeRecord]) -> Vec<EnrichedTrade> {
        let mut page_stats: HashMap<&str, WalletStats> = HashMap::new();
        for trade in trades {
            if !page_stats.contains_key(trade.wallet.as_str()) {
                let stats = self.stats_for(&trade.wallet).await;
                page_stats.insert(trade.wallet.as_str(), stats);
            }
        }
        trades
            .iter()
            .map(|t| EnrichedTrade::from_trade(t, page_stats[t.wallet.as_str()]))
            .collect()
    }
}
