use crate::domain::entities::trade::WalletStats;
use crate::domain::ports::stats_cache::StatsCache;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

struct CacheInner {
    map: HashMap<String, WalletStats>,
    insertion_order: VecDeque<String>,
}

/// Mutex-guarded wallet-stats cache. Unbounded by default (the reference
/// behavior); pass a capacity for long-running use, where the oldest
/// inserted entry is evicted first — wallets recur in bursts within a
/// market, so insertion-order eviction loses little.
pub struct InMemoryStatsCache {
    inner: Mutex<CacheInner>,
    capacity: Option<usize>,
}

impl InMemoryStatsCache {
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            capacity,
        }
    }
}

impl StatsCache for InMemoryStatsCache {
    fn get(&self, wallet: &str) -> Option<WalletStats> {
        self.inner.lock().ok()?.map.get(wallet).copied()
    }

    fn put(&self, wallet: &str, stats: WalletStats) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.map.insert(wallet.to_string(), stats).is_none() {
            inner.insertion_order.push_back(wallet.to_string());
            if let Some(capacity) = self.capacity {
                while inner.map.len() > capacity.max(1) {
                    if let Some(evicted) = inner.insertion_order.pop_front() {
                        inner.map.remove(&evicted);
                    } else {
                        break;
                    }
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.map.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(value: f64) -> WalletStats {
        WalletStats {
            total_value: value,
            total_trades: 1,
        }
    }

    #[test]
    fn test_get_after_put() {
        let cache = InMemoryStatsCache::unbounded();
        cache.put("0xa", stats(10.0));
        assert_eq!(cache.get("0xa"), Some(stats(10.0)));
        assert_eq!(cache.get("0xb"), None);
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let cache = InMemoryStatsCache::with_capacity(Some(2));
        cache.put("0xa", stats(1.0));
        cache.put("0xb", stats(2.0));
        cache.put("0xc", stats(3.0));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("0xa"), None);
        assert_eq!(cache.get("0xc"), Some(stats(3.0)));
    }

    #[test]
    fn test_overwrite_does_not_grow() {
        let cache = InMemoryStatsCache::with_capacity(Some(2));
        cache.put("0xa", stats(1.0));
        cache.put("0xa", stats(9.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("0xa"), Some(stats(9.0)));
    }
}
