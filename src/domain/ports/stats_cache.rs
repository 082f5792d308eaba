use crate::domain::entities::trade::WalletStats;

/// Process-lifetime cache for wallet stats. Injectable so production use
/// can bound it instead of letting it grow for as long as the run lives.
///
/// Implementations must be safe for concurrent access: worker loops for
/// different markets share one cache.
pub trait StatsCache: Send + Sync {
    fn get(&self, wallet: &str) -> Option<WalletStats>;
    fn put(&self, wallet: &str, stats: WalletStats);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
