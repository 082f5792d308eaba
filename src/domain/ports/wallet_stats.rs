use crate::domain::entities::trade::WalletStats;
use crate::domain::error::DomainError;
use async_trait::async_trait;

/// Remote lookup of a wallet's aggregate stats (portfolio value and
/// lifetime trade count — two endpoints upstream, one call here).
#[async_trait]
pub trait WalletStatsSource: Send + Sync {
    async fn fetch_stats(&self, wallet: &str) -> Result<WalletStats, DomainError>;
}
