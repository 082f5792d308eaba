use crate::domain::entities::trade::TradeRecord;
use crate::domain::error::DomainError;
use async_trait::async_trait;

/// Paginated source of trade records for a market.
///
/// Implementations classify failures into the `DomainError` taxonomy:
/// `Transient` errors are retried by the engine at the same offset, anything
/// else aborts the market. Timestamps in returned records are already
/// normalized to UTC.
#[async_trait]
pub trait TradeSource: Send + Sync {
    async fn fetch_page(
        &self,
        market_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TradeRecord>, DomainError>;
}
