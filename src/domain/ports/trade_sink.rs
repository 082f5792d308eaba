use crate::domain::entities::trade::EnrichedTrade;
use crate::domain::error::DomainError;

/// Append-only destination for collected trades, one unit of output per
/// market. Appending to the same market twice must not repeat the header.
///
/// The engine guarantees at most one loop per market at a time, so
/// implementations never see concurrent appends for one market id.
pub trait TradeSink: Send + Sync {
    /// Returns the number of records written.
    fn append(&self, market_id: &str, records: &[EnrichedTrade]) -> Result<usize, DomainError>;
}
