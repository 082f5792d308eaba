use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One trade as returned by the trades endpoint, timestamp already
/// normalized to UTC (the wire value may be in seconds or milliseconds;
/// the client disambiguates per response).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub market_id: String,
    pub timestamp: DateTime<Utc>,
    pub wallet: String,
    pub side: String,
    pub size: f64,
    pub price: f64,
}

/// Aggregate stats for a wallet, from the `/value` and `/traded` lookups.
///
/// The zero default doubles as the lookup-failure value: a wallet whose
/// stats could not be fetched is cached as zeros and indistinguishable from
/// a wallet that genuinely has none. Deliberately lossy — callers must not
/// treat zero as "lookup succeeded".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletStats {
    pub total_value: f64,
    pub total_trades: i64,
}

/// A trade joined with its wallet's stats — the unit persisted to the
/// output sink. Kept flat so it serializes directly as one CSV row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedTrade {
    pub condition_id: String,
    pub timestamp: DateTime<Utc>,
    pub wallet: String,
    pub side: String,
    pub size: f64,
    pub price: f64,
    pub wallet_total_value: f64,
    pub wallet_total_trades: i64,
}

impl EnrichedTrade {
    pub fn from_trade(trade: &TradeRecord, stats: WalletStats) -> Self {
        Self {
            condition_id: trade.market_id.clone(),
            timestamp: trade.timestamp,
            wallet: trade.wallet.clone(),
            side: trade.side.clone(),
            size: trade.size,
            price: trade.price,
            wallet_total_value: stats.total_value,
            wallet_total_trades: stats.total_trades,
        }
    }
}
