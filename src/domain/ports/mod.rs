pub mod checkpoint_repository;
pub mod stats_cache;
pub mod trade_sink;
pub mod trade_source;
pub mod wallet_stats;
