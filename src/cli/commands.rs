use crate::infrastructure::http::data_api::DEFAULT_BASE_URL;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "polypull", about = "Checkpointed trade collector for Polymarket-style data APIs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect trades for every market in the list not already done or dead
    Run {
        /// Market list CSV (conditionId, question, closedTime, endDate)
        #[arg(long)]
        markets: PathBuf,
        /// Output directory, one CSV per market
        #[arg(long, default_value = "./trades")]
        out_dir: String,
        /// Trailing window length, ending at each market's close
        #[arg(long, default_value = "24")]
        window_hours: i64,
        /// Page size for the trades endpoint
        #[arg(long, default_value = "100")]
        limit: u64,
        /// Buffered records per market before a flush
        #[arg(long, default_value = "3000")]
        chunk_size: usize,
        /// Offset-0 pages shorter than this mark the market dead (0 disables)
        #[arg(long, default_value = "10")]
        min_lifetime_trades: usize,
        /// Offset-0 in-window counts below this mark the market dead (0 disables)
        #[arg(long, default_value = "5")]
        min_recent_trades: usize,
        /// Server-side CASH trade-size filter in USD
        #[arg(long)]
        filter_amount: Option<u64>,
        /// Consecutive no-progress pages before a market is cut off
        #[arg(long, default_value = "3")]
        stagnation_limit: u32,
        /// Target spacing between remote requests
        #[arg(long, default_value = "500")]
        request_delay_ms: u64,
        /// Pause before retrying a transient failure
        #[arg(long, default_value = "5")]
        retry_delay_secs: u64,
        /// Concurrent market loops (1 = sequential reference behavior)
        #[arg(long, default_value = "1")]
        concurrency: usize,
        /// Fail a market on any malformed trade record instead of skipping it
        #[arg(long)]
        strict_parsing: bool,
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
    },
    /// Show checkpoint counts for a window configuration
    Status {
        #[arg(long, default_value = "24")]
        window_hours: i64,
        #[arg(long)]
        filter_amount: Option<u64>,
    },
}
