use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A market selected for collection. Supplied by the upstream market-list
/// cleaning stage; immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDescriptor {
    /// Condition id used as the market key everywhere: API queries,
    /// checkpoints, output files.
    pub condition_id: String,
    pub question: String,
    pub close_time: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl MarketDescriptor {
    pub fn new(
        condition_id: String,
        question: String,
        close_time: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            condition_id,
            question,
            close_time,
            end_date,
        }
    }
}
