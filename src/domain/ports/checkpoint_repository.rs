use crate::domain::entities::checkpoint::CheckpointRecord;
use crate::domain::error::DomainError;
use serde::Serialize;
use std::collections::HashSet;

/// Counts shown by the `status` command for one window configuration.
#[derive(Debug, Default, Serialize)]
pub struct CheckpointSummary {
    pub window_key: String,
    pub total: usize,
    pub done: usize,
    pub structurally_dead: usize,
    pub empty: usize,
}

/// Durable per-market progress store. Read before each run to filter the
/// active set, written immediately after each market reaches a terminal
/// state. Write failures are fatal to the run.
pub trait CheckpointRepository: Send + Sync {
    fn get(&self, market_id: &str) -> Result<Option<CheckpointRecord>, DomainError>;
    fn upsert(&self, record: &CheckpointRecord) -> Result<(), DomainError>;
    /// Markets excluded from the active set for this window configuration:
    /// structurally dead, or already done for `window_key`.
    fn excluded_ids(&self, window_key: &str) -> Result<HashSet<String>, DomainError>;
    fn summary(&self, window_key: &str) -> Result<CheckpointSummary, DomainError>;
}
