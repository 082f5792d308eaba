use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Durable per-market progress. Created on a market's first terminal state,
/// updated after every later one, never deleted.
///
/// `done` is a map keyed by window configuration (`"24h"`,
/// `"48h_cash1000"`, ...) rather than one column per configuration, so
/// running a new window needs no schema change. Flags are only ever set:
/// `mark_done` and `mark_dead` never clear anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub market_id: String,
    pub structurally_dead: bool,
    /// The market's very first page was empty.
    pub empty: bool,
    pub done: BTreeMap<String, bool>,
    pub last_offset: u64,
    pub updated_at: DateTime<Utc>,
}

impl CheckpointRecord {
    pub fn new(market_id: String) -> Self {
        Self {
            market_id,
            structurally_dead: false,
            empty: false,
            done: BTreeMap::new(),
            last_offset: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn mark_done(&mut self, window_key: &str) {
        self.done.insert(window_key.to_string(), true);
        self.updated_at = Utc::now();
    }

    pub fn mark_dead(&mut self, empty: bool) {
        self.structurally_dead = true;
        self.empty = self.empty || empty;
        self.updated_at = Utc::now();
    }

    pub fn is_done(&self, window_key: &str) -> bool {
        self.done.get(window_key).copied().unwrap_or(false)
    }
}
