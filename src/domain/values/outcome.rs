use serde::Serialize;

/// Why a market's fetch loop reached TERMINATED_DONE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneReason {
    /// A page reached back past the window cutoff.
    WindowCovered,
    /// The API ran out of pages before the cutoff was reached.
    Exhausted,
    /// Repeated-page protection fired.
    RepeatedPage,
    /// Stagnant-page protection fired.
    Stagnation,
}

/// Why a market was classified structurally dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadReason {
    /// Empty page at offset 0: no trade history at all.
    NoHistory,
    /// Lifetime trade count below the configured minimum.
    ThinHistory,
    /// In-window trade count below the configured minimum.
    QuietWindow,
}

/// Terminal state of one market's loop. Aborted markets get no checkpoint
/// and re-run from scratch next time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MarketOutcome {
    Done { reason: DoneReason },
    Dead { reason: DeadReason },
    Aborted { error: String },
}

impl std::fmt::Display for MarketOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketOutcome::Done { reason } => write!(f, "done ({reason:?})"),
            MarketOutcome::Dead { reason } => write!(f, "dead ({reason:?})"),
            MarketOutcome::Aborted { error } => write!(f, "aborted: {error}"),
        }
    }
}

/// Per-market result line in the run report.
#[derive(Debug, Clone, Serialize)]
pub struct MarketReport {
    pub market_id: String,
    pub outcome: MarketOutcome,
    pub pages_fetched: u32,
    pub records_written: usize,
}

/// Whole-run summary returned by the engine and printed by the CLI.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub window_key: String,
    pub markets_considered: usize,
    /// Already done for this window or structurally dead.
    pub markets_skipped: usize,
    pub markets_cancelled: usize,
    pub records_written: usize,
    pub markets: Vec<MarketReport>,
}
