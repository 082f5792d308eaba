use std::time::Duration;

/// Server-side trade-size filter forwarded to the trades endpoint
/// (`filterType` / `filterAmount`).
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeFilter {
    pub filter_type: String,
    pub amount: u64,
}

impl VolumeFilter {
    pub fn cash(amount: u64) -> Self {
        Self {
            filter_type: "CASH".into(),
            amount,
        }
    }
}

/// What to do with records that decode but lack required fields. The source
/// of this engine handled them inconsistently, so the policy is an explicit
/// configuration choice rather than an assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Skip bad records, keep the rest of the page. Skips are counted and
    /// logged.
    #[default]
    Lenient,
    /// Fail the page with a malformed-response error; the market aborts
    /// like a permanent client error.
    Strict,
}

/// Everything a run needs, passed explicitly into the engine constructor.
/// One engine, parameterized — not one script copy per window length.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub window_hours: i64,
    /// Page size for the trades endpoint.
    pub page_limit: u64,
    /// Buffered records per market before a flush to the sink.
    pub chunk_size: usize,
    /// Offset-0 pages shorter than this mark the market structurally dead.
    /// 0 disables the check.
    pub min_lifetime_trades: usize,
    /// Offset-0 in-window counts below this mark the market structurally
    /// dead. 0 disables the check. Independent of `min_lifetime_trades`.
    pub min_recent_trades: usize,
    pub volume_filter: Option<VolumeFilter>,
    /// Consecutive pages without chronological progress before the loop is
    /// cut off.
    pub stagnation_limit: u32,
    /// Target spacing between remote requests; drives the shared
    /// token-bucket limiter.
    pub request_delay: Duration,
    /// Fixed pause before retrying a transient failure. No backoff: the
    /// retry runs until it succeeds or the operator cancels.
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    /// Concurrent market loops. 1 reproduces the sequential reference
    /// behavior.
    pub concurrency: usize,
    pub parse_policy: ParsePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            page_limit: 100,
            chunk_size: 3000,
            min_lifetime_trades: 10,
            min_recent_trades: 5,
            volume_filter: None,
            stagnation_limit: 3,
            request_delay: Duration::from_millis(500),
            retry_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            concurrency: 1,
            parse_policy: ParsePolicy::Lenient,
        }
    }
}

impl IngestConfig {
    /// Checkpoint key for this window configuration. Window length plus the
    /// volume filter identify a configuration; two runs with the same key
    /// share done flags.
    pub fn window_key(&self) -> String {
        match &self.volume_filter {
            Some(f) => format!(
                "{}h_{}{}",
                self.window_hours,
                f.filter_type.to_lowercase(),
                f.amount
            ),
            None => format!("{}h", self.window_hours),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_key_bare() {
        let cfg = IngestConfig::default();
        assert_eq!(cfg.window_key(), "24h");
    }

    #[test]
    fn test_window_key_with_filter() {
        let cfg = IngestConfig {
            window_hours: 48,
            volume_filter: Some(VolumeFilter::cash(1000)),
            ..Default::default()
        };
        assert_eq!(cfg.window_key(), "48h_cash1000");
    }
}
