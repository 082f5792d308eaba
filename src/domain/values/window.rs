use crate::domain::entities::market::MarketDescriptor;
use chrono::{DateTime, Duration, Utc};

/// The collection window for one market: a trailing duration ending at the
/// market's effective close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPlan {
    /// Records with `timestamp >= cutoff` are inside the window.
    pub cutoff: DateTime<Utc>,
    /// `min(close_time, end_date)` — the end of the window.
    pub reference: DateTime<Utc>,
    /// Set when `close_time > end_date`. Informational only: the source
    /// annotated these markets but never filtered differently on the flag,
    /// and that asymmetry is preserved here.
    pub late_closing: bool,
}

impl WindowPlan {
    pub fn for_market(market: &MarketDescriptor, window_hours: i64) -> Self {
        let late_closing = market.close_time > market.end_date;
        let reference = market.close_time.min(market.end_date);
        Self {
            cutoff: reference - Duration::hours(window_hours),
            reference,
            late_closing,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn market(close: &str, end: &str) -> MarketDescriptor {
        MarketDescriptor::new(
            "0xmarket".into(),
            "Will it rain?".into(),
            close.parse().unwrap(),
            end.parse().unwrap(),
        )
    }

    #[test]
    fn test_cutoff_is_close_minus_window() {
        let m = market("2025-01-10T00:00:00Z", "2025-01-12T00:00:00Z");
        let plan = WindowPlan::for_market(&m, 24);
        assert_eq!(
            plan.cutoff,
            Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap()
        );
        assert!(!plan.late_closing);
    }

    #[test]
    fn test_late_closing_uses_end_date() {
        let m = market("2025-01-12T00:00:00Z", "2025-01-10T00:00:00Z");
        let plan = WindowPlan::for_market(&m, 48);
        assert_eq!(
            plan.reference,
            Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(
            plan.cutoff,
            Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap()
        );
        assert!(plan.late_closing);
    }

    #[test]
    fn test_contains_is_inclusive_at_cutoff() {
        let m = market("2025-01-10T00:00:00Z", "2025-01-10T00:00:00Z");
        let plan = WindowPlan::for_market(&m, 24);
        assert!(plan.contains(plan.cutoff));
        assert!(!plan.contains(plan.cutoff - chrono::Duration::seconds(1)));
    }
}
