use crate::domain::entities::trade::TradeRecord;
use chrono::{DateTime, Utc};

/// Identity of a fetched page without relying on trade ids (the API has
/// none): last wallet, last timestamp, record count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSignature {
    pub last_wallet: String,
    pub last_timestamp: DateTime<Utc>,
    pub len: usize,
}

impl PageSignature {
    /// None for an empty page — the loop terminates on those before the
    /// guard ever sees them.
    pub fn of(page: &[TradeRecord]) -> Option<Self> {
        page.last().map(|last| Self {
            last_wallet: last.wallet.clone(),
            last_timestamp: last.timestamp,
            len: page.len(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    Continue,
    /// Identical signature to the previous page: the pagination cursor is
    /// not advancing.
    RepeatedPage,
    /// Too many consecutive pages without chronological progress toward
    /// the cutoff.
    Stagnant,
}

/// Bounds the per-market fetch loop against a misbehaving or
/// inconsistently-ordered upstream. Fed each window-filtered, non-empty
/// page; a terminating verdict means the page must not be buffered.
#[derive(Debug)]
pub struct ProgressGuard {
    stagnation_limit: u32,
    previous: Option<PageSignature>,
    oldest_seen: Option<DateTime<Utc>>,
    stagnant_pages: u32,
}

impl ProgressGuard {
    pub fn new(stagnation_limit: u32) -> Self {
        Self {
            stagnation_limit,
            previous: None,
            oldest_seen: None,
            stagnant_pages: 0,
        }
    }

    pub fn observe(&mut self, page: &[TradeRecord]) -> GuardVerdict {
        let Some(signature) = PageSignature::of(page) else {
            return GuardVerdict::Continue;
        };
        if self.previous.as_ref() == Some(&signature) {
            return GuardVerdict::RepeatedPage;
        }
        self.previous = Some(signature);

        let page_min = page
            .iter()
            .map(|t| t.timestamp)
            .min()
            .expect("non-empty page");
        match self.oldest_seen {
            None => {
                self.oldest_seen = Some(page_min);
                self.stagnant_pages = 0;
            }
            Some(oldest) if page_min < oldest => {
                self.oldest_seen = Some(page_min);
                self.stagnant_pages = 0;
            }
            Some(_) => self.stagnant_pages += 1,
        }

        if self.stagnant_pages >= self.stagnation_limit {
            GuardVerdict::Stagnant
        } else {
            GuardVerdict::Continue
        }
    }

    pub fn oldest_seen(&self) -> Option<DateTime<Utc>> {
        self.oldest_seen
    }
}
