use crate::domain::entities::market::MarketDescriptor;
use crate::domain::error::DomainError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Raw row shape of the upstream market-list CSV (the cleaning stage's
/// output). Everything optional: incomplete rows are dropped, not fatal.
#[derive(Debug, Deserialize)]
struct MarketRow {
    #[serde(rename = "conditionId")]
    condition_id: Option<String>,
    #[serde(default)]
    question: Option<String>,
    #[serde(rename = "closedTime")]
    closed_time: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
}

/// Loads the market list, deduplicating condition ids and dropping rows
/// with a missing id or unparseable close/end time. Drops are counted and
/// logged, matching the upstream stage's coerce-and-dropna behavior.
pub fn load_markets(path: impl AsRef<Path>) -> Result<Vec<MarketDescriptor>, DomainError> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DomainError::InvalidInput(format!("open {}: {e}", path.display())))?;

    let mut markets = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut dropped = 0usize;
    for row in reader.deserialize::<MarketRow>() {
        let row = row.map_err(|e| DomainError::InvalidInput(format!("{}: {e}", path.display())))?;
        let parsed = row.condition_id.as_deref().and_then(|id| {
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            let close_time = parse_datetime(row.closed_time.as_deref()?)?;
            let end_date = parse_datetime(row.end_date.as_deref()?)?;
            Some(MarketDescriptor::new(
                id.to_string(),
                row.question.clone().unwrap_or_default(),
                close_time,
                end_date,
            ))
        });
        match parsed {
            Some(market) if seen.insert(market.condition_id.clone()) => markets.push(market),
            Some(_) => {} // duplicate condition id
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!(path = %path.display(), dropped, "dropped market rows with missing id or dates");
    }
    Ok(markets)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // The cleaning stage sometimes emits naive "YYYY-MM-DD HH:MM:SS"; the
    // upstream data is UTC throughout.
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_and_drop_bad_rows() {
        let file = write_csv(
            "conditionId,question,closedTime,endDate\n\
             0xa,Will X happen?,2025-01-10T00:00:00Z,2025-01-11T00:00:00Z\n\
             0xb,Bad dates,not-a-date,2025-01-11T00:00:00Z\n\
             ,No id,2025-01-10T00:00:00Z,2025-01-11T00:00:00Z\n",
        );
        let markets = load_markets(file.path()).unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].condition_id, "0xa");
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let file = write_csv(
            "conditionId,question,closedTime,endDate\n\
             0xa,First,2025-01-10 00:00:00,2025-01-11 00:00:00\n\
             0xa,Second,2025-01-10 00:00:00,2025-01-11 00:00:00\n",
        );
        let markets = load_markets(file.path()).unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].question, "First");
    }
}
