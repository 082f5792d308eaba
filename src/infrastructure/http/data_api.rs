use crate::config::{IngestConfig, ParsePolicy, VolumeFilter};
use crate::domain::entities::trade::{TradeRecord, WalletStats};
use crate::domain::error::DomainError;
use crate::domain::ports::trade_source::TradeSource;
use crate::domain::ports::wallet_stats::WalletStatsSource;
use crate::infrastructure::http::rate_limit::TokenBucketLimiter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://data-api.polymarket.com";

/// Client for the Polymarket-style data API: the paginated `/trades`
/// endpoint plus the `/value` and `/traded` wallet-stats endpoints.
///
/// Every request waits on the shared token-bucket limiter first. Failures
/// are classified into the `DomainError` taxonomy here; the engine decides
/// what each class means for the market loop.
pub struct DataApiClient {
    http: reqwest::Client,
    base_url: String,
    limiter: Arc<TokenBucketLimiter>,
    volume_filter: Option<VolumeFilter>,
    parse_policy: ParsePolicy,
}

impl DataApiClient {
    pub fn new(
        base_url: impl Into<String>,
        limiter: Arc<TokenBucketLimiter>,
        config: &IngestConfig,
    ) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent("polypull/0.1")
            .build()
            .map_err(|e| DomainError::InvalidInput(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            limiter,
            volume_filter: config.volume_filter.clone(),
            parse_policy: config.parse_policy,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, DomainError> {
        self.limiter.acquire().await;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| DomainError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| DomainError::MalformedResponse(format!("{path}: {e}")));
        }
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(DomainError::Transient(format!("{path} returned {status}")));
        }
        let message = response.text().await.unwrap_or_default();
        Err(DomainError::PermanentClient {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl TradeSource for DataApiClient {
    async fn fetch_page(
        &self,
        market_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TradeRecord>, DomainError> {
        let mut query = vec![
            ("market", market_id.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(filter) = &self.volume_filter {
            query.push(("filterType", filter.filter_type.clone()));
            query.push(("filterAmount", filter.amount.to_string()));
        }

        let body = self.get_json("trades", &query).await?;
        let (records, skipped) = parse_trade_page(market_id, &body, self.parse_policy)?;
        if skipped > 0 {
            warn!(market = market_id, offset, skipped, "skipped malformed trade records");
        }
        Ok(records)
    }
}

#[async_trait]
impl WalletStatsSource for DataApiClient {
    /// Two lookups per wallet, in the upstream's shapes: `/value` answers
    /// with a one-element list, `/traded` with a scalar count.
    async fn fetch_stats(&self, wallet: &str) -> Result<WalletStats, DomainError> {
        let query = [("user", wallet.to_string())];

        let value_body = self.get_json("value", &query).await?;
        let total_value = value_body
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| number_field(item, "value"))
            .ok_or_else(|| DomainError::MalformedResponse("value: unexpected shape".into()))?;

        let traded_body = self.get_json("traded", &query).await?;
        let total_trades = number_field(&traded_body, "traded")
            .ok_or_else(|| DomainError::MalformedResponse("traded: unexpected shape".into()))?;

        Ok(WalletStats {
            total_value,
            total_trades: total_trades as i64,
        })
    }
}

/// Decodes one `/trades` response body. Returns the normalized records and
/// how many were skipped (always 0 under the strict policy, which fails
/// instead). Separated from the client so the policy behavior is testable
/// without HTTP.
pub fn parse_trade_page(
    market_id: &str,
    body: &Value,
    policy: ParsePolicy,
) -> Result<(Vec<TradeRecord>, usize), DomainError> {
    let Some(items) = body.as_array() else {
        return match policy {
            ParsePolicy::Strict => Err(DomainError::MalformedResponse(
                "trades: expected a JSON array".into(),
            )),
            ParsePolicy::Lenient => Ok((Vec::new(), 0)),
        };
    };

    let mut raw: Vec<(f64, String, String, f64, f64)> = Vec::with_capacity(items.len());
    let mut skipped = 0usize;
    for item in items {
        match parse_trade_fields(item) {
            Some(fields) => raw.push(fields),
            None => match policy {
                ParsePolicy::Strict => {
                    return Err(DomainError::MalformedResponse(format!(
                        "trade record missing required fields: {item}"
                    )))
                }
                ParsePolicy::Lenient => skipped += 1,
            },
        }
    }

    // Timestamp unit is ambiguous upstream; decide per response from the
    // largest raw value (epoch seconds never exceed 1e12).
    let millis = raw.iter().map(|r| r.0).fold(f64::MIN, f64::max) > 1e12;
    let mut records = Vec::with_capacity(raw.len());
    for (ts, wallet, side, size, price) in raw {
        match epoch_to_utc(ts, millis) {
            Some(timestamp) => records.push(TradeRecord {
                market_id: market_id.to_string(),
                timestamp,
                wallet,
                side,
                size,
                price,
            }),
            None => match policy {
                ParsePolicy::Strict => {
                    return Err(DomainError::MalformedResponse(format!(
                        "unrepresentable timestamp {ts}"
                    )))
                }
                ParsePolicy::Lenient => skipped += 1,
            },
        }
    }
    Ok((records, skipped))
}

fn parse_trade_fields(item: &Value) -> Option<(f64, String, String, f64, f64)> {
    let ts = number_field(item, "timestamp")?;
    let wallet = item.get("proxyWallet")?.as_str()?.to_string();
    let side = item.get("side")?.as_str()?.to_string();
    let size = number_field(item, "size")?;
    let price = number_field(item, "price")?;
    Some((ts, wallet, side, size, price))
}

/// The API is inconsistent about numeric encoding; accept either a JSON
/// number or a numeric string.
fn number_field(item: &Value, key: &str) -> Option<f64> {
    match item.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn epoch_to_utc(raw: f64, millis: bool) -> Option<DateTime<Utc>> {
    if millis {
        DateTime::from_timestamp_millis(raw as i64)
    } else {
        DateTime::from_timestamp(raw as i64, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(trades: Value) -> (Vec<TradeRecord>, usize) {
        parse_trade_page("0xm", &trades, ParsePolicy::Lenient).unwrap()
    }

    #[test]
    fn test_second_timestamps() {
        let (records, skipped) = page(json!([
            {"timestamp": 1_700_000_000, "proxyWallet": "0xa", "side": "BUY", "size": 10, "price": 0.4}
        ]));
        assert_eq!(skipped, 0);
        assert_eq!(records[0].timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_millisecond_timestamps_detected() {
        let (records, _) = page(json!([
            {"timestamp": 1_700_000_000_000_i64, "proxyWallet": "0xa", "side": "SELL", "size": 1, "price": 0.9}
        ]));
        assert_eq!(records[0].timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let (records, skipped) = page(json!([
            {"timestamp": "1700000000", "proxyWallet": "0xa", "side": "BUY", "size": "2.5", "price": "0.35"}
        ]));
        assert_eq!(skipped, 0);
        assert_eq!(records[0].size, 2.5);
        assert_eq!(records[0].price, 0.35);
    }

    #[test]
    fn test_lenient_skips_bad_records() {
        let (records, skipped) = page(json!([
            {"timestamp": 1_700_000_000, "proxyWallet": "0xa", "side": "BUY", "size": 1, "price": 0.5},
            {"proxyWallet": "0xb", "side": "BUY"}
        ]));
        assert_eq!(records.len(), 1);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_strict_fails_on_bad_record() {
        let body = json!([{"proxyWallet": "0xb"}]);
        let err = parse_trade_page("0xm", &body, ParsePolicy::Strict).unwrap_err();
        assert!(matches!(err, DomainError::MalformedResponse(_)));
    }

    #[test]
    fn test_lenient_non_array_is_empty_page() {
        let (records, skipped) = page(json!({"error": "nope"}));
        assert!(records.is_empty());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_strict_non_array_fails() {
        let err = parse_trade_page("0xm", &json!({}), ParsePolicy::Strict).unwrap_err();
        assert!(matches!(err, DomainError::MalformedResponse(_)));
    }
}
