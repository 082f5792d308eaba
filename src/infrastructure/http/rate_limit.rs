use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared by every worker loop, so total request rate stays
/// at the configured spacing no matter how many markets run concurrently.
/// One token is one remote request.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    tokens_per_second: f64,
    burst: f64,
    state: AsyncMutex<BucketState>,
}

impl TokenBucketLimiter {
    /// Rate derived from the configured inter-request spacing; burst of one
    /// keeps requests as evenly spaced as the original fixed sleep did.
    pub fn from_request_delay(delay: Duration) -> Arc<Self> {
        let secs = delay.as_secs_f64().max(0.001);
        Arc::new(Self {
            tokens_per_second: 1.0 / secs,
            burst: 1.0,
            state: AsyncMutex::new(BucketState {
                tokens: 1.0,
                last_refill: Instant::now(),
            }),
        })
    }

    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut guard = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(guard.last_refill).as_secs_f64();
                if elapsed > 0.0 {
                    guard.tokens = (guard.tokens + elapsed * self.tokens_per_second).min(self.burst);
                    guard.last_refill = now;
                }
                if guard.tokens >= 1.0 {
                    guard.tokens -= 1.0;
                    None
                } else {
                    let deficit = (1.0 - guard.tokens).max(0.0);
                    Some(Duration::from_secs_f64(
                        (deficit / self.tokens_per_second).max(0.001),
                    ))
                }
            };
            match wait {
                Some(wait) => time::sleep(wait).await,
                None => return,
            }
        }
    }
}
