//! Minimum-interval waiter: spaces requests to each model evenly.

use std::collections::HashMap;
use std::time::Duration;

use anvil_core::provider::RateLimiter;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Allows at most `requests_per_minute` calls per model, evenly spaced.
///
/// A limit of 0 disables waiting.
pub struct MinIntervalWaiter {
    interval: Option<Duration>,
    last_call: Mutex<HashMap<String, Instant>>,
}

impl MinIntervalWaiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let interval =
            (requests_per_minute > 0).then(|| Duration::from_secs(60) / requests_per_minute);
        Self {
            interval,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

#[async_trait]
impl RateLimiter for MinIntervalWaiter {
    async fn wait_if_needed(&self, model: &str) {
        let Some(interval) = self.interval else {
            return;
        };

        // Held across the sleep so concurrent callers queue up.
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = last_call.get(model) {
            let ready_at = *last + interval;
            let now = Instant::now();
            if ready_at > now {
                debug!(model = %model, wait_ms = (ready_at - now).as_millis() as u64, "Waiting before model call");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        last_call.insert(model.to_string(), Instant::now());
    }
}
