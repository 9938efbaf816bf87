//! Minimum-interval pacing for scraped sources
//!
//! Retail and community sites have no API quota to negotiate with; the only
//! polite option is to space requests out. `RequestPacer` serializes callers
//! and guarantees a minimum gap between consecutive outbound requests.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until at least `min_interval` has passed since the previous
    /// request, then records the new request time.
    ///
    /// The lock is held across the sleep so concurrent callers queue up
    /// rather than all observing the same stale timestamp.
    pub async fn pace(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_is_not_delayed() {
        let pacer = RequestPacer::new(Duration::from_millis(200));
        let start = Instant::now();
        pacer.pace().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_consecutive_requests_are_spaced() {
        let pacer = RequestPacer::new(Duration::from_millis(100));
        let start = Instant::now();
        pacer.pace().await;
        pacer.pace().await;
        pacer.pace().await;
        // Two enforced gaps of 100ms each
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_concurrent_callers_queue() {
        use std::sync::Arc;

        let pacer = Arc::new(RequestPacer::new(Duration::from_millis(80)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let pacer = pacer.clone();
            handles.push(tokio::spawn(async move { pacer.pace().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(160));
    }
}
