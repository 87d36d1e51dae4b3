use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

use crate::domain::repository::SendPacer;

/// Fixed minimum spacing between sends, shared by every drain in the process.
pub struct IntervalPacer {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl IntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }
}

impl SendPacer for IntervalPacer {
    async fn pace(&self) {
        // Held across the sleep so concurrent callers queue up behind each other.
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            sleep_until(previous + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}
