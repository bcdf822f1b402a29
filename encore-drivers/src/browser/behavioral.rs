use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
/// Produces human-like pauses to reduce automation signals.
pub struct BehavioralEngine {
    navigation_jitter_ms: (u64, u64),
}

impl BehavioralEngine {
    pub fn new(navigation_jitter_ms: (u64, u64)) -> Self {
        Self {
            navigation_jitter_ms,
        }
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, min: u64, max: u64) {
        if max == 0 || min > max {
            return;
        }
        let ms = OsRng.gen_range(min..=max);
        sleep(Duration::from_millis(ms)).await;
    }

    /// Pause before navigation using the configured jitter window.
    pub async fn before_navigation(&self) {
        let (min, max) = self.navigation_jitter_ms;
        self.random_delay(min, max).await;
    }
}
