//! Pacing: randomized inter-send delays and send timeouts.
//!
//! Advisory only. Spreading sends over time makes a batch look less like a
//! bot; it has no bearing on correctness.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::DeliveryError;

/// Uniform random delay in `[min_ms, max_ms]`.
///
/// A degenerate range (`min_ms >= max_ms`) returns `min_ms`.
pub fn random_delay(min_ms: u64, max_ms: u64) -> u64 {
    if min_ms >= max_ms {
        return min_ms;
    }
    rand::rng().random_range(min_ms..=max_ms)
}

/// Sleeps a fresh random delay before each item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Pacer {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// No delay at all.
    pub fn disabled() -> Self {
        Self::new(0, 0)
    }

    pub async fn pause(&self) -> Duration {
        let delay = Duration::from_millis(random_delay(self.min_ms, self.max_ms));
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "pacing pause");
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

/// Race `fut` against a timer.
///
/// On expiry the future is dropped, so a late completion can never be
/// observed by anything that runs afterwards.
pub async fn with_send_timeout<F, T>(limit: Duration, fut: F) -> Result<T, DeliveryError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeliveryError::SendTimeout)
}
