//! Crawl-wide rate-limit cooldown.
//!
//! The limit is imposed per calling IP, so a block seen by any producer
//! pauses every producer. Each fetch first waits on the gate; whoever sees a
//! block page trips it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Shared cooldown flag for all crawl tasks.
#[derive(Debug)]
pub struct RateLimitGate {
    cooldown: Duration,
    resume_at: Mutex<Option<Instant>>,
    events: AtomicU64,
    cancel: CancellationToken,
}

impl RateLimitGate {
    pub fn new(cooldown: Duration, cancel: CancellationToken) -> Self {
        Self {
            cooldown,
            resume_at: Mutex::new(None),
            events: AtomicU64::new(0),
            cancel,
        }
    }

    /// Start a cooldown. Returns `false` if one is already running, so
    /// concurrent detections of the same block count once.
    pub fn trip(&self) -> bool {
        let now = Instant::now();
        let mut resume_at = self.resume_at.lock().unwrap_or_else(|e| e.into_inner());

        if matches!(*resume_at, Some(at) if at > now) {
            return false;
        }

        *resume_at = Some(now + self.cooldown);
        self.events.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            "Rate limiting detected, pausing for {} seconds!",
            self.cooldown.as_secs_f64()
        );
        true
    }

    /// Whether a cooldown is currently running.
    pub fn is_cooling(&self) -> bool {
        let resume_at = self.resume_at.lock().unwrap_or_else(|e| e.into_inner());
        matches!(*resume_at, Some(at) if at > Instant::now())
    }

    /// Number of distinct cooldowns started.
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// Block until no cooldown is running.
    ///
    /// Returns [`FetchError::Cancelled`] if the run is cancelled first.
    pub async fn wait(&self) -> Result<(), FetchError> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let deadline = *self.resume_at.lock().unwrap_or_else(|e| e.into_inner());
            match deadline {
                Some(at) if at > Instant::now() => {
                    tokio::select! {
                        _ = sleep_until(at) => {}
                        _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                    }
                }
                _ => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_open_gate_does_not_wait() {
        let gate = RateLimitGate::new(Duration::from_secs(60), CancellationToken::new());
        let started = std::time::Instant::now();
        gate.wait().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!gate.is_cooling());
        assert_eq!(gate.events(), 0);
    }

    #[tokio::test]
    async fn test_trip_counts_once_while_cooling() {
        let gate = RateLimitGate::new(Duration::from_secs(60), CancellationToken::new());
        assert!(gate.trip());
        assert!(!gate.trip());
        assert!(gate.is_cooling());
        assert_eq!(gate.events(), 1);
    }

    #[tokio::test]
    async fn test_wait_blocks_until_cooldown_ends() {
        let gate = RateLimitGate::new(Duration::from_millis(80), CancellationToken::new());
        gate.trip();

        let started = std::time::Instant::now();
        gate.wait().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(70));
        assert!(!gate.is_cooling());

        // A later block starts a fresh cooldown.
        assert!(gate.trip());
        assert_eq!(gate.events(), 2);
    }

    #[tokio::test]
    async fn test_wait_is_shared_across_tasks() {
        let gate = Arc::new(RateLimitGate::new(
            Duration::from_millis(80),
            CancellationToken::new(),
        ));
        gate.trip();

        let started = std::time::Instant::now();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.wait().await })
            })
            .collect();

        for waiter in waiters {
            waiter.await.unwrap().unwrap();
        }
        assert!(started.elapsed() >= Duration::from_millis(70));
    }

    #[tokio::test]
    async fn test_wait_cancelled() {
        let cancel = CancellationToken::new();
        let gate = RateLimitGate::new(Duration::from_secs(3600), cancel.clone());
        gate.trip();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        assert!(matches!(gate.wait().await, Err(FetchError::Cancelled)));
    }
}
