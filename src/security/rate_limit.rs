//! Per-client sliding-window rate limiting.
//!
//! # Responsibilities
//! - Track admitted request instants per client over a one-minute and a one-hour window
//! - Admit or deny each request, recording it only when admitted
//! - Evict clients whose windows have fully drained
//!
//! # Design Decisions
//! - Expired instants are purged lazily on access; `sweep` reclaims idle clients
//! - The minute quota is checked before the hour quota and the first violation wins
//! - Denied requests are never recorded, so they cost nothing against later quota
//! - Check and append for one client run under that client's map entry lock

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Length of the short window.
pub const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Length of the long window.
pub const HOUR_WINDOW: Duration = Duration::from_secs(3600);

/// Reason a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RateLimitExceeded {
    #[error("per-minute limit exceeded")]
    PerMinute,

    #[error("per-hour limit exceeded")]
    PerHour,
}

impl RateLimitExceeded {
    /// Window label used in log fields and metric labels.
    pub fn window(&self) -> &'static str {
        match self {
            RateLimitExceeded::PerMinute => "minute",
            RateLimitExceeded::PerHour => "hour",
        }
    }
}

/// Admitted request instants for one client, oldest first.
#[derive(Debug, Default)]
struct ClientWindow {
    minute: VecDeque<Instant>,
    hour: VecDeque<Instant>,
}

impl ClientWindow {
    fn purge(&mut self, now: Instant) {
        drop_expired(&mut self.minute, now, MINUTE_WINDOW);
        drop_expired(&mut self.hour, now, HOUR_WINDOW);
    }

    fn is_idle(&self) -> bool {
        self.minute.is_empty() && self.hour.is_empty()
    }
}

fn drop_expired(instants: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = instants.front() {
        if now.saturating_duration_since(oldest) >= window {
            instants.pop_front();
        } else {
            break;
        }
    }
}

/// Two-window rate limiter keyed by client identifier.
///
/// Constructed once at startup and shared through `Arc`.
pub struct RateLimiter {
    clients: DashMap<String, ClientWindow>,
    enabled: bool,
    per_minute: usize,
    per_hour: usize,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            clients: DashMap::new(),
            enabled: config.enabled,
            per_minute: config.per_minute as usize,
            per_hour: config.per_hour as usize,
        }
    }

    /// Decide whether `identifier` may make a request now.
    ///
    /// The caller supplies a stable fallback (e.g. `"unknown"`) when no
    /// identifier is available; the limiter does not inspect its shape.
    pub fn admit(&self, identifier: &str) -> Result<(), RateLimitExceeded> {
        if !self.enabled {
            return Ok(());
        }
        let mut window = self.clients.entry(identifier.to_owned()).or_default();
        // Read the clock under the entry lock so each window stays sorted.
        self.decide(&mut window, Instant::now())
    }

    /// Same decision as [`admit`](Self::admit), evaluated at `now`.
    pub fn admit_at(&self, identifier: &str, now: Instant) -> Result<(), RateLimitExceeded> {
        if !self.enabled {
            return Ok(());
        }
        let mut window = self.clients.entry(identifier.to_owned()).or_default();
        self.decide(&mut window, now)
    }

    fn decide(&self, window: &mut ClientWindow, now: Instant) -> Result<(), RateLimitExceeded> {
        window.purge(now);

        if window.minute.len() >= self.per_minute {
            return Err(RateLimitExceeded::PerMinute);
        }
        if window.hour.len() >= self.per_hour {
            return Err(RateLimitExceeded::PerHour);
        }

        window.minute.push_back(now);
        window.hour.push_back(now);
        Ok(())
    }

    /// Purge every window and forget clients with no request in the last hour.
    ///
    /// Returns the number of clients removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Same as [`sweep`](Self::sweep), evaluated at `now`.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.clients.retain(|_, window| {
            window.purge(now);
            if window.is_idle() {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Number of clients currently holding window state.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Periodically evict idle clients until shutdown is signalled.
pub async fn run_sweeper(
    limiter: Arc<RateLimiter>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!(interval_secs = every.as_secs(), "Rate limit sweeper starting");

    let mut ticker = time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.sweep();
                let remaining = limiter.tracked_clients();
                metrics::record_tracked_clients(remaining);
                if removed > 0 {
                    tracing::debug!(removed, remaining, "Evicted idle rate limit clients");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_minute: u32, per_hour: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            enabled: true,
            per_minute,
            per_hour,
            sweep_interval_secs: 0,
        })
    }

    #[test]
    fn test_minute_quota_then_denial() {
        let rl = limiter(60, 1000);
        let t0 = Instant::now();

        for i in 0..60 {
            let now = t0 + Duration::from_millis(i * 500);
            assert_eq!(rl.admit_at("1.2.3.4", now), Ok(()), "request {} should pass", i + 1);
        }
        let err = rl
            .admit_at("1.2.3.4", t0 + Duration::from_secs(45))
            .unwrap_err();
        assert_eq!(err, RateLimitExceeded::PerMinute);
        assert_eq!(err.to_string(), "per-minute limit exceeded");
    }

    #[test]
    fn test_minute_window_expires() {
        let rl = limiter(60, 1000);
        let t0 = Instant::now();

        for _ in 0..60 {
            rl.admit_at("client", t0).unwrap();
        }
        assert!(rl.admit_at("client", t0 + Duration::from_secs(59)).is_err());
        assert_eq!(rl.admit_at("client", t0 + Duration::from_secs(60)), Ok(()));
    }

    #[test]
    fn test_denied_requests_do_not_count() {
        let rl = limiter(2, 3);
        let t0 = Instant::now();

        rl.admit_at("c", t0).unwrap();
        rl.admit_at("c", t0).unwrap();
        for _ in 0..10 {
            assert_eq!(rl.admit_at("c", t0), Err(RateLimitExceeded::PerMinute));
        }

        // Only the two admitted requests sit in the hour window, so one more fits.
        let t1 = t0 + Duration::from_secs(61);
        assert_eq!(rl.admit_at("c", t1), Ok(()));
        assert_eq!(rl.admit_at("c", t1), Err(RateLimitExceeded::PerHour));
    }

    #[test]
    fn test_hour_quota_and_expiry() {
        let rl = limiter(60, 5);
        let t0 = Instant::now();

        for i in 0..5 {
            rl.admit_at("c", t0 + Duration::from_secs(i * 120)).unwrap();
        }
        let later = t0 + Duration::from_secs(1800);
        let err = rl.admit_at("c", later).unwrap_err();
        assert_eq!(err, RateLimitExceeded::PerHour);
        assert_eq!(err.to_string(), "per-hour limit exceeded");

        // The first request leaves the hour window exactly one hour after it was made.
        assert_eq!(rl.admit_at("c", t0 + HOUR_WINDOW), Ok(()));
    }

    #[test]
    fn test_minute_checked_before_hour() {
        let rl = limiter(1, 1);
        let t0 = Instant::now();
        rl.admit_at("c", t0).unwrap();
        assert_eq!(rl.admit_at("c", t0), Err(RateLimitExceeded::PerMinute));
        assert_eq!(
            rl.admit_at("c", t0 + Duration::from_secs(61)),
            Err(RateLimitExceeded::PerHour)
        );
    }

    #[test]
    fn test_identifiers_are_independent() {
        let rl = limiter(1, 10);
        let t0 = Instant::now();
        assert!(rl.admit_at("a", t0).is_ok());
        assert!(rl.admit_at("a", t0).is_err());
        assert!(rl.admit_at("b", t0).is_ok());
        assert!(rl.admit_at("unknown", t0).is_ok());
        assert_eq!(rl.tracked_clients(), 3);
    }

    #[test]
    fn test_disabled_admits_everything() {
        let rl = RateLimiter::new(RateLimitConfig {
            enabled: false,
            per_minute: 1,
            per_hour: 1,
            sweep_interval_secs: 0,
        });
        for _ in 0..100 {
            assert!(rl.admit("c").is_ok());
        }
        assert_eq!(rl.tracked_clients(), 0);
        assert!(!rl.is_enabled());
    }

    #[test]
    fn test_sweep_evicts_only_idle_clients() {
        let rl = limiter(10, 100);
        let t0 = Instant::now();
        rl.admit_at("old", t0).unwrap();
        rl.admit_at("recent", t0 + Duration::from_secs(3000)).unwrap();

        assert_eq!(rl.sweep_at(t0 + Duration::from_secs(1800)), 0);
        assert_eq!(rl.sweep_at(t0 + HOUR_WINDOW), 1);
        assert_eq!(rl.tracked_clients(), 1);

        // A swept client starts over with a fresh window.
        assert!(rl.admit_at("old", t0 + HOUR_WINDOW).is_ok());
        assert_eq!(rl.tracked_clients(), 2);
    }

    #[test]
    fn test_concurrent_admissions_never_exceed_quota() {
        let rl = limiter(50, 1000);
        let admitted = std::sync::atomic::AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..25 {
                        if rl.admit("shared").is_ok() {
                            admitted.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.into_inner(), 50);
    }

    #[tokio::test]
    async fn test_sweeper_evicts_idle_clients_and_stops_on_shutdown() {
        let rl = Arc::new(limiter(60, 1000));
        let Some(long_ago) = Instant::now().checked_sub(Duration::from_secs(3700)) else {
            // Monotonic clock started less than an hour ago.
            return;
        };
        assert!(rl.admit_at("idle", long_ago).is_ok());
        assert!(rl.admit("active").is_ok());
        assert_eq!(rl.tracked_clients(), 2);

        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(run_sweeper(rl.clone(), Duration::from_millis(50), rx));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(rl.tracked_clients(), 1);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("sweeper did not stop after shutdown")
            .unwrap();
    }
}
