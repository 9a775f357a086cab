//! Adaptive periodic cleanup ticker with idle detection.
//!
//! Every component that needs periodic housekeeping (the schedulers, the
//! result cache, the executor itself) owns an [`InactivityCleanup`]. The
//! ticker runs as a tokio task while its owner has work and stops itself once
//! the owner has been idle for long enough:
//!
//! ```text
//!   restart() ──► [running] ──tick──► perform_cleanup()
//!                    ▲   │                   │
//!                    │   │        is_busy() or recent activity?
//!                    │   │          yes │          no │
//!                    └───┴──────────────┘             ▼
//!                                          enter_idle_state(), stop
//! ```
//!
//! The owner is held through a `Weak` reference, so a ticker never keeps its
//! owner alive; when the owner is dropped the task exits on its next tick.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Callbacks a ticker drives on its owner.
pub trait InactivityCleanupListener: Send + Sync {
    /// Periodic housekeeping.
    fn perform_cleanup(&self);

    /// Must err on the side of `true`: a false "idle" can strand work.
    fn is_busy(&self) -> bool;

    /// Called once when the ticker stops for inactivity.
    fn enter_idle_state(&self);
}

/// Tick timings for an [`InactivityCleanup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InactivityConfig {
    /// Interval between ticks in normal mode.
    pub interval: Duration,
    /// Interval between ticks in high-speed mode.
    pub high_speed_interval: Duration,
    /// How long without activity before the ticker goes idle.
    pub idle_after: Duration,
}

impl InactivityConfig {
    /// Normal interval with high-speed mode at half of it.
    pub fn new(interval: Duration, idle_after: Duration) -> Self {
        Self {
            interval,
            high_speed_interval: interval / 2,
            idle_after,
        }
    }
}

struct TickerShared {
    name: String,
    config: InactivityConfig,
    listener: Weak<dyn InactivityCleanupListener>,
    running: AtomicBool,
    high_speed: AtomicBool,
    activity_epoch: AtomicU64,
    last_activity: Mutex<Instant>,
    shutdown: Mutex<Option<CancellationToken>>,
}

impl TickerShared {
    fn current_interval(&self) -> Duration {
        if self.high_speed.load(Ordering::Relaxed) {
            self.config.high_speed_interval
        } else {
            self.config.interval
        }
    }

    fn idle_for(&self) -> Duration {
        Instant::now().saturating_duration_since(*self.last_activity.lock())
    }
}

/// Cancellable periodic task driving an [`InactivityCleanupListener`].
pub struct InactivityCleanup {
    shared: Arc<TickerShared>,
    runtime: Handle,
}

impl InactivityCleanup {
    /// Creates a stopped ticker for `listener`.
    pub fn new(
        name: impl Into<String>,
        config: InactivityConfig,
        listener: Weak<dyn InactivityCleanupListener>,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(TickerShared {
                name: name.into(),
                config,
                listener,
                running: AtomicBool::new(false),
                high_speed: AtomicBool::new(false),
                activity_epoch: AtomicU64::new(0),
                last_activity: Mutex::new(Instant::now()),
                shutdown: Mutex::new(None),
            }),
            runtime,
        }
    }

    /// Records activity and starts the ticker if it is stopped.
    pub fn restart(&self) {
        *self.shared.last_activity.lock() = Instant::now();
        self.shared.activity_epoch.fetch_add(1, Ordering::SeqCst);

        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.spawn_loop();
        }
    }

    /// Stops the ticker without calling `enter_idle_state`.
    pub fn stop(&self) {
        if let Some(token) = self.shared.shutdown.lock().take() {
            token.cancel();
        }
        self.shared.running.store(false, Ordering::SeqCst);
    }

    /// Switches between the normal and high-speed interval.
    pub fn set_high_speed(&self, enabled: bool) {
        let previous = self.shared.high_speed.swap(enabled, Ordering::Relaxed);
        if previous != enabled {
            debug!(ticker = %self.shared.name, high_speed = enabled, "Cleanup tick speed changed");
        }
    }

    pub fn is_high_speed(&self) -> bool {
        self.shared.high_speed.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &InactivityConfig {
        &self.shared.config
    }

    fn spawn_loop(&self) {
        let token = CancellationToken::new();
        if let Some(previous) = self.shared.shutdown.lock().replace(token.clone()) {
            previous.cancel();
        }

        let shared = Arc::clone(&self.shared);
        debug!(ticker = %shared.name, "Cleanup ticker started");
        self.runtime.spawn(run_loop(shared, token));
    }
}

impl Drop for InactivityCleanup {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(shared: Arc<TickerShared>, token: CancellationToken) {
    loop {
        let period = shared.current_interval();
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }

        let Some(listener) = shared.listener.upgrade() else {
            shared.running.store(false, Ordering::SeqCst);
            break;
        };

        let seen_epoch = shared.activity_epoch.load(Ordering::SeqCst);
        listener.perform_cleanup();

        if listener.is_busy() || shared.idle_for() < shared.config.idle_after {
            trace!(ticker = %shared.name, "Cleanup tick");
            continue;
        }

        shared.running.store(false, Ordering::SeqCst);

        // Activity may have arrived between the idle decision and the store
        // above; in that case restart() saw `running == true` and did not
        // spawn, so this loop keeps going.
        if shared.activity_epoch.load(Ordering::SeqCst) != seen_epoch {
            if shared
                .running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                continue;
            }
            break;
        }

        debug!(ticker = %shared.name, "Cleanup ticker idle");
        listener.enter_idle_state();
        break;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingListener {
        cleanups: AtomicUsize,
        idles: AtomicUsize,
        busy: AtomicBool,
    }

    impl InactivityCleanupListener for CountingListener {
        fn perform_cleanup(&self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }

        fn is_busy(&self) -> bool {
            self.busy.load(Ordering::SeqCst)
        }

        fn enter_idle_state(&self) {
            self.idles.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ticker_for(listener: &Arc<CountingListener>) -> InactivityCleanup {
        let weak: Weak<dyn InactivityCleanupListener> =
            Arc::downgrade(listener) as Weak<dyn InactivityCleanupListener>;
        InactivityCleanup::new(
            "test",
            InactivityConfig::new(Duration::from_millis(100), Duration::from_secs(1)),
            weak,
            Handle::current(),
        )
    }

    #[test]
    fn test_high_speed_defaults_to_half_interval() {
        let config = InactivityConfig::new(Duration::from_millis(250), Duration::from_secs(30));
        assert_eq!(config.high_speed_interval, Duration::from_millis(125));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_idle() {
        let listener = Arc::new(CountingListener::default());
        let ticker = ticker_for(&listener);

        ticker.restart();
        assert!(ticker.is_running());

        tokio::time::sleep(Duration::from_millis(550)).await;
        let cleanups = listener.cleanups.load(Ordering::SeqCst);
        assert!(cleanups >= 4, "expected several ticks, got {}", cleanups);
        assert_eq!(listener.idles.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!ticker.is_running());
        assert_eq!(listener.idles.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_listener_keeps_ticker_running() {
        let listener = Arc::new(CountingListener::default());
        listener.busy.store(true, Ordering::SeqCst);
        let ticker = ticker_for(&listener);

        ticker.restart();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(ticker.is_running());
        assert_eq!(listener.idles.load(Ordering::SeqCst), 0);

        listener.busy.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!ticker.is_running());
        assert_eq!(listener.idles.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_idle() {
        let listener = Arc::new(CountingListener::default());
        let ticker = ticker_for(&listener);

        ticker.restart();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!ticker.is_running());

        ticker.restart();
        assert!(ticker.is_running());
        let before = listener.cleanups.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(listener.cleanups.load(Ordering::SeqCst) > before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_speed_ticks_faster() {
        let listener = Arc::new(CountingListener::default());
        listener.busy.store(true, Ordering::SeqCst);
        let ticker = ticker_for(&listener);

        ticker.set_high_speed(true);
        assert!(ticker.is_high_speed());
        ticker.restart();

        tokio::time::sleep(Duration::from_millis(505)).await;
        let cleanups = listener.cleanups.load(Ordering::SeqCst);
        assert!(cleanups >= 9, "expected high-speed ticks, got {}", cleanups);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_does_not_enter_idle() {
        let listener = Arc::new(CountingListener::default());
        let ticker = ticker_for(&listener);

        ticker.restart();
        ticker.stop();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!ticker.is_running());
        assert_eq!(listener.cleanups.load(Ordering::SeqCst), 0);
        assert_eq!(listener.idles.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_listener_stops_ticker() {
        let listener = Arc::new(CountingListener::default());
        let ticker = ticker_for(&listener);

        ticker.restart();
        drop(listener);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!ticker.is_running());
    }
}
