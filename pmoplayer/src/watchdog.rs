//! Bounded buffering.
//!
//! [`BufferWatchdog`] starts a countdown when playback enters the buffering
//! state and drops it as soon as playback reports any other state. If the
//! countdown elapses first, the timeout callback handed over when buffering
//! began runs exactly once.
//!
//! ```text
//! Idle ──buffering──► CountingDown ──not buffering──► Idle (cancelled)
//!                          │
//!                          └──elapsed──► Idle (timeout callback)
//! ```

use crate::engine::PlaybackState;
use pmoutils::TimerSlot;
use std::time::Duration;
use tracing::debug;

/// Default buffering timeout
pub const BUFFER_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Idle,
    CountingDown,
}

/// Single-shot buffering countdown.
#[derive(Debug)]
pub struct BufferWatchdog {
    timeout: Duration,
    timer: TimerSlot,
}

impl BufferWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            timer: TimerSlot::new("buffer-watchdog"),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Feeds a playback state change.
    ///
    /// Entering [`PlaybackState::Buffering`] arms the countdown unless one is
    /// already running, in which case `on_timeout` is dropped unused. Any other
    /// state cancels the countdown. Needs a Tokio runtime to arm.
    pub fn on_playback_state_changed<F>(&self, state: PlaybackState, on_timeout: F) -> WatchdogState
    where
        F: FnOnce() + Send + 'static,
    {
        if state.is_buffering() {
            if self.timer.arm_if_idle(self.timeout, on_timeout) {
                debug!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Buffering started, watchdog armed"
                );
            }
        } else if self.timer.cancel() {
            debug!(?state, "Buffering ended before timeout");
        }
        self.state()
    }

    /// Drops a running countdown without firing it.
    pub fn disarm(&self) -> bool {
        self.timer.cancel()
    }

    pub fn state(&self) -> WatchdogState {
        if self.timer.is_armed() {
            WatchdogState::CountingDown
        } else {
            WatchdogState::Idle
        }
    }
}

impl Default for BufferWatchdog {
    fn default() -> Self {
        Self::new(Duration::from_millis(BUFFER_TIMEOUT_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    fn timeouts() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let shared = Arc::clone(&count);
        (count, move || {
            let shared = Arc::clone(&shared);
            Box::new(move || {
                shared.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffering_twice_arms_once() {
        let watchdog = BufferWatchdog::default();
        let (count, callback) = timeouts();

        assert_eq!(
            watchdog.on_playback_state_changed(PlaybackState::Buffering, callback()),
            WatchdogState::CountingDown
        );
        sleep(Duration::from_secs(6)).await;
        // Must not restart the countdown
        watchdog.on_playback_state_changed(PlaybackState::Buffering, callback());

        sleep(Duration::from_millis(4_001)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(watchdog.state(), WatchdogState::Idle);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_before_timeout_cancels() {
        let watchdog = BufferWatchdog::default();
        let (count, callback) = timeouts();

        watchdog.on_playback_state_changed(PlaybackState::Buffering, callback());
        sleep(Duration::from_secs(4)).await;
        assert_eq!(
            watchdog.on_playback_state_changed(PlaybackState::Ready, callback()),
            WatchdogState::Idle
        );

        sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reusable_after_timeout() {
        let watchdog = BufferWatchdog::new(Duration::from_secs(1));
        let (count, callback) = timeouts();

        watchdog.on_playback_state_changed(PlaybackState::Buffering, callback());
        sleep(Duration::from_millis(1_001)).await;
        watchdog.on_playback_state_changed(PlaybackState::Buffering, callback());
        sleep(Duration::from_millis(1_001)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_exactly_at_deadline_times_out_or_cancels() {
        let watchdog = BufferWatchdog::default();
        let (count, callback) = timeouts();

        watchdog.on_playback_state_changed(PlaybackState::Buffering, callback());
        sleep(Duration::from_millis(BUFFER_TIMEOUT_MS)).await;
        let cancelled = watchdog.disarm();

        sleep(Duration::from_secs(30)).await;
        assert_eq!(usize::from(cancelled) + count.load(Ordering::SeqCst), 1);
        assert_eq!(watchdog.state(), WatchdogState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm() {
        let watchdog = BufferWatchdog::default();
        let (count, callback) = timeouts();

        watchdog.on_playback_state_changed(PlaybackState::Buffering, callback());
        assert!(watchdog.disarm());
        assert!(!watchdog.disarm());

        sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
