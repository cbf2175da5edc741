//! Single-shot timers with atomic cancel/replace semantics.
//!
//! A [`TimerSlot`] owns at most one pending timer. Arming a new timer and
//! cancelling the current one happen under the same lock, and a timer that
//! elapses must *claim* its slot under that lock before running its callback.
//! For every armed timer exactly one of two things happens: it is cancelled,
//! or its callback runs.
//!
//! Timers are Tokio tasks, so `arm` and `arm_if_idle` must be called from
//! within a Tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::trace;

struct PendingTimer {
    generation: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct SlotState {
    last_generation: u64,
    pending: Option<PendingTimer>,
}

impl SlotState {
    fn take_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Owned slot holding at most one pending single-shot timer.
pub struct TimerSlot {
    name: &'static str,
    state: Arc<Mutex<SlotState>>,
}

impl TimerSlot {
    /// Creates an empty slot. `name` only shows up in trace logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(SlotState::default())),
        }
    }

    /// Arms a timer, cancelling whatever was pending.
    ///
    /// Returns `true` if a pending timer was replaced.
    pub fn arm<F>(&self, delay: Duration, on_fire: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = lock(&self.state);
        let replaced = state.take_pending();
        self.spawn_locked(&mut state, delay, on_fire);
        replaced
    }

    /// Arms a timer only if none is pending.
    ///
    /// Returns `true` if a timer was armed.
    pub fn arm_if_idle<F>(&self, delay: Duration, on_fire: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = lock(&self.state);
        if state.pending.is_some() {
            return false;
        }
        self.spawn_locked(&mut state, delay, on_fire);
        true
    }

    /// Cancels the pending timer, if any.
    ///
    /// Returns `true` if a timer was pending. Once this returns, the
    /// cancelled timer's callback will never run.
    pub fn cancel(&self) -> bool {
        let cancelled = lock(&self.state).take_pending();
        if cancelled {
            trace!(timer = self.name, "Pending timer cancelled");
        }
        cancelled
    }

    /// Whether a timer is currently pending.
    pub fn is_armed(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    fn spawn_locked<F>(&self, state: &mut SlotState, delay: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        state.last_generation += 1;
        let generation = state.last_generation;
        let token = CancellationToken::new();
        state.pending = Some(PendingTimer {
            generation,
            token: token.clone(),
        });

        let shared = Arc::clone(&self.state);
        let name = self.name;
        trace!(
            timer = name,
            generation,
            delay_ms = delay.as_millis() as u64,
            "Timer armed"
        );

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = sleep(delay) => {
                    if claim(&shared, generation) {
                        trace!(timer = name, generation, "Timer fired");
                        on_fire();
                    }
                }
            }
        });
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        lock(&self.state).take_pending();
    }
}

impl std::fmt::Debug for TimerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerSlot")
            .field("name", &self.name)
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Takes the pending entry if it still belongs to `generation`.
fn claim(state: &Mutex<SlotState>, generation: u64) -> bool {
    let mut state = lock(state);
    match state.pending.as_ref() {
        Some(pending) if pending.generation == generation => {
            state.pending = None;
            true
        }
        _ => false,
    }
}

fn lock(state: &Mutex<SlotState>) -> MutexGuard<'_, SlotState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let slot = TimerSlot::new("test");
        let (count, on_fire) = counter();

        assert!(slot.arm_if_idle(Duration::from_millis(100), on_fire));
        assert!(slot.is_armed());

        sleep(Duration::from_millis(99)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!slot.is_armed());

        sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_elapse() {
        let slot = TimerSlot::new("test");
        let (count, on_fire) = counter();

        slot.arm(Duration::from_millis(100), on_fire);
        sleep(Duration::from_millis(50)).await;

        assert!(slot.cancel());
        assert!(!slot.cancel());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_replaces_pending_timer() {
        let slot = TimerSlot::new("test");
        let (first, first_fire) = counter();
        let (second, second_fire) = counter();

        assert!(!slot.arm(Duration::from_millis(100), first_fire));
        assert!(slot.arm(Duration::from_millis(300), second_fire));

        sleep(Duration::from_millis(150)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_if_idle_keeps_existing_timer() {
        let slot = TimerSlot::new("test");
        let (first, first_fire) = counter();
        let (second, second_fire) = counter();

        assert!(slot.arm_if_idle(Duration::from_millis(100), first_fire));
        assert!(!slot.arm_if_idle(Duration::from_millis(10), second_fire));

        sleep(Duration::from_millis(150)).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_at_deadline_is_exclusive_with_firing() {
        let slot = TimerSlot::new("test");
        for offset_ms in [99_u64, 100, 100, 100, 101] {
            let (count, on_fire) = counter();
            slot.arm(Duration::from_millis(100), on_fire);

            // At 100 ms both sleeps are due; cancel runs before this task yields
            sleep(Duration::from_millis(offset_ms)).await;
            let cancelled = slot.cancel();

            sleep(Duration::from_millis(500)).await;
            let fired = count.load(Ordering::SeqCst);
            assert_eq!(
                usize::from(cancelled) + fired,
                1,
                "offset {} ms: cancelled={} fired={}",
                offset_ms,
                cancelled,
                fired
            );
            if offset_ms < 100 {
                assert!(cancelled);
            }
            if offset_ms > 100 {
                assert_eq!(fired, 1);
            }
            assert!(!slot.is_armed());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_at_deadline_runs_one_callback() {
        let slot = TimerSlot::new("test");
        let (first, first_fire) = counter();
        let (second, second_fire) = counter();

        slot.arm(Duration::from_millis(100), first_fire);
        sleep(Duration::from_millis(100)).await;
        let replaced = slot.arm(Duration::from_millis(100), second_fire);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(
            usize::from(replaced) + first.load(Ordering::SeqCst),
            1
        );
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_timer() {
        let (count, on_fire) = counter();
        {
            let slot = TimerSlot::new("test");
            slot.arm(Duration::from_millis(10), on_fire);
        }
        sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
