//! Track-aligned polling of now-playing content.
//!
//! The poller fetches once, hands the result to its listener and, while
//! repeating, arms a single-shot timer for the moment the current track is
//! expected to end. A failed fetch of the current repeating session is
//! reported and ends that session (the poller goes back to
//! [`PollState::Idle`]): nothing re-arms the timer until
//! [`ContentPoller::start_repeating`] is called again. Failures of
//! [`ContentPoller::fetch_once`] or of a fetch left over from an earlier
//! session are only reported.
//!
//! ```text
//! start_repeating ─► fetch ─► listener ─► (Scheduled?) arm(next_poll_delay) ─► fetch ─► …
//!                      │
//!                      └─ error ─► listener.on_content_load_failed (loop ends)
//! ```

use crate::error::Result;
use crate::listener::ContentListener;
use crate::models::{NowPlayingTrack, RadioContent};
use crate::source::NowPlayingSource;
use pmoutils::TimerSlot;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delay used when the current track has no known end
pub const DEFAULT_POLL_DELAY_MS: u64 = 5000;

/// Padding past the announced track end, so the next fetch sees the new track
pub const BOUNDARY_PADDING_MS: u64 = 1000;

/// Whether repeated polling is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Scheduled,
}

/// Poller tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub default_delay: Duration,
    pub boundary_padding: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            default_delay: Duration::from_millis(DEFAULT_POLL_DELAY_MS),
            boundary_padding: Duration::from_millis(BOUNDARY_PADDING_MS),
        }
    }
}

/// Delay before the next fetch, given the track just fetched.
///
/// With the default configuration this is `(remaining + 1) * 1000` ms for a
/// known remaining time and 5000 ms otherwise.
pub fn next_poll_delay(track: &NowPlayingTrack, config: &PollerConfig) -> Duration {
    match track.remaining_time() {
        Some(remaining) => remaining + config.boundary_padding,
        None => config.default_delay,
    }
}

/// Self-rescheduling now-playing poller.
///
/// Cheap to clone; clones share the same state, listener and timer.
/// Must be used from within a Tokio runtime.
#[derive(Clone)]
pub struct ContentPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    source: Arc<dyn NowPlayingSource>,
    config: PollerConfig,
    listener: RwLock<Option<Arc<dyn ContentListener>>>,
    state: Mutex<LoopState>,
    timer: TimerSlot,
}

struct LoopState {
    poll: PollState,
    /// Bumped by every `start_repeating`
    session: u64,
}

/// Who asked for a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchOrigin {
    OneShot,
    Session(u64),
}

impl ContentPoller {
    pub fn new(source: Arc<dyn NowPlayingSource>, config: PollerConfig) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                source,
                config,
                listener: RwLock::new(None),
                state: Mutex::new(LoopState {
                    poll: PollState::Idle,
                    session: 0,
                }),
                timer: TimerSlot::new("now-playing-poll"),
            }),
        }
    }

    pub fn with_defaults(source: Arc<dyn NowPlayingSource>) -> Self {
        Self::new(source, PollerConfig::default())
    }

    /// Registers the consumer of fetch outcomes, replacing any previous one.
    pub fn attach_listener(&self, listener: Arc<dyn ContentListener>) {
        *self
            .inner
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    pub fn state(&self) -> PollState {
        self.inner.lock_state().poll
    }

    pub fn is_repeating(&self) -> bool {
        self.state() == PollState::Scheduled
    }

    /// Whether a reschedule timer is pending.
    pub fn has_pending_fetch(&self) -> bool {
        self.inner.timer.is_armed()
    }

    /// Starts repeated polling and fetches immediately.
    ///
    /// No-op (returns `None`) while already repeating. Otherwise returns the
    /// handle of the first fetch.
    pub fn start_repeating(&self) -> Option<JoinHandle<()>> {
        let session = {
            let mut state = self.inner.lock_state();
            if state.poll == PollState::Scheduled {
                debug!("Scheduled loading already active");
                return None;
            }
            state.poll = PollState::Scheduled;
            state.session += 1;
            state.session
        };

        info!(session, "Starting scheduled loading of now-playing content");
        Some(PollerInner::spawn_fetch(
            &self.inner,
            FetchOrigin::Session(session),
        ))
    }

    /// Stops repeated polling and drops any pending reschedule.
    ///
    /// A fetch already in flight still completes and is still delivered to
    /// the listener, but it will not reschedule.
    pub fn stop_repeating(&self) {
        let mut state = self.inner.lock_state();
        state.poll = PollState::Idle;
        let cancelled = self.inner.timer.cancel();
        drop(state);

        info!(
            cancelled_timer = cancelled,
            "Stopped scheduled loading of now-playing content"
        );
    }

    /// Issues one fetch regardless of the repeating state.
    ///
    /// A failure is reported but leaves a running loop untouched.
    pub fn fetch_once(&self) -> JoinHandle<()> {
        PollerInner::spawn_fetch(&self.inner, FetchOrigin::OneShot)
    }
}

impl std::fmt::Debug for ContentPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentPoller")
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .field("timer", &self.inner.timer)
            .finish()
    }
}

impl PollerInner {
    fn lock_state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listener(&self) -> Option<Arc<dyn ContentListener>> {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn spawn_fetch(inner: &Arc<Self>, origin: FetchOrigin) -> JoinHandle<()> {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let outcome = inner.source.fetch_now_playing().await;
            PollerInner::handle_outcome(&inner, outcome, origin);
        })
    }

    fn handle_outcome(inner: &Arc<Self>, outcome: Result<RadioContent>, origin: FetchOrigin) {
        let listener = inner.listener();

        let content = match outcome {
            Ok(content) => content,
            Err(err) => {
                warn!(error = %err, "Failed to load now-playing content");
                inner.end_session_on_failure(origin);
                match listener {
                    Some(listener) => listener.on_content_load_failed(),
                    None => debug!("No content listener attached, dropping failure"),
                }
                return;
            }
        };

        let delay = next_poll_delay(&content.current_track, &inner.config);

        match listener {
            Some(listener) => listener.on_content_loaded(content),
            None => debug!("No content listener attached, dropping content"),
        }

        // Armed under the state lock so a concurrent stop either sees the
        // timer and cancels it, or is seen here as Idle.
        let state = inner.lock_state();
        if state.poll != PollState::Scheduled {
            debug!("Poller stopped while fetching, not rescheduling");
            return;
        }

        let weak = Arc::downgrade(inner);
        let session = state.session;
        inner
            .timer
            .arm(delay, move || PollerInner::on_timer_elapsed(&weak, session));
        drop(state);

        debug!(delay_ms = delay.as_millis() as u64, "Next now-playing fetch scheduled");
    }

    /// A failed fetch of the live session ends it; `start_repeating` restarts it.
    fn end_session_on_failure(&self, origin: FetchOrigin) {
        let FetchOrigin::Session(session) = origin else {
            return;
        };
        let mut state = self.lock_state();
        if state.poll != PollState::Scheduled {
            return;
        }
        if state.session != session {
            debug!(
                session,
                current = state.session,
                "Ignoring failure of an earlier session"
            );
            return;
        }
        state.poll = PollState::Idle;
        self.timer.cancel();
        info!(session, "Scheduled loading ended by a failed fetch");
    }

    fn on_timer_elapsed(weak: &Weak<Self>, session: u64) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let state = inner.lock_state();
        if state.poll != PollState::Scheduled || state.session != session {
            return;
        }
        drop(state);
        PollerInner::spawn_fetch(&inner, FetchOrigin::Session(session));
    }
}
