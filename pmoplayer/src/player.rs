//! Radio player: an [`AudioEngine`] plus the buffering watchdog.
//!
//! The player forwards play/pause to the engine and consumes its events. A
//! native engine error and a buffering timeout take the same path: the
//! engine is stopped, the player is marked not playing, then the stream
//! error listener is notified.

use crate::engine::{AudioEngine, EngineEvent, PlaybackState};
use crate::error::PlaybackError;
use crate::watchdog::{BufferWatchdog, WatchdogState, BUFFER_TIMEOUT_MS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Consumer of playback failures
pub trait StreamErrorListener: Send + Sync {
    fn on_stream_error(&self, error: &PlaybackError);
}

/// Player tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    pub buffer_timeout: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            buffer_timeout: Duration::from_millis(BUFFER_TIMEOUT_MS),
        }
    }
}

/// Stream player.
///
/// Cheap to clone; clones drive the same engine. Must be created from within
/// a Tokio runtime, since it spawns the task draining engine events.
#[derive(Clone)]
pub struct RadioPlayer {
    inner: Arc<PlayerInner>,
}

struct PlayerInner {
    engine: Arc<dyn AudioEngine>,
    watchdog: BufferWatchdog,
    playing: AtomicBool,
    listener: RwLock<Option<Arc<dyn StreamErrorListener>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl RadioPlayer {
    pub fn new(engine: Arc<dyn AudioEngine>, config: PlayerConfig) -> Self {
        let events = engine.subscribe();
        let inner = Arc::new(PlayerInner {
            engine,
            watchdog: BufferWatchdog::new(config.buffer_timeout),
            playing: AtomicBool::new(false),
            listener: RwLock::new(None),
            pump: Mutex::new(None),
        });

        let pump = tokio::spawn(pump_events(Arc::downgrade(&inner), events));
        *inner.pump.lock().unwrap_or_else(PoisonError::into_inner) = Some(pump);

        Self { inner }
    }

    pub fn with_defaults(engine: Arc<dyn AudioEngine>) -> Self {
        Self::new(engine, PlayerConfig::default())
    }

    /// Registers the consumer of playback failures, replacing any previous one.
    pub fn set_stream_error_listener(&self, listener: Arc<dyn StreamErrorListener>) {
        *self
            .inner
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::SeqCst)
    }

    pub fn watchdog_state(&self) -> WatchdogState {
        self.inner.watchdog.state()
    }

    /// Prepares the engine if needed and starts playback as soon as it is ready.
    pub fn play(&self) {
        let engine = &self.inner.engine;
        if engine.playback_state() == PlaybackState::Idle {
            debug!("Preparing audio engine");
            if let Err(err) = engine.prepare() {
                PlayerInner::on_player_error(&self.inner, err);
                return;
            }
        }
        engine.set_play_when_ready(true);
        self.inner.playing.store(true, Ordering::SeqCst);
        info!("Playback requested");
    }

    pub fn pause(&self) {
        self.inner.engine.set_play_when_ready(false);
        self.inner.playing.store(false, Ordering::SeqCst);
        info!("Playback paused");
    }

    /// Releases the engine and stops consuming its events.
    pub fn release(&self) {
        self.inner.engine.release();
        self.inner.playing.store(false, Ordering::SeqCst);
        self.inner.watchdog.disarm();
        self.inner.abort_pump();
        info!("Player released");
    }

    /// Applies one engine event. Events from the engine subscription are
    /// routed here automatically.
    pub fn handle_event(&self, event: EngineEvent) {
        PlayerInner::handle_event(&self.inner, event);
    }
}

impl std::fmt::Debug for RadioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioPlayer")
            .field("playing", &self.is_playing())
            .field("watchdog", &self.inner.watchdog)
            .finish()
    }
}

async fn pump_events(player: Weak<PlayerInner>, mut events: mpsc::UnboundedReceiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = player.upgrade() else {
            break;
        };
        PlayerInner::handle_event(&inner, event);
    }
    debug!("Engine event stream closed");
}

impl PlayerInner {
    fn handle_event(inner: &Arc<Self>, event: EngineEvent) {
        match event {
            EngineEvent::StateChanged {
                play_when_ready,
                state,
            } => Self::on_player_state_changed(inner, play_when_ready, state),
            EngineEvent::Error(err) => Self::on_player_error(inner, err),
        }
    }

    fn on_player_state_changed(inner: &Arc<Self>, play_when_ready: bool, state: PlaybackState) {
        debug!(play_when_ready, ?state, "Engine state changed");
        let weak = Arc::downgrade(inner);
        inner.watchdog.on_playback_state_changed(state, move || {
            if let Some(inner) = weak.upgrade() {
                Self::on_buffering_timed_out(&inner);
            }
        });
    }

    fn on_buffering_timed_out(inner: &Arc<Self>) {
        let timeout_ms = inner.watchdog.timeout().as_millis() as u64;
        Self::on_player_error(inner, PlaybackError::BufferingTimedOut { timeout_ms });
    }

    fn on_player_error(inner: &Arc<Self>, err: PlaybackError) {
        error!(error = %err, "Stream playback failed");

        inner.watchdog.disarm();
        inner.engine.stop();
        inner.playing.store(false, Ordering::SeqCst);

        let listener = inner
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match listener {
            Some(listener) => listener.on_stream_error(&err),
            None => debug!("No stream error listener attached"),
        }
    }

    fn abort_pump(&self) {
        if let Some(pump) = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pump.abort();
        }
    }
}

impl Drop for PlayerInner {
    fn drop(&mut self) {
        self.abort_pump();
    }
}
