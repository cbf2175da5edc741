//! Audio engine abstraction driven by [`RadioPlayer`](crate::RadioPlayer)

use crate::error::{PlaybackError, Result};
use tokio::sync::mpsc;

/// Playback state reported by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not prepared, or stopped
    Idle,
    /// Waiting for data before playback can continue
    Buffering,
    /// Data available; playing if play-when-ready is set
    Ready,
    /// The stream ended
    Ended,
}

impl PlaybackState {
    pub fn is_buffering(self) -> bool {
        self == PlaybackState::Buffering
    }
}

/// Notification pushed by an engine to its subscriber
#[derive(Debug)]
pub enum EngineEvent {
    StateChanged {
        play_when_ready: bool,
        state: PlaybackState,
    },
    Error(PlaybackError),
}

/// Audio engine commands and notifications.
///
/// Commands are synchronous; their effects are reported asynchronously
/// through the channel returned by [`AudioEngine::subscribe`].
pub trait AudioEngine: Send + Sync {
    /// Starts loading the stream. The engine leaves [`PlaybackState::Idle`].
    fn prepare(&self) -> Result<()>;

    fn set_play_when_ready(&self, play_when_ready: bool);

    fn play_when_ready(&self) -> bool;

    fn playback_state(&self) -> PlaybackState;

    /// Stops loading and playback; the engine goes back to `Idle` and can be
    /// prepared again.
    fn stop(&self);

    /// Releases the engine for good.
    fn release(&self);

    /// Registers the single event subscriber, replacing any previous one.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent>;
}
