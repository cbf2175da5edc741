//! # pmoplayer - radio stream playback with bounded buffering
//!
//! [`RadioPlayer`] drives an [`AudioEngine`] and watches its buffering: if
//! the engine stays in [`PlaybackState::Buffering`] longer than the
//! configured timeout (10 s by default), playback is stopped and the
//! [`StreamErrorListener`] is told, exactly as for a native engine error.
//!
//! [`HttpStreamEngine`] is the engine used by the PMORadio binary. Anything
//! implementing [`AudioEngine`] can take its place.

pub mod engine;
pub mod error;
pub mod http_engine;
pub mod player;
pub mod watchdog;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

pub use engine::{AudioEngine, EngineEvent, PlaybackState};
pub use error::{PlaybackError, Result};
pub use http_engine::{HttpStreamEngine, HttpStreamEngineBuilder};
pub use player::{PlayerConfig, RadioPlayer, StreamErrorListener};
pub use watchdog::{BufferWatchdog, WatchdogState, BUFFER_TIMEOUT_MS};

#[cfg(feature = "pmoconfig")]
pub use config_ext::PlayerConfigExt;
