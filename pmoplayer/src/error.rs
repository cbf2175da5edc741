//! Error types for stream playback

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Errors reported by an audio engine or synthesized by the player
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The engine stayed in the buffering state past the watchdog timeout
    #[error("Buffering timed out after {timeout_ms} ms")]
    BufferingTimedOut { timeout_ms: u64 },

    /// Transport failure while connecting to or reading the stream
    #[error("Stream transport failed: {0}")]
    Stream(#[from] reqwest::Error),

    /// The stream server answered with a non-success status
    #[error("Stream server returned error status: {0}")]
    Status(reqwest::StatusCode),

    /// Invalid stream URL
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Engine-specific failure
    #[error("Audio engine error: {0}")]
    Engine(String),
}

impl PlaybackError {
    /// Create an engine error from a string
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    pub fn is_buffering_timeout(&self) -> bool {
        matches!(self, Self::BufferingTimedOut { .. })
    }
}
