//! HTTP stream engine
//!
//! Pulls a radio stream with `reqwest` and reports the playback state from
//! the flow of bytes: `Buffering` while connecting or when no chunk arrived
//! within the stall threshold, `Ready` as data flows, `Ended` when the server
//! closes the body. Decoding is left to whoever consumes the chunk sink.

use crate::engine::{AudioEngine, EngineEvent, PlaybackState};
use crate::error::{PlaybackError, Result};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

/// Default radio stream
pub const DEFAULT_STREAM_URL: &str = "https://stream.r-a-d.io/main.mp3";

/// Silence after which the stream is considered stalled
pub const DEFAULT_STALL_THRESHOLD_MS: u64 = 2000;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "pmoradio/0.1.0";

/// [`AudioEngine`] reading an HTTP audio stream.
///
/// # Example
///
/// ```no_run
/// use pmoplayer::{HttpStreamEngine, RadioPlayer};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = HttpStreamEngine::builder()
///         .stream_url("https://stream.r-a-d.io/main.mp3")
///         .build()?;
///     let player = RadioPlayer::with_defaults(Arc::new(engine));
///     player.play();
///     tokio::signal::ctrl_c().await?;
///     player.release();
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct HttpStreamEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    client: Client,
    stream_url: Url,
    stall_threshold: Duration,
    state: Mutex<EngineState>,
}

struct EngineState {
    playback: PlaybackState,
    play_when_ready: bool,
    released: bool,
    session: Option<CancellationToken>,
    events: Option<mpsc::UnboundedSender<EngineEvent>>,
    sink: Option<mpsc::Sender<Bytes>>,
}

impl EngineState {
    fn emit(&self, event: EngineEvent) {
        if let Some(events) = &self.events {
            // A closed subscriber just means nobody is listening anymore
            let _ = events.send(event);
        }
    }

    fn transition(&mut self, playback: PlaybackState) {
        if self.playback == playback {
            return;
        }
        self.playback = playback;
        self.emit(EngineEvent::StateChanged {
            play_when_ready: self.play_when_ready,
            state: playback,
        });
    }

    fn end_session(&mut self) {
        if let Some(token) = self.session.take() {
            token.cancel();
        }
    }
}

impl HttpStreamEngine {
    pub fn builder() -> HttpStreamEngineBuilder {
        HttpStreamEngineBuilder::default()
    }

    pub fn stream_url(&self) -> &Url {
        &self.inner.stream_url
    }
}

impl std::fmt::Debug for HttpStreamEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStreamEngine")
            .field("stream_url", &self.inner.stream_url.as_str())
            .field("state", &self.playback_state())
            .finish()
    }
}

impl AudioEngine for HttpStreamEngine {
    fn prepare(&self) -> Result<()> {
        let token = {
            let mut state = self.inner.lock_state();
            if state.released {
                return Err(PlaybackError::engine("engine already released"));
            }
            state.end_session();
            let token = CancellationToken::new();
            state.session = Some(token.clone());
            state.transition(PlaybackState::Buffering);
            token
        };

        info!(url = %self.inner.stream_url, "Connecting to stream");
        tokio::spawn(pull_stream(Arc::clone(&self.inner), token));
        Ok(())
    }

    fn set_play_when_ready(&self, play_when_ready: bool) {
        let mut state = self.inner.lock_state();
        if state.play_when_ready == play_when_ready {
            return;
        }
        state.play_when_ready = play_when_ready;
        let playback = state.playback;
        state.emit(EngineEvent::StateChanged {
            play_when_ready,
            state: playback,
        });
    }

    fn play_when_ready(&self) -> bool {
        self.inner.lock_state().play_when_ready
    }

    fn playback_state(&self) -> PlaybackState {
        self.inner.lock_state().playback
    }

    fn stop(&self) {
        let mut state = self.inner.lock_state();
        state.end_session();
        state.transition(PlaybackState::Idle);
        debug!("Stream stopped");
    }

    fn release(&self) {
        let mut state = self.inner.lock_state();
        state.end_session();
        state.transition(PlaybackState::Idle);
        state.released = true;
        state.events = None;
        state.sink = None;
        debug!("Stream engine released");
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock_state().events = Some(tx);
        rx
    }
}

impl EngineInner {
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `apply` only while `token` is still the current session.
    fn with_session<R>(
        &self,
        token: &CancellationToken,
        apply: impl FnOnce(&mut EngineState) -> R,
    ) -> Option<R> {
        let mut state = self.lock_state();
        if token.is_cancelled() {
            return None;
        }
        Some(apply(&mut state))
    }

    fn fail(&self, token: &CancellationToken, err: PlaybackError) {
        warn!(error = %err, url = %self.stream_url, "Stream failed");
        self.with_session(token, |state| {
            state.session = None;
            state.emit(EngineEvent::Error(err));
        });
    }
}

/// Pull loop for one prepared session.
async fn pull_stream(inner: Arc<EngineInner>, token: CancellationToken) {
    let request = inner.client.get(inner.stream_url.clone()).send();
    let response = tokio::select! {
        _ = token.cancelled() => return,
        response = request => response,
    };

    let response = match response {
        Ok(response) => response,
        Err(err) => return inner.fail(&token, PlaybackError::Stream(err)),
    };
    let status = response.status();
    if !status.is_success() {
        return inner.fail(&token, PlaybackError::Status(status));
    }

    debug!(%status, "Stream connected");
    let mut body = response.bytes_stream();

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => return,
            next = tokio::time::timeout(inner.stall_threshold, body.next()) => next,
        };

        match next {
            Err(_) => {
                trace!(
                    stall_ms = inner.stall_threshold.as_millis() as u64,
                    "No stream data, buffering"
                );
                if inner
                    .with_session(&token, |state| state.transition(PlaybackState::Buffering))
                    .is_none()
                {
                    return;
                }
            }
            Ok(Some(Ok(chunk))) => {
                let sink = inner.with_session(&token, |state| {
                    state.transition(PlaybackState::Ready);
                    if state.play_when_ready {
                        state.sink.clone()
                    } else {
                        None
                    }
                });
                let sink = match sink {
                    Some(sink) => sink,
                    None => return,
                };
                if let Some(sink) = sink {
                    match sink.try_send(chunk) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(chunk)) => {
                            trace!(
                                bytes = chunk.len(),
                                "Chunk sink full, dropping stream data"
                            );
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            debug!("Chunk sink closed, discarding stream data");
                            inner.lock_state().sink = None;
                        }
                    }
                }
            }
            Ok(Some(Err(err))) => return inner.fail(&token, PlaybackError::Stream(err)),
            Ok(None) => {
                info!("Stream ended");
                inner.with_session(&token, |state| {
                    state.session = None;
                    state.transition(PlaybackState::Ended);
                });
                return;
            }
        }
    }
}

/// Builder for [`HttpStreamEngine`]
#[derive(Debug, Default)]
pub struct HttpStreamEngineBuilder {
    client: Option<Client>,
    stream_url: Option<String>,
    stall_threshold: Option<Duration>,
    user_agent: Option<String>,
    sink: Option<mpsc::Sender<Bytes>>,
}

impl HttpStreamEngineBuilder {
    /// Use an existing reqwest client. The user agent setting is ignored in that case.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    pub fn stall_threshold(mut self, threshold: Duration) -> Self {
        self.stall_threshold = Some(threshold);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Where stream chunks go while playing. Without a sink they are discarded.
    ///
    /// The pull loop never waits on the sink: chunks arriving while it is full
    /// are dropped, so a slow consumer cannot hide a stalled stream.
    pub fn sink(mut self, sink: mpsc::Sender<Bytes>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<HttpStreamEngine> {
        let stream_url = Url::parse(self.stream_url.as_deref().unwrap_or(DEFAULT_STREAM_URL))?;

        // No overall request timeout: the body of a live stream never ends
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(
                    self.user_agent
                        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
                )
                .build()?,
        };

        Ok(HttpStreamEngine {
            inner: Arc::new(EngineInner {
                client,
                stream_url,
                stall_threshold: self
                    .stall_threshold
                    .unwrap_or(Duration::from_millis(DEFAULT_STALL_THRESHOLD_MS)),
                state: Mutex::new(EngineState {
                    playback: PlaybackState::Idle,
                    play_when_ready: false,
                    released: false,
                    session: None,
                    events: None,
                    sink: self.sink,
                }),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let engine = HttpStreamEngine::builder().build().unwrap();
        assert_eq!(engine.stream_url().as_str(), DEFAULT_STREAM_URL);
        assert_eq!(engine.playback_state(), PlaybackState::Idle);
        assert!(!engine.play_when_ready());
    }

    #[test]
    fn test_builder_rejects_invalid_url() {
        let result = HttpStreamEngine::builder().stream_url("::nope").build();
        assert!(matches!(result, Err(PlaybackError::InvalidUrl(_))));
    }

    #[test]
    fn test_prepare_after_release_fails() {
        let engine = HttpStreamEngine::builder().build().unwrap();
        engine.release();
        assert!(matches!(engine.prepare(), Err(PlaybackError::Engine(_))));
    }
}
