//! Radio player screen logic.
//!
//! The presenter keeps the now-playing poller running while the screen is
//! visible, toggles playback from the action button and turns content and
//! stream failures into error messages plus a paused player.

use pmonowplaying::{ContentListener, ContentPoller, RadioContent};
use pmoplayer::{PlaybackError, RadioPlayer, StreamErrorListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::{debug, warn};

/// What the presenter drives on screen
pub trait View: Send + Sync {
    fn show_play_button(&self);
    fn show_pause_button(&self);
    fn show_current_track_title(&self, title: &str);
    fn show_current_dj_name(&self, name: &str);
    fn show_num_of_listeners(&self, count: u32);
    fn show_could_not_load_content_error(&self);
    fn show_could_not_play_stream_error(&self);
}

/// Playback commands the presenter needs from a player
pub trait PlaybackControl: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn is_playing(&self) -> bool;
}

impl PlaybackControl for RadioPlayer {
    fn play(&self) {
        RadioPlayer::play(self)
    }

    fn pause(&self) {
        RadioPlayer::pause(self)
    }

    fn is_playing(&self) -> bool {
        RadioPlayer::is_playing(self)
    }
}

pub struct RadioPlayerPresenter {
    view: Arc<dyn View>,
    poller: ContentPoller,
    player: RwLock<Option<Arc<dyn PlaybackControl>>>,
    playing: AtomicBool,
}

/// Listener registered on the poller and the player; holds the presenter weakly
struct PresenterLink(Weak<RadioPlayerPresenter>);

impl ContentListener for PresenterLink {
    fn on_content_loaded(&self, content: RadioContent) {
        if let Some(presenter) = self.0.upgrade() {
            presenter.on_content_loaded(content);
        }
    }

    fn on_content_load_failed(&self) {
        if let Some(presenter) = self.0.upgrade() {
            presenter.on_content_load_failed();
        }
    }
}

impl StreamErrorListener for PresenterLink {
    fn on_stream_error(&self, error: &PlaybackError) {
        if let Some(presenter) = self.0.upgrade() {
            presenter.on_stream_error(error);
        }
    }
}

impl RadioPlayerPresenter {
    /// Creates the presenter and registers it as the poller's listener.
    pub fn new(view: Arc<dyn View>, poller: ContentPoller) -> Arc<Self> {
        let presenter = Arc::new(Self {
            view,
            poller,
            player: RwLock::new(None),
            playing: AtomicBool::new(false),
        });
        presenter
            .poller
            .attach_listener(Arc::new(PresenterLink(Arc::downgrade(&presenter))));
        presenter
    }

    /// Listener to hand to [`RadioPlayer::set_stream_error_listener`].
    pub fn stream_error_listener(self: &Arc<Self>) -> Arc<dyn StreamErrorListener> {
        Arc::new(PresenterLink(Arc::downgrade(self)))
    }

    pub fn on_resume(&self) {
        self.poller.start_repeating();
    }

    pub fn on_pause(&self) {
        self.poller.stop_repeating();
    }

    pub fn on_player_connected(&self, player: Arc<dyn PlaybackControl>, is_playing: bool) {
        *self
            .player
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(player);
        if is_playing {
            self.set_state_playing();
        } else {
            self.set_state_paused();
        }
    }

    pub fn on_player_disconnected(&self) {
        *self
            .player
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_player_connected(&self) -> bool {
        self.player().is_some()
    }

    pub fn is_player_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn on_action_button_clicked(&self) {
        if self.is_player_playing() {
            self.pause_player();
        } else {
            self.play_player();
        }
    }

    pub fn on_content_loaded(&self, content: RadioContent) {
        self.view
            .show_current_track_title(&content.current_track.title);
        self.view.show_current_dj_name(&content.current_dj.name);
        self.view.show_num_of_listeners(content.listener_count);
    }

    pub fn on_content_load_failed(&self) {
        self.view.show_could_not_load_content_error();
        self.pause_player();
    }

    pub fn on_stream_error(&self, error: &PlaybackError) {
        warn!(error = %error, "Could not play stream");
        self.view.show_could_not_play_stream_error();
        self.pause_player();
    }

    fn player(&self) -> Option<Arc<dyn PlaybackControl>> {
        self.player
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn pause_player(&self) {
        match self.player() {
            Some(player) => {
                player.pause();
                self.set_state_paused();
            }
            None => debug!("No player connected, nothing to pause"),
        }
    }

    fn play_player(&self) {
        match self.player() {
            Some(player) => {
                player.play();
                self.set_state_playing();
            }
            None => self.view.show_could_not_play_stream_error(),
        }
    }

    fn set_state_paused(&self) {
        self.view.show_play_button();
        self.playing.store(false, Ordering::SeqCst);
    }

    fn set_state_playing(&self) {
        self.view.show_pause_button();
        self.playing.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pmonowplaying::{Dj, Error, NowPlayingSource, NowPlayingTrack, Result};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq)]
    enum Shown {
        PlayButton,
        PauseButton,
        Title(String),
        DjName(String),
        Listeners(u32),
        ContentError,
        StreamError,
    }

    #[derive(Default)]
    struct FakeView {
        shown: Mutex<Vec<Shown>>,
    }

    impl FakeView {
        fn shown(&self) -> Vec<Shown> {
            self.shown.lock().unwrap().clone()
        }

        fn push(&self, shown: Shown) {
            self.shown.lock().unwrap().push(shown);
        }
    }

    impl View for FakeView {
        fn show_play_button(&self) {
            self.push(Shown::PlayButton);
        }
        fn show_pause_button(&self) {
            self.push(Shown::PauseButton);
        }
        fn show_current_track_title(&self, title: &str) {
            self.push(Shown::Title(title.to_string()));
        }
        fn show_current_dj_name(&self, name: &str) {
            self.push(Shown::DjName(name.to_string()));
        }
        fn show_num_of_listeners(&self, count: u32) {
            self.push(Shown::Listeners(count));
        }
        fn show_could_not_load_content_error(&self) {
            self.push(Shown::ContentError);
        }
        fn show_could_not_play_stream_error(&self) {
            self.push(Shown::StreamError);
        }
    }

    #[derive(Default)]
    struct FakePlayer {
        plays: AtomicUsize,
        pauses: AtomicUsize,
        playing: AtomicBool,
    }

    impl PlaybackControl for FakePlayer {
        fn play(&self) {
            self.plays.fetch_add(1, Ordering::SeqCst);
            self.playing.store(true, Ordering::SeqCst);
        }
        fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
            self.playing.store(false, Ordering::SeqCst);
        }
        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
    }

    struct FakeSource {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NowPlayingSource for FakeSource {
        async fn fetch_now_playing(&self) -> Result<RadioContent> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::other("offline"));
            }
            Ok(fake_content())
        }
    }

    fn fake_content() -> RadioContent {
        RadioContent::new(
            NowPlayingTrack::new("current track title", 120),
            Dj::new("current dj name", 4),
            253,
        )
    }

    struct Fixture {
        presenter: Arc<RadioPlayerPresenter>,
        view: Arc<FakeView>,
        player: Arc<FakePlayer>,
        source: Arc<FakeSource>,
        poller: ContentPoller,
    }

    fn fixture(fail: bool) -> Fixture {
        let view = Arc::new(FakeView::default());
        let source = Arc::new(FakeSource {
            fail,
            calls: AtomicUsize::new(0),
        });
        let poller = ContentPoller::with_defaults(source.clone());
        let presenter = RadioPlayerPresenter::new(view.clone(), poller.clone());
        Fixture {
            presenter,
            view,
            player: Arc::new(FakePlayer::default()),
            source,
            poller,
        }
    }

    fn connect(f: &Fixture, is_playing: bool) {
        f.presenter.on_player_connected(f.player.clone(), is_playing);
    }

    #[test]
    fn test_defaults() {
        let f = fixture(false);
        assert!(!f.presenter.is_player_connected());
        assert!(!f.presenter.is_player_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_resume_starts_polling_and_on_pause_stops_it() {
        let f = fixture(false);

        f.presenter.on_resume();
        assert!(f.poller.is_repeating());
        tokio::task::yield_now().await;
        assert_eq!(f.source.calls.load(Ordering::SeqCst), 1);

        f.presenter.on_pause();
        assert!(!f.poller.is_repeating());
        assert!(!f.poller.has_pending_fetch());
    }

    #[test]
    fn test_connected_while_playing_shows_pause_button() {
        let f = fixture(false);
        connect(&f, true);

        assert!(f.presenter.is_player_connected());
        assert!(f.presenter.is_player_playing());
        assert_eq!(f.view.shown(), vec![Shown::PauseButton]);
    }

    #[test]
    fn test_connected_while_paused_shows_play_button() {
        let f = fixture(false);
        connect(&f, false);

        assert!(f.presenter.is_player_connected());
        assert!(!f.presenter.is_player_playing());
        assert_eq!(f.view.shown(), vec![Shown::PlayButton]);
    }

    #[test]
    fn test_disconnected() {
        let f = fixture(false);
        connect(&f, false);
        f.presenter.on_player_disconnected();
        assert!(!f.presenter.is_player_connected());
    }

    #[test]
    fn test_action_button_toggles_playback() {
        let f = fixture(false);
        connect(&f, false);

        f.presenter.on_action_button_clicked();
        assert!(f.presenter.is_player_playing());
        assert_eq!(f.player.plays.load(Ordering::SeqCst), 1);

        f.presenter.on_action_button_clicked();
        assert!(!f.presenter.is_player_playing());
        assert_eq!(f.player.pauses.load(Ordering::SeqCst), 1);

        assert_eq!(
            f.view.shown(),
            vec![Shown::PlayButton, Shown::PauseButton, Shown::PlayButton]
        );
    }

    #[test]
    fn test_play_without_player_shows_error_and_keeps_state() {
        let f = fixture(false);

        f.presenter.on_action_button_clicked();

        assert!(!f.presenter.is_player_playing());
        assert_eq!(f.view.shown(), vec![Shown::StreamError]);
    }

    #[test]
    fn test_pause_without_player_changes_nothing() {
        let f = fixture(false);
        connect(&f, true);
        f.presenter.on_player_disconnected();

        f.presenter.on_action_button_clicked();

        assert!(f.presenter.is_player_playing());
        assert_eq!(f.view.shown(), vec![Shown::PauseButton]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loaded_content_is_shown() {
        let f = fixture(false);
        f.poller.fetch_once().await.unwrap();

        assert_eq!(
            f.view.shown(),
            vec![
                Shown::Title("current track title".into()),
                Shown::DjName("current dj name".into()),
                Shown::Listeners(253),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_failure_shows_error_and_pauses() {
        let f = fixture(true);
        connect(&f, true);

        f.poller.fetch_once().await.unwrap();

        assert_eq!(
            f.view.shown(),
            vec![Shown::PauseButton, Shown::ContentError, Shown::PlayButton]
        );
        assert!(!f.presenter.is_player_playing());
        assert_eq!(f.player.pauses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stream_error_shows_error_and_pauses() {
        let f = fixture(false);
        connect(&f, true);

        f.presenter
            .stream_error_listener()
            .on_stream_error(&PlaybackError::BufferingTimedOut { timeout_ms: 10_000 });

        assert_eq!(
            f.view.shown(),
            vec![Shown::PauseButton, Shown::StreamError, Shown::PlayButton]
        );
        assert!(!f.presenter.is_player_playing());
    }
}
