mod logs;
mod presenter;
mod view;

use pmoconfig::get_config;
use pmonowplaying::{ContentPoller, NowPlayingConfigExt};
use pmoplayer::{PlayerConfigExt, RadioPlayer};
use presenter::RadioPlayerPresenter;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use view::ConsoleView;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();
    logs::init_logging(&config);

    info!("📻 Starting PMORadio...");

    let client = config.now_playing_client()?;
    info!(api_url = %client.api_url(), "Now-playing client ready");
    let poller = ContentPoller::new(Arc::new(client), config.poller_config()?);

    let engine = config.http_stream_engine(None)?;
    info!(stream_url = %engine.stream_url(), "Stream engine ready");
    let player = RadioPlayer::new(Arc::new(engine), config.player_config()?);

    let presenter = RadioPlayerPresenter::new(Arc::new(ConsoleView), poller);
    player.set_stream_error_listener(presenter.stream_error_listener());
    presenter.on_player_connected(Arc::new(player.clone()), player.is_playing());
    presenter.on_resume();

    info!("✅ PMORadio is ready! [p] play/pause, [q] quit");

    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = commands.next_line() => match line? {
                Some(line) => match line.trim() {
                    "p" => presenter.on_action_button_clicked(),
                    "q" => break,
                    "" => {}
                    other => warn!(command = other, "Unknown command"),
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("Stopping PMORadio...");
    presenter.on_pause();
    presenter.on_player_disconnected();
    player.release();

    Ok(())
}
