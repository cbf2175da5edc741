//! Terminal rendering of the player screen

use crate::presenter::View;
use tracing::info;

/// [`View`] printing to stdout
#[derive(Debug, Default)]
pub struct ConsoleView;

impl View for ConsoleView {
    fn show_play_button(&self) {
        println!("⏸  Paused  [p] play  [q] quit");
    }

    fn show_pause_button(&self) {
        println!("▶  Playing  [p] pause  [q] quit");
    }

    fn show_current_track_title(&self, title: &str) {
        info!(title, "Now playing");
        println!("🎵 {}", title);
    }

    fn show_current_dj_name(&self, name: &str) {
        println!("🎧 DJ: {}", name);
    }

    fn show_num_of_listeners(&self, count: u32) {
        println!("👥 {} listeners", count);
    }

    fn show_could_not_load_content_error(&self) {
        eprintln!("⚠️  Could not load radio content");
    }

    fn show_could_not_play_stream_error(&self) {
        eprintln!("⚠️  Could not play radio stream");
    }
}
