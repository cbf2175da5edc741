//! # pmonowplaying - now-playing tracking for an internet radio
//!
//! Fetches the "now playing" snapshot (track, DJ, listener count) of a radio
//! and keeps it fresh with a poller that re-arms itself for the moment the
//! current track ends.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pmonowplaying::{ContentListener, ContentPoller, NowPlayingClient, RadioContent};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ContentListener for Printer {
//!     fn on_content_loaded(&self, content: RadioContent) {
//!         println!("{} ({} listeners)", content.current_track.title, content.listener_count);
//!     }
//!
//!     fn on_content_load_failed(&self) {
//!         eprintln!("could not load now-playing content");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let poller = ContentPoller::with_defaults(Arc::new(NowPlayingClient::new()?));
//!     poller.attach_listener(Arc::new(Printer));
//!     poller.start_repeating();
//!
//!     tokio::signal::ctrl_c().await?;
//!     poller.stop_repeating();
//!     Ok(())
//! }
//! ```
//!
//! ## Scheduling
//!
//! After each successful fetch the next one is scheduled
//! `remaining_time + 1s` later, or after 5s when the remaining time is
//! unknown. See [`next_poll_delay`]. Failures are reported once and stop the
//! loop.

pub mod client;
pub mod error;
pub mod listener;
pub mod models;
pub mod poller;
pub mod source;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

pub use client::{ClientBuilder, NowPlayingClient};
pub use error::{Error, Result};
pub use listener::ContentListener;
pub use models::{Dj, NowPlayingTrack, RadioContent, INVALID_TIME_VALUE};
pub use poller::{next_poll_delay, ContentPoller, PollState, PollerConfig};
pub use source::NowPlayingSource;

#[cfg(feature = "pmoconfig")]
pub use config_ext::NowPlayingConfigExt;
