//! Extension pour construire le lecteur depuis pmoconfig
//!
//! ```rust,ignore
//! use pmoconfig::get_config;
//! use pmoplayer::{PlayerConfigExt, RadioPlayer};
//! use std::sync::Arc;
//!
//! let config = get_config();
//! let engine = config.http_stream_engine(None)?;
//! let player = RadioPlayer::new(Arc::new(engine), config.player_config()?);
//! ```

use crate::http_engine::HttpStreamEngine;
use crate::player::PlayerConfig;
use anyhow::Result;
use bytes::Bytes;
use pmoconfig::Config;
use std::time::Duration;
use tokio::sync::mpsc;

/// Builds the stream engine and player settings from `pmoconfig::Config`
pub trait PlayerConfigExt {
    /// Watchdog timeout (`player.buffer_timeout_ms`)
    fn player_config(&self) -> Result<PlayerConfig>;

    /// Engine for `radio.stream_url`, optionally forwarding chunks to `sink`
    fn http_stream_engine(&self, sink: Option<mpsc::Sender<Bytes>>) -> Result<HttpStreamEngine>;
}

impl PlayerConfigExt for Config {
    fn player_config(&self) -> Result<PlayerConfig> {
        Ok(PlayerConfig {
            buffer_timeout: Duration::from_millis(self.get_buffer_timeout_ms()?),
        })
    }

    fn http_stream_engine(&self, sink: Option<mpsc::Sender<Bytes>>) -> Result<HttpStreamEngine> {
        let mut builder = HttpStreamEngine::builder()
            .stream_url(self.get_radio_stream_url()?)
            .user_agent(self.get_radio_user_agent()?)
            .stall_threshold(Duration::from_millis(self.get_stall_threshold_ms()?));
        if let Some(sink) = sink {
            builder = builder.sink(sink);
        }
        Ok(builder.build()?)
    }
}
