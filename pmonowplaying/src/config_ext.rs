//! Extension pour intégrer le client now-playing dans pmoconfig
//!
//! ```rust,ignore
//! use pmoconfig::get_config;
//! use pmonowplaying::NowPlayingConfigExt;
//!
//! let config = get_config();
//! let client = config.now_playing_client()?;
//! let poller_config = config.poller_config()?;
//! ```

use crate::client::NowPlayingClient;
use crate::poller::PollerConfig;
use anyhow::Result;
use pmoconfig::Config;
use std::time::Duration;

/// Builds the now-playing client and poller settings from `pmoconfig::Config`
pub trait NowPlayingConfigExt {
    /// Poller delays (`poller.default_delay_ms`, `poller.boundary_padding_ms`)
    fn poller_config(&self) -> Result<PollerConfig>;

    /// HTTP client for `radio.api_url`, with the configured timeout and user agent
    fn now_playing_client(&self) -> Result<NowPlayingClient>;
}

impl NowPlayingConfigExt for Config {
    fn poller_config(&self) -> Result<PollerConfig> {
        Ok(PollerConfig {
            default_delay: Duration::from_millis(self.get_default_poll_delay_ms()?),
            boundary_padding: Duration::from_millis(self.get_boundary_padding_ms()?),
        })
    }

    fn now_playing_client(&self) -> Result<NowPlayingClient> {
        let client = NowPlayingClient::builder()
            .api_url(self.get_radio_api_url()?)
            .request_timeout(Duration::from_secs(self.get_radio_request_timeout_secs()?))
            .user_agent(self.get_radio_user_agent()?)
            .build()?;
        Ok(client)
    }
}
