//! HTTP client for the now-playing API

use crate::error::{Error, Result};
use crate::models::{ApiResponse, RadioContent};
use crate::source::NowPlayingSource;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Default now-playing API endpoint
pub const DEFAULT_API_URL: &str = "https://r-a-d.io/api";

/// Default timeout for metadata HTTP requests
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "pmoradio/0.1.0";

/// Now-playing HTTP client
///
/// One `GET` on the API endpoint per fetch, decoded into a [`RadioContent`].
///
/// # Example
///
/// ```no_run
/// use pmonowplaying::NowPlayingClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = NowPlayingClient::new()?;
///     let content = client.now_playing().await?;
///     println!("Now playing: {}", content.current_track.title);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct NowPlayingClient {
    client: Client,
    api_url: Url,
    request_timeout: Duration,
}

impl NowPlayingClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// API endpoint this client polls
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Fetch the current now-playing snapshot
    pub async fn now_playing(&self) -> Result<RadioContent> {
        tracing::debug!(url = %self.api_url, "Fetching now-playing content");

        let response = self
            .client
            .get(self.api_url.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        let body = response.bytes().await?;
        let decoded: ApiResponse = serde_json::from_slice(&body)?;
        let content = RadioContent::from(decoded);

        tracing::debug!(
            title = %content.current_track.title,
            remaining_secs = content.current_track.remaining_time_seconds,
            listeners = content.listener_count,
            "Received now-playing content"
        );

        Ok(content)
    }
}

#[async_trait]
impl NowPlayingSource for NowPlayingClient {
    async fn fetch_now_playing(&self) -> Result<RadioContent> {
        self.now_playing().await
    }
}

/// Builder for [`NowPlayingClient`]
#[derive(Debug, Default)]
pub struct ClientBuilder {
    client: Option<Client>,
    api_url: Option<String>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Use an existing reqwest client (shared pool, proxy settings...)
    ///
    /// The user agent setting is ignored in that case.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the API endpoint
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<NowPlayingClient> {
        let api_url = Url::parse(self.api_url.as_deref().unwrap_or(DEFAULT_API_URL))?;

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(
                    self.user_agent
                        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
                )
                .build()?,
        };

        Ok(NowPlayingClient {
            client,
            api_url,
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = NowPlayingClient::builder().build().unwrap();
        assert_eq!(client.api_url().as_str(), DEFAULT_API_URL);
        assert_eq!(
            client.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_builder_rejects_invalid_url() {
        let result = NowPlayingClient::builder().api_url("not a url").build();
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
