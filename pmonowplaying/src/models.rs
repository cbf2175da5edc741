//! Data models for now-playing API responses

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Sentinel for "remaining time unknown"
pub const INVALID_TIME_VALUE: i64 = -1;

/// Deserialize an optional string or number into Option<i64>
fn deserialize_optional_string_or_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrI64 {
        String(String),
        Int(i64),
        Float(f64),
    }

    match Option::<StringOrI64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrI64::String(s)) if s.trim().is_empty() => Ok(None),
        Some(StringOrI64::String(s)) => s.trim().parse::<i64>().map(Some).map_err(D::Error::custom),
        Some(StringOrI64::Int(i)) => Ok(Some(i)),
        Some(StringOrI64::Float(f)) => Ok(Some(f as i64)),
    }
}

/// Deserialize a string or number into a u32, defaulting to 0
fn deserialize_string_or_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_optional_string_or_i64(deserializer)?;
    Ok(value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0))
}

/// Track currently on air
///
/// Immutable snapshot; a new one is built from every successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NowPlayingTrack {
    pub title: String,
    /// Seconds until the track ends, or [`INVALID_TIME_VALUE`]
    pub remaining_time_seconds: i64,
}

impl NowPlayingTrack {
    pub fn new(title: impl Into<String>, remaining_time_seconds: i64) -> Self {
        Self {
            title: title.into(),
            remaining_time_seconds,
        }
    }

    /// Track whose end is unknown
    pub fn with_unknown_remaining_time(title: impl Into<String>) -> Self {
        Self::new(title, INVALID_TIME_VALUE)
    }

    /// Remaining time, `None` when unknown (sentinel or negative)
    pub fn remaining_time(&self) -> Option<Duration> {
        u64::try_from(self.remaining_time_seconds)
            .ok()
            .map(Duration::from_secs)
    }
}

/// DJ currently hosting the stream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dj {
    #[serde(rename = "djname", default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_string_or_u32")]
    pub id: u32,
}

impl Dj {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    /// URL of the DJ's avatar served by the API at `api_base`
    pub fn avatar_url(&self, api_base: &str) -> String {
        format!("{}/dj-image/{}", api_base.trim_end_matches('/'), self.id)
    }
}

/// Now-playing snapshot: current track, DJ and listener count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioContent {
    pub current_track: NowPlayingTrack,
    pub current_dj: Dj,
    pub listener_count: u32,
}

impl RadioContent {
    pub fn new(current_track: NowPlayingTrack, current_dj: Dj, listener_count: u32) -> Self {
        Self {
            current_track,
            current_dj,
            listener_count,
        }
    }
}

/// Raw API document (`{"main": {...}}`)
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse {
    pub main: ApiMain,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiMain {
    #[serde(default)]
    pub np: String,
    #[serde(default, deserialize_with = "deserialize_string_or_u32")]
    pub listeners: u32,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_i64")]
    pub current: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_i64")]
    pub start_time: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_i64")]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub dj: Option<Dj>,
}

impl ApiMain {
    /// `end_time - current`, or the sentinel when the track has no known length
    fn remaining_time_seconds(&self) -> i64 {
        match (self.start_time, self.end_time, self.current) {
            (Some(start), Some(end), Some(current)) if end > start && end >= current => end
                .checked_sub(current)
                .unwrap_or(INVALID_TIME_VALUE),
            _ => INVALID_TIME_VALUE,
        }
    }
}

impl From<ApiResponse> for RadioContent {
    fn from(response: ApiResponse) -> Self {
        let main = response.main;
        let track = NowPlayingTrack::new(main.np.clone(), main.remaining_time_seconds());
        RadioContent::new(track, main.dj.unwrap_or_default(), main.listeners)
    }
}
