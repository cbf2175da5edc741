//! Remote fetch abstraction consumed by the poller

use crate::error::Result;
use crate::models::RadioContent;
use async_trait::async_trait;

/// Source of now-playing snapshots.
///
/// Implementations perform one remote fetch per call. No retry and no
/// timeout is added on top by the poller; a call that never completes
/// stalls the reschedule loop.
#[async_trait]
pub trait NowPlayingSource: Send + Sync {
    async fn fetch_now_playing(&self) -> Result<RadioContent>;
}
