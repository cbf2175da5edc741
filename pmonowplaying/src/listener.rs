//! Listener notified of every fetch outcome

use crate::models::RadioContent;

/// Single consumer of the poller's fetch outcomes.
///
/// Callbacks run on the Tokio task that completed the fetch, never while the
/// poller holds one of its locks.
pub trait ContentListener: Send + Sync {
    fn on_content_loaded(&self, content: RadioContent);

    fn on_content_load_failed(&self);
}
