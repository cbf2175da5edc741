//! Shared helpers for the PMORadio crates.
//!
//! - [`TimerSlot`] : single-shot timer with atomic cancel/replace, used by the
//!   now-playing poller and the buffering watchdog.

pub mod timer;

pub use timer::TimerSlot;
