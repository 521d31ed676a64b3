//! Core systems for the Trellis widget toolkit.
//!
//! This crate holds the foundation pieces shared by every Trellis screen:
//!
//! - [`geometry`] - Integer pixel geometry ([`Point`], [`Size`], [`Rect`])
//! - [`timer`] - Pump-driven one-shot and repeating timers
//! - [`queue`] - Thread-safe request queue for timer-thread handoff
//! - [`error`] - Core error types
//! - [`logging`] - `tracing` target constants for log filtering
//!
//! Trellis targets small fixed-size displays, so all geometry is integer
//! pixels. There is no event loop in this crate: the embedder owns the
//! pump and drives timers explicitly via [`timer::TimerManager::poll`].

pub mod error;
pub mod geometry;
pub mod logging;
pub mod queue;
pub mod timer;

pub use error::{CoreError, Result, TimerError};
pub use geometry::{Point, Rect, Size};
pub use queue::PostQueue;
pub use timer::{TimerId, TimerKind, TimerManager};
