//! The widget and layout engine.
//!
//! This module holds everything between application mutations and paint
//! requests:
//!
//! - [`item`] - the item model, layout directives and peer state
//! - [`widgets`] - concrete item bodies (choice group, text field, ...)
//! - [`layout`] - the row layout engine (full and incremental modes)
//! - [`form`] - the form screen: scroll, traversal, callbacks
//! - [`displayable`] - shared visibility state machine and host boundary
//! - [`events`] / [`command`] - input events and commands
//!
//! # Data flow
//!
//! An application mutation marks its item dirty and schedules a layout.
//! The next (rate-limited) pass pulls all dirty state into per-axis stale
//! flags, recomputes only the affected rows, re-clamps the scroll window,
//! re-validates focus, and requests paint. Application listeners run
//! strictly after that commit, with the listener taken out of the form so
//! callback code may re-enter it freely.

pub(crate) mod capacity;
pub mod command;
pub mod displayable;
pub mod events;
pub mod form;
pub mod item;
pub mod layout;
pub mod widgets;

#[cfg(test)]
mod tests;

pub use command::{Command, CommandKind};
pub use displayable::{DisplayHost, HostRequest, QueuedHost, VisibilityState};
pub use events::{Direction, KeyCode, KeyEvent, PointerEvent, PointerPhase};
pub use form::{CommandListener, Form, ItemStateListener};
pub use item::{HAlign, InternalTraverse, Item, ItemBody, ItemId, ItemLayout, VAlign};
pub use layout::LayoutMode;
