//! Trellis: a small-footprint widget and layout toolkit for fixed-size
//! embedded displays.
//!
//! Trellis implements the retained widget model of a compact device UI:
//! screens hold an ordered list of heterogeneous items, a row-based
//! layout engine arranges them incrementally inside a viewport, and focus
//! traversal moves across scrollable pages with cyclic wraparound. The
//! platform supplies rendering and text metrics through narrow traits;
//! Trellis supplies the layout, traversal and state-synchronization
//! logic.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use trellis::render::MonospaceMetrics;
//! use trellis::widget::widgets::{ChoiceGroup, ChoiceKind};
//! use trellis::widget::{Form, Item, ItemBody};
//!
//! let mut form = Form::new("Settings", Arc::new(MonospaceMetrics::new()));
//! form.set_viewport(176, 208);
//!
//! let ringtone = ChoiceGroup::with_elements(ChoiceKind::Exclusive, ["Loud", "Soft", "Off"]);
//! form.append(Item::with_label(ItemBody::Choice(ringtone), "Ringtone")?)?;
//!
//! form.show();
//! # Ok::<(), trellis::error::UiError>(())
//! ```
//!
//! # Crates
//!
//! Foundation types (geometry, timers, request queues) live in
//! [`trellis_core`]; this crate re-exports the common ones.

pub mod error;
pub mod render;
pub mod widget;

pub use error::{Result, UiError};
pub use trellis_core::geometry::{Point, Rect, Size};
