//! Concrete item bodies.
//!
//! Each module implements one widget kind: its model state, mutation
//! protocol, measurement, painting and internal traversal. The bodies are
//! plain structs dispatched through
//! [`ItemBody`](crate::widget::item::ItemBody); there is no inheritance
//! hierarchy.

mod choice_group;
mod custom_item;
mod date_editor;
mod date_field;
mod spacer;
mod string_item;
mod text_field;

pub use choice_group::{ChoiceElement, ChoiceGroup, ChoiceKind};
pub use custom_item::{CustomItem, CustomItemDelegate};
pub use date_editor::{DateEditor, EditSection};
pub use date_field::{DateField, DateTimeMode};
pub use spacer::Spacer;
pub use string_item::StringItem;
pub use text_field::{TextConstraint, TextField};
