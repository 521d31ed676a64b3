//! Commands attachable to items and screens.
//!
//! A command is a request the user can issue (soft key, menu entry); how it
//! is presented is the platform's concern. The engine only tracks which
//! commands an item carries and which one is the default, and routes
//! activations to the command listener.

/// Semantic category of a command, used by the platform to place it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// A screen-level application action.
    Screen,
    /// Navigate back.
    Back,
    /// Abort the current operation.
    Cancel,
    /// Confirm the current operation.
    Ok,
    /// Request help.
    Help,
    /// Stop an in-progress operation.
    Stop,
    /// Exit the application.
    Exit,
    /// An action on the currently focused item.
    Item,
}

/// A user-invokable action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    label: String,
    long_label: Option<String>,
    kind: CommandKind,
    priority: i32,
}

impl Command {
    /// Create a new command.
    pub fn new(label: impl Into<String>, kind: CommandKind, priority: i32) -> Self {
        Self {
            label: label.into(),
            long_label: None,
            kind,
            priority,
        }
    }

    /// Set a longer label for menus with room to spare.
    pub fn with_long_label(mut self, label: impl Into<String>) -> Self {
        self.long_label = Some(label.into());
        self
    }

    /// The short label.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The long label, if one was set.
    #[inline]
    pub fn long_label(&self) -> Option<&str> {
        self.long_label.as_deref()
    }

    /// The command's category.
    #[inline]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Placement priority; lower values are more prominent.
    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }
}
