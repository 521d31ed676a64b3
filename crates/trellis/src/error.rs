//! Error types for the widget and layout engine.
//!
//! Argument-validation errors are raised before any state is touched: a
//! mutation that returns an error leaves the widget exactly as it was.
//! Illegal-state errors signal an operation that is never valid for the
//! target (for example attaching a label to a spacer), also with no state
//! change.

/// Result type alias for widget operations.
pub type Result<T> = std::result::Result<T, UiError>;

/// Errors raised by widget mutation and query operations.
#[derive(Debug, thiserror::Error)]
pub enum UiError {
    /// An index was outside the valid range of a collection.
    #[error("index {index} out of bounds for {what} of size {size}")]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        size: usize,
    },

    /// A selected-flags array did not match the element count.
    #[error("selected-flags array has {got} entries, expected at least {expected}")]
    FlagCountMismatch { expected: usize, got: usize },

    /// Text content would exceed a field's maximum size.
    #[error("text of {length} characters exceeds the maximum size {max}")]
    TextTooLong { length: usize, max: usize },

    /// A size, flag combination or other argument was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The item is already attached to a screen and must be removed first.
    #[error("item is already owned by a screen")]
    ItemAlreadyOwned,

    /// The operation is never valid for this kind of item.
    #[error("operation not supported by this item: {0}")]
    Unsupported(&'static str),
}

impl UiError {
    /// Create an index-out-of-bounds error.
    pub fn index(what: &'static str, index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { what, index, size }
    }

    /// Create an invalid-argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
