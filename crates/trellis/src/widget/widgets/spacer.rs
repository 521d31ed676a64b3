//! Invisible spacing item.
//!
//! A spacer occupies layout space and nothing else: it paints nothing,
//! never takes focus, and rejects labels and commands (the item layer
//! raises the error). Combined with the expand directives it pushes
//! neighboring items apart.

use trellis_core::geometry::Size;

use crate::error::{Result, UiError};

/// A blank, non-interactive item used purely for spacing.
#[derive(Debug)]
pub struct Spacer {
    min_size: Size,
    dirty: bool,
}

impl Spacer {
    /// Create a spacer with the given minimum size.
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width < 0 || height < 0 {
            return Err(UiError::invalid("spacer sizes must be non-negative"));
        }
        Ok(Self {
            min_size: Size::new(width, height),
            dirty: true,
        })
    }

    /// The spacer's minimum size.
    #[inline]
    pub fn minimum_size(&self) -> Size {
        self.min_size
    }

    /// Replace the minimum size.
    pub fn set_minimum_size(&mut self, width: i32, height: i32) -> Result<()> {
        if width < 0 || height < 0 {
            return Err(UiError::invalid("spacer sizes must be non-negative"));
        }
        self.min_size = Size::new(width, height);
        self.dirty = true;
        Ok(())
    }

    pub(crate) fn interactive(&self) -> bool {
        false
    }

    pub(crate) fn content_sizing(&self) -> (Size, Size) {
        (self.min_size, self.min_size)
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_validated() {
        assert!(Spacer::new(-1, 5).is_err());
        let mut spacer = Spacer::new(10, 5).unwrap();
        assert!(spacer.set_minimum_size(3, -2).is_err());
        assert_eq!(spacer.minimum_size(), Size::new(10, 5));
    }

    #[test]
    fn test_min_equals_pref() {
        let spacer = Spacer::new(16, 4).unwrap();
        let (min, pref) = spacer.content_sizing();
        assert_eq!(min, pref);
        assert_eq!(min, Size::new(16, 4));
    }
}
