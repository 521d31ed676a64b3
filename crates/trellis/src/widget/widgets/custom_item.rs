//! Application-implemented item.
//!
//! A custom item delegates measurement, painting and internal traversal to
//! application code behind [`CustomItemDelegate`]. Measured sizes are
//! cached by the owning screen before each layout pass so the delegate is
//! not re-queried for every row computation. Delegate paint calls are
//! fenced: a panic inside application paint code is caught, logged, and
//! the toolkit keeps running.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use trellis_core::geometry::{Rect, Size};

use crate::render::Graphics;
use crate::widget::events::{Direction, KeyCode};
use crate::widget::item::InternalTraverse;

/// Application-side behavior of a custom item.
pub trait CustomItemDelegate: Send {
    /// Smallest content box the item can render into.
    fn minimum_content_size(&self) -> Size;

    /// Content box the item would like.
    fn preferred_content_size(&self) -> Size;

    /// Paint the content into a `width` x `height` box at the origin.
    fn paint(&mut self, g: &mut dyn Graphics, width: i32, height: i32);

    /// Move internal focus one step in `dir`.
    ///
    /// Return `true` to keep focus inside, updating `visible` to the
    /// rectangle that must stay scrolled into view; return `false` to let
    /// focus leave the item.
    fn traverse(&mut self, dir: Direction, viewport: Size, visible: &mut Rect) -> bool {
        let _ = (dir, viewport, visible);
        false
    }

    /// Focus left the item.
    fn traverse_out(&mut self) {}

    /// A non-directional key arrived while the item was focused.
    ///
    /// Return `true` if the item's state changed.
    fn key_pressed(&mut self, code: KeyCode) -> bool {
        let _ = code;
        false
    }
}

/// An item whose behavior lives in application code.
pub struct CustomItem {
    delegate: Box<dyn CustomItemDelegate>,
    /// Cached (minimum, preferred) content sizes; cleared on invalidate.
    cached_sizes: Option<(Size, Size)>,
    /// Internal focus rectangle reported by the delegate.
    visible_rect: Rect,
    traversing: bool,
    dirty: bool,
}

impl CustomItem {
    /// Create a custom item around a delegate.
    pub fn new(delegate: Box<dyn CustomItemDelegate>) -> Self {
        Self {
            delegate,
            cached_sizes: None,
            visible_rect: Rect::ZERO,
            traversing: false,
            dirty: true,
        }
    }

    /// Drop cached sizes so the next layout re-queries the delegate.
    pub fn invalidate_sizes(&mut self) {
        self.cached_sizes = None;
        self.dirty = true;
    }

    /// Query and cache the delegate's sizes if the cache is cold.
    pub(crate) fn refresh_sizes(&mut self) {
        if self.cached_sizes.is_none() {
            self.cached_sizes = Some((
                self.delegate.minimum_content_size(),
                self.delegate.preferred_content_size(),
            ));
        }
    }

    pub(crate) fn interactive(&self) -> bool {
        true
    }

    pub(crate) fn in_traversal(&self) -> bool {
        self.traversing
    }

    pub(crate) fn focus_out(&mut self) {
        self.traversing = false;
        self.delegate.traverse_out();
    }

    pub(crate) fn traverse_inside(&mut self, dir: Direction, viewport: Size) -> InternalTraverse {
        let mut visible = self.visible_rect;
        if self.delegate.traverse(dir, viewport, &mut visible) {
            self.visible_rect = visible;
            self.traversing = true;
            InternalTraverse::Consumed
        } else {
            InternalTraverse::Exit
        }
    }

    pub(crate) fn consume_key(&mut self, code: KeyCode) -> bool {
        self.delegate.key_pressed(code)
    }

    pub(crate) fn focus_rect(&self) -> Rect {
        self.visible_rect
    }

    pub(crate) fn content_sizing(&mut self) -> (Size, Size) {
        self.refresh_sizes();
        // refresh_sizes just filled the cache.
        self.cached_sizes.unwrap_or((Size::ZERO, Size::ZERO))
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub(crate) fn paint(&mut self, g: &mut dyn Graphics, width: i32, height: i32) {
        let delegate = &mut self.delegate;
        let outcome = catch_unwind(AssertUnwindSafe(|| delegate.paint(g, width, height)));
        if outcome.is_err() {
            tracing::error!(
                target: trellis_core::logging::targets::CALLBACK,
                "custom item paint panicked; continuing"
            );
        }
    }
}

impl fmt::Debug for CustomItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomItem")
            .field("cached_sizes", &self.cached_sizes)
            .field("traversing", &self.traversing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingDelegate {
        queries: Arc<AtomicUsize>,
        rows: i32,
        row: i32,
    }

    impl CustomItemDelegate for CountingDelegate {
        fn minimum_content_size(&self) -> Size {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Size::new(10, 10)
        }

        fn preferred_content_size(&self) -> Size {
            Size::new(40, 20 * self.rows)
        }

        fn paint(&mut self, _g: &mut dyn Graphics, _width: i32, _height: i32) {}

        fn traverse(&mut self, dir: Direction, _viewport: Size, visible: &mut Rect) -> bool {
            let next = match dir {
                Direction::Down => self.row + 1,
                Direction::Up => self.row - 1,
                _ => return false,
            };
            if next < 0 || next >= self.rows {
                return false;
            }
            self.row = next;
            *visible = Rect::new(0, next * 20, 40, 20);
            true
        }
    }

    fn item(queries: Arc<AtomicUsize>) -> CustomItem {
        CustomItem::new(Box::new(CountingDelegate {
            queries,
            rows: 3,
            row: 0,
        }))
    }

    #[test]
    fn test_sizes_cached_until_invalidated() {
        let queries = Arc::new(AtomicUsize::new(0));
        let mut item = item(Arc::clone(&queries));

        item.refresh_sizes();
        item.refresh_sizes();
        assert_eq!(queries.load(Ordering::SeqCst), 1);

        item.invalidate_sizes();
        item.refresh_sizes();
        assert_eq!(queries.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_delegate_traversal() {
        let mut item = item(Arc::new(AtomicUsize::new(0)));
        let viewport = Size::new(100, 60);

        assert_eq!(item.traverse_inside(Direction::Up, viewport), InternalTraverse::Exit);
        assert_eq!(
            item.traverse_inside(Direction::Down, viewport),
            InternalTraverse::Consumed
        );
        assert_eq!(item.focus_rect(), Rect::new(0, 20, 40, 20));
        assert_eq!(
            item.traverse_inside(Direction::Down, viewport),
            InternalTraverse::Consumed
        );
        assert_eq!(
            item.traverse_inside(Direction::Down, viewport),
            InternalTraverse::Exit
        );
    }
}
