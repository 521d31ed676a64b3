//! Editable text field.
//!
//! A text field holds a single editable string with a hard maximum size
//! (in characters) and an input constraint. Content wraps into the width
//! the layout assigns, and the caret moves across the wrapped lines during
//! internal traversal. Caret movement is grapheme-aware so combining
//! sequences are never split.

use trellis_core::geometry::{Rect, Size};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Result, UiError};
use crate::render::{Font, Graphics, TextMetrics};
use crate::widget::events::{Direction, KeyCode};
use crate::widget::item::InternalTraverse;

/// Input constraint applied to every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextConstraint {
    /// Any text.
    #[default]
    Any,
    /// Optional leading minus followed by decimal digits.
    Numeric,
}

impl TextConstraint {
    fn accepts(self, text: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Numeric => {
                let body = text.strip_prefix('-').unwrap_or(text);
                !text.is_empty() && !body.is_empty() && body.chars().all(|c| c.is_ascii_digit())
                    || text.is_empty()
            }
        }
    }
}

/// An editable text item.
#[derive(Debug)]
pub struct TextField {
    text: String,
    /// Maximum content length in characters.
    max_size: usize,
    constraint: TextConstraint,
    /// Caret position as a byte offset into `text`.
    caret: usize,
    /// Visual line the caret sits on, maintained during traversal.
    caret_line: i32,
    traversing: bool,
    dirty: bool,
}

impl TextField {
    /// Create a text field with initial content.
    pub fn new(text: impl Into<String>, max_size: usize, constraint: TextConstraint) -> Result<Self> {
        if max_size == 0 {
            return Err(UiError::invalid("text field maximum size must be positive"));
        }
        let text = text.into();
        Self::check(&text, max_size, constraint)?;
        let caret = text.len();
        Ok(Self {
            text,
            max_size,
            constraint,
            caret,
            caret_line: 0,
            traversing: false,
            dirty: true,
        })
    }

    fn check(text: &str, max_size: usize, constraint: TextConstraint) -> Result<()> {
        let length = text.chars().count();
        if length > max_size {
            return Err(UiError::TextTooLong {
                length,
                max: max_size,
            });
        }
        if !constraint.accepts(text) {
            return Err(UiError::invalid("text does not satisfy the input constraint"));
        }
        Ok(())
    }

    /// Current content.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Content length in characters.
    #[inline]
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Maximum content length in characters.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The input constraint.
    #[inline]
    pub fn constraint(&self) -> TextConstraint {
        self.constraint
    }

    /// Caret position as a character index.
    pub fn caret_position(&self) -> usize {
        self.text[..self.caret].chars().count()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Replace the whole content.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        Self::check(&text, self.max_size, self.constraint)?;
        self.caret = text.len();
        self.text = text;
        self.dirty = true;
        Ok(())
    }

    /// Insert `src` before the character at `position`.
    ///
    /// `position` beyond the end is clamped to the end. The combined
    /// content is validated before anything changes.
    pub fn insert(&mut self, src: &str, position: usize) -> Result<()> {
        let byte_pos = Self::char_to_byte(&self.text, position);
        let mut combined = String::with_capacity(self.text.len() + src.len());
        combined.push_str(&self.text[..byte_pos]);
        combined.push_str(src);
        combined.push_str(&self.text[byte_pos..]);
        Self::check(&combined, self.max_size, self.constraint)?;

        self.caret = byte_pos + src.len();
        self.text = combined;
        self.dirty = true;
        Ok(())
    }

    /// Delete `length` characters starting at character `offset`.
    pub fn delete(&mut self, offset: usize, length: usize) -> Result<()> {
        let size = self.char_count();
        if offset + length > size {
            return Err(UiError::index("text field", offset + length, size));
        }
        let start = Self::char_to_byte(&self.text, offset);
        let end = Self::char_to_byte(&self.text, offset + length);

        let mut remaining = String::with_capacity(self.text.len() - (end - start));
        remaining.push_str(&self.text[..start]);
        remaining.push_str(&self.text[end..]);
        Self::check(&remaining, self.max_size, self.constraint)?;

        self.text = remaining;
        if self.caret >= end {
            self.caret -= end - start;
        } else if self.caret > start {
            self.caret = start;
        }
        self.dirty = true;
        Ok(())
    }

    /// Change the maximum size, truncating the content if needed.
    ///
    /// Returns the maximum actually applied.
    pub fn set_max_size(&mut self, max_size: usize) -> Result<usize> {
        if max_size == 0 {
            return Err(UiError::invalid("text field maximum size must be positive"));
        }
        self.max_size = max_size;
        if self.char_count() > max_size {
            let keep = Self::char_to_byte(&self.text, max_size);
            self.text.truncate(keep);
            self.caret = self.caret.min(self.text.len());
            self.dirty = true;
        }
        Ok(max_size)
    }

    fn char_to_byte(text: &str, position: usize) -> usize {
        text.char_indices()
            .nth(position)
            .map(|(i, _)| i)
            .unwrap_or(text.len())
    }

    // =========================================================================
    // Traversal and input
    // =========================================================================

    pub(crate) fn interactive(&self) -> bool {
        true
    }

    pub(crate) fn in_traversal(&self) -> bool {
        self.traversing
    }

    pub(crate) fn focus_in(&mut self, dir: Direction, metrics: &dyn TextMetrics, width: i32) {
        let lines = self.line_count(metrics, width);
        self.caret_line = if dir.is_backward() { lines - 1 } else { 0 };
        self.traversing = true;
    }

    pub(crate) fn focus_out(&mut self) {
        self.traversing = false;
    }

    fn columns(&self, metrics: &dyn TextMetrics, width: i32) -> i32 {
        let char_w = metrics.string_width(Font::default(), "0").max(1);
        (width / char_w).max(1)
    }

    fn line_count(&self, metrics: &dyn TextMetrics, width: i32) -> i32 {
        metrics.wrapped_line_count(Font::default(), &self.text, width)
    }

    /// Move the caret one visual line up or down.
    pub(crate) fn traverse_inside(
        &mut self,
        dir: Direction,
        metrics: &dyn TextMetrics,
        width: i32,
    ) -> InternalTraverse {
        let lines = self.line_count(metrics, width);
        match dir {
            Direction::Up => {
                if self.caret_line == 0 {
                    return InternalTraverse::Exit;
                }
                self.caret_line -= 1;
            }
            Direction::Down => {
                if self.caret_line + 1 >= lines {
                    return InternalTraverse::Exit;
                }
                self.caret_line += 1;
            }
            Direction::Left => {
                self.move_caret_back();
                return InternalTraverse::Consumed;
            }
            Direction::Right => {
                self.move_caret_forward();
                return InternalTraverse::Consumed;
            }
        }
        // Keep the caret on the new visual line, same column when possible.
        let cols = self.columns(metrics, width);
        let cur = self.caret_position() as i32;
        let col = cur % cols;
        let target = (self.caret_line * cols + col).min(self.char_count() as i32);
        self.caret = Self::char_to_byte(&self.text, target.max(0) as usize);
        self.traversing = true;
        InternalTraverse::Consumed
    }

    fn move_caret_back(&mut self) {
        if let Some((i, _)) = self.text[..self.caret].grapheme_indices(true).next_back() {
            self.caret = i;
        }
    }

    fn move_caret_forward(&mut self) {
        if let Some(g) = self.text[self.caret..].graphemes(true).next() {
            self.caret += g.len();
        }
    }

    /// React to a non-directional key. Returns `true` when the content
    /// changed.
    pub(crate) fn consume_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => {
                let pos = self.caret_position();
                self.insert(&c.to_string(), pos).is_ok()
            }
            KeyCode::Back => {
                let pos = self.caret_position();
                if pos == 0 {
                    return false;
                }
                self.delete(pos - 1, 1).is_ok()
            }
            _ => false,
        }
    }

    /// The caret's line rectangle, used to keep it scrolled into view.
    pub(crate) fn focus_rect(&self, metrics: &dyn TextMetrics, width: i32) -> Rect {
        let line_h = metrics.line_height(Font::default());
        Rect::new(0, self.caret_line * line_h, width, line_h)
    }

    // =========================================================================
    // Measurement and painting
    // =========================================================================

    pub(crate) fn content_sizing(&self, metrics: &dyn TextMetrics, width_limit: i32) -> (Size, Size) {
        let font = Font::default();
        let char_w = metrics.string_width(font, "0").max(1);
        let line_h = metrics.line_height(font);

        let min = Size::new(char_w * 4, line_h);
        let pref = Size::new(
            width_limit.max(min.width),
            metrics.wrapped_height(font, &self.text, width_limit.max(min.width)),
        );
        (min, pref)
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub(crate) fn paint(
        &self,
        g: &mut dyn Graphics,
        metrics: &dyn TextMetrics,
        width: i32,
        _height: i32,
        focused: bool,
    ) {
        let font = Font::default();
        let line_h = metrics.line_height(font);
        let cols = self.columns(metrics, width).max(1) as usize;

        let chars: Vec<char> = self.text.chars().collect();
        let mut y = 0;
        for line in chars.chunks(cols) {
            let line: String = line.iter().collect();
            g.draw_string(font, &line, 0, y);
            y += line_h;
        }

        if focused {
            let caret_chars = self.caret_position();
            let col = (caret_chars % cols) as i32;
            let row = (caret_chars / cols) as i32;
            let char_w = metrics.string_width(font, "0").max(1);
            g.draw_line(
                trellis_core::geometry::Point::new(col * char_w, row * line_h),
                trellis_core::geometry::Point::new(col * char_w, row * line_h + line_h),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MonospaceMetrics;

    #[test]
    fn test_max_size_enforced_before_mutation() {
        let mut field = TextField::new("hello", 8, TextConstraint::Any).unwrap();
        assert!(matches!(
            field.insert("worldwide", 5),
            Err(UiError::TextTooLong { .. })
        ));
        assert_eq!(field.text(), "hello");
    }

    #[test]
    fn test_insert_position_clamped() {
        let mut field = TextField::new("ab", 10, TextConstraint::Any).unwrap();
        field.insert("c", 99).unwrap();
        assert_eq!(field.text(), "abc");
        field.insert("x", 0).unwrap();
        assert_eq!(field.text(), "xabc");
    }

    #[test]
    fn test_delete_range_validated() {
        let mut field = TextField::new("abcdef", 10, TextConstraint::Any).unwrap();
        assert!(field.delete(4, 5).is_err());
        assert_eq!(field.text(), "abcdef");
        field.delete(1, 2).unwrap();
        assert_eq!(field.text(), "adef");
    }

    #[test]
    fn test_numeric_constraint() {
        assert!(TextField::new("-123", 10, TextConstraint::Numeric).is_ok());
        assert!(TextField::new("", 10, TextConstraint::Numeric).is_ok());
        assert!(TextField::new("12a", 10, TextConstraint::Numeric).is_err());

        let mut field = TextField::new("12", 10, TextConstraint::Numeric).unwrap();
        assert!(field.insert("x", 1).is_err());
        assert_eq!(field.text(), "12");
    }

    #[test]
    fn test_set_max_size_truncates() {
        let mut field = TextField::new("abcdef", 10, TextConstraint::Any).unwrap();
        field.set_max_size(3).unwrap();
        assert_eq!(field.text(), "abc");
        assert!(field.set_max_size(0).is_err());
    }

    #[test]
    fn test_grapheme_caret_movement() {
        // "e" followed by a combining acute accent is one grapheme.
        let mut field = TextField::new("ae\u{301}b", 10, TextConstraint::Any).unwrap();
        assert_eq!(field.caret_position(), 4);
        field.move_caret_back(); // over 'b'
        field.move_caret_back(); // over the whole "e\u{301}" cluster
        assert_eq!(field.caret_position(), 1);
        field.move_caret_forward();
        assert_eq!(field.caret_position(), 3);
    }

    #[test]
    fn test_internal_traversal_across_lines() {
        let metrics = MonospaceMetrics::new();
        // 10 chars in a 30px field: 5 columns, 2 lines.
        let mut field = TextField::new("abcdefghij", 20, TextConstraint::Any).unwrap();
        field.focus_in(Direction::Down, &metrics, 30);

        assert_eq!(
            field.traverse_inside(Direction::Up, &metrics, 30),
            InternalTraverse::Exit
        );
        assert_eq!(
            field.traverse_inside(Direction::Down, &metrics, 30),
            InternalTraverse::Consumed
        );
        assert_eq!(
            field.traverse_inside(Direction::Down, &metrics, 30),
            InternalTraverse::Exit
        );
    }

    #[test]
    fn test_key_input_changes_content() {
        let mut field = TextField::new("", 5, TextConstraint::Any).unwrap();
        assert!(field.consume_key(KeyCode::Char('h')));
        assert!(field.consume_key(KeyCode::Char('i')));
        assert_eq!(field.text(), "hi");
        assert!(field.consume_key(KeyCode::Back));
        assert_eq!(field.text(), "h");
        assert!(!field.consume_key(KeyCode::Select));
    }

    #[test]
    fn test_content_height_tracks_wrapping() {
        let metrics = MonospaceMetrics::new();
        let field = TextField::new("abcdefghij", 20, TextConstraint::Any).unwrap();
        let (_, pref) = field.content_sizing(&metrics, 30);
        assert_eq!(pref.height, 24); // two 12px lines
    }
}
