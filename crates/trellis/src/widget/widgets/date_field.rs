//! Date/time input field.
//!
//! Closed, the field shows its value (or a placeholder) on a single row.
//! Select opens a [`DateEditor`] over the value; while the editor is open
//! the field captures all navigation (internal traversal), and Select
//! commits while Back cancels.

use chrono::{Local, NaiveDateTime, Timelike};
use trellis_core::geometry::{Rect, Size};

use crate::render::{Font, Graphics, TextMetrics};
use crate::widget::events::{Direction, KeyCode};
use crate::widget::item::InternalTraverse;

use super::date_editor::DateEditor;

/// Which parts of a date-time the field edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateTimeMode {
    /// Calendar date only.
    #[default]
    Date,
    /// Wall-clock time only.
    Time,
    /// Date and time.
    DateTime,
}

/// A date/time item.
#[derive(Debug)]
pub struct DateField {
    mode: DateTimeMode,
    value: Option<NaiveDateTime>,
    editor: Option<DateEditor>,
    dirty: bool,
}

impl DateField {
    /// Create an empty date field.
    pub fn new(mode: DateTimeMode) -> Self {
        Self {
            mode,
            value: None,
            editor: None,
            dirty: true,
        }
    }

    /// The field's mode.
    #[inline]
    pub fn mode(&self) -> DateTimeMode {
        self.mode
    }

    /// The current value, if set.
    #[inline]
    pub fn date(&self) -> Option<NaiveDateTime> {
        self.value
    }

    /// Set the value.
    pub fn set_date(&mut self, value: NaiveDateTime) {
        self.value = Some(truncate_seconds(value));
        self.dirty = true;
    }

    /// Clear the value back to "not set".
    pub fn clear_date(&mut self) {
        self.value = None;
        self.dirty = true;
    }

    /// Whether the popup editor is open.
    #[inline]
    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    fn display_string(&self) -> String {
        match self.value {
            Some(value) => format_value(self.mode, value),
            None => "<not set>".to_string(),
        }
    }

    // =========================================================================
    // Traversal and input
    // =========================================================================

    pub(crate) fn interactive(&self) -> bool {
        true
    }

    pub(crate) fn in_traversal(&self) -> bool {
        self.editor.is_some()
    }

    pub(crate) fn focus_out(&mut self) {
        // Losing focus abandons an uncommitted edit.
        self.editor = None;
    }

    pub(crate) fn traverse_inside(&mut self, dir: Direction) -> InternalTraverse {
        let Some(editor) = self.editor.as_mut() else {
            return InternalTraverse::Exit;
        };
        match dir {
            Direction::Left | Direction::Right => match editor.move_section(dir) {
                // The open editor holds navigation at its edges; only
                // commit or cancel releases it.
                InternalTraverse::Exit => InternalTraverse::Consumed,
                other => other,
            },
            Direction::Up => {
                editor.increment();
                InternalTraverse::Consumed
            }
            Direction::Down => {
                editor.decrement();
                InternalTraverse::Consumed
            }
        }
    }

    /// React to a non-directional key. Returns `true` when the value
    /// changed (editor committed).
    pub(crate) fn consume_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Select => {
                if let Some(editor) = self.editor.take() {
                    let committed = editor.value();
                    let changed = self.value != Some(committed);
                    self.value = Some(committed);
                    self.dirty = true;
                    changed
                } else {
                    let seed = self
                        .value
                        .unwrap_or_else(|| truncate_seconds(Local::now().naive_local()));
                    self.editor = Some(DateEditor::new(self.mode, seed));
                    self.dirty = true;
                    false
                }
            }
            KeyCode::Back if self.editor.is_some() => {
                self.editor = None;
                self.dirty = true;
                false
            }
            _ => false,
        }
    }

    // =========================================================================
    // Measurement and painting
    // =========================================================================

    pub(crate) fn content_sizing(&self, metrics: &dyn TextMetrics, _width_limit: i32) -> (Size, Size) {
        let font = Font::default();
        let text = self.display_string();
        let size = Size::new(
            metrics.string_width(font, &text),
            metrics.line_height(font),
        );
        (size, size)
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub(crate) fn paint(
        &self,
        g: &mut dyn Graphics,
        metrics: &dyn TextMetrics,
        width: i32,
        height: i32,
        focused: bool,
    ) {
        let font = Font::default();
        let text = match &self.editor {
            Some(editor) => format_value(self.mode, editor.value()),
            None => self.display_string(),
        };
        g.draw_string(font, &text, 0, 0);

        if let Some(editor) = &self.editor {
            // Underline the active section; sections are fixed-width in
            // the display string, so approximate by even division.
            let n = editor.sections().len() as i32;
            let slot = (metrics.string_width(font, &text) / n.max(1)).max(1);
            let x = slot * editor.active_index() as i32;
            let y = metrics.line_height(font);
            g.draw_line(
                trellis_core::geometry::Point::new(x, y),
                trellis_core::geometry::Point::new(x + slot, y),
            );
        } else if focused {
            g.draw_rect(Rect::new(0, 0, width, height));
        }
    }
}

fn truncate_seconds(value: NaiveDateTime) -> NaiveDateTime {
    value.with_second(0).unwrap_or(value)
}

fn format_value(mode: DateTimeMode, value: NaiveDateTime) -> String {
    match mode {
        DateTimeMode::Date => value.format("%Y-%m-%d").to_string(),
        DateTimeMode::Time => value.format("%H:%M").to_string(),
        DateTimeMode::DateTime => value.format("%Y-%m-%d %H:%M").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_closed_field_exits_traversal() {
        let mut field = DateField::new(DateTimeMode::Date);
        assert_eq!(field.traverse_inside(Direction::Down), InternalTraverse::Exit);
        assert!(!field.in_traversal());
    }

    #[test]
    fn test_select_opens_then_commits() {
        let mut field = DateField::new(DateTimeMode::Date);
        field.set_date(at(2026, 8, 6, 0, 0));

        assert!(!field.consume_key(KeyCode::Select));
        assert!(field.is_editing());

        // Year section is active; bump it and commit.
        assert_eq!(field.traverse_inside(Direction::Up), InternalTraverse::Consumed);
        assert!(field.consume_key(KeyCode::Select));
        assert!(!field.is_editing());
        assert_eq!(field.date(), Some(at(2027, 8, 6, 0, 0)));
    }

    #[test]
    fn test_back_cancels_edit() {
        let mut field = DateField::new(DateTimeMode::Time);
        field.set_date(at(2026, 8, 6, 10, 30));

        field.consume_key(KeyCode::Select);
        field.traverse_inside(Direction::Up);
        assert!(!field.consume_key(KeyCode::Back));
        assert!(!field.is_editing());
        assert_eq!(field.date(), Some(at(2026, 8, 6, 10, 30)));
    }

    #[test]
    fn test_open_editor_holds_horizontal_navigation() {
        let mut field = DateField::new(DateTimeMode::Date);
        field.set_date(at(2026, 8, 6, 0, 0));
        field.consume_key(KeyCode::Select);

        // Left at the first section stays inside the editor.
        assert_eq!(field.traverse_inside(Direction::Left), InternalTraverse::Consumed);
    }

    #[test]
    fn test_focus_out_abandons_edit() {
        let mut field = DateField::new(DateTimeMode::Date);
        field.set_date(at(2026, 8, 6, 0, 0));
        field.consume_key(KeyCode::Select);
        field.traverse_inside(Direction::Up);
        field.focus_out();
        assert_eq!(field.date(), Some(at(2026, 8, 6, 0, 0)));
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(format_value(DateTimeMode::Date, at(2026, 8, 6, 10, 30)), "2026-08-06");
        assert_eq!(format_value(DateTimeMode::Time, at(2026, 8, 6, 10, 30)), "10:30");
        assert_eq!(
            format_value(DateTimeMode::DateTime, at(2026, 8, 6, 10, 30)),
            "2026-08-06 10:30"
        );
    }
}
