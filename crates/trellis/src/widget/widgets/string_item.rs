//! Plain text item.
//!
//! A string item displays static text. It is not interactive by itself;
//! attaching a command to the owning item turns it into a focusable
//! button/hyperlink, which the item layer handles.

use trellis_core::geometry::Size;

use crate::render::{Font, Graphics, TextMetrics};

/// A non-editable text item.
#[derive(Debug)]
pub struct StringItem {
    text: Option<String>,
    font: Option<Font>,
    dirty: bool,
}

impl StringItem {
    /// Create a string item.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            font: None,
            dirty: true,
        }
    }

    /// Create an empty string item.
    pub fn empty() -> Self {
        Self {
            text: None,
            font: None,
            dirty: true,
        }
    }

    /// The displayed text.
    #[inline]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Replace the displayed text.
    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text;
        self.dirty = true;
    }

    /// The font override, if any.
    #[inline]
    pub fn font(&self) -> Option<Font> {
        self.font
    }

    /// Override the display font (`None` restores the default).
    pub fn set_font(&mut self, font: Option<Font>) {
        self.font = font;
        self.dirty = true;
    }

    fn effective_font(&self) -> Font {
        self.font.unwrap_or_default()
    }

    pub(crate) fn interactive(&self) -> bool {
        false
    }

    pub(crate) fn content_sizing(&self, metrics: &dyn TextMetrics, width_limit: i32) -> (Size, Size) {
        let font = self.effective_font();
        let text = self.text.as_deref().unwrap_or("");
        if text.is_empty() {
            return (Size::ZERO, Size::ZERO);
        }

        let line_h = metrics.line_height(font);
        let full = metrics.string_width(font, text);
        let pref_w = full.min(width_limit.max(1));
        let pref_h = metrics.wrapped_height(font, text, pref_w);

        let char_w = metrics.string_width(font, "0").max(1);
        let min = Size::new(char_w.min(pref_w), line_h);
        (min, Size::new(pref_w, pref_h))
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
        _focused: bool,
    ) {
        let Some(text) = self.text.as_deref() else {
            return;
        };
        let font = self.effective_font();
        let line_h = metrics.line_height(font);
        let char_w = metrics.string_width(font, "0").max(1);
        let cols = (width / char_w).max(1) as usize;

        let chars: Vec<char> = text.chars().collect();
        let mut y = 0;
        for line in chars.chunks(cols) {
            let line: String = line.iter().collect();
            g.draw_string(font, &line, 0, y);
            y += line_h;
        }
    }
}
