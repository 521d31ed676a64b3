//! The rendering and text-measurement boundary.
//!
//! Trellis does not rasterize anything itself. Screens paint through the
//! narrow [`Graphics`] trait and measure text through [`TextMetrics`];
//! both are implemented by the embedding platform. The toolkit ships
//! [`MonospaceMetrics`], a fixed-cell implementation used as the headless
//! fallback and throughout the test suite.
//!
//! # Example
//!
//! ```ignore
//! use trellis::render::{Font, MonospaceMetrics, TextMetrics};
//!
//! let metrics = MonospaceMetrics::new();
//! let width = metrics.string_width(Font::default(), "hello");
//! ```

use std::fmt;
use std::sync::Arc;

use trellis_core::geometry::{Point, Rect, Size};

/// Typeface selector for a [`Font`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontFace {
    /// The platform's default face.
    #[default]
    System,
    /// A fixed-pitch face.
    Monospace,
    /// A proportional face.
    Proportional,
}

/// Relative size step for a [`Font`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

bitflags::bitflags! {
    /// Style attributes for a [`Font`]. Attributes combine freely.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontStyle: u8 {
        const BOLD = 0b001;
        const ITALIC = 0b010;
        const UNDERLINED = 0b100;
    }
}

/// A font request: face, style attributes and size step.
///
/// Fonts are values, not resources; the platform resolves them when
/// measuring or painting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Font {
    pub face: FontFace,
    pub style: FontStyle,
    pub size: FontSize,
}

impl Font {
    /// Create a font with explicit attributes.
    pub const fn new(face: FontFace, style: FontStyle, size: FontSize) -> Self {
        Self { face, style, size }
    }
}

/// Text measurement provided by the platform.
///
/// The layout engine only ever needs three questions answered: how tall is
/// a line, how wide is a string, and how tall does a string become when
/// wrapped into a given width.
pub trait TextMetrics {
    /// Height of a single line in the given font.
    fn line_height(&self, font: Font) -> i32;

    /// Advance width of `text` on a single line.
    fn string_width(&self, font: Font, text: &str) -> i32;

    /// Number of lines `text` occupies when wrapped into `width` pixels.
    ///
    /// Empty text still occupies one line.
    fn wrapped_line_count(&self, font: Font, text: &str, width: i32) -> i32;

    /// Total height of `text` wrapped into `width` pixels.
    fn wrapped_height(&self, font: Font, text: &str, width: i32) -> i32 {
        self.wrapped_line_count(font, text, width) * self.line_height(font)
    }
}

/// Fixed-cell text metrics.
///
/// Every character occupies one cell; wrapping is per-character. The cell
/// grows with the font size step. Deterministic by construction, which is
/// what the layout tests rely on.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetrics;

impl MonospaceMetrics {
    pub const fn new() -> Self {
        Self
    }

    fn cell(font: Font) -> Size {
        match font.size {
            FontSize::Small => Size::new(5, 9),
            FontSize::Medium => Size::new(6, 12),
            FontSize::Large => Size::new(8, 16),
        }
    }
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMetrics for MonospaceMetrics {
    fn line_height(&self, font: Font) -> i32 {
        Self::cell(font).height
    }

    fn string_width(&self, font: Font, text: &str) -> i32 {
        Self::cell(font).width * text.chars().count() as i32
    }

    fn wrapped_line_count(&self, font: Font, text: &str, width: i32) -> i32 {
        let chars = text.chars().count() as i32;
        if chars == 0 {
            return 1;
        }
        let cols = (width / Self::cell(font).width).max(1);
        (chars + cols - 1) / cols
    }
}

/// Paint primitives provided by the platform.
///
/// All coordinates are in the current translated space; screens translate
/// by the scroll offset before painting their items.
pub trait Graphics {
    /// Shift the coordinate origin by the given deltas.
    fn translate(&mut self, dx: i32, dy: i32);

    /// The current translation from the original origin.
    fn translation(&self) -> Point;

    /// The current clip rectangle, in translated coordinates.
    fn clip(&self) -> Rect;

    /// Replace the clip rectangle.
    fn set_clip(&mut self, rect: Rect);

    /// Draw a one-pixel line.
    fn draw_line(&mut self, from: Point, to: Point);

    /// Outline a rectangle.
    fn draw_rect(&mut self, rect: Rect);

    /// Fill a rectangle.
    fn fill_rect(&mut self, rect: Rect);

    /// Draw a string with its top-left corner at (x, y).
    fn draw_string(&mut self, font: Font, text: &str, x: i32, y: i32);

    /// Draw an image with its top-left corner at (x, y).
    fn draw_image(&mut self, image: &Image, x: i32, y: i32);
}

/// A raster image handle.
///
/// Images come in two flavors: immutable (created once, never changes) and
/// mutable (the application may keep drawing into its source). When a
/// mutable image is handed to a widget, the widget stores a
/// [`snapshot`](Self::snapshot) — an immutable copy taken at assignment
/// time — and never re-reads the source afterwards.
#[derive(Clone)]
pub struct Image {
    size: Size,
    mutable: bool,
    data: Arc<Vec<u8>>,
}

impl Image {
    /// Create an immutable image from pixel data.
    pub fn immutable(size: Size, data: Vec<u8>) -> Self {
        Self {
            size,
            mutable: false,
            data: Arc::new(data),
        }
    }

    /// Create a mutable image the application can keep drawing into.
    pub fn mutable(size: Size) -> Self {
        let len = (size.width.max(0) as usize) * (size.height.max(0) as usize);
        Self {
            size,
            mutable: true,
            data: Arc::new(vec![0; len]),
        }
    }

    /// Image dimensions.
    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Whether the source may still change after assignment.
    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// An immutable copy decoupled from the source.
    ///
    /// Immutable images share their pixel data; mutable images are deep
    /// copied so later drawing into the source cannot affect the snapshot.
    pub fn snapshot(&self) -> Image {
        if self.mutable {
            Image {
                size: self.size,
                mutable: false,
                data: Arc::new(self.data.as_ref().clone()),
            }
        } else {
            self.clone()
        }
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("size", &self.size)
            .field("mutable", &self.mutable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monospace_string_width() {
        let m = MonospaceMetrics::new();
        assert_eq!(m.string_width(Font::default(), "hello"), 30);
        assert_eq!(m.string_width(Font::default(), ""), 0);
    }

    #[test]
    fn test_monospace_wrapping() {
        let m = MonospaceMetrics::new();
        let f = Font::default();
        // 10 chars at 6px into 30px: 5 columns -> 2 lines.
        assert_eq!(m.wrapped_line_count(f, "abcdefghij", 30), 2);
        assert_eq!(m.wrapped_height(f, "abcdefghij", 30), 24);
        // Empty text is one line tall.
        assert_eq!(m.wrapped_line_count(f, "", 30), 1);
        // Degenerate width still wraps one column at a time.
        assert_eq!(m.wrapped_line_count(f, "abc", 0), 3);
    }

    #[test]
    fn test_monospace_size_steps() {
        let m = MonospaceMetrics::new();
        let small = Font::new(FontFace::System, FontStyle::empty(), FontSize::Small);
        let large = Font::new(FontFace::System, FontStyle::empty(), FontSize::Large);
        assert!(m.line_height(small) < m.line_height(large));
    }

    #[test]
    fn test_image_snapshot_detaches_mutable_source() {
        let src = Image::mutable(Size::new(4, 4));
        let snap = src.snapshot();
        assert!(!snap.is_mutable());
        assert!(!Arc::ptr_eq(&src.data, &snap.data));
    }

    #[test]
    fn test_image_snapshot_shares_immutable_source() {
        let src = Image::immutable(Size::new(4, 4), vec![7; 16]);
        let snap = src.snapshot();
        assert!(Arc::ptr_eq(&src.data, &snap.data));
    }
}
