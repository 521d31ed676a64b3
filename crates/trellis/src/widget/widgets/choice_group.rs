//! Choice group: a list of selectable elements.
//!
//! A choice group holds an ordered collection of elements (text, optional
//! image, optional per-element font) with selection state. Four kinds are
//! supported:
//!
//! - [`ChoiceKind::Exclusive`] - radio-button list, exactly one selected
//! - [`ChoiceKind::Multiple`] - checkbox list, independent flags
//! - [`ChoiceKind::Implicit`] - selection follows the highlight
//! - [`ChoiceKind::Popup`] - closed single row that opens an element list
//!
//! Every mutation validates its arguments before touching any state; a
//! returned error means the group is unchanged. Single-selection kinds
//! keep exactly one element selected whenever the group is non-empty, and
//! silently ignore attempts to deselect without a replacement.

use trellis_core::geometry::Size;

use crate::error::{Result, UiError};
use crate::render::{Font, Graphics, Image, TextMetrics};
use crate::widget::capacity;
use crate::widget::events::{Direction, KeyCode};
use crate::widget::item::InternalTraverse;

use trellis_core::geometry::Rect;

/// Selection behavior of a [`ChoiceGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    /// Exactly one element selected (radio buttons).
    Exclusive,
    /// Independent per-element selection (checkboxes).
    Multiple,
    /// Exactly one selected; selection tracks the highlight.
    Implicit,
    /// Exactly one selected; renders closed as a single row.
    Popup,
}

impl ChoiceKind {
    /// Whether this kind keeps exactly one element selected.
    #[inline]
    pub fn is_single_selection(self) -> bool {
        !matches!(self, Self::Multiple)
    }
}

/// Width of the check/radio gutter drawn left of each element.
const CHECK_GUTTER: i32 = 12;

/// One element of a choice group.
#[derive(Debug, Clone)]
pub struct ChoiceElement {
    text: String,
    image: Option<Image>,
    font: Option<Font>,
    selected: bool,
}

impl ChoiceElement {
    fn new(text: impl Into<String>, image: Option<&Image>) -> Self {
        Self {
            text: text.into(),
            // Snapshot at assignment time; a mutable source image is never
            // re-read after this point.
            image: image.map(Image::snapshot),
            font: None,
            selected: false,
        }
    }

    /// The element's display text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The element's display image snapshot, if any.
    #[inline]
    pub fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    /// The element's font override, if any.
    #[inline]
    pub fn font(&self) -> Option<Font> {
        self.font
    }

    /// Whether the element is currently selected.
    #[inline]
    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// A list of selectable elements.
#[derive(Debug)]
pub struct ChoiceGroup {
    kind: ChoiceKind,
    elements: Vec<ChoiceElement>,
    /// Cached per-element row heights; rebuilt lazily after mutation.
    el_heights: Vec<i32>,
    /// The element the internal traversal cursor sits on.
    highlighted: Option<usize>,
    /// Whether the internal cursor is live (the group has focus and has
    /// consumed at least one traversal step).
    traversing: bool,
    /// Popup kinds only: whether the element list is open.
    popup_open: bool,
    /// Content size changed since the last layout pass.
    dirty: bool,
}

impl ChoiceGroup {
    /// Create an empty choice group.
    pub fn new(kind: ChoiceKind) -> Self {
        Self {
            kind,
            elements: Vec::new(),
            el_heights: Vec::new(),
            highlighted: None,
            traversing: false,
            popup_open: false,
            dirty: true,
        }
    }

    /// Create a group pre-populated with text elements.
    pub fn with_elements<I, S>(kind: ChoiceKind, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = Self::new(kind);
        for text in texts {
            // Appending to a fresh group cannot fail.
            let _ = group.append(text, None);
        }
        group
    }

    /// The group's selection kind.
    #[inline]
    pub fn kind(&self) -> ChoiceKind {
        self.kind
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the group has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The element at `index`.
    pub fn element(&self, index: usize) -> Result<&ChoiceElement> {
        self.elements
            .get(index)
            .ok_or_else(|| UiError::index("choice group", index, self.elements.len()))
    }

    /// The display text at `index`.
    pub fn string(&self, index: usize) -> Result<&str> {
        Ok(self.element(index)?.text())
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append an element, returning its index.
    pub fn append(&mut self, text: impl Into<String>, image: Option<&Image>) -> Result<usize> {
        let index = self.elements.len();
        self.insert(index, text, image)?;
        Ok(index)
    }

    /// Insert an element before `index`.
    pub fn insert(
        &mut self,
        index: usize,
        text: impl Into<String>,
        image: Option<&Image>,
    ) -> Result<()> {
        if index > self.elements.len() {
            return Err(UiError::index("choice group", index, self.elements.len()));
        }

        capacity::reserve_for_push(&mut self.elements);
        capacity::reserve_for_push(&mut self.el_heights);
        self.elements.insert(index, ChoiceElement::new(text, image));
        self.element_inserted(index);
        Ok(())
    }

    /// Remove the element at `index`.
    pub fn delete(&mut self, index: usize) -> Result<()> {
        if index >= self.elements.len() {
            return Err(UiError::index("choice group", index, self.elements.len()));
        }

        self.elements.remove(index);
        capacity::trim_after_remove(&mut self.elements);
        self.element_deleted(index);
        Ok(())
    }

    /// Remove every element.
    pub fn delete_all(&mut self) {
        self.elements.clear();
        self.elements.shrink_to_fit();
        self.el_heights.clear();
        self.el_heights.shrink_to_fit();
        self.highlighted = None;
        self.traversing = false;
        self.popup_open = false;
        self.dirty = true;
    }

    /// Replace the element at `index`, keeping its selection flag.
    pub fn set(&mut self, index: usize, text: impl Into<String>, image: Option<&Image>) -> Result<()> {
        if index >= self.elements.len() {
            return Err(UiError::index("choice group", index, self.elements.len()));
        }

        let selected = self.elements[index].selected;
        let mut element = ChoiceElement::new(text, image);
        element.selected = selected;
        self.elements[index] = element;
        self.element_set(index);
        Ok(())
    }

    /// Override the font of the element at `index` (`None` restores the
    /// group default).
    pub fn set_font(&mut self, index: usize, font: Option<Font>) -> Result<()> {
        if index >= self.elements.len() {
            return Err(UiError::index("choice group", index, self.elements.len()));
        }
        self.elements[index].font = font;
        self.element_set(index);
        Ok(())
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Whether the element at `index` is selected.
    pub fn is_selected(&self, index: usize) -> Result<bool> {
        Ok(self.element(index)?.is_selected())
    }

    /// The selected index for single-selection kinds.
    ///
    /// Returns `None` when the group is empty, and always `None` for
    /// [`ChoiceKind::Multiple`].
    pub fn selected_index(&self) -> Option<usize> {
        if !self.kind.is_single_selection() {
            return None;
        }
        self.elements.iter().position(|e| e.selected)
    }

    /// Set or clear the selection flag of one element.
    ///
    /// For single-selection kinds, selecting an element deselects every
    /// other element; a deselect with no replacement is silently ignored.
    pub fn set_selected_index(&mut self, index: usize, selected: bool) -> Result<()> {
        if index >= self.elements.len() {
            return Err(UiError::index("choice group", index, self.elements.len()));
        }

        if self.kind.is_single_selection() {
            if !selected {
                // There is no way to have zero selected elements; ignored.
                return Ok(());
            }
            for (i, element) in self.elements.iter_mut().enumerate() {
                element.selected = i == index;
            }
        } else {
            self.elements[index].selected = selected;
        }
        Ok(())
    }

    /// Copy every element's selection flag into `out`.
    ///
    /// `out` must hold at least as many entries as there are elements;
    /// extra entries are cleared. Returns the number of selected elements.
    pub fn selected_flags(&self, out: &mut [bool]) -> Result<usize> {
        if out.len() < self.elements.len() {
            return Err(UiError::FlagCountMismatch {
                expected: self.elements.len(),
                got: out.len(),
            });
        }
        let mut count = 0;
        for (slot, element) in out.iter_mut().zip(&self.elements) {
            *slot = element.selected;
            if element.selected {
                count += 1;
            }
        }
        for slot in out.iter_mut().skip(self.elements.len()) {
            *slot = false;
        }
        Ok(count)
    }

    /// Set every element's selection flag at once.
    ///
    /// `flags` must hold at least as many entries as there are elements.
    /// For single-selection kinds the first set flag wins; if no flag is
    /// set, element zero becomes selected.
    pub fn set_selected_flags(&mut self, flags: &[bool]) -> Result<()> {
        if flags.len() < self.elements.len() {
            return Err(UiError::FlagCountMismatch {
                expected: self.elements.len(),
                got: flags.len(),
            });
        }
        if self.elements.is_empty() {
            return Ok(());
        }

        if self.kind.is_single_selection() {
            let winner = flags
                .iter()
                .take(self.elements.len())
                .position(|&f| f)
                .unwrap_or(0);
            for (i, element) in self.elements.iter_mut().enumerate() {
                element.selected = i == winner;
            }
        } else {
            for (element, &flag) in self.elements.iter_mut().zip(flags) {
                element.selected = flag;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Derived-index maintenance
    // =========================================================================

    /// Keep derived state consistent after an element landed at `index`.
    fn element_inserted(&mut self, index: usize) {
        self.el_heights.insert(index, 0);

        // Inserting before the highlight shifts it by one.
        if let Some(h) = self.highlighted {
            if index <= h {
                self.highlighted = Some(h + 1);
            }
        }

        // Single-selection groups keep exactly one element selected from
        // the moment any element exists.
        if self.kind.is_single_selection() && self.selected_index().is_none() {
            self.elements[index].selected = true;
        }

        self.dirty = true;
    }

    /// Keep derived state consistent after the element at `index` left.
    fn element_deleted(&mut self, index: usize) {
        self.el_heights.remove(index);
        capacity::trim_after_remove(&mut self.el_heights);

        self.highlighted = Self::reassign_after_delete(self.highlighted, index, self.elements.len());
        if self.highlighted.is_none() {
            self.traversing = false;
            self.popup_open = false;
        }

        if self.kind.is_single_selection()
            && !self.elements.is_empty()
            && self.selected_index().is_none()
        {
            // The selected element was deleted: the nearest valid neighbor
            // (clamped to the new last index) inherits the selection.
            let next = index.min(self.elements.len() - 1);
            self.elements[next].selected = true;
        }

        self.dirty = true;
    }

    /// Keep derived state consistent after the element at `index` was
    /// replaced in place.
    fn element_set(&mut self, index: usize) {
        self.el_heights[index] = 0;
        self.dirty = true;
    }

    /// Shift or clamp a derived index after deleting `deleted`.
    fn reassign_after_delete(current: Option<usize>, deleted: usize, new_len: usize) -> Option<usize> {
        let cur = current?;
        if new_len == 0 {
            return None;
        }
        if cur > deleted {
            Some(cur - 1)
        } else {
            Some(cur.min(new_len - 1))
        }
    }

    // =========================================================================
    // Traversal and input
    // =========================================================================

    /// The element the internal cursor sits on.
    #[inline]
    pub fn highlighted_index(&self) -> Option<usize> {
        self.highlighted
    }

    /// Whether the popup element list is open (popup kinds only).
    #[inline]
    pub fn is_popup_open(&self) -> bool {
        self.popup_open
    }

    pub(crate) fn interactive(&self) -> bool {
        true
    }

    pub(crate) fn in_traversal(&self) -> bool {
        self.traversing
    }

    /// Enter the group from the given travel direction.
    pub(crate) fn focus_in(&mut self, dir: Direction) {
        if self.elements.is_empty() {
            return;
        }
        if self.highlighted.is_none() {
            self.highlighted = match (self.kind, dir.is_backward()) {
                // Re-entering a single-selection group lands on its
                // selection; otherwise enter at the near edge.
                (k, _) if k.is_single_selection() => self.selected_index().or(Some(0)),
                (_, false) => Some(0),
                (_, true) => Some(self.elements.len() - 1),
            };
        }
        self.traversing = true;
    }

    pub(crate) fn focus_out(&mut self) {
        self.traversing = false;
        self.popup_open = false;
    }

    /// Move the internal cursor one step.
    pub(crate) fn traverse_inside(&mut self, dir: Direction) -> InternalTraverse {
        if self.elements.is_empty() {
            return InternalTraverse::Exit;
        }
        if self.kind == ChoiceKind::Popup && !self.popup_open {
            // A closed popup navigates like a plain item.
            return InternalTraverse::Exit;
        }

        let h = self.highlighted.unwrap_or(0);
        match dir {
            Direction::Up => {
                if h == 0 {
                    if self.popup_open {
                        // The open list captures navigation until closed.
                        return InternalTraverse::Consumed;
                    }
                    return InternalTraverse::Exit;
                }
                self.highlighted = Some(h - 1);
            }
            Direction::Down => {
                if h + 1 >= self.elements.len() {
                    if self.popup_open {
                        return InternalTraverse::Consumed;
                    }
                    return InternalTraverse::Exit;
                }
                self.highlighted = Some(h + 1);
            }
            Direction::Left | Direction::Right => return InternalTraverse::Exit,
        }
        self.traversing = true;
        if self.kind == ChoiceKind::Implicit {
            // Implicit groups keep selection glued to the highlight.
            let idx = self.highlighted.unwrap_or(0);
            let _ = self.set_selected_index(idx, true);
        }
        InternalTraverse::Consumed
    }

    /// React to a non-directional key. Returns `true` when selection state
    /// changed (the owner queues an item-state notification).
    pub(crate) fn consume_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Select => {
                let Some(h) = self.highlighted.or(self.selected_index()) else {
                    return false;
                };
                match self.kind {
                    ChoiceKind::Multiple => {
                        let flag = self.elements[h].selected;
                        let _ = self.set_selected_index(h, !flag);
                        true
                    }
                    ChoiceKind::Exclusive | ChoiceKind::Implicit => {
                        let changed = self.selected_index() != Some(h);
                        let _ = self.set_selected_index(h, true);
                        changed
                    }
                    ChoiceKind::Popup => {
                        if self.popup_open {
                            let changed = self.selected_index() != Some(h);
                            let _ = self.set_selected_index(h, true);
                            self.popup_open = false;
                            self.dirty = true;
                            changed
                        } else {
                            self.popup_open = true;
                            self.highlighted = self.selected_index().or(Some(0));
                            self.dirty = true;
                            false
                        }
                    }
                }
            }
            KeyCode::Back if self.popup_open => {
                self.popup_open = false;
                self.dirty = true;
                false
            }
            _ => false,
        }
    }

    /// The rectangle of the highlighted element in content coordinates,
    /// used to keep the internal cursor visible while scrolling.
    pub(crate) fn focus_rect(&self, metrics: &dyn TextMetrics, width: i32) -> Rect {
        let Some(h) = self.highlighted else {
            return Rect::new(0, 0, width, 0);
        };
        let mut y = 0;
        for i in 0..h {
            y += self.element_height(metrics, i);
        }
        Rect::new(0, y, width, self.element_height(metrics, h))
    }

    // =========================================================================
    // Measurement and painting
    // =========================================================================

    fn element_height(&self, metrics: &dyn TextMetrics, index: usize) -> i32 {
        let element = &self.elements[index];
        let text_h = metrics.line_height(element.font.unwrap_or_default());
        let image_h = element.image.as_ref().map(|i| i.size().height).unwrap_or(0);
        text_h.max(image_h)
    }

    /// Refresh the per-element height cache.
    fn refresh_heights(&mut self, metrics: &dyn TextMetrics) {
        for i in 0..self.elements.len() {
            self.el_heights[i] = self.element_height(metrics, i);
        }
    }

    pub(crate) fn content_sizing(&mut self, metrics: &dyn TextMetrics, _width_limit: i32) -> (Size, Size) {
        self.refresh_heights(metrics);

        let mut widest = 0;
        for element in &self.elements {
            let font = element.font.unwrap_or_default();
            let mut w = metrics.string_width(font, &element.text);
            if let Some(image) = &element.image {
                w += image.size().width;
            }
            widest = widest.max(w);
        }

        let closed_popup = self.kind == ChoiceKind::Popup && !self.popup_open;
        let height = if self.elements.is_empty() {
            metrics.line_height(Font::default())
        } else if closed_popup {
            let selected = self.selected_index().unwrap_or(0);
            self.el_heights[selected]
        } else {
            self.el_heights.iter().sum()
        };

        let pref = Size::new(CHECK_GUTTER + widest, height);
        // Elements do not wrap, so the group cannot become narrower or
        // shorter than its preferred box.
        (pref, pref)
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
        let closed_popup = self.kind == ChoiceKind::Popup && !self.popup_open;
        let mut y = 0;
        for (i, element) in self.elements.iter().enumerate() {
            if closed_popup && Some(i) != self.selected_index() {
                continue;
            }
            let font = element.font.unwrap_or_default();
            let h = self.el_heights.get(i).copied().unwrap_or(0);

            let marker = Rect::new(2, y + 2, CHECK_GUTTER - 4, (h - 4).max(0));
            if element.selected {
                g.fill_rect(marker);
            } else if !closed_popup {
                g.draw_rect(marker);
            }

            let mut x = CHECK_GUTTER;
            if let Some(image) = &element.image {
                g.draw_image(image, x, y);
                x += image.size().width;
            }
            g.draw_string(font, &element.text, x, y);

            if focused && self.highlighted == Some(i) && !closed_popup {
                g.draw_rect(Rect::new(0, y, width, h));
            }
            y += h;
        }
    }
}
