//! The item model and its layout peer state.
//!
//! An [`Item`] is what the application manipulates: label, layout
//! directives, optional locked size, commands and one concrete body
//! ([`ItemBody`]). The engine attaches a [`Peer`] to every item on a
//! screen: the peer carries layout output (bounds, row height) and the
//! per-axis staleness flags that drive incremental re-layout.
//!
//! Bodies are a tagged union rather than a class hierarchy; the handful of
//! operations the engine needs (measure, paint, traverse, key input) are
//! dispatched by matching on the variant.

use std::sync::atomic::{AtomicU64, Ordering};

use trellis_core::geometry::{Rect, Size};

use crate::error::{Result, UiError};
use crate::render::{Font, Graphics, TextMetrics};
use crate::widget::command::Command;
use crate::widget::events::{Direction, KeyCode};
use crate::widget::widgets::{
    ChoiceGroup, CustomItem, DateField, Spacer, StringItem, TextField,
};

/// Global item id counter.
static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of an item, independent of its position on a screen.
///
/// Used to re-resolve indices after the item array was mutated underneath
/// a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(u64);

impl ItemId {
    fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

bitflags::bitflags! {
    /// Layout directives for an item.
    ///
    /// At most one horizontal alignment bit and one vertical alignment bit
    /// may be set; [`Item::set_layout`] validates this. The vertical
    /// sizing directives (`VSHRINK`, `VEXPAND`) only take effect together
    /// with [`VERSION_2`](Self::VERSION_2).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ItemLayout: u16 {
        /// Align the item's row to the left edge.
        const LEFT = 1 << 0;
        /// Align the item's row to the right edge.
        const RIGHT = 1 << 1;
        /// Center the item's row horizontally.
        const CENTER_H = 1 << 2;
        /// Align the item to the top of its row.
        const TOP = 1 << 3;
        /// Align the item to the bottom of its row (the default).
        const BOTTOM = 1 << 4;
        /// Center the item vertically within its row.
        const CENTER_V = 1 << 5;
        /// Force a row break before this item.
        const NEWLINE_BEFORE = 1 << 6;
        /// Force a row break after this item.
        const NEWLINE_AFTER = 1 << 7;
        /// Allow compressing the item toward its minimum width.
        const SHRINK = 1 << 8;
        /// Let the item absorb leftover row width.
        const EXPAND = 1 << 9;
        /// Allow compressing the item toward its minimum height.
        const VSHRINK = 1 << 10;
        /// Stretch the item to its row's height.
        const VEXPAND = 1 << 11;
        /// Opt into the second-generation layout rules (vertical sizing
        /// directives honored).
        const VERSION_2 = 1 << 12;
    }
}

/// Effective horizontal alignment of an item's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Effective vertical alignment of an item within its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    /// Legacy default: items sit on their row's bottom edge.
    Bottom,
}

impl ItemLayout {
    /// Validate that alignment bits are not contradictory.
    pub fn validate(self) -> Result<()> {
        let h = (self & (Self::LEFT | Self::RIGHT | Self::CENTER_H))
            .bits()
            .count_ones();
        let v = (self & (Self::TOP | Self::BOTTOM | Self::CENTER_V))
            .bits()
            .count_ones();
        if h > 1 || v > 1 {
            return Err(UiError::invalid("conflicting alignment directives"));
        }
        Ok(())
    }

    /// The horizontal alignment, defaulting to left.
    pub fn h_align(self) -> HAlign {
        if self.contains(Self::RIGHT) {
            HAlign::Right
        } else if self.contains(Self::CENTER_H) {
            HAlign::Center
        } else {
            HAlign::Left
        }
    }

    /// The vertical alignment, defaulting to bottom.
    pub fn v_align(self) -> VAlign {
        if self.contains(Self::TOP) {
            VAlign::Top
        } else if self.contains(Self::CENTER_V) {
            VAlign::Center
        } else {
            VAlign::Bottom
        }
    }
}

/// Outcome of one internal traversal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalTraverse {
    /// The item kept focus and moved its internal cursor.
    Consumed,
    /// Focus leaves the item in the travel direction.
    Exit,
}

bitflags::bitflags! {
    /// Per-axis staleness of a peer's bounds.
    ///
    /// Bounds are trusted only when no flag is set. A peer whose only
    /// stale axis is `Y` can be repositioned without re-measurement.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct StaleBounds: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const WIDTH = 1 << 2;
        const HEIGHT = 1 << 3;
    }
}

impl StaleBounds {
    pub(crate) const ALL: Self = Self::all();
}

/// Measured sizes captured before a layout pass.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Sizing {
    pub min: Size,
    pub pref: Size,
}

/// Per-item layout state owned by the screen.
#[derive(Debug)]
pub(crate) struct Peer {
    /// Bounds in content (form-local) coordinates.
    pub bounds: Rect,
    /// Height of the row this item belongs to.
    pub row_height: i32,
    /// Top y of the row this item belongs to.
    pub row_top: i32,
    pub stale: StaleBounds,
    /// Whether this item starts its row.
    pub new_line: bool,
    pub visible: bool,
    pub focused: bool,
    pub sizing: Sizing,
}

impl Peer {
    pub(crate) fn new() -> Self {
        Self {
            bounds: Rect::ZERO,
            row_height: 0,
            row_top: 0,
            stale: StaleBounds::ALL,
            new_line: false,
            visible: true,
            focused: false,
            sizing: Sizing::default(),
        }
    }

    /// Whether the bounds can be trusted on every axis.
    #[inline]
    pub(crate) fn bounds_valid(&self) -> bool {
        self.stale.is_empty()
    }
}

/// The concrete behavior of an item.
#[derive(Debug)]
pub enum ItemBody {
    String(StringItem),
    Choice(ChoiceGroup),
    Text(TextField),
    Date(DateField),
    Custom(CustomItem),
    Spacer(Spacer),
}

impl ItemBody {
    fn interactive(&self) -> bool {
        match self {
            Self::String(b) => b.interactive(),
            Self::Choice(b) => b.interactive(),
            Self::Text(b) => b.interactive(),
            Self::Date(b) => b.interactive(),
            Self::Custom(b) => b.interactive(),
            Self::Spacer(b) => b.interactive(),
        }
    }

    pub(crate) fn in_traversal(&self) -> bool {
        match self {
            Self::Choice(b) => b.in_traversal(),
            Self::Text(b) => b.in_traversal(),
            Self::Date(b) => b.in_traversal(),
            Self::Custom(b) => b.in_traversal(),
            Self::String(_) | Self::Spacer(_) => false,
        }
    }

    pub(crate) fn focus_in(&mut self, dir: Direction, metrics: &dyn TextMetrics, width: i32) {
        match self {
            Self::Choice(b) => b.focus_in(dir),
            Self::Text(b) => b.focus_in(dir, metrics, width),
            _ => {}
        }
    }

    pub(crate) fn focus_out(&mut self) {
        match self {
            Self::Choice(b) => b.focus_out(),
            Self::Text(b) => b.focus_out(),
            Self::Date(b) => b.focus_out(),
            Self::Custom(b) => b.focus_out(),
            Self::String(_) | Self::Spacer(_) => {}
        }
    }

    pub(crate) fn traverse_inside(
        &mut self,
        dir: Direction,
        metrics: &dyn TextMetrics,
        width: i32,
        viewport: Size,
    ) -> InternalTraverse {
        match self {
            Self::Choice(b) => b.traverse_inside(dir),
            Self::Text(b) => b.traverse_inside(dir, metrics, width),
            Self::Date(b) => b.traverse_inside(dir),
            Self::Custom(b) => b.traverse_inside(dir, viewport),
            Self::String(_) | Self::Spacer(_) => InternalTraverse::Exit,
        }
    }

    pub(crate) fn consume_key(&mut self, code: KeyCode) -> bool {
        match self {
            Self::Choice(b) => b.consume_key(code),
            Self::Text(b) => b.consume_key(code),
            Self::Date(b) => b.consume_key(code),
            Self::Custom(b) => b.consume_key(code),
            Self::String(_) | Self::Spacer(_) => false,
        }
    }

    /// Rectangle (in content-box coordinates) the internal cursor needs to
    /// keep visible, when the body has one.
    pub(crate) fn focus_rect(&self, metrics: &dyn TextMetrics, width: i32) -> Option<Rect> {
        match self {
            Self::Choice(b) => Some(b.focus_rect(metrics, width)),
            Self::Text(b) => Some(b.focus_rect(metrics, width)),
            Self::Custom(b) => Some(b.focus_rect()),
            _ => None,
        }
    }

    pub(crate) fn content_sizing(
        &mut self,
        metrics: &dyn TextMetrics,
        width_limit: i32,
    ) -> (Size, Size) {
        match self {
            Self::String(b) => b.content_sizing(metrics, width_limit),
            Self::Choice(b) => b.content_sizing(metrics, width_limit),
            Self::Text(b) => b.content_sizing(metrics, width_limit),
            Self::Date(b) => b.content_sizing(metrics, width_limit),
            Self::Custom(b) => b.content_sizing(),
            Self::Spacer(b) => b.content_sizing(),
        }
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        match self {
            Self::String(b) => b.take_dirty(),
            Self::Choice(b) => b.take_dirty(),
            Self::Text(b) => b.take_dirty(),
            Self::Date(b) => b.take_dirty(),
            Self::Custom(b) => b.take_dirty(),
            Self::Spacer(b) => b.take_dirty(),
        }
    }

    pub(crate) fn paint(
        &mut self,
        g: &mut dyn Graphics,
        metrics: &dyn TextMetrics,
        width: i32,
        height: i32,
        focused: bool,
    ) {
        match self {
            Self::String(b) => b.paint(g, metrics, width, height, focused),
            Self::Choice(b) => b.paint(g, metrics, width, height, focused),
            Self::Text(b) => b.paint(g, metrics, width, height, focused),
            Self::Date(b) => b.paint(g, metrics, width, height, focused),
            Self::Custom(b) => b.paint(g, width, height),
            Self::Spacer(_) => {}
        }
    }
}

/// One widget on a screen.
#[derive(Debug)]
pub struct Item {
    id: ItemId,
    label: Option<String>,
    layout: ItemLayout,
    /// User-locked preferred width; `None` leaves the axis computed.
    locked_width: Option<i32>,
    /// User-locked preferred height; `None` leaves the axis computed.
    locked_height: Option<i32>,
    commands: Vec<Command>,
    default_command: Option<usize>,
    /// Set while the item is attached to a screen.
    owned: bool,
    body: ItemBody,
    /// Label or lock changed since the last layout pass.
    dirty: bool,
}

impl Item {
    /// Create an item around a body.
    pub fn new(body: ItemBody) -> Self {
        Self {
            id: ItemId::next(),
            label: None,
            layout: ItemLayout::default(),
            locked_width: None,
            locked_height: None,
            commands: Vec::new(),
            default_command: None,
            owned: false,
            body,
            dirty: true,
        }
    }

    /// Create an item with a label.
    pub fn with_label(body: ItemBody, label: impl Into<String>) -> Result<Self> {
        let mut item = Self::new(body);
        item.set_label(Some(label.into()))?;
        Ok(item)
    }

    /// The item's stable identity.
    #[inline]
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// The item's label.
    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Set or clear the label.
    ///
    /// Spacers never carry a label.
    pub fn set_label(&mut self, label: Option<String>) -> Result<()> {
        if matches!(self.body, ItemBody::Spacer(_)) {
            return Err(UiError::Unsupported("label on a spacer"));
        }
        self.label = label;
        self.dirty = true;
        Ok(())
    }

    /// The layout directive bitmask.
    #[inline]
    pub fn layout(&self) -> ItemLayout {
        self.layout
    }

    /// Replace the layout directives.
    pub fn set_layout(&mut self, layout: ItemLayout) -> Result<()> {
        layout.validate()?;
        if self.layout != layout {
            self.layout = layout;
            self.dirty = true;
        }
        Ok(())
    }

    /// Lock the preferred size per axis; `None` unlocks an axis.
    pub fn set_preferred_size(&mut self, width: Option<i32>, height: Option<i32>) -> Result<()> {
        if width.map_or(false, |w| w < 0) || height.map_or(false, |h| h < 0) {
            return Err(UiError::invalid("locked sizes must be non-negative"));
        }
        self.locked_width = width;
        self.locked_height = height;
        self.dirty = true;
        Ok(())
    }

    /// The locked width, if any.
    #[inline]
    pub fn locked_width(&self) -> Option<i32> {
        self.locked_width
    }

    /// The locked height, if any.
    #[inline]
    pub fn locked_height(&self) -> Option<i32> {
        self.locked_height
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Attach a command; duplicates are ignored.
    pub fn add_command(&mut self, command: Command) -> Result<()> {
        if matches!(self.body, ItemBody::Spacer(_)) {
            return Err(UiError::Unsupported("commands on a spacer"));
        }
        if !self.commands.contains(&command) {
            self.commands.push(command);
        }
        Ok(())
    }

    /// Detach a command, clearing the default if it pointed at it.
    pub fn remove_command(&mut self, command: &Command) {
        if let Some(pos) = self.commands.iter().position(|c| c == command) {
            self.commands.remove(pos);
            match self.default_command {
                Some(d) if d == pos => self.default_command = None,
                Some(d) if d > pos => self.default_command = Some(d - 1),
                _ => {}
            }
        }
    }

    /// Set the default command, attaching it if absent.
    pub fn set_default_command(&mut self, command: Option<Command>) -> Result<()> {
        match command {
            None => {
                self.default_command = None;
                Ok(())
            }
            Some(command) => {
                if !self.commands.contains(&command) {
                    self.add_command(command.clone())?;
                }
                self.default_command = self.commands.iter().position(|c| *c == command);
                Ok(())
            }
        }
    }

    /// The attached commands.
    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// The default command, if set.
    pub fn default_command(&self) -> Option<&Command> {
        self.default_command.and_then(|i| self.commands.get(i))
    }

    // =========================================================================
    // Ownership
    // =========================================================================

    /// Whether the item is attached to a screen.
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub(crate) fn mark_owned(&mut self) -> Result<()> {
        if self.owned {
            return Err(UiError::ItemAlreadyOwned);
        }
        self.owned = true;
        Ok(())
    }

    pub(crate) fn clear_owned(&mut self) {
        self.owned = false;
    }

    // =========================================================================
    // Body access
    // =========================================================================

    /// The item's body.
    #[inline]
    pub fn body(&self) -> &ItemBody {
        &self.body
    }

    /// Mutable access to the body.
    ///
    /// The owning screen schedules a re-layout after handing this out.
    #[inline]
    pub fn body_mut(&mut self) -> &mut ItemBody {
        &mut self.body
    }

    /// The choice group body, if this item is one.
    pub fn as_choice(&self) -> Option<&ChoiceGroup> {
        match &self.body {
            ItemBody::Choice(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable choice group body access.
    pub fn as_choice_mut(&mut self) -> Option<&mut ChoiceGroup> {
        match &mut self.body {
            ItemBody::Choice(c) => Some(c),
            _ => None,
        }
    }

    /// The text field body, if this item is one.
    pub fn as_text(&self) -> Option<&TextField> {
        match &self.body {
            ItemBody::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable text field body access.
    pub fn as_text_mut(&mut self) -> Option<&mut TextField> {
        match &mut self.body {
            ItemBody::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Whether the item can take focus.
    pub fn is_interactive(&self) -> bool {
        self.body.interactive() || !self.commands.is_empty()
    }

    /// Aggregate and clear the dirty markers of the item and its body.
    pub(crate) fn take_dirty(&mut self) -> bool {
        let body = self.body.take_dirty();
        std::mem::replace(&mut self.dirty, false) || body
    }

    // =========================================================================
    // Measurement
    // =========================================================================

    fn label_box(&self, metrics: &dyn TextMetrics, width_limit: i32) -> Size {
        match self.label.as_deref() {
            None | Some("") => Size::ZERO,
            Some(label) => {
                let font = Font::default();
                Size::new(
                    metrics.string_width(font, label).min(width_limit.max(1)),
                    metrics.line_height(font),
                )
            }
        }
    }

    /// Measure the item: content plus label, with locks applied.
    pub(crate) fn sizing(&mut self, metrics: &dyn TextMetrics, width_limit: i32) -> Sizing {
        let label = self.label_box(metrics, width_limit);
        let (body_min, body_pref) = self.body.content_sizing(metrics, width_limit);

        let min = Size::new(
            body_min.width.max(label.width),
            body_min.height + label.height,
        );
        let mut pref = Size::new(
            body_pref.width.max(label.width),
            body_pref.height + label.height,
        );

        // A lock overrides the computed preference but never undercuts the
        // minimum.
        if let Some(w) = self.locked_width {
            pref.width = w.max(min.width);
        }
        if let Some(h) = self.locked_height {
            pref.height = h.max(min.height);
        }

        Sizing { min, pref }
    }

    /// The preferred width the layout would use.
    pub fn preferred_width(&mut self, metrics: &dyn TextMetrics, width_limit: i32) -> i32 {
        self.sizing(metrics, width_limit).pref.width
    }

    /// The preferred height the layout would use.
    pub fn preferred_height(&mut self, metrics: &dyn TextMetrics, width_limit: i32) -> i32 {
        self.sizing(metrics, width_limit).pref.height
    }

    /// The minimum width the layout would allow.
    pub fn minimum_width(&mut self, metrics: &dyn TextMetrics, width_limit: i32) -> i32 {
        self.sizing(metrics, width_limit).min.width
    }

    /// The minimum height the layout would allow.
    pub fn minimum_height(&mut self, metrics: &dyn TextMetrics, width_limit: i32) -> i32 {
        self.sizing(metrics, width_limit).min.height
    }

    /// Height of the label band above the content box.
    pub(crate) fn label_height(&self, metrics: &dyn TextMetrics) -> i32 {
        match self.label.as_deref() {
            None | Some("") => 0,
            Some(_) => metrics.line_height(Font::default()),
        }
    }
}

/// An item plus its layout peer, as stored by a screen.
#[derive(Debug)]
pub(crate) struct Entry {
    pub item: Item,
    pub peer: Peer,
}

impl Entry {
    pub(crate) fn new(item: Item) -> Self {
        Self {
            item,
            peer: Peer::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MonospaceMetrics;
    use crate::widget::command::CommandKind;

    fn string_item(text: &str) -> Item {
        Item::new(ItemBody::String(StringItem::new(text)))
    }

    #[test]
    fn test_layout_validation() {
        let mut item = string_item("x");
        assert!(item
            .set_layout(ItemLayout::LEFT | ItemLayout::RIGHT)
            .is_err());
        assert!(item
            .set_layout(ItemLayout::TOP | ItemLayout::BOTTOM)
            .is_err());
        assert!(item
            .set_layout(ItemLayout::LEFT | ItemLayout::TOP | ItemLayout::SHRINK)
            .is_ok());
    }

    #[test]
    fn test_alignment_defaults() {
        assert_eq!(ItemLayout::default().h_align(), HAlign::Left);
        assert_eq!(ItemLayout::default().v_align(), VAlign::Bottom);
        assert_eq!(ItemLayout::CENTER_V.v_align(), VAlign::Center);
    }

    #[test]
    fn test_preferred_size_round_trip() {
        let metrics = MonospaceMetrics::new();
        let mut item = string_item("hello"); // 30x12 preferred

        // Locked above the minimum: reported verbatim.
        item.set_preferred_size(Some(80), Some(40)).unwrap();
        assert_eq!(item.preferred_width(&metrics, 200), 80);
        assert_eq!(item.preferred_height(&metrics, 200), 40);

        // Locked below the minimum: clamped up to the minimum.
        item.set_preferred_size(Some(2), Some(3)).unwrap();
        assert_eq!(
            item.preferred_width(&metrics, 200),
            item.minimum_width(&metrics, 200)
        );
        assert_eq!(
            item.preferred_height(&metrics, 200),
            item.minimum_height(&metrics, 200)
        );

        // Unlocked: computed values return.
        item.set_preferred_size(None, None).unwrap();
        assert_eq!(item.preferred_width(&metrics, 200), 30);
        assert_eq!(item.preferred_height(&metrics, 200), 12);
    }

    #[test]
    fn test_negative_lock_rejected() {
        let mut item = string_item("x");
        assert!(item.set_preferred_size(Some(-2), None).is_err());
    }

    #[test]
    fn test_label_adds_a_line() {
        let metrics = MonospaceMetrics::new();
        let mut item = string_item("hello");
        let plain = item.preferred_height(&metrics, 200);
        item.set_label(Some("name".into())).unwrap();
        assert_eq!(item.preferred_height(&metrics, 200), plain + 12);
    }

    #[test]
    fn test_spacer_rejects_label_and_commands() {
        let mut item = Item::new(ItemBody::Spacer(Spacer::new(10, 10).unwrap()));
        assert!(matches!(
            item.set_label(Some("x".into())),
            Err(UiError::Unsupported(_))
        ));
        assert!(item
            .add_command(Command::new("Go", CommandKind::Item, 1))
            .is_err());
    }

    #[test]
    fn test_commands_make_item_interactive() {
        let mut item = string_item("link");
        assert!(!item.is_interactive());
        item.add_command(Command::new("Open", CommandKind::Item, 1))
            .unwrap();
        assert!(item.is_interactive());
    }

    #[test]
    fn test_default_command_attaches() {
        let mut item = string_item("x");
        let cmd = Command::new("Go", CommandKind::Item, 1);
        item.set_default_command(Some(cmd.clone())).unwrap();
        assert_eq!(item.commands().len(), 1);
        assert_eq!(item.default_command(), Some(&cmd));

        item.remove_command(&cmd);
        assert!(item.default_command().is_none());
    }

    #[test]
    fn test_single_ownership() {
        let mut item = string_item("x");
        item.mark_owned().unwrap();
        assert!(matches!(item.mark_owned(), Err(UiError::ItemAlreadyOwned)));
        item.clear_owned();
        assert!(item.mark_owned().is_ok());
    }

    #[test]
    fn test_peer_starts_fully_stale() {
        let peer = Peer::new();
        assert!(!peer.bounds_valid());
        assert_eq!(peer.stale, StaleBounds::ALL);
    }

    #[test]
    fn test_item_ids_unique() {
        assert_ne!(string_item("a").id(), string_item("b").id());
    }
}
