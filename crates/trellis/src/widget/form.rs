//! The form screen: item array, layout orchestration, scrolling and focus
//! traversal.
//!
//! A [`Form`] owns an ordered array of items with their layout peers and
//! drives everything the engine does between input and paint:
//!
//! - full vs. incremental layout, coalesced through a 40 ms invalidate
//!   window so mutation bursts trigger one recomputation
//! - the scroll position (`viewable` origin), clamped to the laid-out
//!   content
//! - focus traversal: internal-first delegation, sequential movement,
//!   page flips with a small overlap, and cyclic wraparound across pages
//! - application callbacks (item-state and command listeners), always
//!   invoked with the listener *taken out* of the form so the callback
//!   can freely re-enter and mutate it; indices computed before the call
//!   are re-resolved afterwards if the item array changed underneath
//!   (`items_modified` / [`Form::refresh_items`])
//!
//! Widget state has a single owner. Timer threads never touch it: the
//! deferred-invalidate timer lives in a [`TimerManager`] polled by the
//! event pump, and display requests travel through the host queue.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use trellis_core::geometry::{Point, Rect, Size};
use trellis_core::timer::{TimerId, TimerManager};

use crate::error::{Result, UiError};
use crate::render::{Font, Graphics, TextMetrics};
use crate::widget::capacity;
use crate::widget::command::Command;
use crate::widget::displayable::{Displayable, DisplayHost, ShowEffects};
use crate::widget::events::{Direction, KeyCode, KeyEvent, PointerEvent, PointerPhase};
use crate::widget::item::{Entry, InternalTraverse, Item, ItemBody, ItemId, StaleBounds};
use crate::widget::layout::manager::{self, LayoutMode};

/// Minimum interval between layout recomputations (about 25 per second).
pub(crate) const INVALIDATE_PERIOD: Duration = Duration::from_millis(40);

/// Overlap kept from the previous page when flipping a full page.
pub(crate) const PIXELS_LEFT_ON_PAGE: i32 = 2;

/// Item-state listener: called with the form and the item's current index.
pub type ItemStateListener = Box<dyn FnMut(&mut Form, usize) + Send>;

/// Command listener: called with the form, the item's current index and
/// the activated command.
pub type CommandListener = Box<dyn FnMut(&mut Form, usize, &Command) + Send>;

/// A queued application notification, dispatched after the triggering
/// operation has fully committed.
#[derive(Debug)]
enum Notification {
    ItemState(ItemId),
    Command(ItemId, Command),
}

/// Decision of the invalidate rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateDecision {
    /// Run the layout immediately.
    RunNow,
    /// Schedule a one-shot timer for the end of the grace window.
    Defer(Duration),
    /// A deferred run is already scheduled; coalesce into it.
    Pending,
}

/// Coalesces invalidate requests to at most one per
/// [`INVALIDATE_PERIOD`]. A request inside the window is deferred to the
/// window's end, never dropped.
#[derive(Debug, Default)]
struct InvalidateGate {
    last_run: Option<Instant>,
    deferred: bool,
}

impl InvalidateGate {
    fn request(&mut self, now: Instant) -> GateDecision {
        match self.last_run {
            Some(last) if now.duration_since(last) < INVALIDATE_PERIOD => {
                if self.deferred {
                    GateDecision::Pending
                } else {
                    self.deferred = true;
                    GateDecision::Defer(INVALIDATE_PERIOD - now.duration_since(last))
                }
            }
            _ => GateDecision::RunNow,
        }
    }

    fn mark_ran(&mut self, now: Instant) {
        self.last_run = Some(now);
        self.deferred = false;
    }
}

/// A screen holding a scrollable, traversable list of items.
pub struct Form {
    base: Displayable,
    entries: Vec<Entry>,
    /// Index of the focused item, if any.
    traverse_index: Option<usize>,
    /// Laid-out content: origin is the scroll offset, size the content
    /// extent.
    viewable: Rect,
    /// Set whenever insert/delete/set changes the item array; invalidates
    /// indices computed before an application callback ran.
    items_modified: bool,
    /// Layout work scheduled but not yet run.
    pending_mode: Option<LayoutMode>,
    gate: InvalidateGate,
    timers: TimerManager,
    gate_timer: Option<TimerId>,
    metrics: Arc<dyn TextMetrics + Send + Sync>,
    item_state_listener: Option<ItemStateListener>,
    command_listener: Option<CommandListener>,
    notifications: VecDeque<Notification>,
}

impl Form {
    /// Create an empty form.
    pub fn new(
        title: impl Into<String>,
        metrics: Arc<dyn TextMetrics + Send + Sync>,
    ) -> Self {
        Self {
            base: Displayable::new(Some(title.into())),
            entries: Vec::new(),
            traverse_index: None,
            viewable: Rect::ZERO,
            items_modified: false,
            pending_mode: None,
            gate: InvalidateGate::default(),
            timers: TimerManager::new(),
            gate_timer: None,
            metrics,
            item_state_listener: None,
            command_listener: None,
            notifications: VecDeque::new(),
        }
    }

    /// The screen title.
    pub fn title(&self) -> Option<&str> {
        self.base.title()
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the form holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Connect the display server interface.
    pub fn attach_host(&mut self, host: Arc<dyn DisplayHost>) {
        self.base.attach_host(host);
    }

    // =========================================================================
    // Item management
    // =========================================================================

    /// Append an item, returning its index.
    ///
    /// The item must not already belong to a screen.
    pub fn append(&mut self, item: Item) -> Result<usize> {
        let index = self.entries.len();
        self.insert(index, item)?;
        Ok(index)
    }

    /// Insert an item before `index`.
    pub fn insert(&mut self, index: usize, mut item: Item) -> Result<()> {
        if index > self.entries.len() {
            return Err(UiError::index("form", index, self.entries.len()));
        }
        item.mark_owned()?;

        capacity::reserve_for_push(&mut self.entries);
        self.entries.insert(index, Entry::new(item));
        // Everything below the new item will shift.
        for entry in &mut self.entries[index + 1..] {
            entry.peer.stale.insert(StaleBounds::Y);
        }

        self.resolve_traverse_index();
        self.items_modified = true;
        self.schedule(LayoutMode::Update);
        self.invalidate();
        Ok(())
    }

    /// Remove and return the item at `index`.
    pub fn delete(&mut self, index: usize) -> Result<Item> {
        if index >= self.entries.len() {
            return Err(UiError::index("form", index, self.entries.len()));
        }

        let mut entry = self.entries.remove(index);
        capacity::trim_after_remove(&mut self.entries);
        entry.item.clear_owned();
        entry.item.body_mut().focus_out();

        for later in &mut self.entries[index..] {
            later.peer.stale.insert(StaleBounds::Y);
        }

        self.resolve_traverse_index();
        self.items_modified = true;
        self.schedule(LayoutMode::Update);
        self.invalidate();
        Ok(entry.item)
    }

    /// Remove every item.
    pub fn delete_all(&mut self) {
        for entry in &mut self.entries {
            entry.item.clear_owned();
        }
        self.entries.clear();
        self.entries.shrink_to_fit();
        self.traverse_index = None;
        self.items_modified = true;
        self.schedule(LayoutMode::Full);
        self.invalidate();
    }

    /// Replace the item at `index`, returning the old one.
    pub fn set(&mut self, index: usize, mut item: Item) -> Result<Item> {
        if index >= self.entries.len() {
            return Err(UiError::index("form", index, self.entries.len()));
        }
        item.mark_owned()?;

        let mut old = std::mem::replace(&mut self.entries[index], Entry::new(item));
        old.item.clear_owned();
        old.item.body_mut().focus_out();

        for later in &mut self.entries[index + 1..] {
            later.peer.stale.insert(StaleBounds::Y);
        }

        self.resolve_traverse_index();
        self.items_modified = true;
        self.schedule(LayoutMode::Update);
        self.invalidate();
        Ok(old.item)
    }

    /// The item at `index`.
    pub fn item(&self, index: usize) -> Result<&Item> {
        self.entries
            .get(index)
            .map(|e| &e.item)
            .ok_or_else(|| UiError::index("form", index, self.entries.len()))
    }

    /// Mutable access to the item at `index`.
    ///
    /// A re-layout is scheduled unconditionally; whether anything actually
    /// moves is decided by the dirty sweep before the next layout pass.
    pub fn item_mut(&mut self, index: usize) -> Result<&mut Item> {
        if index >= self.entries.len() {
            return Err(UiError::index("form", index, self.entries.len()));
        }
        self.schedule(LayoutMode::Update);
        Ok(&mut self.entries[index].item)
    }

    /// The current index of the item with identity `id`, if it is still
    /// on this form.
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.entries.iter().position(|e| e.item.id() == id)
    }

    /// Laid-out bounds of an item, in content coordinates.
    pub(crate) fn peer_bounds(&self, index: usize) -> Rect {
        self.entries[index].peer.bounds
    }

    /// (bounds valid, bottom edge) of an item's peer.
    pub(crate) fn peer_state(&self, index: usize) -> (bool, i32) {
        let peer = &self.entries[index].peer;
        (peer.bounds_valid(), peer.bounds.bottom())
    }

    /// Recompute the focus index from the focused peer flag, which moves
    /// with its entry through inserts and deletes.
    fn resolve_traverse_index(&mut self) {
        self.traverse_index = self.entries.iter().position(|e| e.peer.focused);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Viewport size available to content.
    pub fn viewport(&self) -> Size {
        self.base.viewport()
    }

    /// The platform resized the viewport.
    pub fn set_viewport(&mut self, width: i32, height: i32) {
        let deliver_now = self.base.set_viewport(Size::new(width, height));
        self.schedule(LayoutMode::Full);
        if deliver_now {
            self.invalidate();
        }
    }

    /// The display took this screen: run the full show pipeline.
    pub fn show(&mut self) {
        let effects = self.base.notify_shown();
        self.show_contents(effects);
    }

    /// The display dropped this screen.
    ///
    /// An outstanding deferred-invalidate timer is stopped; the pending
    /// work itself survives and is replayed by the next show.
    pub fn hide(&mut self) {
        self.base.notify_hidden();
        if let Some(timer) = self.gate_timer.take() {
            let _ = self.timers.cancel(timer);
        }
    }

    /// A modal system layer obscured this screen.
    pub fn freeze(&mut self) {
        self.base.notify_frozen();
    }

    /// Whether the screen is currently on the display.
    pub fn is_shown(&self) -> bool {
        self.base.is_shown()
    }

    /// Full pipeline on show: cache custom sizes, lay out, clamp scroll,
    /// pick the item to focus in the viewport.
    fn show_contents(&mut self, effects: ShowEffects) {
        for entry in &mut self.entries {
            if let ItemBody::Custom(custom) = entry.item.body_mut() {
                custom.refresh_sizes();
            }
        }

        self.pending_mode = None;
        self.do_layout(LayoutMode::Full);
        self.init_items_in_viewport(Direction::Down);

        if effects.size_changed.is_some() || effects.repaint.is_some() || effects.relayout {
            // Anything recorded while not shown is covered by the full
            // pass above; just repaint everything once.
            let viewport = self.base.viewport();
            self.base
                .request_paint(Rect::new(0, 0, viewport.width, viewport.height));
        }
    }

    // =========================================================================
    // Invalidate scheduling
    // =========================================================================

    /// Record layout work and tell the display a pass is needed.
    fn schedule(&mut self, mode: LayoutMode) {
        self.pending_mode = Some(match self.pending_mode {
            Some(LayoutMode::Full) => LayoutMode::Full,
            _ => mode,
        });
        self.base.request_layout();
    }

    /// Request a layout recomputation, rate-limited to one per 40 ms.
    ///
    /// Requests inside the window are deferred to the window's end via a
    /// timer the event pump polls; no request is dropped.
    pub fn invalidate(&mut self) {
        if self.pending_mode.is_none() {
            self.pending_mode = Some(LayoutMode::Update);
        }
        let now = Instant::now();
        match self.gate.request(now) {
            GateDecision::RunNow => self.run_pending_layout(now),
            GateDecision::Defer(delay) => {
                self.gate_timer = Some(self.timers.start_one_shot(now, delay));
            }
            GateDecision::Pending => {}
        }
    }

    /// Drive timers, run scheduled layout work and deliver queued
    /// application callbacks.
    ///
    /// The embedder calls this from its dispatch loop.
    pub fn pump(&mut self, now: Instant) {
        for fired in self.timers.poll(now) {
            if self.gate_timer == Some(fired) {
                self.gate_timer = None;
                self.run_pending_layout(now);
            }
        }

        // Layout scheduled without a live deferral timer (e.g. through
        // item_mut) goes through the gate here.
        if self.pending_mode.is_some() && self.gate_timer.is_none() {
            match self.gate.request(now) {
                GateDecision::RunNow => self.run_pending_layout(now),
                GateDecision::Defer(delay) => {
                    self.gate_timer = Some(self.timers.start_one_shot(now, delay));
                }
                GateDecision::Pending => {}
            }
        }

        self.dispatch_notifications();
    }

    fn run_pending_layout(&mut self, now: Instant) {
        self.gate.mark_ran(now);
        let Some(mode) = self.pending_mode.take() else {
            return;
        };
        if !self.base.is_shown() {
            // Keep the work queued; the show pipeline replays it.
            self.pending_mode = Some(mode);
            return;
        }
        self.do_layout(mode);
    }

    /// Run one layout pass and recompute the scroll window.
    fn do_layout(&mut self, mode: LayoutMode) {
        // Pull dirty state: body mutations become stale bounds here, so a
        // single pass covers any number of model changes.
        for entry in &mut self.entries {
            if entry.item.take_dirty() {
                entry
                    .peer
                    .stale
                    .insert(StaleBounds::WIDTH | StaleBounds::HEIGHT);
            }
        }

        let viewport = self.base.viewport();
        let metrics = Arc::clone(&self.metrics);
        let content = manager::run(mode, &mut self.entries, viewport, metrics.as_ref());
        self.viewable.size = content;
        self.clamp_scroll();
        self.items_modified = false;

        // The recomputed geometry may have moved the focus target off the
        // page (or there may be none yet); re-run viewport selection.
        self.init_items_in_viewport(Direction::Down);

        self.base
            .request_paint(Rect::new(0, 0, viewport.width, viewport.height));
    }

    // =========================================================================
    // Scrolling
    // =========================================================================

    /// Current scroll offset from the top of the content.
    #[inline]
    pub fn scroll_top(&self) -> i32 {
        self.viewable.origin.y
    }

    /// Total laid-out content size.
    #[inline]
    pub fn content_size(&self) -> Size {
        self.viewable.size
    }

    /// Set the scroll offset directly (clamped to the content).
    pub fn set_scroll_top(&mut self, y: i32) {
        self.viewable.origin.y = y;
        self.clamp_scroll();
    }

    fn max_scroll(&self) -> i32 {
        (self.viewable.height() - self.base.viewport().height).max(0)
    }

    fn clamp_scroll(&mut self) {
        self.viewable.origin.x = 0;
        self.viewable.origin.y = self.viewable.origin.y.clamp(0, self.max_scroll());
    }

    /// Scroll just enough to bring `bounds` into view.
    ///
    /// A target taller than the viewport keeps its top edge visible,
    /// never its bottom, regardless of travel direction.
    fn scroll_for_bounds(&mut self, bounds: Rect) {
        let viewport_h = self.base.viewport().height;
        let y = self.viewable.origin.y;

        let new_y = if bounds.height() > viewport_h {
            bounds.top()
        } else if bounds.top() < y {
            bounds.top()
        } else if bounds.bottom() > y + viewport_h {
            bounds.bottom() - viewport_h
        } else {
            y
        };

        self.viewable.origin.y = new_y.clamp(0, self.max_scroll());
    }

    // =========================================================================
    // Focus traversal
    // =========================================================================

    /// Index of the focused item, if any.
    #[inline]
    pub fn focused_index(&self) -> Option<usize> {
        self.traverse_index
    }

    /// Focus a specific item and scroll it into view.
    pub fn set_current_item(&mut self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(UiError::index("form", index, self.entries.len()));
        }
        self.set_focus(index, Direction::Down);
        let bounds = self.entries[index].peer.bounds;
        self.scroll_for_bounds(bounds);
        Ok(())
    }

    fn set_focus(&mut self, index: usize, dir: Direction) {
        if self.traverse_index == Some(index) {
            return;
        }
        if let Some(old) = self.traverse_index.take() {
            if let Some(entry) = self.entries.get_mut(old) {
                entry.peer.focused = false;
                entry.item.body_mut().focus_out();
            }
        }

        let metrics = Arc::clone(&self.metrics);
        let entry = &mut self.entries[index];
        let width = entry.peer.bounds.width();
        entry.peer.focused = true;
        entry.item.body_mut().focus_in(dir, metrics.as_ref(), width);
        self.traverse_index = Some(index);

        let bounds = entry.peer.bounds;
        self.base.request_paint(bounds.translated(0, -self.viewable.origin.y));
    }

    /// Percentage (0-100) of `bounds` visible in the current viewport.
    fn visibility_percent(&self, bounds: Rect) -> i32 {
        if bounds.height() <= 0 {
            return 0;
        }
        let top = self.viewable.origin.y;
        let bottom = top + self.base.viewport().height;
        let visible = (bounds.bottom().min(bottom) - bounds.top().max(top))
            .clamp(0, bounds.height());
        visible * 100 / bounds.height()
    }

    /// Pick the item to focus after the viewport moved (page show, page
    /// flip, resize).
    ///
    /// The previously focused item continues its internal traversal if it
    /// is still mid-flight. Otherwise candidates are scored by visible
    /// percentage in travel order; the first fully visible one wins
    /// outright. With no interactive item visible, focus stays empty
    /// until the next directional traversal.
    fn init_items_in_viewport(&mut self, dir: Direction) {
        if let Some(index) = self.traverse_index {
            if let Some(entry) = self.entries.get(index) {
                // A focused item mid-internal-traversal keeps the focus;
                // so does one that is still at least partially visible.
                if entry.item.body().in_traversal()
                    || self.visibility_percent(entry.peer.bounds) > 0
                {
                    return;
                }
            }
        }

        let order: Vec<usize> = if dir.is_backward() {
            (0..self.entries.len()).rev().collect()
        } else {
            (0..self.entries.len()).collect()
        };

        let mut best: Option<(usize, i32)> = None;
        for i in order {
            if !self.entries[i].item.is_interactive() {
                continue;
            }
            let percent = self.visibility_percent(self.entries[i].peer.bounds);
            if percent == 100 {
                best = Some((i, percent));
                break;
            }
            if percent > 0 && best.map_or(true, |(_, b)| percent > b) {
                best = Some((i, percent));
            }
        }

        if let Some((index, _)) = best {
            self.set_focus(index, dir);
        }
    }

    /// The next interactive item from the current focus in `dir`.
    fn next_interactive(&self, dir: Direction) -> Option<usize> {
        let interactive = |i: &usize| self.entries[*i].item.is_interactive();
        match (self.traverse_index, dir.is_backward()) {
            (Some(cur), false) => (cur + 1..self.entries.len()).find(|i| interactive(i)),
            (Some(cur), true) => (0..cur).rev().find(|i| interactive(i)),
            (None, false) => (0..self.entries.len()).find(|i| interactive(i)),
            (None, true) => (0..self.entries.len()).rev().find(|i| interactive(i)),
        }
    }

    /// One directional traversal step.
    pub fn traverse(&mut self, dir: Direction) {
        if self.entries.is_empty() {
            return;
        }

        // Internal traversal first: a complex item keeps focus while it
        // still has somewhere to go, and we only scroll enough to keep
        // its internal focus rectangle visible.
        if let Some(index) = self.traverse_index {
            let viewport = self.base.viewport();
            let metrics = Arc::clone(&self.metrics);
            let entry = &mut self.entries[index];
            let width = entry.peer.bounds.width();
            let outcome =
                entry
                    .item
                    .body_mut()
                    .traverse_inside(dir, metrics.as_ref(), width, viewport);
            if outcome == InternalTraverse::Consumed {
                let bounds = entry.peer.bounds;
                let label_h = entry.item.label_height(metrics.as_ref());
                if let Some(focus) = entry.item.body().focus_rect(metrics.as_ref(), width) {
                    let absolute =
                        focus.translated(bounds.left(), bounds.top() + label_h);
                    self.scroll_for_bounds(absolute);
                }
                let viewport = self.base.viewport();
                self.base
                    .request_paint(Rect::new(0, 0, viewport.width, viewport.height));
                return;
            }
        }

        match self.next_interactive(dir) {
            Some(next) => {
                let bounds = self.entries[next].peer.bounds;
                if self.visibility_percent(bounds) > 0 {
                    self.set_focus(next, dir);
                    self.scroll_for_bounds(bounds);
                } else {
                    self.page_flip(dir);
                }
            }
            None => self.cyclic_wrap(dir),
        }
    }

    /// Flip one page in `dir`, keeping a small overlap and avoiding
    /// cutting an item mid-row when possible.
    fn page_flip(&mut self, dir: Direction) {
        let viewport_h = self.base.viewport().height;
        let y = self.viewable.origin.y;
        let step = (viewport_h - PIXELS_LEFT_ON_PAGE).max(1);

        let mut target = if dir.is_backward() { y - step } else { y + step };
        target = target.clamp(0, self.max_scroll());

        // An item straddling the new boundary is aligned flush with it
        // when that still advances the scroll.
        if dir.is_backward() {
            let boundary = target + viewport_h;
            if let Some(straddler) = self
                .entries
                .iter()
                .find(|e| e.peer.bounds.top() < boundary && e.peer.bounds.bottom() > boundary)
            {
                let aligned = straddler.peer.bounds.bottom() - viewport_h;
                if aligned < y {
                    target = aligned;
                }
            }
        } else if let Some(straddler) = self
            .entries
            .iter()
            .find(|e| e.peer.bounds.top() < target && e.peer.bounds.bottom() > target)
        {
            let aligned = straddler.peer.bounds.top();
            if aligned > y {
                target = aligned;
            }
        }

        self.viewable.origin.y = target.clamp(0, self.max_scroll());
        self.init_items_in_viewport(dir);

        let viewport = self.base.viewport();
        self.base
            .request_paint(Rect::new(0, 0, viewport.width, viewport.height));
    }

    /// Wrap focus around the content when traversal runs off either end
    /// and the form spans more than one page.
    fn cyclic_wrap(&mut self, dir: Direction) {
        let viewport_h = self.base.viewport().height;
        if self.viewable.height() <= viewport_h {
            return;
        }

        if dir.is_backward() {
            self.viewable.origin.y = self.max_scroll();
            if let Some(last) = (0..self.entries.len())
                .rev()
                .find(|&i| self.entries[i].item.is_interactive())
            {
                self.set_focus(last, dir);
            }
        } else {
            self.viewable.origin.y = 0;
            if let Some(first) = (0..self.entries.len())
                .find(|&i| self.entries[i].item.is_interactive())
            {
                self.set_focus(first, dir);
            }
        }

        let viewport = self.base.viewport();
        self.base
            .request_paint(Rect::new(0, 0, viewport.width, viewport.height));
    }

    // =========================================================================
    // Input dispatch
    // =========================================================================

    /// Handle a decoded key event.
    pub fn key_event(&mut self, event: KeyEvent) {
        if let Some(dir) = event.code.direction() {
            self.traverse(dir);
            return;
        }

        let Some(index) = self.traverse_index else {
            return;
        };
        let changed = self.entries[index].item.body_mut().consume_key(event.code);
        let id = self.entries[index].item.id();

        if changed {
            self.notifications.push_back(Notification::ItemState(id));
        } else if matches!(event.code, KeyCode::Select) {
            // Items whose body ignores Select activate their default
            // command instead.
            if let Some(command) = self.entries[index].item.default_command().cloned() {
                self.notifications.push_back(Notification::Command(id, command));
            }
        }

        // Body state may have changed shape (popup opened, text grew).
        self.invalidate();
    }

    /// Handle a decoded pointer event.
    pub fn pointer_event(&mut self, event: PointerEvent) {
        if event.phase != PointerPhase::Pressed {
            return;
        }
        let content = Point::new(
            event.position.x + self.viewable.origin.x,
            event.position.y + self.viewable.origin.y,
        );
        let hit = (0..self.entries.len()).find(|&i| {
            self.entries[i].item.is_interactive()
                && self.entries[i].peer.bounds.contains(content)
        });
        if let Some(index) = hit {
            self.set_focus(index, Direction::Down);
        }
    }

    // =========================================================================
    // Application callbacks
    // =========================================================================

    /// Install the item-state listener.
    pub fn set_item_state_listener(&mut self, listener: Option<ItemStateListener>) {
        self.item_state_listener = listener;
    }

    /// Install the command listener.
    pub fn set_command_listener(&mut self, listener: Option<CommandListener>) {
        self.command_listener = listener;
    }

    /// Reconcile after an application callback mutated the item array:
    /// re-resolve the focus index by identity and re-clamp the scroll.
    fn refresh_items(&mut self) {
        self.resolve_traverse_index();
        self.clamp_scroll();
        self.items_modified = false;
    }

    /// Deliver queued notifications.
    ///
    /// Each listener is taken out of the form for the duration of its
    /// call, so the callback may re-enter the form freely. A panic in a
    /// callback is caught and logged; the toolkit continues. If the
    /// callback mutated the item array, indices are re-resolved before
    /// the next delivery.
    fn dispatch_notifications(&mut self) {
        while let Some(notification) = self.notifications.pop_front() {
            match notification {
                Notification::ItemState(id) => {
                    let Some(mut listener) = self.item_state_listener.take() else {
                        continue;
                    };
                    if let Some(index) = self.index_of(id) {
                        self.items_modified = false;
                        let outcome =
                            catch_unwind(AssertUnwindSafe(|| listener(&mut *self, index)));
                        if outcome.is_err() {
                            tracing::error!(
                                target: trellis_core::logging::targets::CALLBACK,
                                index,
                                "item-state listener panicked; continuing"
                            );
                        }
                        if self.items_modified {
                            self.refresh_items();
                        }
                    }
                    if self.item_state_listener.is_none() {
                        self.item_state_listener = Some(listener);
                    }
                }
                Notification::Command(id, command) => {
                    let Some(mut listener) = self.command_listener.take() else {
                        continue;
                    };
                    if let Some(index) = self.index_of(id) {
                        self.items_modified = false;
                        let outcome = catch_unwind(AssertUnwindSafe(|| {
                            listener(&mut *self, index, &command)
                        }));
                        if outcome.is_err() {
                            tracing::error!(
                                target: trellis_core::logging::targets::CALLBACK,
                                index,
                                command = command.label(),
                                "command listener panicked; continuing"
                            );
                        }
                        if self.items_modified {
                            self.refresh_items();
                        }
                    }
                    if self.command_listener.is_none() {
                        self.command_listener = Some(listener);
                    }
                }
            }
        }
    }

    // =========================================================================
    // Painting
    // =========================================================================

    /// Paint the visible items through the scroll offset.
    pub fn paint(&mut self, g: &mut dyn Graphics, clip: Rect) {
        let origin = self.viewable.origin;
        let metrics = Arc::clone(&self.metrics);
        let content_clip = clip.translated(origin.x, origin.y);

        g.translate(-origin.x, -origin.y);
        for entry in &mut self.entries {
            if !entry.peer.visible || !entry.peer.bounds.intersects(&content_clip) {
                continue;
            }
            let bounds = entry.peer.bounds;
            let label_h = entry.item.label_height(metrics.as_ref());

            g.translate(bounds.left(), bounds.top());
            if let Some(label) = entry.item.label() {
                g.draw_string(Font::default(), label, 0, 0);
            }
            g.translate(0, label_h);
            entry.item.body_mut().paint(
                g,
                metrics.as_ref(),
                bounds.width(),
                bounds.height() - label_h,
                entry.peer.focused,
            );
            g.translate(-bounds.left(), -(bounds.top() + label_h));
        }
        g.translate(origin.x, origin.y);
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("title", &self.base.title())
            .field("items", &self.entries.len())
            .field("traverse_index", &self.traverse_index)
            .field("viewable", &self.viewable)
            .field("state", &self.base.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MonospaceMetrics;
    use crate::widget::widgets::{ChoiceGroup, ChoiceKind, Spacer, StringItem};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn metrics() -> Arc<dyn TextMetrics + Send + Sync> {
        Arc::new(MonospaceMetrics::new())
    }

    fn spacer_item(width: i32, height: i32) -> Item {
        Item::new(ItemBody::Spacer(Spacer::new(width, height).unwrap()))
    }

    fn button_item(label: &str) -> Item {
        let mut item = Item::new(ItemBody::String(StringItem::new(label)));
        item.add_command(Command::new(
            "Go",
            crate::widget::command::CommandKind::Item,
            1,
        ))
        .unwrap();
        item
    }

    /// A form with a 100x100 viewport, shown.
    fn shown_form() -> Form {
        let mut form = Form::new("test", metrics());
        form.set_viewport(100, 100);
        form.show();
        form
    }

    #[test]
    fn test_detached_item_can_move_between_forms() {
        let mut form = shown_form();
        let item = spacer_item(10, 10);
        form.append(item).unwrap();

        let mut other = Form::new("other", metrics());
        let taken = form.delete(0).unwrap();
        other.append(taken).unwrap();
    }

    #[test]
    fn test_item_cannot_join_two_forms() {
        let mut form = shown_form();
        let mut item = spacer_item(10, 10);
        item.mark_owned().unwrap();
        assert!(matches!(form.append(item), Err(UiError::ItemAlreadyOwned)));
        assert_eq!(form.len(), 0);
    }

    #[test]
    fn test_scroll_clamps_when_content_shrinks() {
        // Content 90px tall in a 100px viewport with a stale 40px scroll
        // clamps back to zero.
        let mut form = shown_form();
        for _ in 0..3 {
            form.append(spacer_item(100, 30)).unwrap();
        }
        form.pump(Instant::now() + INVALIDATE_PERIOD);
        assert_eq!(form.content_size().height, 90);

        form.viewable.origin.y = 40;
        form.schedule(LayoutMode::Full);
        form.invalidate();
        form.pump(Instant::now() + 2 * INVALIDATE_PERIOD);
        assert_eq!(form.scroll_top(), 0);
    }

    #[test]
    fn test_traverse_moves_between_items() {
        let mut form = shown_form();
        form.append(button_item("a")).unwrap();
        form.append(button_item("b")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        assert_eq!(form.focused_index(), Some(0));
        form.traverse(Direction::Down);
        assert_eq!(form.focused_index(), Some(1));
        form.traverse(Direction::Up);
        assert_eq!(form.focused_index(), Some(0));
    }

    #[test]
    fn test_traversal_skips_non_interactive() {
        let mut form = shown_form();
        form.append(button_item("a")).unwrap();
        form.append(spacer_item(100, 10)).unwrap();
        form.append(button_item("b")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        form.traverse(Direction::Down);
        assert_eq!(form.focused_index(), Some(2));
    }

    #[test]
    fn test_cyclic_wrap_down_resets_scroll() {
        // Multi-page form; traversing down past the last interactive item
        // wraps to the first and resets the scroll to zero.
        let mut form = shown_form();
        form.append(button_item("top")).unwrap();
        for _ in 0..5 {
            form.append(spacer_item(100, 60)).unwrap();
        }
        form.append(button_item("bottom")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);
        assert!(form.content_size().height > 100);

        form.set_current_item(6).unwrap();
        assert!(form.scroll_top() > 0);

        form.traverse(Direction::Down);
        assert_eq!(form.scroll_top(), 0);
        assert_eq!(form.focused_index(), Some(0));
    }

    #[test]
    fn test_cyclic_wrap_up_goes_to_end() {
        let mut form = shown_form();
        form.append(button_item("top")).unwrap();
        for _ in 0..5 {
            form.append(spacer_item(100, 60)).unwrap();
        }
        form.append(button_item("bottom")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        assert_eq!(form.focused_index(), Some(0));
        form.traverse(Direction::Up);
        assert_eq!(form.focused_index(), Some(6));
        assert_eq!(form.scroll_top(), form.content_size().height - 100);
    }

    #[test]
    fn test_no_wrap_on_single_page() {
        let mut form = shown_form();
        form.append(button_item("only")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        form.traverse(Direction::Down);
        assert_eq!(form.focused_index(), Some(0));
        assert_eq!(form.scroll_top(), 0);
    }

    #[test]
    fn test_page_flip_advances_with_overlap() {
        let mut form = shown_form();
        form.append(button_item("top")).unwrap();
        // Non-interactive filler spanning several pages.
        for _ in 0..8 {
            form.append(spacer_item(100, 50)).unwrap();
        }
        form.append(button_item("bottom")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        assert_eq!(form.focused_index(), Some(0));
        form.traverse(Direction::Down);
        // A raw flip would land at 98 and cut the 62..112 filler row; the
        // straddling item is aligned flush with the new page top instead.
        assert_eq!(form.scroll_top(), 62);
    }

    #[test]
    fn test_page_flip_keeps_overlap_without_straddler() {
        let mut form = shown_form();
        form.append(button_item("top")).unwrap(); // 0..12
        form.append(spacer_item(100, 86)).unwrap(); // 12..98
        form.append(spacer_item(100, 200)).unwrap(); // 98..298
        form.append(button_item("bottom")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        form.traverse(Direction::Down);
        // The page boundary at 98 coincides with a row edge: the flip
        // advances by a full page minus the overlap.
        assert_eq!(form.scroll_top(), 100 - PIXELS_LEFT_ON_PAGE);
    }

    #[test]
    fn test_tall_item_keeps_top_edge_visible() {
        let mut form = shown_form();
        form.append(button_item("a")).unwrap();
        form.append(spacer_item(100, 300)).unwrap();
        form.append(button_item("b")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        let tall_top = form.entries[1].peer.bounds.top();
        form.set_current_item(2).unwrap();
        // Focus something below, then force the tall item's bounds into
        // view: its top edge wins.
        let bounds = form.entries[1].peer.bounds;
        form.scroll_for_bounds(bounds);
        assert_eq!(form.scroll_top(), tall_top);
    }

    #[test]
    fn test_delete_resolves_focus_by_identity() {
        let mut form = shown_form();
        form.append(button_item("a")).unwrap();
        form.append(button_item("b")).unwrap();
        form.append(button_item("c")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        form.set_current_item(2).unwrap();
        form.delete(0).unwrap();
        // Focus follows the item, not the index.
        assert_eq!(form.focused_index(), Some(1));

        form.delete(1).unwrap();
        assert_eq!(form.focused_index(), None);
    }

    #[test]
    fn test_insert_before_focus_shifts_index() {
        let mut form = shown_form();
        form.append(button_item("a")).unwrap();
        form.append(button_item("b")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);
        form.set_current_item(1).unwrap();

        form.insert(0, spacer_item(10, 10)).unwrap();
        assert_eq!(form.focused_index(), Some(2));
    }

    #[test]
    fn test_select_key_notifies_item_state() {
        let mut form = shown_form();
        let choice = ChoiceGroup::with_elements(ChoiceKind::Exclusive, ["x", "y"]);
        form.append(Item::new(ItemBody::Choice(choice))).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        let hits = Arc::new(AtomicUsize::new(0));
        let recorded = Arc::clone(&hits);
        form.set_item_state_listener(Some(Box::new(move |_form, _index| {
            recorded.fetch_add(1, Ordering::SeqCst);
        })));

        // Move the highlight to the second element, then select it.
        form.traverse(Direction::Down);
        form.key_event(KeyEvent::pressed(crate::widget::events::KeyCode::Select));
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            form.item(0).unwrap().as_choice().unwrap().selected_index(),
            Some(1)
        );
    }

    #[test]
    fn test_listener_may_mutate_form_reentrantly() {
        let mut form = shown_form();
        let choice = ChoiceGroup::with_elements(ChoiceKind::Multiple, ["x"]);
        form.append(Item::new(ItemBody::Choice(choice))).unwrap();
        form.append(button_item("victim")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        form.set_item_state_listener(Some(Box::new(|form, _index| {
            // Application code deleting an item mid-callback.
            form.delete(1).unwrap();
        })));

        form.set_current_item(0).unwrap();
        form.key_event(KeyEvent::pressed(crate::widget::events::KeyCode::Select));
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        assert_eq!(form.len(), 1);
        // Reconciliation kept the focus on the surviving item.
        assert_eq!(form.focused_index(), Some(0));
    }

    #[test]
    fn test_listener_panic_is_contained() {
        let mut form = shown_form();
        let choice = ChoiceGroup::with_elements(ChoiceKind::Multiple, ["x"]);
        form.append(Item::new(ItemBody::Choice(choice))).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        form.set_item_state_listener(Some(Box::new(|_form, _index| {
            panic!("listener bug");
        })));

        form.set_current_item(0).unwrap();
        form.key_event(KeyEvent::pressed(crate::widget::events::KeyCode::Select));
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        // Still alive, and the listener stayed installed.
        assert!(form.item_state_listener.is_some());
        form.traverse(Direction::Down);
    }

    #[test]
    fn test_select_activates_default_command() {
        let mut form = shown_form();
        let mut item = Item::new(ItemBody::String(StringItem::new("open me")));
        item.set_default_command(Some(Command::new(
            "Open",
            crate::widget::command::CommandKind::Item,
            1,
        )))
        .unwrap();
        form.append(item).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        let hits = Arc::new(AtomicUsize::new(0));
        let recorded = Arc::clone(&hits);
        form.set_command_listener(Some(Box::new(move |_form, _index, command| {
            assert_eq!(command.label(), "Open");
            recorded.fetch_add(1, Ordering::SeqCst);
        })));

        form.set_current_item(0).unwrap();
        form.key_event(KeyEvent::pressed(crate::widget::events::KeyCode::Select));
        form.pump(Instant::now() + INVALIDATE_PERIOD);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pointer_press_focuses_hit_item() {
        let mut form = shown_form();
        form.append(button_item("a")).unwrap();
        form.append(button_item("b")).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);

        let second_top = form.entries[1].peer.bounds.top();
        form.pointer_event(PointerEvent {
            phase: PointerPhase::Pressed,
            position: Point::new(5, second_top + 1),
        });
        assert_eq!(form.focused_index(), Some(1));
    }

    #[test]
    fn test_invalidate_gate_coalesces() {
        let t0 = Instant::now();
        let mut gate = InvalidateGate::default();

        assert_eq!(gate.request(t0), GateDecision::RunNow);
        gate.mark_ran(t0);

        // Inside the window: one deferred run, further requests coalesce.
        let t1 = t0 + Duration::from_millis(10);
        assert!(matches!(gate.request(t1), GateDecision::Defer(_)));
        assert_eq!(gate.request(t1), GateDecision::Pending);

        // After the window closed, requests run immediately again.
        gate.mark_ran(t0 + INVALIDATE_PERIOD);
        let t2 = t0 + INVALIDATE_PERIOD + INVALIDATE_PERIOD;
        assert_eq!(gate.request(t2), GateDecision::RunNow);
    }

    #[test]
    fn test_deferred_invalidate_fires_via_pump() {
        let mut form = shown_form();
        form.append(spacer_item(100, 10)).unwrap();
        form.pump(Instant::now() + INVALIDATE_PERIOD);
        let before = form.content_size().height;

        // Two rapid mutations: the second lands inside the gate window.
        if let ItemBody::Spacer(s) = form.item_mut(0).unwrap().body_mut() {
            s.set_minimum_size(100, 50).unwrap();
        }
        form.invalidate();
        form.invalidate();

        // The deferred window closes by the next pump.
        form.pump(Instant::now() + 2 * INVALIDATE_PERIOD);
        assert_ne!(form.content_size().height, before);
        assert_eq!(form.content_size().height, 50 + 1);
    }

    #[test]
    fn test_hidden_form_defers_layout_to_show() {
        let mut form = Form::new("test", metrics());
        form.set_viewport(100, 100);
        form.append(spacer_item(100, 30)).unwrap();
        form.invalidate();
        // Nothing laid out while hidden.
        assert_eq!(form.content_size(), Size::ZERO);

        form.show();
        assert_eq!(form.content_size().height, 31); // single-item pad
    }
}
