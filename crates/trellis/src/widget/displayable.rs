//! Shared screen base: visibility state machine and viewport plumbing.
//!
//! Every screen owns a [`Displayable`]: a small state machine over
//! HIDDEN -> SHOWN -> FROZEN plus the viewport size and the forwarding
//! rules for paint/layout requests. Requests made while the screen is not
//! SHOWN are recorded and replayed on the next show, and a viewport size
//! change that arrives while not SHOWN is delivered exactly once - with
//! the most recent size - when the screen becomes SHOWN again.
//!
//! The [`DisplayHost`] trait is the narrow outbound interface to the
//! platform's display server; [`QueuedHost`] is the standard
//! implementation, posting plain requests into a [`PostQueue`] that the
//! event pump drains. Timer threads use the same path, which is what
//! keeps them off the widget state entirely.

use std::sync::Arc;

use trellis_core::geometry::{Rect, Size};
use trellis_core::queue::PostQueue;

/// Visibility of a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    /// Not on the display. The initial state.
    Hidden,
    /// On the display; paint and layout requests are forwarded.
    Shown,
    /// Obscured by a modal system layer; requests are recorded.
    Frozen,
}

/// A request posted toward the platform display server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    /// Repaint the given region of the current screen.
    Paint(Rect),
    /// Re-run layout for the current screen.
    Layout,
}

/// Outbound interface to the display server.
pub trait DisplayHost: Send + Sync {
    /// Ask the platform to repaint a region.
    fn request_paint(&self, region: Rect);

    /// Ask the platform to schedule a layout pass.
    fn request_layout(&self);
}

/// A [`DisplayHost`] that queues requests for the event pump.
#[derive(Debug, Default)]
pub struct QueuedHost {
    queue: PostQueue<HostRequest>,
}

impl QueuedHost {
    /// Create a host with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// The queue the pump drains.
    pub fn queue(&self) -> &PostQueue<HostRequest> {
        &self.queue
    }
}

impl DisplayHost for QueuedHost {
    fn request_paint(&self, region: Rect) {
        self.queue.post(HostRequest::Paint(region));
    }

    fn request_layout(&self) {
        self.queue.post(HostRequest::Layout);
    }
}

/// Effects the owner must apply after a screen became SHOWN.
#[derive(Debug, Default)]
pub struct ShowEffects {
    /// Deliver a size-changed notification with this size.
    pub size_changed: Option<Size>,
    /// Replay a repaint recorded while not shown.
    pub repaint: Option<Rect>,
    /// Replay a layout request recorded while not shown.
    pub relayout: bool,
}

/// Base state shared by all screens.
pub struct Displayable {
    title: Option<String>,
    state: VisibilityState,
    viewport: Size,
    /// Region dirtied while not SHOWN, replayed on the next show.
    pending_paint: Option<Rect>,
    /// Layout requested while not SHOWN.
    pending_layout: bool,
    /// Size change awaiting delivery; always the most recent size.
    pending_size: Option<Size>,
    host: Option<Arc<dyn DisplayHost>>,
}

impl Displayable {
    /// Create a hidden screen base.
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            state: VisibilityState::Hidden,
            viewport: Size::ZERO,
            pending_paint: None,
            pending_layout: false,
            pending_size: None,
            host: None,
        }
    }

    /// The screen title.
    #[inline]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Replace the screen title.
    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
        let viewport = self.viewport;
        self.request_paint(Rect::new(0, 0, viewport.width, viewport.height));
    }

    /// Current visibility.
    #[inline]
    pub fn state(&self) -> VisibilityState {
        self.state
    }

    /// Whether the screen is on the display.
    #[inline]
    pub fn is_shown(&self) -> bool {
        self.state == VisibilityState::Shown
    }

    /// The viewport size available to content.
    #[inline]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Connect the display server interface.
    pub fn attach_host(&mut self, host: Arc<dyn DisplayHost>) {
        self.host = Some(host);
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// The display took this screen. Returns the effects to replay.
    pub fn notify_shown(&mut self) -> ShowEffects {
        self.state = VisibilityState::Shown;
        ShowEffects {
            size_changed: self.pending_size.take(),
            repaint: self.pending_paint.take(),
            relayout: std::mem::take(&mut self.pending_layout),
        }
    }

    /// A modal system layer obscured the screen.
    pub fn notify_frozen(&mut self) {
        if self.state != VisibilityState::Shown {
            tracing::warn!(
                target: trellis_core::logging::targets::FORM,
                state = ?self.state,
                "freeze notification outside SHOWN; ignoring"
            );
            return;
        }
        self.state = VisibilityState::Frozen;
    }

    /// The display dropped this screen.
    pub fn notify_hidden(&mut self) {
        self.state = VisibilityState::Hidden;
    }

    /// The platform resized the viewport.
    ///
    /// Returns `true` when the owner should notify application code right
    /// away; otherwise the notification is deferred until the next show.
    pub fn set_viewport(&mut self, size: Size) -> bool {
        self.viewport = size;
        if self.is_shown() {
            true
        } else {
            self.pending_size = Some(size);
            false
        }
    }

    // =========================================================================
    // Request forwarding
    // =========================================================================

    /// Forward or record a repaint request.
    pub fn request_paint(&mut self, region: Rect) {
        if self.is_shown() {
            if let Some(host) = &self.host {
                host.request_paint(region);
                return;
            }
        }
        self.pending_paint = Some(match self.pending_paint {
            Some(prior) => prior.union(&region),
            None => region,
        });
    }

    /// Forward or record a layout request.
    pub fn request_layout(&mut self) {
        if self.is_shown() {
            if let Some(host) = &self.host {
                host.request_layout();
                return;
            }
        }
        self.pending_layout = true;
    }
}

impl std::fmt::Debug for Displayable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Displayable")
            .field("title", &self.title)
            .field("state", &self.state)
            .field("viewport", &self.viewport)
            .field("pending_paint", &self.pending_paint)
            .field("pending_layout", &self.pending_layout)
            .field("has_host", &self.host.is_some())
            .finish()
    }
}
