//! The row layout engine.
//!
//! Items are arranged left-to-right into rows inside a fixed-width
//! viewport. A row breaks when the previous item demands a newline after
//! itself, the next item demands one before itself, the next item's width
//! no longer fits, or the next item's horizontal alignment differs from
//! the row's established alignment.
//!
//! Two passes inflate a finished row:
//!
//! 1. Shrinkable items grow back toward their preferred width using an
//!    integer baseline-proportion split (see [`inflate_shrinkables`]).
//!    The integer division can leave unallocated remainder space; it is
//!    deliberately left as slack.
//! 2. Leftover width is split evenly (integer division) among expandable
//!    items, the remainder again staying as trailing slack.
//!
//! [`LayoutMode::Update`] recomputes only what the staleness flags demand:
//! a stale X or width re-lays the row block containing the item until a
//! clean row boundary is found; a stale height re-measures in place and
//! ripples the delta down; a stale Y rides the same ripple with no
//! re-measurement.

use trellis_core::geometry::Size;

use crate::render::TextMetrics;
use crate::widget::item::{Entry, HAlign, Item, ItemLayout, StaleBounds, VAlign};

/// How much of the layout to recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Recompute every item from scratch.
    Full,
    /// Recompute only items with stale bounds.
    Update,
}

/// Extra pixel added to the row height and y origin when a screen holds
/// exactly one item. A compatibility quirk inherited from the original
/// renderer; do not "fix" without checking downstream pixel comparisons.
pub(crate) const SINGLE_ITEM_ROW_PAD: i32 = 1;

/// Lay out `entries` into `viewport` and return the content size.
///
/// Peer bounds, row bookkeeping and staleness flags are updated in place.
/// A screen with no items collapses to zero content.
pub(crate) fn run(
    mode: LayoutMode,
    entries: &mut [Entry],
    viewport: Size,
    metrics: &dyn TextMetrics,
) -> Size {
    if entries.is_empty() {
        return Size::ZERO;
    }
    if viewport.width <= 0 {
        tracing::warn!(
            target: trellis_core::logging::targets::LAYOUT,
            %viewport,
            "layout requested with a degenerate viewport"
        );
    }

    refresh_sizings(mode, entries, viewport, metrics);

    let content_height = match mode {
        LayoutMode::Full => {
            // Everything is recomputed; no boundary is stable.
            for entry in entries.iter_mut() {
                entry.peer.stale = StaleBounds::ALL;
            }
            let old = snapshot(entries);
            let (_, y_after) = layout_block(entries, 0, entries.len(), 0, viewport, metrics, &old);
            y_after
        }
        LayoutMode::Update => update_pass(entries, viewport, metrics),
    };

    Size::new(viewport.width, content_height)
}

/// Capture measured sizes for every item the pass will need.
fn refresh_sizings(
    mode: LayoutMode,
    entries: &mut [Entry],
    viewport: Size,
    metrics: &dyn TextMetrics,
) {
    let limit = viewport.width.max(1);
    for entry in entries.iter_mut() {
        let must = match mode {
            LayoutMode::Full => true,
            LayoutMode::Update => entry
                .peer
                .stale
                .intersects(StaleBounds::WIDTH | StaleBounds::HEIGHT),
        };
        if must {
            entry.peer.sizing = entry.item.sizing(metrics, limit);
        }
    }
}

/// Width a row grants an item before inflation.
fn assigned_width(entry: &Entry, viewport_width: i32) -> i32 {
    let layout = entry.item.layout();
    let sizing = entry.peer.sizing;
    let wanted = if layout.contains(ItemLayout::SHRINK) {
        sizing.min.width
    } else {
        // Locked widths are already folded into the preferred size.
        sizing.pref.width
    };
    // Horizontal scrolling is not available; nothing exceeds the viewport.
    wanted.clamp(0, viewport_width.max(0))
}

/// Natural height of an item at an assigned width.
fn natural_height(item: &mut Item, metrics: &dyn TextMetrics, width: i32) -> i32 {
    item.sizing(metrics, width.max(1)).pref.height
}

/// Pre-update snapshot of row bookkeeping, used to find stable boundaries.
struct OldRows {
    starts: Vec<bool>,
    tops: Vec<i32>,
    stale: Vec<StaleBounds>,
}

fn snapshot(entries: &[Entry]) -> OldRows {
    OldRows {
        starts: entries.iter().map(|e| e.peer.new_line).collect(),
        tops: entries.iter().map(|e| e.peer.row_top).collect(),
        stale: entries.iter().map(|e| e.peer.stale).collect(),
    }
}

/// Collect the members of the row starting at `start`.
///
/// Returns the exclusive end index, the granted widths, the established
/// row alignment and the leftover width.
fn collect_row(
    entries: &[Entry],
    start: usize,
    end_limit: usize,
    viewport_width: i32,
) -> (usize, Vec<i32>, HAlign, i32) {
    let mut widths = Vec::new();
    let mut remaining = viewport_width.max(0);
    let mut row_align = None;
    let mut i = start;

    while i < end_limit {
        if i > start {
            if entries[i - 1].item.layout().contains(ItemLayout::NEWLINE_AFTER) {
                break;
            }
            if entries[i].item.layout().contains(ItemLayout::NEWLINE_BEFORE) {
                break;
            }
        }

        let width = assigned_width(&entries[i], viewport_width);
        if i > start && width > remaining {
            break;
        }

        let align = entries[i].item.layout().h_align();
        match row_align {
            None => row_align = Some(align),
            Some(established) if established != align => break,
            _ => {}
        }

        widths.push(width);
        remaining -= width;
        i += 1;
    }

    (i, widths, row_align.unwrap_or(HAlign::Left), remaining)
}

/// First inflation pass: grow shrinkable members back toward their
/// preferred width by integer baseline proportions.
///
/// The smallest positive (preferred - minimum) gap among the shrinkables
/// is the baseline; each shrinkable's share is proportional to the integer
/// multiple of that baseline its own gap represents. Division truncates
/// at both steps, so a few pixels may remain unallocated: that slack is
/// intentional and preserved.
fn inflate_shrinkables(
    entries: &[Entry],
    start: usize,
    widths: &mut [i32],
    mut remaining: i32,
) -> i32 {
    if remaining <= 0 {
        return remaining;
    }

    let gap = |k: usize| -> i32 {
        let entry = &entries[start + k];
        if !entry.item.layout().contains(ItemLayout::SHRINK) {
            return 0;
        }
        (entry.peer.sizing.pref.width - widths[k]).max(0)
    };

    let gaps: Vec<i32> = (0..widths.len()).map(gap).collect();

    let baseline = gaps
        .iter()
        .copied()
        .filter(|&g| g > 0)
        .min()
        .unwrap_or(0);
    if baseline == 0 {
        return remaining;
    }

    let units: Vec<i32> = gaps.iter().map(|&g| g / baseline).collect();
    let total_units: i32 = units.iter().sum();
    if total_units == 0 {
        return remaining;
    }

    let per_unit = remaining / total_units;
    for (k, &unit) in units.iter().enumerate() {
        if unit == 0 {
            continue;
        }
        let grant = (per_unit * unit).min(gaps[k]);
        widths[k] += grant;
        remaining -= grant;
    }

    remaining
}

/// Second inflation pass: split leftover width evenly among expandable
/// members; the integer-division remainder stays as trailing slack.
fn inflate_expandables(
    entries: &[Entry],
    start: usize,
    widths: &mut [i32],
    mut remaining: i32,
) -> i32 {
    if remaining <= 0 {
        return remaining;
    }
    let expandable: Vec<usize> = (0..widths.len())
        .filter(|&k| entries[start + k].item.layout().contains(ItemLayout::EXPAND))
        .collect();
    if expandable.is_empty() {
        return remaining;
    }

    let share = remaining / expandable.len() as i32;
    for &k in &expandable {
        widths[k] += share;
        remaining -= share;
    }
    remaining
}

/// Position one finished row. Returns the y advance (row height plus any
/// single-item pad).
#[allow(clippy::too_many_arguments)]
fn place_row(
    entries: &mut [Entry],
    start: usize,
    widths: &[i32],
    row_align: HAlign,
    row_top: i32,
    viewport: Size,
    metrics: &dyn TextMetrics,
    pad: i32,
) -> i32 {
    let count = widths.len();

    // Natural heights at the granted widths decide the row height.
    let mut heights = Vec::with_capacity(count);
    for (k, &width) in widths.iter().enumerate() {
        heights.push(natural_height(&mut entries[start + k].item, metrics, width));
    }
    let row_height: i32 = heights.iter().copied().max().unwrap_or(0);

    let used: i32 = widths.iter().sum();
    let slack = (viewport.width - used).max(0);
    let mut x = match row_align {
        HAlign::Left => 0,
        HAlign::Center => slack / 2,
        HAlign::Right => slack,
    };

    let top = row_top + pad;
    for (k, &width) in widths.iter().enumerate() {
        let entry = &mut entries[start + k];
        let layout = entry.item.layout();

        let natural = heights[k];
        let height = if layout.contains(ItemLayout::VERSION_2) {
            if layout.contains(ItemLayout::VEXPAND) {
                row_height
            } else if layout.contains(ItemLayout::VSHRINK) {
                natural
                    .min(viewport.height.max(1))
                    .max(entry.peer.sizing.min.height)
            } else {
                natural
            }
        } else {
            natural
        };

        let v_off = match layout.v_align() {
            VAlign::Top => 0,
            VAlign::Center => (row_height - height) / 2,
            VAlign::Bottom => row_height - height,
        };

        let peer = &mut entry.peer;
        peer.bounds = trellis_core::geometry::Rect::new(x, top + v_off, width, height);
        peer.row_height = row_height + pad;
        peer.row_top = row_top;
        peer.new_line = k == 0;
        peer.visible = true;
        peer.stale = StaleBounds::empty();

        x += width;
    }

    pad + row_height
}

/// Lay out rows from `start` (a row boundary) at `top` until either
/// `end_limit` or a stable old row boundary is reached.
///
/// A boundary is stable when the next item started a row before this
/// pass, needs no re-measurement itself, and every input that decides row
/// membership from there on is unchanged; rows beyond it only need the
/// vertical ripple the caller applies.
fn layout_block(
    entries: &mut [Entry],
    start: usize,
    end_limit: usize,
    top: i32,
    viewport: Size,
    metrics: &dyn TextMetrics,
    old: &OldRows,
) -> (usize, i32) {
    let pad = if entries.len() == 1 {
        SINGLE_ITEM_ROW_PAD
    } else {
        0
    };

    let mut i = start;
    let mut y = top;
    while i < end_limit {
        if i > start
            && old.starts[i]
            && !old.stale[i]
                .intersects(StaleBounds::X | StaleBounds::WIDTH | StaleBounds::HEIGHT)
        {
            return (i, y);
        }

        let (end, mut widths, row_align, remaining) =
            collect_row(entries, i, end_limit, viewport.width);
        debug_assert!(end > i, "row collection must always make progress");

        let remaining = inflate_shrinkables(entries, i, &mut widths, remaining);
        inflate_expandables(entries, i, &mut widths, remaining);

        y += place_row(entries, i, &widths, row_align, y, viewport, metrics, pad);
        i = end;
    }

    (i, y)
}

/// The incremental pass: scan items in order, doing the minimum work each
/// staleness pattern allows, and return the resulting content height.
fn update_pass(entries: &mut [Entry], viewport: Size, metrics: &dyn TextMetrics) -> i32 {
    let n = entries.len();
    let mut i = 0;
    let mut row_anchor = 0;
    let mut anchor_top = 0;
    let mut y_delta = 0;

    while i < n {
        if entries[i].peer.new_line {
            // Row-anchor bookkeeping: a later re-layout must start at the
            // row boundary, not at this item.
            row_anchor = i;
            anchor_top = entries[i].peer.row_top + y_delta;
        }

        let stale = entries[i].peer.stale;

        if stale.intersects(StaleBounds::X | StaleBounds::WIDTH) {
            let old = snapshot(entries);
            let (next, y_after) =
                layout_block(entries, row_anchor, n, anchor_top, viewport, metrics, &old);
            if next < n {
                y_delta = y_after - old.tops[next];
            }
            i = next;
            continue;
        }

        if stale.contains(StaleBounds::HEIGHT) {
            // Re-measure in place; X and width stay untouched, the height
            // delta ripples down through every later item.
            let width = entries[i].peer.bounds.width();
            let new_height = natural_height(&mut entries[i].item, metrics, width);
            let peer = &mut entries[i].peer;
            let delta = new_height - peer.bounds.height();
            peer.bounds.origin.y += y_delta;
            peer.row_top += y_delta;
            peer.bounds.size.height = new_height;
            peer.row_height += delta;
            peer.stale = StaleBounds::empty();
            y_delta += delta;
            i += 1;
            continue;
        }

        // Clean, or Y-only: ride the ripple.
        let peer = &mut entries[i].peer;
        peer.bounds.origin.y += y_delta;
        peer.row_top += y_delta;
        peer.stale = StaleBounds::empty();
        i += 1;
    }

    entries
        .iter()
        .map(|e| e.peer.row_top + e.peer.row_height)
        .max()
        .unwrap_or(0)
}
