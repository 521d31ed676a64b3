//! Timer system for Trellis.
//!
//! Provides one-shot and repeating timers driven by an external pump.
//! Trellis has no event loop of its own; the embedder calls
//! [`TimerManager::poll`] from its dispatch loop (or a timer thread) and
//! acts on the expired timer ids. This is how deferred layout requests,
//! key-repeat detection and scroll animation ticks are scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, TimerError};

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// The type of timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires once after the specified duration.
    OneShot,
    /// Fires repeatedly at the specified interval.
    Repeating,
}

/// Internal timer data.
#[derive(Debug)]
struct TimerData {
    /// When this timer should next fire.
    next_fire: Instant,
    /// The interval for repeating timers.
    interval: Duration,
    /// The kind of timer.
    kind: TimerKind,
    /// Whether this timer is active.
    active: bool,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other.fire_time.cmp(&self.fire_time)
    }
}

/// Manages all timers for a screen or pump.
///
/// Cancelled timers are removed lazily: the heap entry stays behind and is
/// discarded when it surfaces in [`poll`](Self::poll).
#[derive(Debug, Default)]
pub struct TimerManager {
    /// All registered timers.
    timers: SlotMap<TimerId, TimerData>,
    /// Priority queue of pending timer fires (min-heap by fire time).
    queue: BinaryHeap<TimerQueueEntry>,
}

impl TimerManager {
    /// Create a new timer manager.
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
        }
    }

    /// Start a one-shot timer that fires `duration` after `now`.
    ///
    /// Returns the timer ID that can be used to cancel the timer.
    pub fn start_one_shot(&mut self, now: Instant, duration: Duration) -> TimerId {
        self.start(now, duration, TimerKind::OneShot)
    }

    /// Start a repeating timer that fires every `interval` after `now`.
    ///
    /// The first fire occurs after one full interval.
    pub fn start_repeating(&mut self, now: Instant, interval: Duration) -> TimerId {
        self.start(now, interval, TimerKind::Repeating)
    }

    fn start(&mut self, now: Instant, interval: Duration, kind: TimerKind) -> TimerId {
        let next_fire = now + interval;
        let id = self.timers.insert(TimerData {
            next_fire,
            interval,
            kind,
            active: true,
        });
        self.queue.push(TimerQueueEntry {
            id,
            fire_time: next_fire,
        });
        id
    }

    /// Cancel a timer.
    ///
    /// Returns an error if the timer does not exist or was already removed.
    pub fn cancel(&mut self, id: TimerId) -> Result<()> {
        match self.timers.remove(id) {
            Some(_) => Ok(()),
            None => Err(TimerError::InvalidTimerId.into()),
        }
    }

    /// Check whether a timer is still registered and active.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.get(id).map(|t| t.active).unwrap_or(false)
    }

    /// The next deadline across all active timers, if any.
    ///
    /// The pump may sleep until this instant.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers
            .values()
            .filter(|t| t.active)
            .map(|t| t.next_fire)
            .min()
    }

    /// Collect every timer due at `now`.
    ///
    /// One-shot timers are removed as they fire; repeating timers are
    /// rescheduled one interval ahead. Expired entries for cancelled timers
    /// are silently discarded.
    pub fn poll(&mut self, now: Instant) -> Vec<TimerId> {
        let mut fired = Vec::new();

        while let Some(entry) = self.queue.peek().copied() {
            if entry.fire_time > now {
                break;
            }
            self.queue.pop();

            let Some(timer) = self.timers.get_mut(entry.id) else {
                // Cancelled after this entry was queued.
                continue;
            };
            if !timer.active || timer.next_fire != entry.fire_time {
                // Stale entry from a reschedule.
                continue;
            }

            fired.push(entry.id);
            match timer.kind {
                TimerKind::OneShot => {
                    self.timers.remove(entry.id);
                }
                TimerKind::Repeating => {
                    timer.next_fire = entry.fire_time + timer.interval;
                    let fire_time = timer.next_fire;
                    self.queue.push(TimerQueueEntry {
                        id: entry.id,
                        fire_time,
                    });
                }
            }
        }

        fired
    }

    /// Number of registered timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Check if no timers are registered.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
