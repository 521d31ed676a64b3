//! Thread-safe request queue for timer-thread handoff.
//!
//! Widget and layout state in Trellis has a single owner: the dispatch
//! loop. Timer callbacks (deferred invalidates, scroll animation ticks,
//! key-repeat expiry) run on other threads and must not touch that state
//! directly. Instead they post plain-data requests into a [`PostQueue`],
//! which the dispatch loop drains between operations.
//!
//! This replaces a shared reentrant lock around the widget state: the only
//! synchronized structure is the queue itself.

use std::collections::VecDeque;

use parking_lot::Mutex;
use static_assertions::assert_impl_all;

/// A thread-safe FIFO of posted requests.
///
/// Producers call [`post`](Self::post) from any thread; the single consumer
/// drains with [`take_all`](Self::take_all) or [`pop`](Self::pop).
#[derive(Debug)]
pub struct PostQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

assert_impl_all!(PostQueue<i32>: Send, Sync);

impl<T> PostQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a request to the queue.
    pub fn post(&self, request: T) {
        self.inner.lock().push_back(request);
    }

    /// Remove and return the oldest request, if any.
    pub fn pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Drain every pending request in posting order.
    ///
    /// The queue lock is released before the returned requests are
    /// processed, so handlers are free to post follow-up requests.
    pub fn take_all(&self) -> Vec<T> {
        let mut guard = self.inner.lock();
        guard.drain(..).collect()
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if no requests are pending.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<T> Default for PostQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_post_and_drain_in_order() {
        let queue = PostQueue::new();
        queue.post(1);
        queue.post(2);
        queue.post(3);
        assert_eq!(queue.take_all(), vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop() {
        let queue = PostQueue::new();
        queue.post("a");
        assert_eq!(queue.pop(), Some("a"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_cross_thread_post() {
        let queue = Arc::new(PostQueue::new());
        let producer = Arc::clone(&queue);

        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                producer.post(i);
            }
        });
        handle.join().unwrap();

        let drained = queue.take_all();
        assert_eq!(drained.len(), 100);
        assert_eq!(drained[0], 0);
        assert_eq!(drained[99], 99);
    }
}
