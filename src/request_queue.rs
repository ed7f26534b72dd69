//! FIFO correlation of issued commands to their `%begin … %end`/`%error`
//! responses.
//!
//! tmux guarantees responses are returned in the order commands were
//! written. The queue relies on that guarantee: every command emission
//! pushes exactly one [`PendingCallback`] (a no-op if the caller doesn't
//! need the result), and every completed envelope pops exactly one.

use std::collections::VecDeque;

/// A one-shot callback invoked with the body lines of a completed
/// `%begin … %end`/`%error` envelope. Invoked even on `%error` — the
/// dispatcher logs the error itself and still drains the queue slot.
pub type PendingCallback = Box<dyn FnOnce(&[String]) + Send>;

/// The FIFO itself.
#[derive(Default)]
pub struct RequestQueue {
    queue: VecDeque<PendingCallback>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a callback for a command that was just written to the child's
    /// stdin. Must be called exactly once per emitted command line.
    pub fn push(&mut self, callback: PendingCallback) {
        self.queue.push_back(callback);
    }

    /// Push a callback that discards the result — used for commands the
    /// caller doesn't care to observe but whose response must still be
    /// consumed to keep the FIFO aligned.
    pub fn push_noop(&mut self) {
        self.push(Box::new(|_lines| {}));
    }

    /// Pop and return the next callback, in emission order. Returns
    /// `None` if a `%begin` envelope closed with no matching push — a
    /// protocol invariant violation the caller should log loudly.
    pub fn pop(&mut self) -> Option<PendingCallback> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every pending callback without invoking it. Used when
    /// `new_session` tears down a prior connection.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn fifo_order_preserved() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut q = RequestQueue::new();
        for i in 0..3 {
            let seen = Arc::clone(&seen);
            q.push(Box::new(move |lines: &[String]| {
                seen.lock().unwrap().push((i, lines.to_vec()));
            }));
        }
        assert_eq!(q.len(), 3);
        for i in 0..3 {
            let cb = q.pop().expect("callback present");
            cb(&[format!("line-{i}")]);
        }
        assert!(q.is_empty());
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, 0);
        assert_eq!(seen[1].0, 1);
        assert_eq!(seen[2].0, 2);
    }

    #[test]
    fn pop_on_empty_queue_returns_none() {
        let mut q = RequestQueue::new();
        assert!(q.pop().is_none());
    }

    #[test]
    fn noop_does_not_panic_when_invoked() {
        let mut q = RequestQueue::new();
        q.push_noop();
        let cb = q.pop().unwrap();
        cb(&["ignored".to_string()]);
    }

    #[test]
    fn clear_drops_pending_without_invoking() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let mut q = RequestQueue::new();
        let invoked2 = Arc::clone(&invoked);
        q.push(Box::new(move |_| {
            invoked2.fetch_add(1, Ordering::SeqCst);
        }));
        q.clear();
        assert!(q.is_empty());
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }
}
