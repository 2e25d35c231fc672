//! Bounded capture event buffer
//!
//! Hand-off point between the proxy layer's producer threads and the single
//! UI-side poller. Pushes never block beyond the short critical section, and
//! a full buffer evicts its oldest event instead of growing or failing.

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::models::CaptureEvent;

/// Default number of undrained events retained before eviction
pub const DEFAULT_CAPACITY: usize = 500;

/// Bounded FIFO of capture events, safe to push from any thread.
///
/// Eviction is expected behavior under sustained load, not a fault; it is
/// counted but never logged or surfaced as an error.
pub struct CaptureBuffer {
    items: Mutex<VecDeque<CaptureEvent>>,
    capacity: usize,
    evicted: AtomicU64,
}

impl CaptureBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            evicted: AtomicU64::new(0),
        }
    }

    /// Append an event, evicting the oldest entry once past capacity
    pub fn push(&self, event: CaptureEvent) {
        let mut items = self.items.lock().expect("capture buffer mutex poisoned");
        items.push_back(event);
        while items.len() > self.capacity {
            items.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Atomically remove and return every buffered event, oldest first.
    ///
    /// Events pushed concurrently land either in this drain or the next,
    /// never both.
    pub fn drain_all(&self) -> Vec<CaptureEvent> {
        let drained = {
            let mut items = self.items.lock().expect("capture buffer mutex poisoned");
            mem::take(&mut *items)
        };
        Vec::from(drained)
    }

    /// Remove and return the single oldest event, if any
    pub fn pop_one(&self) -> Option<CaptureEvent> {
        self.items
            .lock()
            .expect("capture buffer mutex poisoned")
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("capture buffer mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events lost to ring eviction since creation
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
