use std::collections::VecDeque;
use tracing::trace;

/// Default number of line starts retained for backward navigation.
pub const POSITION_HISTORY_MAX: usize = 100;

/// Bounded stack of display-line starts visited by forward navigation.
///
/// Entries are pushed only by `advance`, so they are strictly increasing from
/// bottom to top. When full, the oldest entry is evicted.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    entries: VecDeque<usize>,
    capacity: usize,
    evicted: u64,
}

impl Default for PositionHistory {
    fn default() -> Self {
        Self::new(POSITION_HISTORY_MAX)
    }
}

impl PositionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries dropped by the capacity bound since construction.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn push(&mut self, position: usize) {
        self.entries.push_back(position);
        if self.entries.len() > self.capacity {
            let _ = self.entries.pop_front();
            self.evicted += 1;
            trace!(target: "state.history", depth = self.entries.len(), "history_trimmed");
        }
    }

    /// Pop the most recent entry strictly below `current`, discarding stale
    /// entries on the way. `None` once the history is exhausted.
    pub fn pop_before(&mut self, current: usize) -> Option<usize> {
        while let Some(top) = self.entries.pop_back() {
            if top < current {
                trace!(target: "state.history", depth = self.entries.len(), top, "history_pop");
                return Some(top);
            }
            trace!(target: "state.history", top, current, "history_stale_discarded");
        }
        None
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            trace!(target: "state.history", depth = self.entries.len(), "history_cleared");
        }
        self.entries.clear();
    }
}
