// src/input/debounce.rs

//! Suppression of pointer reports that a backend delivers twice through
//! overlapping event classes.

use super::event::{DeviceId, PointerKindTag};
use log::trace;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebounceKey {
    pub serial: u64,
    pub kind: PointerKindTag,
    pub source: DeviceId,
}

/// Bounded ring of recently seen report keys with their last-seen time.
///
/// Entries older than the window are evicted from the front on every insert,
/// and the ring never holds more than `capacity` entries.
#[derive(Debug)]
pub struct Debouncer {
    window_ms: u64,
    capacity: usize,
    recent: VecDeque<(DebounceKey, u64)>,
}

impl Debouncer {
    pub fn new(window_ms: u64, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window_ms,
            capacity,
            recent: VecDeque::with_capacity(capacity),
        }
    }

    /// Records `key` as seen at `time_ms`. Returns `true` if the same key was
    /// already seen within the window, in which case the report is a duplicate.
    pub fn check_and_record(&mut self, key: DebounceKey, time_ms: u64) -> bool {
        self.evict_stale(time_ms);

        let duplicate = match self.recent.iter().position(|(k, _)| *k == key) {
            Some(index) => {
                self.recent.remove(index);
                true
            }
            None => false,
        };

        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back((key, time_ms));

        if duplicate {
            trace!("Debouncer: dropping duplicate report {:?} at {}ms", key, time_ms);
        }
        duplicate
    }

    fn evict_stale(&mut self, now_ms: u64) {
        while let Some(&(_, seen)) = self.recent.front() {
            if now_ms.saturating_sub(seen) > self.window_ms {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}
