//! Per-resource request sequencing for optimistic updates.
//!
//! Concurrent writes to the same resource can complete in any order. Each
//! write takes a [`RequestToken`] before it is sent; when its response
//! arrives, [`RequestSequencer::complete`] reports whether it is still the
//! latest write for that resource. Responses to superseded writes are
//! dropped instead of overwriting newer local state.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

/// Sequence number of one write. Strictly increasing across the sequencer,
/// and therefore per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// The raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Hands out request tokens per logical resource.
#[derive(Debug)]
pub struct RequestSequencer<K> {
    state: Mutex<SequencerState<K>>,
}

#[derive(Debug)]
struct SequencerState<K> {
    next: u64,
    latest: HashMap<K, RequestToken>,
}

impl<K: Eq + Hash + Clone> Default for RequestSequencer<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> RequestSequencer<K> {
    /// An empty sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SequencerState {
                next: 1,
                latest: HashMap::new(),
            }),
        }
    }

    /// Issue a token for a new write to `key`, superseding any earlier one.
    pub fn issue(&self, key: &K) -> RequestToken {
        let mut state = self.lock();
        let token = RequestToken(state.next);
        state.next += 1;
        state.latest.insert(key.clone(), token);
        token
    }

    /// Whether `token` is the most recent write issued for `key`.
    pub fn is_current(&self, key: &K, token: RequestToken) -> bool {
        self.lock().latest.get(key) == Some(&token)
    }

    /// Record that the write `token` finished. Returns `true` when its result
    /// should be applied, `false` when a newer write superseded it.
    pub fn complete(&self, key: &K, token: RequestToken) -> bool {
        let current = self.is_current(key, token);
        if !current {
            tracing::debug!(token = token.get(), "Discarding superseded response");
        }
        current
    }

    /// Drop tracking for `key`; any in-flight write for it becomes stale.
    pub fn forget(&self, key: &K) {
        self.lock().latest.remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SequencerState<K>> {
        // Every critical section leaves the state consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
