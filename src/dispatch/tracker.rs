//! In-flight request bookkeeping.
//!
//! # Responsibilities
//! - Track fingerprints of call groups that have been accepted but not settled
//! - Answer membership queries for duplicate rejection
//!
//! # Design Decisions
//! - Identity only: no timing, no retry awareness, no HTTP semantics
//! - Backed by a concurrent map; `try_register` is a single check-and-insert
//!   so parallel identical calls cannot both be accepted
//! - Entries carry a generation id; a guard releases only its own entry
//! - Cloning a tracker shares the underlying map

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::dispatch::request::{Fingerprint, RequestDescriptor};

/// Set of in-flight request fingerprints.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    inner: Arc<TrackerInner>,
}

/// Each registration carries a generation id, so a guard only ever removes
/// the entry it created.
#[derive(Debug, Default)]
struct TrackerInner {
    in_flight: DashMap<Fingerprint, u64>,
    next_generation: AtomicU64,
}

impl TrackerInner {
    fn generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the descriptor as in flight.
    pub fn add(&self, descriptor: &RequestDescriptor) {
        let generation = self.inner.generation();
        self.inner.in_flight.insert(descriptor.fingerprint(), generation);
    }

    /// Forget the descriptor. Removing an absent entry is a no-op.
    pub fn remove(&self, descriptor: &RequestDescriptor) {
        self.inner.in_flight.remove(&descriptor.fingerprint());
    }

    pub fn contains(&self, descriptor: &RequestDescriptor) -> bool {
        self.inner.in_flight.contains_key(&descriptor.fingerprint())
    }

    /// Register the descriptor unless an identical call is already in flight.
    ///
    /// The entry lives until the returned guard is dropped.
    pub fn try_register(&self, descriptor: &RequestDescriptor) -> Option<InFlightGuard> {
        let fingerprint = descriptor.fingerprint();
        let generation = match self.inner.in_flight.entry(fingerprint.clone()) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(slot) => {
                let generation = self.inner.generation();
                slot.insert(generation);
                generation
            }
        };
        tracing::trace!(fingerprint = %fingerprint, generation, "Registered in-flight request");
        Some(InFlightGuard {
            tracker: self.clone(),
            fingerprint,
            generation,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.in_flight.is_empty()
    }
}

/// A RAII guard that keeps a fingerprint registered.
#[derive(Debug)]
pub struct InFlightGuard {
    tracker: RequestTracker,
    fingerprint: Fingerprint,
    generation: u64,
}

impl InFlightGuard {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let generation = self.generation;
        let removed = self
            .tracker
            .inner
            .in_flight
            .remove_if(&self.fingerprint, |_, current| *current == generation);
        tracing::trace!(
            fingerprint = %self.fingerprint,
            released = removed.is_some(),
            "Released in-flight request"
        );
    }
}
