//! Busy indicator signaling.
//!
//! # Responsibilities
//! - Tell the host UI that a call group started and finished
//!
//! # Design Decisions
//! - Fire-and-forget: no return values, no errors
//! - Implementations must tolerate unpaired `begin`/`end` calls

use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives start/stop signals for call groups.
pub trait BusyIndicator: Send + Sync {
    fn begin(&self, message: &str);
    fn end(&self);
}

/// Ignores every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBusyIndicator;

impl BusyIndicator for NoopBusyIndicator {
    fn begin(&self, _message: &str) {}
    fn end(&self) {}
}

/// Logs busy transitions and counts outstanding call groups.
#[derive(Debug, Default)]
pub struct TracingBusyIndicator {
    active: AtomicUsize,
}

impl TracingBusyIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call groups begun and not yet ended.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

impl BusyIndicator for TracingBusyIndicator {
    fn begin(&self, message: &str) {
        let active = self.active.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(message, active, "Busy");
    }

    fn end(&self) {
        // Saturating: an unpaired end must not wrap the counter.
        let previous = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        tracing::debug!(active = previous.saturating_sub(1), "Idle");
    }
}
