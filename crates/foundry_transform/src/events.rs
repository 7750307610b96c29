//! Hooks observing a transformation run.

use crate::artifact::HardwareArtifact;
use crate::member::TransformedMember;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives progress notifications from [`transform_with_events`].
///
/// Hooks run on the calling thread, in member order, after every member has
/// been transformed. They never run when a cached artifact is returned.
///
/// [`transform_with_events`]: crate::transform_with_events
pub trait TransformationEvents: Send + Sync {
    /// Called once per transformed component.
    fn member_transformed(&self, _member: &TransformedMember) {}

    /// Called once the artifact is complete.
    fn transformation_completed(&self, _artifact: &HardwareArtifact) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl TransformationEvents for NoEvents {}

/// Counts events.
#[derive(Debug, Default)]
pub struct CountingEvents {
    members: AtomicUsize,
    completed: AtomicUsize,
}

impl CountingEvents {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `member_transformed` calls.
    pub fn members(&self) -> usize {
        self.members.load(Ordering::Relaxed)
    }

    /// Number of `transformation_completed` calls.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }
}

impl TransformationEvents for CountingEvents {
    fn member_transformed(&self, _member: &TransformedMember) {
        self.members.fetch_add(1, Ordering::Relaxed);
    }

    fn transformation_completed(&self, _artifact: &HardwareArtifact) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}
