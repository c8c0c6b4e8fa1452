//! Collaborator ports consumed by the assignment service.
//!
//! # Responsibility
//! - Abstract wall-clock time and id allocation so tests stay deterministic.

use crate::model::assignment::AssignmentId;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Supplies the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

/// Allocates ledger record ids.
pub trait IdGenerator {
    fn next_assignment_id(&self) -> AssignmentId;
}

/// Random v4 UUID allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_assignment_id(&self) -> AssignmentId {
        Uuid::new_v4()
    }
}
