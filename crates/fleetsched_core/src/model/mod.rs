//! Domain model for task aggregates and their assignment ledger.
//!
//! # Responsibility
//! - Define the canonical task aggregate: work items plus assignment ledger.
//! - Keep scheduling shape invariants close to the types that carry them.
//!
//! # Invariants
//! - Every assignment schedule covers at least one calendar day.
//! - The assignment ledger is the source of truth; work item scheduling
//!   fields are denormalized copies of it.

pub mod assignment;
pub mod task;
