//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the whole-aggregate load/save contract the scheduling service
//!   depends on.
//! - Isolate SQLite and stored-document shape details from scheduling logic.
//!
//! # Invariants
//! - Writes are optimistic compare-and-swap on the aggregate version.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod task_repo;
