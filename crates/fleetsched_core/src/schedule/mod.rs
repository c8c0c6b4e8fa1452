//! Assignment scheduling engine.
//!
//! # Responsibility
//! - Turn scheduling requests into explicit calendar day-sets.
//! - Detect and classify conflicts against the active ledger.
//! - Commit, project and detach ledger records on an in-memory aggregate.
//!
//! # Invariants
//! - Everything here is pure over `&Task` / `&mut Task`; no I/O.
//! - Calendar rendering must reuse `expand::expand` so coverage matches the
//!   engine exactly.
//!
//! Control flow: validate -> expand -> conflict -> ledger -> projector.
//! `removal` is a separate entry point.

pub mod conflict;
pub mod expand;
pub mod ledger;
pub mod projector;
pub mod removal;
pub mod validate;
