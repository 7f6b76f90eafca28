//! Domain model for the people collection.
//!
//! # Invariants
//! - Every stored document is identified by a stable `PersonId`.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod person;
