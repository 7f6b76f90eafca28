//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define document-collection style data access contracts.
//! - Isolate SQLite JSON query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate documents before persistence.
//! - Lookups that find nothing return `Ok(None)`, not an error.

pub mod person_repo;
