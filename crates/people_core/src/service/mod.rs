//! Core use-case services.
//!
//! # Responsibility
//! - Expose the people use-cases on top of repository contracts.
//! - Keep callers decoupled from storage details.

pub mod person_service;
