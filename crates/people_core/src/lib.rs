//! Core document-store logic for the people collection.
//! This crate owns the `Person` schema rule and every store operation.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::{DbError, DbLocation};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::person::{
    NewPerson, Person, PersonField, PersonId, PersonProjection, PersonUpdate,
    PersonValidationError,
};
pub use repo::person_repo::{
    parse_person_id, DeleteSummary, PersonFilter, PersonQuery, PersonRepository, RepoError,
    RepoResult, SortDirection, SortKey, SqlitePersonRepository,
};
pub use service::person_service::{PersonService, AGE_TO_SET, FOOD_TO_ADD, QUERY_CHAIN_LIMIT};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
