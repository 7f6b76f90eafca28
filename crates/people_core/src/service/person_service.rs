//! People use-case service.
//!
//! # Responsibility
//! - Provide the ten people use-cases as single entry points.
//! - Parse caller-supplied id text before reaching the repository.
//! - Emit one metadata-only log event per use-case call.
//!
//! # Invariants
//! - Errors are returned to the caller, never swallowed here.
//! - `find_edit_then_save` (load, mutate, replace) and `find_and_update`
//!   (single atomic statement) stay separate use-cases.
//! - Log lines carry counts and ids only, never names or foods.

use crate::model::person::{NewPerson, Person, PersonField, PersonProjection, PersonUpdate};
use crate::repo::person_repo::{
    parse_person_id, DeleteSummary, PersonFilter, PersonQuery, PersonRepository, RepoError,
    RepoResult, SortDirection, SortKey,
};
use log::{error, info};
use std::time::Instant;

/// Food appended by [`PersonService::find_edit_then_save`].
pub const FOOD_TO_ADD: &str = "hamburger";
/// Age assigned by [`PersonService::find_and_update`].
pub const AGE_TO_SET: u32 = 20;
/// Result cap of [`PersonService::query_chain`].
pub const QUERY_CHAIN_LIMIT: u32 = 2;

/// Use-case facade over a people repository.
pub struct PersonService<R: PersonRepository> {
    repo: R,
}

impl<R: PersonRepository> PersonService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Borrows the underlying repository for lower-level queries.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validates and stores one person, returning it with its assigned id.
    pub fn create_and_save_person(&self, person: &NewPerson) -> RepoResult<Person> {
        let started_at = Instant::now();
        let result = self.repo.insert_person(person);
        finish("person_create", started_at, result, |saved| {
            format!("person_id={}", saved.id)
        })
    }

    /// Stores a batch; nothing is stored when any entry is invalid.
    pub fn create_many_people(&self, people: &[NewPerson]) -> RepoResult<Vec<Person>> {
        let started_at = Instant::now();
        let result = self.repo.insert_people(people);
        finish("person_create_many", started_at, result, |saved| {
            format!("count={}", saved.len())
        })
    }

    /// Returns every person whose name matches exactly.
    pub fn find_people_by_name(&self, name: &str) -> RepoResult<Vec<Person>> {
        let started_at = Instant::now();
        let result = self.repo.find_people(&PersonFilter::by_name(name));
        finish("person_find_by_name", started_at, result, |found| {
            format!("count={}", found.len())
        })
    }

    /// Returns the first person listing `food` among their favorites.
    pub fn find_one_by_favorite_food(&self, food: &str) -> RepoResult<Option<Person>> {
        let started_at = Instant::now();
        let result = self
            .repo
            .find_one_person(&PersonFilter::by_favorite_food(food));
        finish("person_find_one_by_food", started_at, result, found_summary)
    }

    /// Looks a person up by id text.
    ///
    /// # Errors
    /// - `InvalidId` when `person_id` is malformed.
    pub fn find_person_by_id(&self, person_id: &str) -> RepoResult<Option<Person>> {
        let started_at = Instant::now();
        let result = parse_person_id(person_id).and_then(|id| self.repo.get_person(id));
        finish("person_find_by_id", started_at, result, found_summary)
    }

    /// Loads a person, appends [`FOOD_TO_ADD`] and saves the full document.
    ///
    /// # Errors
    /// - `InvalidId` when `person_id` is malformed.
    /// - `NotFound` when the person is absent at load or save time.
    pub fn find_edit_then_save(&self, person_id: &str) -> RepoResult<Person> {
        let started_at = Instant::now();
        let result = parse_person_id(person_id).and_then(|id| {
            let mut person = self.repo.get_person(id)?.ok_or(RepoError::NotFound(id))?;
            person.add_favorite_food(FOOD_TO_ADD);
            self.repo.replace_person(&person)?;
            Ok(person)
        });
        finish("person_edit_save", started_at, result, |saved| {
            format!("person_id={} food_count={}", saved.id, saved.favorite_foods.len())
        })
    }

    /// Atomically sets `age` to [`AGE_TO_SET`] on the first person named
    /// `person_name` and returns the updated document. Never inserts.
    pub fn find_and_update(&self, person_name: &str) -> RepoResult<Option<Person>> {
        let started_at = Instant::now();
        let result = self.repo.find_one_and_update(
            &PersonFilter::by_name(person_name),
            &PersonUpdate::set_age(AGE_TO_SET),
        );
        finish("person_find_and_update", started_at, result, found_summary)
    }

    /// Deletes a person by id text and returns the removed document.
    ///
    /// Deleting an absent id returns `Ok(None)`.
    pub fn remove_by_id(&self, person_id: &str) -> RepoResult<Option<Person>> {
        let started_at = Instant::now();
        let result = parse_person_id(person_id).and_then(|id| self.repo.delete_person(id));
        finish("person_remove_by_id", started_at, result, found_summary)
    }

    /// Deletes every person whose name matches exactly.
    pub fn remove_many_people(&self, name: &str) -> RepoResult<DeleteSummary> {
        let started_at = Instant::now();
        let result = self.repo.delete_people(&PersonFilter::by_name(name));
        finish("person_remove_many", started_at, result, |summary| {
            format!("deleted_count={}", summary.deleted_count)
        })
    }

    /// People liking `food`, sorted by name, at most [`QUERY_CHAIN_LIMIT`],
    /// without the `age` field.
    pub fn query_chain(&self, food: &str) -> RepoResult<Vec<PersonProjection>> {
        let started_at = Instant::now();
        let query = PersonQuery::new(PersonFilter::by_favorite_food(food))
            .sort_by(SortKey::Name, SortDirection::Ascending)
            .limit(QUERY_CHAIN_LIMIT)
            .exclude(PersonField::Age);
        let result = self.repo.query_people(&query);
        finish("person_query_chain", started_at, result, |found| {
            format!("count={}", found.len())
        })
    }
}

fn found_summary(found: &Option<Person>) -> String {
    match found {
        Some(person) => format!("found=true person_id={}", person.id),
        None => "found=false".to_string(),
    }
}

fn finish<T>(
    event: &'static str,
    started_at: Instant,
    result: RepoResult<T>,
    summarize: impl FnOnce(&T) -> String,
) -> RepoResult<T> {
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(value) => info!(
            "event={event} module=service status=ok duration_ms={duration_ms} {}",
            summarize(value)
        ),
        Err(err) => error!(
            "event={event} module=service status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
    result
}
