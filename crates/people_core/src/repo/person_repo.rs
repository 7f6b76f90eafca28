//! Person repository contracts and SQLite JSON-document implementation.
//!
//! # Responsibility
//! - Provide collection-style CRUD and query APIs over the `people` table.
//! - Keep SQL and JSON path details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate documents before SQL mutations.
//! - Read paths reject undecodable or nameless documents instead of masking them.
//! - "First match" means lowest `seq`, i.e. insertion order.
//! - `find_one_and_update` never inserts (no upsert).

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::person::{
    NewPerson, Person, PersonField, PersonId, PersonProjection, PersonUpdate,
    PersonValidationError,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PEOPLE_TABLE: &str = "people";
const REQUIRED_COLUMNS: &[&str] = &["seq", "id", "doc", "created_at", "updated_at"];
const TOUCH_UPDATED_AT_SQL: &str = "updated_at = (strftime('%s', 'now') * 1000)";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for person persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Single-document validation failure.
    Validation(PersonValidationError),
    /// Batch insert rejected because of the entry at `index`.
    InvalidBatchEntry {
        index: usize,
        error: PersonValidationError,
    },
    /// Caller-supplied identifier is not a well-formed id.
    InvalidId(String),
    /// Write target disappeared or never existed.
    NotFound(PersonId),
    InvalidData(String),
    Db(DbError),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::InvalidBatchEntry { .. } => "validation_failed",
            Self::InvalidId(_) => "invalid_id",
            Self::NotFound(_) => "not_found",
            Self::InvalidData(_) => "invalid_data",
            Self::Db(_) => "db_error",
            Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => "schema_mismatch",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "person validation failed: {err}"),
            Self::InvalidBatchEntry { index, error } => {
                write!(f, "person validation failed at batch index {index}: {error}")
            }
            Self::InvalidId(value) => write!(f, "invalid person id `{value}`"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is older than required {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidBatchEntry { error, .. } => Some(error),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PersonValidationError> for RepoError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Parses caller-supplied identifier text.
pub fn parse_person_id(value: &str) -> RepoResult<PersonId> {
    Uuid::parse_str(value).map_err(|_| RepoError::InvalidId(value.to_string()))
}

/// Equality/containment filter. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    /// Exact `name` match.
    pub name: Option<String>,
    /// `favoriteFoods` contains this exact value.
    pub favorite_food: Option<String>,
}

impl PersonFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn by_favorite_food(food: impl Into<String>) -> Self {
        Self {
            favorite_food: Some(food.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Age,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Filter + sort + limit + projection, built by chaining.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonQuery {
    pub filter: PersonFilter,
    pub sort: Option<(SortKey, SortDirection)>,
    /// Maximum rows to return; `None` is unbounded.
    pub limit: Option<u32>,
    pub skip: u32,
    /// Fields removed from every returned document. `id` is always kept.
    pub exclude: Vec<PersonField>,
}

impl PersonQuery {
    pub fn new(filter: PersonFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sort_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort = Some((key, direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    pub fn exclude(mut self, field: PersonField) -> Self {
        if !self.exclude.contains(&field) {
            self.exclude.push(field);
        }
        self
    }
}

/// Outcome of a multi-document delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub deleted_count: u64,
}

/// Repository interface for the people collection.
pub trait PersonRepository {
    fn insert_person(&self, person: &NewPerson) -> RepoResult<Person>;
    fn insert_people(&self, people: &[NewPerson]) -> RepoResult<Vec<Person>>;
    fn find_people(&self, filter: &PersonFilter) -> RepoResult<Vec<Person>>;
    fn find_one_person(&self, filter: &PersonFilter) -> RepoResult<Option<Person>>;
    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn replace_person(&self, person: &Person) -> RepoResult<()>;
    fn find_one_and_update(
        &self,
        filter: &PersonFilter,
        update: &PersonUpdate,
    ) -> RepoResult<Option<Person>>;
    fn delete_person(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn delete_people(&self, filter: &PersonFilter) -> RepoResult<DeleteSummary>;
    fn count_people(&self, filter: &PersonFilter) -> RepoResult<u64>;
    fn query_people(&self, query: &PersonQuery) -> RepoResult<Vec<PersonProjection>>;
}

/// SQLite-backed people repository borrowing the shared connection.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` for foreign schemas.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn insert_person(&self, person: &NewPerson) -> RepoResult<Person> {
        let person = person.clone().into_person(Uuid::new_v4())?;
        insert_document(self.conn, &person)?;
        Ok(person)
    }

    fn insert_people(&self, people: &[NewPerson]) -> RepoResult<Vec<Person>> {
        let people = people
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, input)| {
                input
                    .into_person(Uuid::new_v4())
                    .map_err(|error| RepoError::InvalidBatchEntry { index, error })
            })
            .collect::<RepoResult<Vec<_>>>()?;

        let tx = self.conn.unchecked_transaction()?;
        for person in &people {
            insert_document(&tx, person)?;
        }
        tx.commit()?;

        Ok(people)
    }

    fn find_people(&self, filter: &PersonFilter) -> RepoResult<Vec<Person>> {
        let mut sql = String::from("SELECT id, doc FROM people WHERE 1 = 1");
        let mut bind_values = Vec::new();
        push_filter(&mut sql, &mut bind_values, filter);
        sql.push_str(" ORDER BY seq ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_person_row(row)?);
        }

        Ok(people)
    }

    fn find_one_person(&self, filter: &PersonFilter) -> RepoResult<Option<Person>> {
        let mut sql = String::from("SELECT id, doc FROM people WHERE 1 = 1");
        let mut bind_values = Vec::new();
        push_filter(&mut sql, &mut bind_values, filter);
        sql.push_str(" ORDER BY seq ASC LIMIT 1");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(row)?));
        }

        Ok(None)
    }

    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, doc FROM people WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(row)?));
        }

        Ok(None)
    }

    fn replace_person(&self, person: &Person) -> RepoResult<()> {
        person.validate()?;

        let changed = self.conn.execute(
            &format!("UPDATE people SET doc = ?1, {TOUCH_UPDATED_AT_SQL} WHERE id = ?2;"),
            params![encode_document(person)?, person.id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(person.id));
        }

        Ok(())
    }

    fn find_one_and_update(
        &self,
        filter: &PersonFilter,
        update: &PersonUpdate,
    ) -> RepoResult<Option<Person>> {
        update.validate()?;
        if update.is_empty() {
            return self.find_one_person(filter);
        }

        let mut assignments = Vec::new();
        let mut bind_values = Vec::new();
        if let Some(name) = update.name.as_ref() {
            assignments.push(format!("'{}', ?", PersonField::Name.json_path()));
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(age) = update.age {
            assignments.push(format!("'{}', ?", PersonField::Age.json_path()));
            bind_values.push(Value::Integer(i64::from(age)));
        }
        if let Some(foods) = update.favorite_foods.as_ref() {
            let encoded = serde_json::to_string(foods)
                .map_err(|err| RepoError::InvalidData(format!("cannot encode foods: {err}")))?;
            assignments.push(format!(
                "'{}', json(?)",
                PersonField::FavoriteFoods.json_path()
            ));
            bind_values.push(Value::Text(encoded));
        }

        // Single statement: locate-and-modify cannot interleave with other writers.
        let mut sql = format!(
            "UPDATE people
             SET doc = json_set(doc, {}), {TOUCH_UPDATED_AT_SQL}
             WHERE seq = (SELECT seq FROM people WHERE 1 = 1",
            assignments.join(", ")
        );
        push_filter(&mut sql, &mut bind_values, filter);
        sql.push_str(" ORDER BY seq ASC LIMIT 1) RETURNING id, doc;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(row)?));
        }

        Ok(None)
    }

    fn delete_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare("DELETE FROM people WHERE id = ?1 RETURNING id, doc;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(row)?));
        }

        Ok(None)
    }

    fn delete_people(&self, filter: &PersonFilter) -> RepoResult<DeleteSummary> {
        let mut sql = String::from("DELETE FROM people WHERE 1 = 1");
        let mut bind_values = Vec::new();
        push_filter(&mut sql, &mut bind_values, filter);

        let deleted = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(DeleteSummary {
            deleted_count: deleted as u64,
        })
    }

    fn count_people(&self, filter: &PersonFilter) -> RepoResult<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM people WHERE 1 = 1");
        let mut bind_values = Vec::new();
        push_filter(&mut sql, &mut bind_values, filter);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(count as u64)
    }

    fn query_people(&self, query: &PersonQuery) -> RepoResult<Vec<PersonProjection>> {
        if query.limit == Some(0) {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT id, {} AS doc FROM people WHERE 1 = 1",
            projected_doc_expr(&query.exclude)
        );
        let mut bind_values = Vec::new();
        push_filter(&mut sql, &mut bind_values, &query.filter);

        sql.push_str(" ORDER BY ");
        if let Some((key, direction)) = query.sort {
            let path = match key {
                SortKey::Name => PersonField::Name.json_path(),
                SortKey::Age => PersonField::Age.json_path(),
            };
            let direction = match direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            // Sort on the stored document so excluded fields still order rows.
            sql.push_str(&format!("json_extract(people.doc, '{path}') {direction}, "));
        }
        sql.push_str("seq ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.skip > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.skip)));
            }
        } else if query.skip > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.skip)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projections = Vec::new();
        while let Some(row) = rows.next()? {
            projections.push(parse_projection_row(row)?);
        }

        Ok(projections)
    }
}

/// Stored JSON body; `id` lives in its own column.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocument<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<u32>,
    favorite_foods: &'a [String],
}

fn encode_document(person: &Person) -> RepoResult<String> {
    let document = StoredDocument {
        name: person.name.as_str(),
        age: person.age,
        favorite_foods: person.favorite_foods.as_slice(),
    };
    serde_json::to_string(&document)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode person {}: {err}", person.id)))
}

fn insert_document(conn: &Connection, person: &Person) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO people (id, doc) VALUES (?1, ?2);",
        params![person.id.to_string(), encode_document(person)?],
    )?;
    Ok(())
}

fn push_filter(sql: &mut String, bind_values: &mut Vec<Value>, filter: &PersonFilter) {
    if let Some(name) = filter.name.as_ref() {
        sql.push_str(" AND json_extract(people.doc, '$.name') = ?");
        bind_values.push(Value::Text(name.clone()));
    }

    if let Some(food) = filter.favorite_food.as_ref() {
        sql.push_str(
            " AND EXISTS (
                SELECT 1
                FROM json_each(people.doc, '$.favoriteFoods') AS food
                WHERE food.value = ?
            )",
        );
        bind_values.push(Value::Text(food.clone()));
    }
}

fn projected_doc_expr(exclude: &[PersonField]) -> String {
    if exclude.is_empty() {
        return "people.doc".to_string();
    }

    let paths = exclude
        .iter()
        .map(|field| format!("'{}'", field.json_path()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("json_remove(people.doc, {paths})")
}

fn parse_id_column(row: &Row<'_>) -> RepoResult<PersonId> {
    let id_text: String = row.get("id")?;
    Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid id value `{id_text}` in people.id"))
    })
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let id = parse_id_column(row)?;
    let doc: String = row.get("doc")?;
    let mut person: Person = serde_json::from_str(&doc).map_err(|err| {
        RepoError::InvalidData(format!("undecodable document for person {id}: {err}"))
    })?;
    person.id = id;
    person.validate().map_err(|err| {
        RepoError::InvalidData(format!("stored person {id} violates schema: {err}"))
    })?;
    Ok(person)
}

fn parse_projection_row(row: &Row<'_>) -> RepoResult<PersonProjection> {
    let id = parse_id_column(row)?;
    let doc: String = row.get("doc")?;
    let mut projection: PersonProjection = serde_json::from_str(&doc).map_err(|err| {
        RepoError::InvalidData(format!("undecodable document for person {id}: {err}"))
    })?;
    projection.id = id;
    Ok(projection)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [PEOPLE_TABLE],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(PEOPLE_TABLE));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([PEOPLE_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    for &column in REQUIRED_COLUMNS {
        if !columns.contains(column) {
            return Err(RepoError::MissingRequiredColumn {
                table: PEOPLE_TABLE,
                column,
            });
        }
    }

    Ok(())
}
