//! Person document model.
//!
//! # Responsibility
//! - Define the persisted `Person` document and its insert/update inputs.
//! - Own the single client-side schema rule: `name` is required.
//!
//! # Invariants
//! - `id` is assigned once at insert time and never reused.
//! - A persisted `Person` always has a non-empty `name`.
//! - `favorite_foods` keeps insertion order.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque identifier assigned to every stored person.
pub type PersonId = Uuid;

/// Validation failure for person documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonValidationError {
    /// `name` is absent or empty.
    MissingName,
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "path `name` is required"),
        }
    }
}

impl Error for PersonValidationError {}

/// Field names addressable by projections and sort specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonField {
    Name,
    Age,
    FavoriteFoods,
}

impl PersonField {
    /// JSON path of this field inside the stored document.
    pub fn json_path(self) -> &'static str {
        match self {
            Self::Name => "$.name",
            Self::Age => "$.age",
            Self::FavoriteFoods => "$.favoriteFoods",
        }
    }
}

/// Stored person document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Assigned by the store; not part of the stored JSON body.
    #[serde(skip_deserializing)]
    pub id: PersonId,
    pub name: String,
    pub age: Option<u32>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl Person {
    /// Checks the persisted-record invariant.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        validate_name(Some(self.name.as_str()))
    }

    /// Appends one food, keeping prior entries in order.
    pub fn add_favorite_food(&mut self, food: impl Into<String>) {
        self.favorite_foods.push(food.into());
    }
}

/// Insert input. `name` stays optional so a missing name is representable
/// and rejected by [`NewPerson::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub name: Option<String>,
    pub age: Option<u32>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl NewPerson {
    /// Creates an input with only `name` set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_favorite_foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorite_foods = foods.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), PersonValidationError> {
        validate_name(self.name.as_deref())
    }

    /// Binds this input to a store-assigned id.
    ///
    /// # Errors
    /// - Returns `MissingName` when `name` is absent or empty.
    pub fn into_person(self, id: PersonId) -> Result<Person, PersonValidationError> {
        self.validate()?;
        Ok(Person {
            id,
            name: self.name.unwrap_or_default(),
            age: self.age,
            favorite_foods: self.favorite_foods,
        })
    }
}

/// Field assignments applied by find-and-update. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonUpdate {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub favorite_foods: Option<Vec<String>>,
}

impl PersonUpdate {
    pub fn set_age(age: u32) -> Self {
        Self {
            age: Some(age),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.favorite_foods.is_none()
    }

    pub fn validate(&self) -> Result<(), PersonValidationError> {
        match self.name.as_deref() {
            Some(name) => validate_name(Some(name)),
            None => Ok(()),
        }
    }
}

/// Partial person returned by projected queries.
///
/// Excluded fields are always `None`; `id` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonProjection {
    #[serde(skip_deserializing)]
    pub id: PersonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_foods: Option<Vec<String>>,
}

fn validate_name(name: Option<&str>) -> Result<(), PersonValidationError> {
    match name {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(PersonValidationError::MissingName),
    }
}

#[cfg(test)]
mod tests {
    use super::{NewPerson, PersonUpdate, PersonValidationError};
    use uuid::Uuid;

    #[test]
    fn new_person_without_name_is_rejected() {
        let input = NewPerson::default().with_age(40);
        assert_eq!(input.validate(), Err(PersonValidationError::MissingName));
        assert_eq!(
            NewPerson::named("").validate(),
            Err(PersonValidationError::MissingName)
        );
    }

    #[test]
    fn into_person_keeps_fields_and_food_order() {
        let id = Uuid::new_v4();
        let person = NewPerson::named("John Doe")
            .with_age(25)
            .with_favorite_foods(["Pizza", "Burger"])
            .into_person(id)
            .unwrap();

        assert_eq!(person.id, id);
        assert_eq!(person.age, Some(25));
        assert_eq!(person.favorite_foods, vec!["Pizza", "Burger"]);
    }

    #[test]
    fn stored_body_uses_camel_case_keys() {
        let person = NewPerson::named("Jane Doe")
            .with_favorite_foods(["Salad"])
            .into_person(Uuid::new_v4())
            .unwrap();
        let json = serde_json::to_value(&person).unwrap();
        assert_eq!(json["favoriteFoods"][0], "Salad");
        assert!(json.get("favorite_foods").is_none());
    }

    #[test]
    fn update_rejects_empty_name_only_when_set() {
        assert!(PersonUpdate::set_age(20).validate().is_ok());
        let update = PersonUpdate {
            name: Some(String::new()),
            ..PersonUpdate::default()
        };
        assert_eq!(update.validate(), Err(PersonValidationError::MissingName));
        assert!(PersonUpdate::default().is_empty());
    }
}
