use people_core::db::open_db_in_memory;
use people_core::{
    NewPerson, PersonFilter, PersonRepository, PersonService, RepoError, SqlitePersonRepository,
    AGE_TO_SET, FOOD_TO_ADD, QUERY_CHAIN_LIMIT,
};
use rusqlite::Connection;

fn john_doe() -> NewPerson {
    NewPerson::named("John Doe")
        .with_age(25)
        .with_favorite_foods(["Pizza", "Burger"])
}

fn service(conn: &Connection) -> PersonService<SqlitePersonRepository<'_>> {
    PersonService::new(SqlitePersonRepository::try_new(conn).unwrap())
}

#[test]
fn create_and_save_assigns_id_and_keeps_fields() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let saved = service.create_and_save_person(&john_doe()).unwrap();
    assert!(!saved.id.is_nil());
    assert_eq!(saved.age, Some(25));
    assert_eq!(saved.favorite_foods, vec!["Pizza", "Burger"]);

    let found = service.find_people_by_name("John Doe").unwrap();
    assert_eq!(found, vec![saved]);
}

#[test]
fn create_without_name_fails_validation() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .create_and_save_person(&NewPerson::default().with_favorite_foods(["Soup"]))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn find_by_name_returns_every_namesake() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    service
        .create_many_people(&[
            NewPerson::named("Jane Doe").with_age(28),
            NewPerson::named("Mary").with_age(24),
            NewPerson::named("Mary").with_age(28),
        ])
        .unwrap();

    let marys = service.find_people_by_name("Mary").unwrap();
    assert_eq!(marys.len(), 2);
    assert!(marys.iter().all(|person| person.name == "Mary"));
    assert!(service.find_people_by_name("Nobody").unwrap().is_empty());
}

#[test]
fn find_one_by_favorite_food_hits_single_owner_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let john = service.create_and_save_person(&john_doe()).unwrap();
    service
        .create_and_save_person(&NewPerson::named("Jane Doe").with_favorite_foods(["Salad"]))
        .unwrap();

    let found = service.find_one_by_favorite_food("Pizza").unwrap().unwrap();
    assert_eq!(found.id, john.id);
    assert!(service.find_one_by_favorite_food("Sushi").unwrap().is_none());
}

#[test]
fn find_by_id_distinguishes_malformed_from_absent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let john = service.create_and_save_person(&john_doe()).unwrap();
    let found = service
        .find_person_by_id(&john.id.to_string())
        .unwrap()
        .unwrap();
    assert_eq!(found, john);

    let err = service.find_person_by_id("your_person_id_here").unwrap_err();
    assert!(matches!(err, RepoError::InvalidId(value) if value == "your_person_id_here"));

    let absent = service
        .find_person_by_id("00000000-0000-4000-8000-0000000000aa")
        .unwrap();
    assert!(absent.is_none());
}

#[test]
fn find_edit_then_save_appends_one_food_in_order() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let john = service.create_and_save_person(&john_doe()).unwrap();
    let updated = service.find_edit_then_save(&john.id.to_string()).unwrap();

    assert_eq!(updated.favorite_foods.len(), john.favorite_foods.len() + 1);
    assert_eq!(updated.favorite_foods, vec!["Pizza", "Burger", FOOD_TO_ADD]);

    let stored = service
        .repository()
        .get_person(john.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored, updated);
}

#[test]
fn find_edit_then_save_on_missing_person_fails_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let john = service.create_and_save_person(&john_doe()).unwrap();
    service.remove_by_id(&john.id.to_string()).unwrap();

    let err = service
        .find_edit_then_save(&john.id.to_string())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == john.id));
}

#[test]
fn find_and_update_sets_age_and_returns_new_state() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let john = service.create_and_save_person(&john_doe()).unwrap();
    let updated = service.find_and_update("John Doe").unwrap().unwrap();

    assert_eq!(updated.id, john.id);
    assert_eq!(updated.age, Some(AGE_TO_SET));
    assert_eq!(updated.favorite_foods, john.favorite_foods);
}

#[test]
fn find_and_update_on_unknown_name_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(service.find_and_update("Ghost").unwrap().is_none());
    assert!(service.find_people_by_name("Ghost").unwrap().is_empty());
    assert_eq!(
        service
            .repository()
            .count_people(&PersonFilter::default())
            .unwrap(),
        0
    );
}

#[test]
fn remove_by_id_is_idempotent_in_absence() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let john = service.create_and_save_person(&john_doe()).unwrap();
    let id = john.id.to_string();

    let removed = service.remove_by_id(&id).unwrap();
    assert_eq!(removed, Some(john));
    assert!(service.remove_by_id(&id).unwrap().is_none());
    assert!(matches!(
        service.remove_by_id("not-an-id").unwrap_err(),
        RepoError::InvalidId(_)
    ));
}

#[test]
fn remove_many_people_deletes_all_namesakes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    service
        .create_many_people(&[
            NewPerson::named("Mary").with_favorite_foods(["Fish", "Chips"]),
            NewPerson::named("Mary").with_favorite_foods(["Chicken", "Rice"]),
            NewPerson::named("Mark Smith"),
        ])
        .unwrap();

    let summary = service.remove_many_people("Mary").unwrap();
    assert_eq!(summary.deleted_count, 2);
    assert!(service.find_people_by_name("Mary").unwrap().is_empty());
    assert_eq!(service.find_people_by_name("Mark Smith").unwrap().len(), 1);
}

#[test]
fn query_chain_caps_results_sorts_by_name_and_hides_age() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    service
        .create_many_people(&[
            NewPerson::named("Zoe").with_age(31).with_favorite_foods(["burritos"]),
            NewPerson::named("Bob").with_age(42).with_favorite_foods(["burritos", "tea"]),
            NewPerson::named("Amy").with_age(19).with_favorite_foods(["burritos"]),
            NewPerson::named("Al").with_age(50).with_favorite_foods(["pizza"]),
        ])
        .unwrap();

    let result = service.query_chain("burritos").unwrap();
    assert_eq!(result.len(), QUERY_CHAIN_LIMIT as usize);
    assert_eq!(result[0].name.as_deref(), Some("Amy"));
    assert_eq!(result[1].name.as_deref(), Some("Bob"));
    assert!(result.iter().all(|person| person.age.is_none()));

    let json = serde_json::to_value(&result[0]).unwrap();
    assert!(json.get("age").is_none());
    assert!(json.get("id").is_some());

    assert!(service.query_chain("nachos").unwrap().is_empty());
}
