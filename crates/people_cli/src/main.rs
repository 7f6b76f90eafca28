//! Demo entry point.
//!
//! # Responsibility
//! - Wire config, logging and the shared store connection together.
//! - Run every people use-case once with fixed sample data.
//!
//! # Invariants
//! - Use-case failures are reported and the demo moves on; only bootstrap
//!   failures change the exit code.

use people_core::db::open_location;
use people_core::{
    core_version, init_logging, AppConfig, NewPerson, PersonRepository, PersonService,
    RepoResult, SqlitePersonRepository,
};
use serde::Serialize;
use std::process::ExitCode;

/// Stand-in id used when no person could be created first.
const PLACEHOLDER_ID: &str = "your_person_id_here";

fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging(config.log_level, config.log_dir.as_deref()) {
        eprintln!("logging init failed: {err}");
        return ExitCode::FAILURE;
    }

    let conn = match open_location(&config.db_location) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open store `{}`: {err}", config.db_location);
            return ExitCode::FAILURE;
        }
    };

    let repo = match SqlitePersonRepository::try_new(&conn) {
        Ok(repo) => repo,
        Err(err) => {
            eprintln!("store is not ready: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("people_core version={}", core_version());
    run_demo(&PersonService::new(repo));
    ExitCode::SUCCESS
}

fn run_demo<R: PersonRepository>(service: &PersonService<R>) {
    let john = NewPerson::named("John Doe")
        .with_age(25)
        .with_favorite_foods(["Pizza", "Burger"]);
    let person_id = report(
        "Person saved",
        "Error saving person",
        service.create_and_save_person(&john),
    )
    .map(|saved| saved.id.to_string())
    .unwrap_or_else(|| PLACEHOLDER_ID.to_string());

    report(
        "People created",
        "Error creating people",
        service.create_many_people(&sample_people()),
    );
    report(
        "People found",
        "Error finding people by name",
        service.find_people_by_name("John Doe"),
    );
    report(
        "Person found",
        "Error finding person by favorite food",
        service.find_one_by_favorite_food("Pizza"),
    );
    report(
        "Person found by ID",
        "Error finding person by ID",
        service.find_person_by_id(&person_id),
    );
    report(
        "Person updated",
        "Error updating person",
        service.find_edit_then_save(&person_id),
    );
    report(
        "Person updated",
        "Error updating person by name",
        service.find_and_update("John Doe"),
    );
    report(
        "Person removed",
        "Error removing person by ID",
        service.remove_by_id(&person_id),
    );
    report(
        "People removed",
        "Error removing people by name",
        service.remove_many_people("Mary"),
    );
    report(
        "Query Chain result",
        "Error in query chain",
        service.query_chain("burritos"),
    );
}

fn sample_people() -> Vec<NewPerson> {
    vec![
        NewPerson::named("Jane Doe")
            .with_age(28)
            .with_favorite_foods(["Salad"]),
        NewPerson::named("Mark Smith")
            .with_age(30)
            .with_favorite_foods(["Pasta"]),
        NewPerson::named("Mary")
            .with_age(24)
            .with_favorite_foods(["Fish", "Chips"]),
        NewPerson::named("Mary")
            .with_age(28)
            .with_favorite_foods(["Chicken", "Rice"]),
    ]
}

fn report<T: Serialize>(success: &str, failure: &str, result: RepoResult<T>) -> Option<T> {
    match result {
        Ok(value) => {
            match serde_json::to_string_pretty(&value) {
                Ok(json) => println!("{success}: {json}"),
                Err(err) => eprintln!("{success}, but the result could not be rendered: {err}"),
            }
            Some(value)
        }
        Err(err) => {
            eprintln!("{failure}: {err}");
            None
        }
    }
}
