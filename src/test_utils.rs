//! Shared test utilities for `CartBuddy`.
//!
//! This module provides common helper functions for setting up test databases,
//! pinning the venue clock and creating test entities with sensible defaults.

use crate::{
    core::{
        cart::{self, NewCart},
        person::{self, NewPerson},
        time::TimeService,
    },
    entities,
    errors::Result,
};
use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Time service for the New York venue, frozen at a local wall-clock time.
///
/// # Arguments
/// * `local` - Venue-local time formatted as `YYYY-MM-DDTHH:MM:SS`
///
/// # Panics
/// If `local` is malformed or does not exist in New York.
#[allow(clippy::expect_used)]
pub fn time_at(local: &str) -> TimeService {
    let naive =
        NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S").expect("valid local time");
    let instant = New_York
        .from_local_datetime(&naive)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc);
    TimeService::fixed(New_York, instant)
}

/// Creates a test person with sensible defaults.
///
/// # Defaults
/// * `role`: "volunteer"
/// * `phone`, `email`: None
pub async fn create_test_person(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::person::Model> {
    person::create_person(
        db,
        NewPerson {
            name: name.to_string(),
            role: "volunteer".to_string(),
            phone: None,
            email: None,
        },
    )
    .await
}

/// Creates an available test cart at full battery.
pub async fn create_test_cart(
    db: &DatabaseConnection,
    cart_number: &str,
) -> Result<entities::cart::Model> {
    cart::create_cart(
        db,
        NewCart {
            cart_number: cart_number.to_string(),
            battery_level: None,
            status: None,
        },
    )
    .await
}

/// Sets up a complete test environment with one cart and one person.
/// Returns (db, cart, person) for assignment scenarios.
pub async fn setup_with_cart_and_person() -> Result<(
    DatabaseConnection,
    entities::cart::Model,
    entities::person::Model,
)> {
    let db = setup_test_db().await?;
    let cart = create_test_cart(&db, "A-001").await?;
    let person = create_test_person(&db, "John Doe").await?;
    Ok((db, cart, person))
}
