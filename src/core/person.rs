//! Person registry - Validated directory of staff and volunteers.
//!
//! Creation and updates report exactly one failure at a time, checked in the order
//! name required, name format, name uniqueness, role, email, phone. Names are unique and
//! compared case-sensitively; emails are unique when present.

use crate::{
    core::validation::{non_empty, validate_email, validate_name, validate_phone, validate_role},
    entities::{Cart, CartAssignment, CartHistory, Person, cart, cart_assignment, cart_history, person},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info};

/// Input for [`create_person`].
#[derive(Debug, Clone, Default)]
pub struct NewPerson {
    /// Full name, stored trimmed
    pub name: String,
    /// "admin" or "volunteer"
    pub role: String,
    /// Optional contact number
    pub phone: Option<String>,
    /// Optional contact email, unique when present
    pub email: Option<String>,
}

/// Partial update for [`update_person`]; `None` leaves a field untouched.
///
/// `phone` and `email` take `Some(None)` to clear the stored value.
#[derive(Debug, Clone, Default)]
pub struct PersonPatch {
    /// New full name
    pub name: Option<String>,
    /// New role
    pub role: Option<String>,
    /// New phone number, or `Some(None)` to clear it
    pub phone: Option<Option<String>>,
    /// New email, or `Some(None)` to clear it
    pub email: Option<Option<String>>,
}

/// Retrieves every person, ordered alphabetically by name.
pub async fn get_all_persons(db: &DatabaseConnection) -> Result<Vec<person::Model>> {
    Person::find()
        .order_by_asc(person::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Looks up a person by id.
pub async fn get_person_by_id(
    db: &DatabaseConnection,
    person_id: i64,
) -> Result<Option<person::Model>> {
    Person::find_by_id(person_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Exact, case-sensitive name lookup.
pub async fn get_person_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<person::Model>> {
    Person::find()
        .filter(person::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn require_person<C>(db: &C, person_id: i64) -> Result<person::Model>
where
    C: ConnectionTrait,
{
    Person::find_by_id(person_id)
        .one(db)
        .await?
        .ok_or(Error::PersonNotFound { id: person_id })
}

/// Carts the person is currently assigned to, ordered by cart number.
pub async fn get_assigned_carts(
    db: &DatabaseConnection,
    person_id: i64,
) -> Result<Vec<cart::Model>> {
    Cart::find()
        .inner_join(CartAssignment)
        .filter(cart_assignment::Column::PersonId.eq(person_id))
        .order_by_asc(cart::Column::CartNumber)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn ensure_name_available<C>(db: &C, name: &str, exclude_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Person::find().filter(person::Column::Name.eq(name));
    if let Some(id) = exclude_id {
        query = query.filter(person::Column::Id.ne(id));
    }
    if query.count(db).await? > 0 {
        return Err(Error::DuplicatePersonName {
            name: name.to_string(),
        });
    }
    Ok(())
}

async fn ensure_email_available<C>(db: &C, email: &str, exclude_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Person::find().filter(person::Column::Email.eq(email));
    if let Some(id) = exclude_id {
        query = query.filter(person::Column::Id.ne(id));
    }
    if query.count(db).await? > 0 {
        return Err(Error::DuplicateEmail {
            email: email.to_string(),
        });
    }
    Ok(())
}

/// Creates a new person after running every validator.
///
/// # Errors
/// - `Error::Validation` for the first malformed field
/// - `Error::DuplicatePersonName` / `Error::DuplicateEmail` for uniqueness clashes
pub async fn create_person(db: &DatabaseConnection, input: NewPerson) -> Result<person::Model> {
    validate_name(&input.name)?;
    let name = input.name.trim().to_string();
    ensure_name_available(db, &name, None).await?;

    let role = validate_role(&input.role)?;

    let email = non_empty(input.email).map(|e| e.trim().to_string());
    validate_email(email.as_deref())?;
    if let Some(email) = email.as_deref() {
        ensure_email_available(db, email, None).await?;
    }

    let phone = non_empty(input.phone).map(|p| p.trim().to_string());
    validate_phone(phone.as_deref())?;

    let person = person::ActiveModel {
        name: Set(name),
        role: Set(role),
        phone: Set(phone),
        email: Set(email),
        ..Default::default()
    };

    let result = person.insert(db).await?;
    info!("Created person '{}' (ID: {})", result.name, result.id);
    Ok(result)
}

/// Applies a partial update, validating only the fields that are present.
///
/// Name uniqueness is only checked when the name actually changes.
pub async fn update_person(
    db: &DatabaseConnection,
    person_id: i64,
    patch: PersonPatch,
) -> Result<person::Model> {
    let existing = require_person(db, person_id).await?;
    let mut active: person::ActiveModel = existing.clone().into();

    if let Some(name) = patch.name {
        validate_name(&name)?;
        let name = name.trim().to_string();
        if name != existing.name {
            ensure_name_available(db, &name, Some(person_id)).await?;
            active.name = Set(name);
        }
    }

    if let Some(role) = patch.role {
        active.role = Set(validate_role(&role)?);
    }

    if let Some(email) = patch.email {
        let email = non_empty(email).map(|e| e.trim().to_string());
        validate_email(email.as_deref())?;
        if let Some(new_email) = email.as_deref() {
            if existing.email.as_deref() != Some(new_email) {
                ensure_email_available(db, new_email, Some(person_id)).await?;
            }
        }
        active.email = Set(email);
    }

    if let Some(phone) = patch.phone {
        let phone = non_empty(phone).map(|p| p.trim().to_string());
        validate_phone(phone.as_deref())?;
        active.phone = Set(phone);
    }

    if !active.is_changed() {
        return Ok(existing);
    }

    let updated = active.update(db).await?;
    debug!("Updated person {}", person_id);
    Ok(updated)
}

/// Deletes a person who holds no cart and has no recorded history.
///
/// # Errors
/// - `Error::PersonNotFound` if the id is unknown
/// - `Error::PersonInUse` while the person is assigned to a cart or referenced by history
pub async fn delete_person(db: &DatabaseConnection, person_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let person = require_person(&txn, person_id).await?;

    let active_assignments = CartAssignment::find()
        .filter(cart_assignment::Column::PersonId.eq(person_id))
        .count(&txn)
        .await?;
    if active_assignments > 0 {
        return Err(Error::PersonInUse {
            person_id,
            reason: format!("assigned to {active_assignments} cart(s), unassign first"),
        });
    }

    let history_entries = CartHistory::find()
        .filter(cart_history::Column::PersonId.eq(person_id))
        .count(&txn)
        .await?;
    if history_entries > 0 {
        return Err(Error::PersonInUse {
            person_id,
            reason: format!("referenced by {history_entries} history entries"),
        });
    }

    person.delete(&txn).await?;
    txn.commit().await?;
    info!("Deleted person {}", person_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::PersonRole;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn new_person(name: &str, role: &str) -> NewPerson {
        NewPerson {
            name: name.to_string(),
            role: role.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_person_validation_order() -> Result<()> {
        // Format failures must surface before any database access
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_person(&db, new_person("", "superuser")).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "name", message } if message == "Name is required"
        ));

        let result = create_person(&db, new_person("R2-D2", "volunteer")).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "name", .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_person_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let person = create_person(
            &db,
            NewPerson {
                name: "Jane O'Hara".to_string(),
                role: "admin".to_string(),
                phone: Some("+15551234567".to_string()),
                email: Some("jane@example.com".to_string()),
            },
        )
        .await?;

        assert_eq!(person.name, "Jane O'Hara");
        assert_eq!(person.role, PersonRole::Admin);
        assert_eq!(person.phone.as_deref(), Some("+15551234567"));
        assert_eq!(person.email.as_deref(), Some("jane@example.com"));

        let found = get_person_by_name(&db, "Jane O'Hara").await?;
        assert_eq!(found, Some(person));

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_name_is_conflict() -> Result<()> {
        let db = setup_test_db().await?;

        create_test_person(&db, "John Doe").await?;
        let result = create_person(&db, new_person("John Doe", "volunteer")).await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::DuplicatePersonName { .. }));
        assert_eq!(err.kind(), crate::errors::ErrorKind::Conflict);

        // The second record is never persisted
        assert_eq!(get_all_persons(&db).await?.len(), 1);

        // Exact match only: a different case is a different name
        create_test_person(&db, "john doe").await?;
        assert_eq!(get_all_persons(&db).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_uniqueness_checked_before_role() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_person(&db, "John Doe").await?;

        let result = create_person(&db, new_person("John Doe", "nobody")).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::DuplicatePersonName { .. }
        ));

        let result = create_person(&db, new_person("Jane Doe", "nobody")).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "role", .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_email_checked_before_phone() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_person(
            &db,
            NewPerson {
                name: "Jane Doe".to_string(),
                role: "volunteer".to_string(),
                phone: Some("bad".to_string()),
                email: Some("bad".to_string()),
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "email", .. }
        ));

        let result = create_person(
            &db,
            NewPerson {
                name: "Jane Doe".to_string(),
                role: "volunteer".to_string(),
                phone: Some("bad".to_string()),
                email: Some(String::new()),
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "phone", .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() -> Result<()> {
        let db = setup_test_db().await?;

        let first = NewPerson {
            name: "Jane Doe".to_string(),
            role: "volunteer".to_string(),
            phone: None,
            email: Some("crew@example.com".to_string()),
        };
        create_person(&db, first.clone()).await?;

        let second = NewPerson {
            name: "Jim Doe".to_string(),
            ..first
        };
        let result = create_person(&db, second).await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateEmail { .. }));

        // Empty emails never clash
        create_person(
            &db,
            NewPerson {
                name: "Ann Lee".to_string(),
                role: "volunteer".to_string(),
                phone: None,
                email: Some(String::new()),
            },
        )
        .await?;
        let bob = create_test_person(&db, "Bob Lee").await?;
        assert!(bob.email.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_person_partial() -> Result<()> {
        let db = setup_test_db().await?;
        let person = create_test_person(&db, "John Doe").await?;

        let updated = update_person(
            &db,
            person.id,
            PersonPatch {
                role: Some("admin".to_string()),
                phone: Some(Some("5551234567".to_string())),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.name, "John Doe");
        assert_eq!(updated.role, PersonRole::Admin);
        assert_eq!(updated.phone.as_deref(), Some("5551234567"));

        // Re-submitting the unchanged name is not a conflict with itself
        let updated = update_person(
            &db,
            person.id,
            PersonPatch {
                name: Some("John Doe".to_string()),
                phone: Some(None),
                ..Default::default()
            },
        )
        .await?;
        assert!(updated.phone.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_person_rejects_taken_name_and_bad_fields() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_person(&db, "John Doe").await?;
        let jane = create_test_person(&db, "Jane Doe").await?;

        let result = update_person(
            &db,
            jane.id,
            PersonPatch {
                name: Some("John Doe".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::DuplicatePersonName { .. }
        ));

        let result = update_person(
            &db,
            jane.id,
            PersonPatch {
                email: Some(Some("nope".to_string())),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "email", .. }
        ));

        let unchanged = get_person_by_id(&db, jane.id).await?.unwrap();
        assert_eq!(unchanged, jane);

        let result = update_person(&db, 999, PersonPatch::default()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::PersonNotFound { id: 999 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_person() -> Result<()> {
        let db = setup_test_db().await?;
        let person = create_test_person(&db, "John Doe").await?;

        delete_person(&db, person.id).await?;
        assert!(get_person_by_id(&db, person.id).await?.is_none());

        let result = delete_person(&db, person.id).await;
        assert!(matches!(result.unwrap_err(), Error::PersonNotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_assigned_person_is_blocked() -> Result<()> {
        let (db, cart, person) = setup_with_cart_and_person().await?;
        let time = time_at("2024-06-01T10:00:00");

        crate::core::assignment::assign_person(&db, &time, cart.id, person.id).await?;

        let result = delete_person(&db, person.id).await;
        assert!(matches!(result.unwrap_err(), Error::PersonInUse { .. }));
        assert!(get_person_by_id(&db, person.id).await?.is_some());

        let carts = get_assigned_carts(&db, person.id).await?;
        assert_eq!(carts.len(), 1);
        assert_eq!(carts[0].id, cart.id);

        Ok(())
    }
}
