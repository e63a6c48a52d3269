//! Serialized shapes of carts, persons and history sessions.
//!
//! Timestamps are rendered in the venue zone with their offset. Each builder loads the
//! related rows for a whole batch in one query instead of one per entity.

use crate::{
    core::time::TimeService,
    entities::{
        Cart, CartAssignment, CartStatus, Person, PersonRole, cart, cart_assignment, cart_history,
        person,
    },
    errors::Result,
};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::HashMap;

/// A person as listed on a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonSummary {
    /// Person id
    pub id: i64,
    /// Full name
    pub name: String,
    /// Role at the venue
    pub role: PersonRole,
}

/// A cart as listed on a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// Cart id
    pub id: i64,
    /// Painted cart number
    pub cart_number: String,
    /// Current status
    pub status: CartStatus,
}

/// A cart with its current assignees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// Cart id
    pub id: i64,
    /// Painted cart number
    pub cart_number: String,
    /// Current status
    pub status: CartStatus,
    /// Battery percentage
    pub battery_level: i32,
    /// Start of the current session
    pub checkout_time: Option<DateTime<FixedOffset>>,
    /// Deadline of the current session
    pub return_by_time: Option<DateTime<FixedOffset>>,
    /// People on the cart, in the order they joined
    pub assigned_to: Vec<PersonSummary>,
}

/// A person with the carts they currently hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonView {
    /// Person id
    pub id: i64,
    /// Full name
    pub name: String,
    /// Role at the venue
    pub role: PersonRole,
    /// Contact phone number
    pub phone: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Carts the person is assigned to
    pub assigned_carts: Vec<CartSummary>,
}

/// One usage session with names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryView {
    /// Session id
    pub id: i64,
    /// Cart the session belongs to
    pub cart_id: i64,
    /// Cart number, if the cart still exists
    pub cart_number: Option<String>,
    /// Person the session was recorded for
    pub person_id: i64,
    /// Person name, if the person still exists
    pub person_name: Option<String>,
    /// When the cart went out
    pub checkout_time: DateTime<FixedOffset>,
    /// When the cart came back
    pub return_time: Option<DateTime<FixedOffset>>,
    /// Deadline computed at checkout
    pub expected_return_time: DateTime<FixedOffset>,
    /// Battery percentage at checkout
    pub battery_level_start: i32,
    /// Battery percentage at return
    pub battery_level_end: Option<i32>,
    /// Return notes
    pub notes: Option<String>,
    /// When the row was written
    pub created_at: DateTime<FixedOffset>,
    /// Returned late, or still out past the expected return time
    pub overdue: bool,
}

fn local(time: &TimeService, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    time.to_zone(instant).fixed_offset()
}

impl From<&person::Model> for PersonSummary {
    fn from(person: &person::Model) -> Self {
        Self {
            id: person.id,
            name: person.name.clone(),
            role: person.role,
        }
    }
}

impl From<&cart::Model> for CartSummary {
    fn from(cart: &cart::Model) -> Self {
        Self {
            id: cart.id,
            cart_number: cart.cart_number.clone(),
            status: cart.status,
        }
    }
}

impl CartView {
    /// Builds the view from a cart row and its assignees.
    #[must_use]
    pub fn new(time: &TimeService, cart: &cart::Model, assigned_to: Vec<PersonSummary>) -> Self {
        Self {
            id: cart.id,
            cart_number: cart.cart_number.clone(),
            status: cart.status,
            battery_level: cart.battery_level,
            checkout_time: cart.checkout_time.map(|t| local(time, t)),
            return_by_time: cart.return_by_time.map(|t| local(time, t)),
            assigned_to,
        }
    }
}

impl PersonView {
    /// Builds the view from a person row and their carts.
    #[must_use]
    pub fn new(person: &person::Model, assigned_carts: Vec<CartSummary>) -> Self {
        Self {
            id: person.id,
            name: person.name.clone(),
            role: person.role,
            phone: person.phone.clone(),
            email: person.email.clone(),
            assigned_carts,
        }
    }
}

impl HistoryView {
    /// Builds the view from a history row and the resolved names.
    #[must_use]
    pub fn new(
        time: &TimeService,
        row: &cart_history::Model,
        cart_number: Option<String>,
        person_name: Option<String>,
    ) -> Self {
        let overdue = match row.return_time {
            Some(returned) => returned > row.expected_return_time,
            None => time.is_overdue(row.expected_return_time),
        };
        Self {
            id: row.id,
            cart_id: row.cart_id,
            cart_number,
            person_id: row.person_id,
            person_name,
            checkout_time: local(time, row.checkout_time),
            return_time: row.return_time.map(|t| local(time, t)),
            expected_return_time: local(time, row.expected_return_time),
            battery_level_start: row.battery_level_start,
            battery_level_end: row.battery_level_end,
            notes: row.notes.clone(),
            created_at: local(time, row.created_at),
            overdue,
        }
    }
}

/// Builds views for a batch of carts, keeping the input order.
pub async fn cart_views(
    db: &DatabaseConnection,
    time: &TimeService,
    carts: &[cart::Model],
) -> Result<Vec<CartView>> {
    let links = CartAssignment::find()
        .filter(cart_assignment::Column::CartId.is_in(carts.iter().map(|c| c.id)))
        .order_by_asc(cart_assignment::Column::AssignedAt)
        .order_by_asc(cart_assignment::Column::PersonId)
        .find_also_related(Person)
        .all(db)
        .await?;

    let mut assignees: HashMap<i64, Vec<PersonSummary>> = HashMap::new();
    for (link, person) in links {
        if let Some(person) = person {
            assignees
                .entry(link.cart_id)
                .or_default()
                .push(PersonSummary::from(&person));
        }
    }

    Ok(carts
        .iter()
        .map(|cart| CartView::new(time, cart, assignees.remove(&cart.id).unwrap_or_default()))
        .collect())
}

/// Builds views for a batch of persons, keeping the input order.
pub async fn person_views(
    db: &DatabaseConnection,
    persons: &[person::Model],
) -> Result<Vec<PersonView>> {
    let links = CartAssignment::find()
        .filter(cart_assignment::Column::PersonId.is_in(persons.iter().map(|p| p.id)))
        .order_by_asc(cart_assignment::Column::AssignedAt)
        .find_also_related(Cart)
        .all(db)
        .await?;

    let mut carts: HashMap<i64, Vec<CartSummary>> = HashMap::new();
    for (link, cart) in links {
        if let Some(cart) = cart {
            carts
                .entry(link.person_id)
                .or_default()
                .push(CartSummary::from(&cart));
        }
    }

    Ok(persons
        .iter()
        .map(|person| PersonView::new(person, carts.remove(&person.id).unwrap_or_default()))
        .collect())
}

/// Builds views for a batch of sessions, resolving cart numbers and person names.
pub async fn history_views(
    db: &DatabaseConnection,
    time: &TimeService,
    rows: &[cart_history::Model],
) -> Result<Vec<HistoryView>> {
    let cart_numbers: HashMap<i64, String> = Cart::find()
        .filter(cart::Column::Id.is_in(rows.iter().map(|r| r.cart_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.cart_number))
        .collect();
    let person_names: HashMap<i64, String> = Person::find()
        .filter(person::Column::Id.is_in(rows.iter().map(|r| r.person_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    Ok(rows
        .iter()
        .map(|row| {
            HistoryView::new(
                time,
                row,
                cart_numbers.get(&row.cart_id).cloned(),
                person_names.get(&row.person_id).cloned(),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::assignment::{ReturnRequest, assign_person, return_cart};
    use crate::core::cart::get_all_carts;
    use crate::core::history::get_history_for_cart;
    use crate::core::person::get_all_persons;
    use crate::test_utils::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_cart_view_renders_venue_time() -> Result<()> {
        let (db, cart, person) = setup_with_cart_and_person().await?;
        let time = time_at("2024-06-01T20:00:00");
        create_test_cart(&db, "B-001").await?;
        assign_person(&db, &time, cart.id, person.id).await?;

        let views = cart_views(&db, &time, &get_all_carts(&db).await?).await?;
        assert_eq!(views.len(), 2);

        let value = serde_json::to_value(&views[0]).unwrap();
        assert_eq!(value["status"], "in-use");
        assert_eq!(value["checkout_time"], "2024-06-01T20:00:00-04:00");
        assert_eq!(value["return_by_time"], "2024-06-01T23:59:59-04:00");
        assert_eq!(
            value["assigned_to"],
            json!([{ "id": person.id, "name": "John Doe", "role": "volunteer" }])
        );

        let idle = serde_json::to_value(&views[1]).unwrap();
        assert_eq!(idle["status"], "available");
        assert!(idle["checkout_time"].is_null());
        assert_eq!(idle["assigned_to"], json!([]));

        Ok(())
    }

    #[tokio::test]
    async fn test_person_view_lists_assigned_carts() -> Result<()> {
        let (db, cart, person) = setup_with_cart_and_person().await?;
        let time = time_at("2024-06-01T10:00:00");
        assign_person(&db, &time, cart.id, person.id).await?;

        let views = person_views(&db, &get_all_persons(&db).await?).await?;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].assigned_carts.len(), 1);
        assert_eq!(views[0].assigned_carts[0].cart_number, cart.cart_number);
        assert_eq!(views[0].assigned_carts[0].status, CartStatus::InUse);

        Ok(())
    }

    #[tokio::test]
    async fn test_history_view_overdue_flag() -> Result<()> {
        let (db, cart, person) = setup_with_cart_and_person().await?;
        let checkout = time_at("2024-06-01T10:00:00");
        assign_person(&db, &checkout, cart.id, person.id).await?;

        // Still out before the deadline
        let rows = get_history_for_cart(&db, cart.id).await?;
        let views = history_views(&db, &time_at("2024-06-01T15:00:00"), &rows).await?;
        assert!(!views[0].overdue);
        assert_eq!(views[0].person_name.as_deref(), Some("John Doe"));
        assert_eq!(views[0].cart_number.as_deref(), Some(cart.cart_number.as_str()));

        // Still out after the deadline
        let views = history_views(&db, &time_at("2024-06-01T17:00:00"), &rows).await?;
        assert!(views[0].overdue);

        // Returned late
        let late = time_at("2024-06-01T16:30:00");
        return_cart(&db, &late, cart.id, ReturnRequest::default()).await?;
        let rows = get_history_for_cart(&db, cart.id).await?;
        let views = history_views(&db, &late, &rows).await?;
        assert!(views[0].overdue);
        assert_eq!(
            views[0].return_time.unwrap().to_rfc3339(),
            "2024-06-01T16:30:00-04:00"
        );

        Ok(())
    }
}
