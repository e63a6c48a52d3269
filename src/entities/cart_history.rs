//! Cart history entity - One checkout-to-return usage session.
//!
//! A row is "open" while `return_time` is `None`; a cart has at most one open
//! row at a time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart history database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_history")]
pub struct Model {
    /// Unique identifier for the session
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Cart that was checked out
    pub cart_id: i64,
    /// Person the session was opened for
    pub person_id: i64,
    /// When the cart was checked out
    pub checkout_time: DateTimeUtc,
    /// When the cart actually came back
    pub return_time: Option<DateTimeUtc>,
    /// Deadline computed at checkout
    pub expected_return_time: DateTimeUtc,
    /// Battery percentage at checkout
    pub battery_level_start: i32,
    /// Battery percentage at return
    pub battery_level_end: Option<i32>,
    /// Free-form return notes
    pub notes: Option<String>,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Whether the session is still waiting for a return.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.return_time.is_none()
    }
}

/// Defines relationships between `CartHistory` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each session belongs to one cart
    #[sea_orm(
        belongs_to = "super::cart::Entity",
        from = "Column::CartId",
        to = "super::cart::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Cart,
    /// Each session belongs to one person
    #[sea_orm(
        belongs_to = "super::person::Entity",
        from = "Column::PersonId",
        to = "super::person::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Person,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<super::person::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Person.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
