//! Cart assignment entity - Links a person to a cart while it is checked out.
//!
//! The composite primary key makes a duplicate link impossible at the storage
//! level; links vanish with their cart.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart assignment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_assignments")]
pub struct Model {
    /// Assigned cart
    #[sea_orm(primary_key, auto_increment = false)]
    pub cart_id: i64,
    /// Assigned person
    #[sea_orm(primary_key, auto_increment = false)]
    pub person_id: i64,
    /// When the person joined the cart
    pub assigned_at: DateTimeUtc,
}

/// Defines relationships between `CartAssignment` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each link belongs to one cart
    #[sea_orm(
        belongs_to = "super::cart::Entity",
        from = "Column::CartId",
        to = "super::cart::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Cart,
    /// Each link belongs to one person
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
