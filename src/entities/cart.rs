//! Cart entity - A golf cart tracked by the venue.
//!
//! Checkout and return-by times are only ever written by the assignment
//! lifecycle; `version` serializes concurrent mutations of a single cart.

use crate::errors::Error;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operational state of a cart
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "kebab-case")]
pub enum CartStatus {
    /// Parked and free to check out
    #[sea_orm(string_value = "available")]
    Available,
    /// Checked out to at least one person
    #[sea_orm(string_value = "in-use")]
    InUse,
    /// Pulled from service
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
}

impl CartStatus {
    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in-use",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for CartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CartStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s {
            "available" => Ok(Self::Available),
            "in-use" => Ok(Self::InUse),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(Error::validation(
                "status",
                format!("Invalid status value '{other}'"),
            )),
        }
    }
}

/// Cart database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    /// Unique identifier for the cart
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Painted cart number (e.g., "A-001")
    #[sea_orm(unique)]
    pub cart_number: String,
    /// Current status
    pub status: CartStatus,
    /// Battery percentage, 0 through 100
    pub battery_level: i32,
    /// When the current session started, set only while in use
    pub checkout_time: Option<DateTimeUtc>,
    /// Derived return deadline for the current session
    pub return_by_time: Option<DateTimeUtc>,
    /// Bumped on every lifecycle mutation
    pub version: i32,
}

/// Defines relationships between Cart and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One cart has many assignment links
    #[sea_orm(has_many = "super::cart_assignment::Entity")]
    Assignments,
    /// One cart has many history sessions
    #[sea_orm(has_many = "super::cart_history::Entity")]
    History,
}

impl Related<super::cart_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl Related<super::cart_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl Related<super::person::Entity> for Entity {
    fn to() -> RelationDef {
        super::cart_assignment::Relation::Person.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::cart_assignment::Relation::Cart.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
