//! Person entity - Staff members and volunteers who can take carts out.

use crate::errors::Error;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a person at the venue
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum PersonRole {
    /// Venue administrator
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Volunteer staff
    #[sea_orm(string_value = "volunteer")]
    Volunteer,
}

impl PersonRole {
    /// Stored name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Volunteer => "volunteer",
        }
    }
}

impl fmt::Display for PersonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonRole {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s {
            "admin" => Ok(Self::Admin),
            "volunteer" => Ok(Self::Volunteer),
            _ => Err(Error::validation(
                "role",
                "Role must be either 'admin' or 'volunteer'",
            )),
        }
    }
}

/// Person database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "persons")]
pub struct Model {
    /// Unique identifier for the person
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Full name, unique and case-sensitive
    #[sea_orm(unique)]
    pub name: String,
    /// Role at the venue
    pub role: PersonRole,
    /// Contact phone number
    pub phone: Option<String>,
    /// Contact email, unique when present
    #[sea_orm(unique)]
    pub email: Option<String>,
}

/// Defines relationships between Person and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One person has many assignment links
    #[sea_orm(has_many = "super::cart_assignment::Entity")]
    Assignments,
    /// One person has many history sessions
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

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        super::cart_assignment::Relation::Cart.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::cart_assignment::Relation::Person.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
