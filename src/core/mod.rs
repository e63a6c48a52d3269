//! Core business logic - framework-agnostic cart, person and history operations.
//!
//! Every operation takes a `DatabaseConnection` (and a [`time::TimeService`] where "now"
//! matters) and returns [`crate::errors::Result`], so any transport can sit on top.

pub mod assignment;
pub mod cart;
pub mod history;
pub mod person;
pub mod report;
pub mod time;
pub mod validation;
pub mod views;
