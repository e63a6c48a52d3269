//! `CartBuddy` - Golf-cart assignment for a venue
//!
//! This crate tracks a fleet of golf carts, the staff and volunteers who check them out,
//! and a ledger of every checkout-to-return session, with all times shown in the venue's
//! civil time zone.

#![deny(
    unsafe_code,
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    // No panics outside tests; errors propagate through `errors::Result`
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    // `TimeService` shares its clock through an `Arc`
    clippy::clone_on_ref_ptr,
    clippy::semicolon_if_nothing_returned,
    rust_2018_idioms,
)]
#![allow(
    clippy::module_name_repetitions,
    // Error cases are listed on the lifecycle operations only
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
)]

/// Configuration management for database and venue settings
pub mod config;
/// Core business logic - framework-agnostic cart, person, assignment and history operations
pub mod core;
/// SeaORM entity definitions for database tables
pub mod entities;
/// Unified error types and result handling
pub mod errors;

#[cfg(test)]
pub mod test_utils;
