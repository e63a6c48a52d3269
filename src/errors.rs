//! Unified error type for cart, person and history operations.
//!
//! Every variant belongs to an [`ErrorKind`], which is what an outer transport
//! layer maps to a status code. Integrity failures hide their detail behind a
//! generic message.

use sea_orm::DbErr;
use thiserror::Error;

/// Machine-checkable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad format or missing required field
    Validation,
    /// Uniqueness or concurrent-update clash
    Conflict,
    /// Unknown id
    NotFound,
    /// Cart already holds the maximum number of assignees
    Capacity,
    /// Unexpected write failure or broken invariant
    Integrity,
}

impl ErrorKind {
    /// HTTP-equivalent status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation | Self::Capacity => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Integrity => 500,
        }
    }
}

/// Every failure a cart, person or history operation can report.
#[derive(Debug, Error)]
pub enum Error {
    /// A field failed its format rule
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Cart number already taken
    #[error("Cart number '{cart_number}' already exists")]
    DuplicateCartNumber { cart_number: String },

    /// Person name already taken
    #[error("A person named '{name}' already exists")]
    DuplicatePersonName { name: String },

    /// Email already taken
    #[error("Email '{email}' is already in use")]
    DuplicateEmail { email: String },

    /// Person is already on the cart
    #[error("Person {person_id} is already assigned to cart {cart_id}")]
    AlreadyAssigned { cart_id: i64, person_id: i64 },

    /// Person is not on the cart
    #[error("Person {person_id} is not assigned to cart {cart_id}")]
    NotAssigned { cart_id: i64, person_id: i64 },

    /// Cart already holds the maximum number of people
    #[error("Cart {cart_id} already has the maximum of {limit} assignees")]
    CapacityExceeded { cart_id: i64, limit: usize },

    /// Cart is pulled from service
    #[error("Cart {cart_id} is under maintenance")]
    CartInMaintenance { cart_id: i64 },

    /// Cart version moved during the write
    #[error("Cart {cart_id} was modified concurrently, retry the request")]
    ConcurrentModification { cart_id: i64 },

    /// Cart already has an open history row
    #[error("Cart {cart_id} already has an open history entry")]
    SessionAlreadyOpen { cart_id: i64 },

    /// Person is still assigned or named in history
    #[error("Person {person_id} cannot be deleted: {reason}")]
    PersonInUse { person_id: i64, reason: String },

    /// Unknown cart id
    #[error("Cart {id} not found")]
    CartNotFound { id: i64 },

    /// Unknown person id
    #[error("Person {id} not found")]
    PersonNotFound { id: i64 },

    /// Cart has no open history row
    #[error("Cart {cart_id} has no open history entry")]
    OpenSessionNotFound { cart_id: i64 },

    /// Broken invariant in stored data
    #[error("Integrity error: {message}")]
    Integrity { message: String },

    /// Unreadable or invalid configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Failure reported by the database
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl Error {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Classification used to pick a status code.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::NotAssigned { .. } | Self::CartInMaintenance { .. } => {
                ErrorKind::Validation
            }
            Self::DuplicateCartNumber { .. }
            | Self::DuplicatePersonName { .. }
            | Self::DuplicateEmail { .. }
            | Self::AlreadyAssigned { .. }
            | Self::ConcurrentModification { .. }
            | Self::SessionAlreadyOpen { .. }
            | Self::PersonInUse { .. } => ErrorKind::Conflict,
            Self::CartNotFound { .. }
            | Self::PersonNotFound { .. }
            | Self::OpenSessionNotFound { .. } => ErrorKind::NotFound,
            Self::CapacityExceeded { .. } => ErrorKind::Capacity,
            Self::Integrity { .. } | Self::Config { .. } | Self::Database(_) => {
                ErrorKind::Integrity
            }
        }
    }

    /// Message safe to hand to a caller outside the crate.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Integrity => "An unexpected error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
