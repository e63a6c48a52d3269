//! Field-level format rules shared by the person and cart registries.
//!
//! Each validator returns the first rule its input breaks as an
//! [`Error::Validation`] naming the field.

use crate::{
    entities::PersonRole,
    errors::{Error, Result},
};
use regex::Regex;
use std::sync::LazyLock;

/// Longest accepted cart number
pub const MAX_CART_NUMBER_LEN: usize = 20;
/// Longest accepted return note
pub const MAX_NOTES_LEN: usize = 500;
/// Longest accepted person name
pub const MAX_NAME_LEN: usize = 100;

#[allow(clippy::expect_used)]
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s'-]+$").expect("name pattern compiles"));

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern compiles")
});

#[allow(clippy::expect_used)]
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?\d{10,15}$").expect("phone pattern compiles"));

/// Name must be present, at least two characters, and only letters, spaces,
/// hyphens and apostrophes.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("name", "Name is required"));
    }
    if name.trim().chars().count() < 2 {
        return Err(Error::validation(
            "name",
            "Name must be at least 2 characters long",
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(
            "name",
            format!("Name must be at most {MAX_NAME_LEN} characters long"),
        ));
    }
    if !NAME_RE.is_match(name) {
        return Err(Error::validation(
            "name",
            "Name can only contain letters, spaces, hyphens, and apostrophes",
        ));
    }
    Ok(())
}

/// Empty or absent emails are always valid.
pub fn validate_email(email: Option<&str>) -> Result<()> {
    match email {
        Some(email) if !email.is_empty() && !EMAIL_RE.is_match(email) => {
            Err(Error::validation("email", "Invalid email format"))
        }
        _ => Ok(()),
    }
}

/// Empty or absent phone numbers are always valid.
pub fn validate_phone(phone: Option<&str>) -> Result<()> {
    match phone {
        Some(phone) if !phone.is_empty() && !PHONE_RE.is_match(phone) => Err(Error::validation(
            "phone",
            "Phone number must be 10-15 digits, optionally prefixed with +1",
        )),
        _ => Ok(()),
    }
}

/// Role must be exactly "admin" or "volunteer".
pub fn validate_role(role: &str) -> Result<PersonRole> {
    role.parse()
}

/// Battery level must be within 0 through 100.
pub fn validate_battery_level(level: i32) -> Result<()> {
    if (0..=100).contains(&level) {
        Ok(())
    } else {
        Err(Error::validation(
            "battery_level",
            "Battery level must be between 0 and 100",
        ))
    }
}

/// Returns the trimmed cart number.
pub fn validate_cart_number(cart_number: &str) -> Result<String> {
    let trimmed = cart_number.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("cart_number", "Cart number is required"));
    }
    if trimmed.chars().count() > MAX_CART_NUMBER_LEN {
        return Err(Error::validation(
            "cart_number",
            format!("Cart number must be at most {MAX_CART_NUMBER_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Notes are optional and at most [`MAX_NOTES_LEN`] characters.
pub fn validate_notes(notes: Option<&str>) -> Result<()> {
    match notes {
        Some(notes) if notes.chars().count() > MAX_NOTES_LEN => Err(Error::validation(
            "notes",
            format!("Notes must be at most {MAX_NOTES_LEN} characters"),
        )),
        _ => Ok(()),
    }
}

/// Maps an empty optional string to `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<()>) -> Option<&'static str> {
        match result {
            Err(Error::Validation { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("John Doe").is_ok());
        assert!(validate_name("Mary-Kate O'Neil").is_ok());
        assert!(validate_name("Al").is_ok());

        assert!(matches!(
            validate_name("   "),
            Err(Error::Validation { message, .. }) if message == "Name is required"
        ));
        assert!(matches!(
            validate_name("J"),
            Err(Error::Validation { message, .. }) if message.contains("at least 2")
        ));
        assert_eq!(field_of(validate_name("R2-D2")), Some("name"));
        assert_eq!(field_of(validate_name("Jane_Doe")), Some("name"));
        assert_eq!(field_of(validate_name(&"a".repeat(101))), Some("name"));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email(None).is_ok());
        assert!(validate_email(Some("")).is_ok());
        assert!(validate_email(Some("jane.doe+carts@example.org")).is_ok());

        assert_eq!(field_of(validate_email(Some("jane@"))), Some("email"));
        assert_eq!(field_of(validate_email(Some("jane@example"))), Some("email"));
        assert_eq!(field_of(validate_email(Some("not an email"))), Some("email"));
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone(None).is_ok());
        assert!(validate_phone(Some("")).is_ok());
        assert!(validate_phone(Some("5551234567")).is_ok());
        assert!(validate_phone(Some("+15551234567")).is_ok());
        assert!(validate_phone(Some("442071234567890")).is_ok());

        assert_eq!(field_of(validate_phone(Some("555-123-4567"))), Some("phone"));
        assert_eq!(field_of(validate_phone(Some("12345"))), Some("phone"));
        assert_eq!(field_of(validate_phone(Some("+12345678901234567"))), Some("phone"));
    }

    #[test]
    fn test_validate_role() {
        assert_eq!(validate_role("admin").ok(), Some(PersonRole::Admin));
        assert_eq!(validate_role("volunteer").ok(), Some(PersonRole::Volunteer));
        assert!(matches!(
            validate_role("Admin"),
            Err(Error::Validation { field: "role", .. })
        ));
        assert!(validate_role("").is_err());
    }

    #[test]
    fn test_validate_battery_and_cart_number() {
        assert!(validate_battery_level(0).is_ok());
        assert!(validate_battery_level(100).is_ok());
        assert_eq!(field_of(validate_battery_level(101)), Some("battery_level"));
        assert_eq!(field_of(validate_battery_level(-1)), Some("battery_level"));

        assert_eq!(validate_cart_number("  A-001 ").ok(), Some("A-001".to_string()));
        assert!(validate_cart_number("").is_err());
        assert!(validate_cart_number(&"9".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_notes() {
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some("Left by the pro shop")).is_ok());
        assert_eq!(field_of(validate_notes(Some(&"x".repeat(501)))), Some("notes"));
    }
}
