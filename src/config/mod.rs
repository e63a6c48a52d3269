/// Database configuration and connection management
pub mod database;

/// Venue configuration (time zone, fleet seed) from config.toml
pub mod venue;
