//! Venue configuration loading from config.toml
//!
//! The venue file names the civil time zone every timestamp is shown in and,
//! optionally, the fleet to seed into an empty database on first run.

use crate::core::cart::{BulkCartRequest, insert_cart_batch};
use crate::entities::{Cart, CartStatus};
use crate::errors::{Error, Result};
use chrono_tz::Tz;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, TransactionTrait};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Default civil zone of the venue
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct VenueConfig {
    /// IANA zone name used for all timestamps
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Carts to create when the database has none
    #[serde(default)]
    pub fleet: Vec<FleetSeed>,
}

/// One bulk-create batch of carts to seed
#[derive(Debug, Deserialize, Clone)]
pub struct FleetSeed {
    /// Cart number prefix, e.g. "A"
    pub prefix: String,
    /// First number of the batch
    #[serde(default = "default_start_number")]
    pub start_number: u32,
    /// How many carts to create
    pub count: u32,
    /// Initial battery level
    #[serde(default = "default_battery_level")]
    pub battery_level: i32,
    /// Initial status
    #[serde(default = "default_status")]
    pub status: CartStatus,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

const fn default_start_number() -> u32 {
    1
}

const fn default_battery_level() -> i32 {
    100
}

const fn default_status() -> CartStatus {
    CartStatus::Available
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            fleet: Vec::new(),
        }
    }
}

impl VenueConfig {
    /// Resolves the configured zone name.
    pub fn zone(&self) -> Result<Tz> {
        self.timezone.parse().map_err(|_| Error::Config {
            message: format!("Unknown timezone '{}'", self.timezone),
        })
    }
}

/// Loads venue configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<VenueConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse venue config: {e}"),
    })
}

/// Loads venue configuration from `CART_BUDDY_CONFIG` or ./config.toml.
///
/// A missing file is not an error; the defaults apply.
pub fn load_default_config() -> Result<VenueConfig> {
    let path = std::env::var("CART_BUDDY_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        info!("No venue config at {}, using defaults", path);
        return Ok(VenueConfig::default());
    }
    load_config(path)
}

/// Seeds the configured fleet into an empty database.
///
/// Does nothing once any cart exists, so restarts never duplicate the fleet. All batches
/// commit together; if any batch is rejected, no cart is created.
/// Returns the number of carts created.
pub async fn seed_fleet(db: &DatabaseConnection, config: &VenueConfig) -> Result<usize> {
    let txn = db.begin().await?;

    let existing = Cart::find().count(&txn).await?;
    if existing > 0 {
        debug!("Fleet already has {} carts, skipping seed", existing);
        return Ok(0);
    }

    let mut created = 0;
    for seed in &config.fleet {
        let request = BulkCartRequest {
            prefix: seed.prefix.clone(),
            start_number: seed.start_number,
            count: seed.count,
            status: seed.status,
            battery_level: seed.battery_level,
        };
        created += insert_cart_batch(&txn, &request).await?.len();
    }

    txn.commit().await?;
    info!("Seeded {} carts from venue config", created);
    Ok(created)
}
