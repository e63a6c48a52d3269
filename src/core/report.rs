//! Fleet report business logic.
//!
//! This module provides the dashboard figures for the whole fleet: how many carts sit in
//! each status, how many are running low on battery and which checked-out carts are past
//! their return-by time. All functions return structured data; formatting for a log line
//! or a screen is left to the caller.

use crate::{
    core::{cart::get_all_carts, time::TimeService},
    entities::{CartStatus, cart},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Battery percentage below which a cart counts as low
pub const LOW_BATTERY_THRESHOLD: i32 = 20;

/// Status and health counts across the fleet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    /// Number of carts in the fleet
    pub total: usize,
    /// Carts ready to check out
    pub available: usize,
    /// Carts currently checked out
    pub in_use: usize,
    /// Carts pulled from service
    pub maintenance: usize,
    /// Carts below [`LOW_BATTERY_THRESHOLD`], whatever their status
    pub low_battery: usize,
    /// In-use carts past their return-by time
    pub overdue: usize,
}

/// Whether an in-use cart is past its return-by time.
#[must_use]
pub fn is_cart_overdue(time: &TimeService, cart: &cart::Model) -> bool {
    cart.status == CartStatus::InUse
        && cart
            .return_by_time
            .is_some_and(|deadline| time.is_overdue(deadline))
}

/// Tallies a set of carts.
///
/// # Arguments
/// * `time` - Supplies "now" for the overdue check
/// * `carts` - The carts to count
#[must_use]
pub fn summarize(time: &TimeService, carts: &[cart::Model]) -> FleetSummary {
    carts.iter().fold(
        FleetSummary {
            total: carts.len(),
            ..Default::default()
        },
        |mut summary, cart| {
            match cart.status {
                CartStatus::Available => summary.available += 1,
                CartStatus::InUse => summary.in_use += 1,
                CartStatus::Maintenance => summary.maintenance += 1,
            }
            if cart.battery_level < LOW_BATTERY_THRESHOLD {
                summary.low_battery += 1;
            }
            if is_cart_overdue(time, cart) {
                summary.overdue += 1;
            }
            summary
        },
    )
}

/// Generates the fleet summary from the database.
pub async fn fleet_summary(db: &DatabaseConnection, time: &TimeService) -> Result<FleetSummary> {
    let carts = get_all_carts(db).await?;
    Ok(summarize(time, &carts))
}

/// Lists in-use carts past their return-by time, ordered by cart number.
pub async fn overdue_carts(db: &DatabaseConnection, time: &TimeService) -> Result<Vec<cart::Model>> {
    let carts = get_all_carts(db).await?;
    Ok(carts
        .into_iter()
        .filter(|cart| is_cart_overdue(time, cart))
        .collect())
}

/// One-line rendering of a summary, e.g. `12 carts: 8 available, 3 in use, ...`.
#[must_use]
pub fn format_fleet_summary(summary: &FleetSummary) -> String {
    format!(
        "{} carts: {} available, {} in use, {} in maintenance, {} low battery, {} overdue",
        summary.total,
        summary.available,
        summary.in_use,
        summary.maintenance,
        summary.low_battery,
        summary.overdue
    )
}
