//! Assignment engine - The checkout lifecycle of a cart.
//!
//! A cart goes in-use when its first person is assigned, picks up at most one more
//! assignee, and returns to available either when its last assignee is removed or when it
//! is returned. Each operation runs in one transaction: links, history and the cart row
//! commit together or not at all, and the cart write carries the optimistic version check
//! from `persist_cart_state`.

use crate::{
    core::{
        cart::{get_assignees, persist_cart_state, require_cart},
        history::{
            SessionClose, close_session, get_open_session, open_session, session_recorded,
        },
        person::require_person,
        time::TimeService,
        validation::{validate_battery_level, validate_notes},
    },
    entities::{CartAssignment, CartStatus, cart, cart_assignment},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sea_orm::{PaginatorTrait, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, warn};

/// Most people that can share one cart
pub const MAX_ASSIGNEES: usize = 2;

/// Details supplied when a cart comes back.
#[derive(Debug, Clone, Default)]
pub struct ReturnRequest {
    /// Defaults to now
    pub return_time: Option<DateTime<Tz>>,
    /// Defaults to the cart's battery level before the return
    pub battery_level_end: Option<i32>,
    /// Free-form return notes
    pub notes: Option<String>,
}

async fn is_assigned<C>(db: &C, cart_id: i64, person_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let link = CartAssignment::find_by_id((cart_id, person_id))
        .one(db)
        .await?;
    Ok(link.is_some())
}

/// Assigns a person to a cart.
///
/// The first assignee checks the cart out: it goes in-use, gets a checkout time of now and
/// a derived return-by time, and a history session opens in that person's name. A second
/// assignee only joins.
///
/// # Errors
/// - `Error::CartNotFound` / `Error::PersonNotFound` for unknown ids
/// - `Error::CartInMaintenance` if the cart is under maintenance
/// - `Error::CapacityExceeded` if the cart already has [`MAX_ASSIGNEES`] people
/// - `Error::AlreadyAssigned` if the person is already on this cart
/// - `Error::ConcurrentModification` if the cart changed while we were writing
pub async fn assign_person(
    db: &DatabaseConnection,
    time: &TimeService,
    cart_id: i64,
    person_id: i64,
) -> Result<cart::Model> {
    let txn = db.begin().await?;

    let cart = require_cart(&txn, cart_id).await?;
    let person = require_person(&txn, person_id).await?;

    if cart.status == CartStatus::Maintenance {
        return Err(Error::CartInMaintenance { cart_id });
    }

    let assignee_count = CartAssignment::find()
        .filter(cart_assignment::Column::CartId.eq(cart_id))
        .count(&txn)
        .await?;
    if assignee_count >= MAX_ASSIGNEES as u64 {
        return Err(Error::CapacityExceeded {
            cart_id,
            limit: MAX_ASSIGNEES,
        });
    }
    if is_assigned(&txn, cart_id, person_id).await? {
        return Err(Error::AlreadyAssigned { cart_id, person_id });
    }

    let now = time.now();
    let now_utc = now.with_timezone(&Utc);

    let link = cart_assignment::ActiveModel {
        cart_id: Set(cart_id),
        person_id: Set(person_id),
        assigned_at: Set(now_utc),
    };
    CartAssignment::insert(link)
        .exec_without_returning(&txn)
        .await?;

    let mut next = cart.clone();
    let checking_out = cart.status != CartStatus::InUse;
    if checking_out {
        next.status = CartStatus::InUse;
        next.checkout_time = Some(now_utc);
        next.return_by_time = Some(time.derive_return_by(now).with_timezone(&Utc));
    }

    let saved = persist_cart_state(&txn, &next).await?;
    if checking_out {
        open_session(&txn, &saved, person_id, now_utc).await?;
    }

    txn.commit().await?;

    if checking_out {
        info!(
            "Cart {} checked out to {} (ID: {})",
            saved.cart_number, person.name, person_id
        );
    } else {
        info!(
            "{} (ID: {}) joined cart {}",
            person.name, person_id, saved.cart_number
        );
    }
    Ok(saved)
}

/// Removes a person from a cart.
///
/// When the last assignee leaves, the cart becomes available with its times cleared and
/// its open session is closed at the current battery level.
///
/// # Errors
/// - `Error::CartNotFound` for an unknown cart
/// - `Error::NotAssigned` if the person is not on this cart
/// - `Error::ConcurrentModification` if the cart changed while we were writing
pub async fn unassign_person(
    db: &DatabaseConnection,
    time: &TimeService,
    cart_id: i64,
    person_id: i64,
) -> Result<cart::Model> {
    let txn = db.begin().await?;

    let cart = require_cart(&txn, cart_id).await?;
    if !is_assigned(&txn, cart_id, person_id).await? {
        return Err(Error::NotAssigned { cart_id, person_id });
    }

    CartAssignment::delete_by_id((cart_id, person_id))
        .exec(&txn)
        .await?;

    let remaining = CartAssignment::find()
        .filter(cart_assignment::Column::CartId.eq(cart_id))
        .count(&txn)
        .await?;

    let mut next = cart.clone();
    if remaining == 0 {
        next.status = CartStatus::Available;
        next.checkout_time = None;
        next.return_by_time = None;

        close_session(
            &txn,
            cart_id,
            &SessionClose {
                return_time: time.now().with_timezone(&Utc),
                battery_level_end: Some(cart.battery_level),
                notes: None,
            },
        )
        .await?;
    }

    let saved = persist_cart_state(&txn, &next).await?;
    txn.commit().await?;

    if remaining == 0 {
        info!(
            "Last assignee {} left cart {}, cart is available",
            person_id, saved.cart_number
        );
    } else {
        info!("Person {} unassigned from cart {}", person_id, saved.cart_number);
    }
    Ok(saved)
}

/// Returns a cart to the pool.
///
/// Closes the open session with the return details, or, when the cart lost its session,
/// records one from the cart's checkout state and first assignee. A checkout whose session
/// was already closed in history is left as it is. Afterwards the cart is available with no
/// assignees or times, and its battery is the reported end level.
pub async fn return_cart(
    db: &DatabaseConnection,
    time: &TimeService,
    cart_id: i64,
    request: ReturnRequest,
) -> Result<cart::Model> {
    if let Some(level) = request.battery_level_end {
        validate_battery_level(level)?;
    }
    validate_notes(request.notes.as_deref())?;

    let txn = db.begin().await?;
    let cart = require_cart(&txn, cart_id).await?;

    let return_time = request
        .return_time
        .unwrap_or_else(|| time.now())
        .with_timezone(&Utc);
    if let Some(checkout) = cart.checkout_time {
        if return_time < checkout {
            return Err(Error::validation(
                "return_time",
                "Return time cannot be before checkout time",
            ));
        }
    }
    let battery_level_end = request.battery_level_end.unwrap_or(cart.battery_level);

    if get_open_session(&txn, cart_id).await?.is_none() {
        let already_closed = match cart.checkout_time {
            Some(checkout) => session_recorded(&txn, cart_id, checkout).await?,
            None => false,
        };
        let first_assignee = get_assignees(&txn, cart_id).await?.into_iter().next();
        match (cart.checkout_time, cart.return_by_time, first_assignee) {
            _ if already_closed => debug!(
                "Cart {} session was already closed in history",
                cart.cart_number
            ),
            (Some(_), Some(_), Some(person)) => {
                warn!(
                    "Cart {} had no open session, recording one for {}",
                    cart.cart_number, person.name
                );
                let created_at = time.now().with_timezone(&Utc);
                open_session(&txn, &cart, person.id, created_at).await?;
            }
            _ => warn!(
                "Cart {} returned without a session to record",
                cart.cart_number
            ),
        }
    }

    close_session(
        &txn,
        cart_id,
        &SessionClose {
            return_time,
            battery_level_end: Some(battery_level_end),
            notes: request.notes,
        },
    )
    .await?;

    CartAssignment::delete_many()
        .filter(cart_assignment::Column::CartId.eq(cart_id))
        .exec(&txn)
        .await?;

    let next = cart::Model {
        status: CartStatus::Available,
        battery_level: battery_level_end,
        checkout_time: None,
        return_by_time: None,
        ..cart
    };
    let saved = persist_cart_state(&txn, &next).await?;
    txn.commit().await?;

    info!(
        "Cart {} returned with battery at {}%",
        saved.cart_number, saved.battery_level
    );
    Ok(saved)
}
