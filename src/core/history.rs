//! History ledger - Checkout-to-return usage sessions.
//!
//! Sessions are opened and closed by the assignment lifecycle inside its own database
//! transaction, which is why `open_session` and `close_session` take any
//! `ConnectionTrait`. A cart never has more than one open session; opening a second one is
//! refused, and if legacy data ever holds several, closing reconciles all of them.

use crate::{
    core::{
        cart::require_cart,
        person::require_person,
        time::TimeService,
        validation::{validate_battery_level, validate_notes},
    },
    entities::{CartHistory, CartStatus, cart, cart_history},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, warn};

/// Return details written onto a session when it closes.
#[derive(Debug, Clone)]
pub struct SessionClose {
    /// When the cart came back
    pub return_time: DateTime<Utc>,
    /// Battery percentage at return
    pub battery_level_end: Option<i32>,
    /// Free-form return notes
    pub notes: Option<String>,
}

/// Manually recorded session, as entered by an administrator.
#[derive(Debug, Clone, Default)]
pub struct NewHistoryEntry {
    /// Cart the session belongs to
    pub cart_id: i64,
    /// Person the session is recorded for
    pub person_id: i64,
    /// Defaults to now
    pub checkout_time: Option<DateTime<Tz>>,
    /// Defaults to the derived return-by time of `checkout_time`
    pub expected_return_time: Option<DateTime<Tz>>,
    /// Leave empty to record an open session
    pub return_time: Option<DateTime<Tz>>,
    /// Defaults to the cart's current battery level
    pub battery_level_start: Option<i32>,
    /// Battery percentage at return
    pub battery_level_end: Option<i32>,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Fields that may be edited on a cart's open session.
#[derive(Debug, Clone, Default)]
pub struct HistoryPatch {
    /// Closes the session in the ledger
    pub return_time: Option<DateTime<Tz>>,
    /// Battery percentage at return
    pub battery_level_end: Option<i32>,
    /// Replaces the stored notes
    pub notes: Option<String>,
}

/// Sessions for one cart, most recent checkout first.
pub async fn get_history_for_cart(
    db: &DatabaseConnection,
    cart_id: i64,
) -> Result<Vec<cart_history::Model>> {
    CartHistory::find()
        .filter(cart_history::Column::CartId.eq(cart_id))
        .order_by_desc(cart_history::Column::CheckoutTime)
        .order_by_desc(cart_history::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sessions opened for one person, most recent checkout first.
pub async fn get_history_for_person(
    db: &DatabaseConnection,
    person_id: i64,
) -> Result<Vec<cart_history::Model>> {
    CartHistory::find()
        .filter(cart_history::Column::PersonId.eq(person_id))
        .order_by_desc(cart_history::Column::CheckoutTime)
        .order_by_desc(cart_history::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every session in the ledger, most recent checkout first.
pub async fn get_all_history(db: &DatabaseConnection) -> Result<Vec<cart_history::Model>> {
    CartHistory::find()
        .order_by_desc(cart_history::Column::CheckoutTime)
        .order_by_desc(cart_history::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The cart's open session, if it has one.
pub async fn get_open_session<C>(db: &C, cart_id: i64) -> Result<Option<cart_history::Model>>
where
    C: ConnectionTrait,
{
    CartHistory::find()
        .filter(cart_history::Column::CartId.eq(cart_id))
        .filter(cart_history::Column::ReturnTime.is_null())
        .order_by_desc(cart_history::Column::CheckoutTime)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Whether any session, open or closed, was recorded for this checkout.
pub(crate) async fn session_recorded<C>(
    db: &C,
    cart_id: i64,
    checkout_time: DateTime<Utc>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = CartHistory::find()
        .filter(cart_history::Column::CartId.eq(cart_id))
        .filter(cart_history::Column::CheckoutTime.eq(checkout_time))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Opens a session for a cart that was just checked out.
///
/// Checkout and expected return times are copied from the cart, which must already carry
/// them.
pub(crate) async fn open_session<C>(
    db: &C,
    cart: &cart::Model,
    person_id: i64,
    created_at: DateTime<Utc>,
) -> Result<cart_history::Model>
where
    C: ConnectionTrait,
{
    let (Some(checkout_time), Some(expected_return_time)) =
        (cart.checkout_time, cart.return_by_time)
    else {
        return Err(Error::Integrity {
            message: format!("cart {} has no checkout time to open a session from", cart.id),
        });
    };

    if get_open_session(db, cart.id).await?.is_some() {
        return Err(Error::SessionAlreadyOpen { cart_id: cart.id });
    }

    let session = cart_history::ActiveModel {
        cart_id: Set(cart.id),
        person_id: Set(person_id),
        checkout_time: Set(checkout_time),
        return_time: Set(None),
        expected_return_time: Set(expected_return_time),
        battery_level_start: Set(cart.battery_level),
        battery_level_end: Set(None),
        notes: Set(None),
        created_at: Set(created_at),
        ..Default::default()
    };

    let result = session.insert(db).await?;
    debug!(
        "Opened session {} for cart {} (person {})",
        result.id, cart.id, person_id
    );
    Ok(result)
}

/// Closes the cart's open session and returns the rows that were closed.
///
/// An empty result means there was nothing to close. More than one open row is a data
/// fault left by older writers; every one of them is closed with the same return details.
pub(crate) async fn close_session<C>(
    db: &C,
    cart_id: i64,
    close: &SessionClose,
) -> Result<Vec<cart_history::Model>>
where
    C: ConnectionTrait,
{
    let open_rows = CartHistory::find()
        .filter(cart_history::Column::CartId.eq(cart_id))
        .filter(cart_history::Column::ReturnTime.is_null())
        .order_by_desc(cart_history::Column::CheckoutTime)
        .all(db)
        .await?;

    if open_rows.len() > 1 {
        warn!(
            "Cart {} had {} open sessions; closing all of them",
            cart_id,
            open_rows.len()
        );
    }

    let mut closed = Vec::with_capacity(open_rows.len());
    for row in open_rows {
        let mut active: cart_history::ActiveModel = row.into();
        active.return_time = Set(Some(close.return_time));
        active.battery_level_end = Set(close.battery_level_end);
        active.notes = Set(close.notes.clone());
        closed.push(active.update(db).await?);
    }

    Ok(closed)
}

/// Records a session by hand.
///
/// An entry without a return time becomes the cart's open session. That is only accepted
/// for a checked-out cart that has lost its session; any other cart needs a return time.
pub async fn create_history_entry(
    db: &DatabaseConnection,
    time: &TimeService,
    entry: NewHistoryEntry,
) -> Result<cart_history::Model> {
    if let Some(level) = entry.battery_level_start {
        validate_battery_level(level)?;
    }
    if let Some(level) = entry.battery_level_end {
        validate_battery_level(level)?;
    }
    validate_notes(entry.notes.as_deref())?;

    let checkout_time = entry.checkout_time.unwrap_or_else(|| time.now());
    let expected_return_time = entry
        .expected_return_time
        .unwrap_or_else(|| time.derive_return_by(checkout_time));
    if let Some(return_time) = entry.return_time {
        if return_time < checkout_time {
            return Err(Error::validation(
                "return_time",
                "Return time cannot be before checkout time",
            ));
        }
    }

    let txn = db.begin().await?;

    let cart = require_cart(&txn, entry.cart_id).await?;
    require_person(&txn, entry.person_id).await?;

    if entry.return_time.is_none() {
        if cart.status != CartStatus::InUse {
            return Err(Error::validation(
                "return_time",
                "A cart that is not checked out can only get a returned entry",
            ));
        }
        if get_open_session(&txn, cart.id).await?.is_some() {
            return Err(Error::SessionAlreadyOpen { cart_id: cart.id });
        }
    }

    let session = cart_history::ActiveModel {
        cart_id: Set(cart.id),
        person_id: Set(entry.person_id),
        checkout_time: Set(checkout_time.with_timezone(&Utc)),
        return_time: Set(entry.return_time.map(|t| t.with_timezone(&Utc))),
        expected_return_time: Set(expected_return_time.with_timezone(&Utc)),
        battery_level_start: Set(entry.battery_level_start.unwrap_or(cart.battery_level)),
        battery_level_end: Set(entry.battery_level_end),
        notes: Set(entry.notes),
        created_at: Set(time.now().with_timezone(&Utc)),
        ..Default::default()
    };

    let result = session.insert(&txn).await?;
    txn.commit().await?;
    info!(
        "Recorded manual history entry {} for cart {}",
        result.id, result.cart_id
    );
    Ok(result)
}

/// Edits the return details of the cart's open session.
///
/// Setting a return time closes the session in the ledger; the cart itself is left alone.
pub async fn update_open_entry(
    db: &DatabaseConnection,
    cart_id: i64,
    patch: HistoryPatch,
) -> Result<cart_history::Model> {
    if let Some(level) = patch.battery_level_end {
        validate_battery_level(level)?;
    }
    validate_notes(patch.notes.as_deref())?;

    let txn = db.begin().await?;
    require_cart(&txn, cart_id).await?;
    let open = get_open_session(&txn, cart_id)
        .await?
        .ok_or(Error::OpenSessionNotFound { cart_id })?;

    let mut active: cart_history::ActiveModel = open.clone().into();
    if let Some(return_time) = patch.return_time {
        let return_time = return_time.with_timezone(&Utc);
        if return_time < open.checkout_time {
            return Err(Error::validation(
                "return_time",
                "Return time cannot be before checkout time",
            ));
        }
        active.return_time = Set(Some(return_time));
    }
    if let Some(level) = patch.battery_level_end {
        active.battery_level_end = Set(Some(level));
    }
    if let Some(notes) = patch.notes {
        active.notes = Set(Some(notes));
    }

    if !active.is_changed() {
        return Ok(open);
    }

    let updated = active.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}
