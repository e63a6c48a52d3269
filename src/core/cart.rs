//! Cart registry - Creating, editing and removing carts.
//!
//! Direct edits here cover status and battery only; checkout and return-by times belong to
//! the assignment lifecycle in [`crate::core::assignment`]. Every write that touches a
//! cart's lifecycle state goes through `persist_cart_state`, which bumps the cart's
//! version with an optimistic check so two concurrent writers cannot both win.

use crate::{
    core::{
        history::{SessionClose, close_session},
        time::TimeService,
        validation::{validate_battery_level, validate_cart_number},
    },
    entities::{
        Cart, CartAssignment, CartHistory, CartStatus, Person, cart, cart_assignment,
        cart_history, person,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::collections::HashSet;
use tracing::{debug, info};

/// Battery level of a cart created without one
pub const DEFAULT_BATTERY_LEVEL: i32 = 100;
/// Largest batch accepted by [`bulk_create_carts`]
pub const MAX_BULK_CARTS: u32 = 50;

/// Input for [`create_cart`].
#[derive(Debug, Clone, Default)]
pub struct NewCart {
    /// Painted number, trimmed before it is stored
    pub cart_number: String,
    /// Defaults to [`DEFAULT_BATTERY_LEVEL`]
    pub battery_level: Option<i32>,
    /// Defaults to available
    pub status: Option<CartStatus>,
}

/// Input for [`bulk_create_carts`].
#[derive(Debug, Clone)]
pub struct BulkCartRequest {
    /// Number prefix, e.g. "A"
    pub prefix: String,
    /// First number of the run
    pub start_number: u32,
    /// How many carts to create, 1 through 50
    pub count: u32,
    /// Status shared by every cart in the batch
    pub status: CartStatus,
    /// Battery level shared by every cart in the batch
    pub battery_level: i32,
}

/// Partial update for [`update_cart`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct CartPatch {
    /// New status; in-use is rejected
    pub status: Option<CartStatus>,
    /// New battery level, 0 through 100
    pub battery_level: Option<i32>,
}

/// Retrieves every cart, ordered by cart number.
pub async fn get_all_carts(db: &DatabaseConnection) -> Result<Vec<cart::Model>> {
    Cart::find()
        .order_by_asc(cart::Column::CartNumber)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Looks up a cart by id.
pub async fn get_cart_by_id(db: &DatabaseConnection, cart_id: i64) -> Result<Option<cart::Model>> {
    Cart::find_by_id(cart_id).one(db).await.map_err(Into::into)
}

/// Exact cart number lookup.
pub async fn get_cart_by_number(
    db: &DatabaseConnection,
    cart_number: &str,
) -> Result<Option<cart::Model>> {
    Cart::find()
        .filter(cart::Column::CartNumber.eq(cart_number))
        .one(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn require_cart<C>(db: &C, cart_id: i64) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    Cart::find_by_id(cart_id)
        .one(db)
        .await?
        .ok_or(Error::CartNotFound { id: cart_id })
}

/// People currently assigned to a cart, in the order they joined.
pub async fn get_assignees<C>(db: &C, cart_id: i64) -> Result<Vec<person::Model>>
where
    C: ConnectionTrait,
{
    Person::find()
        .inner_join(CartAssignment)
        .filter(cart_assignment::Column::CartId.eq(cart_id))
        .order_by_asc(cart_assignment::Column::AssignedAt)
        .order_by_asc(person::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Writes the cart's lifecycle columns if nobody else changed the cart since it was read.
///
/// The update only matches when the stored version still equals `cart.version`, and bumps
/// it by one.
///
/// # Errors
/// `Error::ConcurrentModification` when the version moved underneath us.
pub(crate) async fn persist_cart_state<C>(db: &C, cart: &cart::Model) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    let state = cart::ActiveModel {
        status: Set(cart.status),
        battery_level: Set(cart.battery_level),
        checkout_time: Set(cart.checkout_time),
        return_by_time: Set(cart.return_by_time),
        ..Default::default()
    };

    let result = Cart::update_many()
        .set(state)
        .col_expr(
            cart::Column::Version,
            Expr::col(cart::Column::Version).add(1),
        )
        .filter(cart::Column::Id.eq(cart.id))
        .filter(cart::Column::Version.eq(cart.version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::ConcurrentModification { cart_id: cart.id });
    }

    Ok(cart::Model {
        version: cart.version + 1,
        ..cart.clone()
    })
}

async fn ensure_cart_number_available<C>(db: &C, cart_number: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = Cart::find()
        .filter(cart::Column::CartNumber.eq(cart_number))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::DuplicateCartNumber {
            cart_number: cart_number.to_string(),
        });
    }
    Ok(())
}

fn reject_direct_in_use(status: CartStatus) -> Result<()> {
    if status == CartStatus::InUse {
        return Err(Error::validation(
            "status",
            "A cart becomes in-use by assigning a person to it",
        ));
    }
    Ok(())
}

/// Creates a single cart.
///
/// # Errors
/// - `Error::Validation` for a missing cart number, out-of-range battery, or in-use status
/// - `Error::DuplicateCartNumber` if the number is taken
pub async fn create_cart(db: &DatabaseConnection, input: NewCart) -> Result<cart::Model> {
    let cart_number = validate_cart_number(&input.cart_number)?;
    let battery_level = input.battery_level.unwrap_or(DEFAULT_BATTERY_LEVEL);
    validate_battery_level(battery_level)?;
    let status = input.status.unwrap_or(CartStatus::Available);
    reject_direct_in_use(status)?;

    ensure_cart_number_available(db, &cart_number).await?;

    let cart = cart::ActiveModel {
        cart_number: Set(cart_number),
        status: Set(status),
        battery_level: Set(battery_level),
        checkout_time: Set(None),
        return_by_time: Set(None),
        version: Set(0),
        ..Default::default()
    };

    let result = cart.insert(db).await?;
    info!("Created cart {} (ID: {})", result.cart_number, result.id);
    Ok(result)
}

/// Cart numbers for a bulk request: `{prefix}-{n}` with `n` zero-padded to three digits.
#[must_use]
pub fn bulk_cart_numbers(prefix: &str, start_number: u32, count: u32) -> Vec<String> {
    (0..count)
        .map(|i| format!("{prefix}-{:03}", u64::from(start_number) + u64::from(i)))
        .collect()
}

/// Inserts one bulk batch on an existing connection or transaction.
///
/// Validates the whole batch and checks every number for clashes before the first insert.
/// The caller owns the transaction, so several batches can commit together.
pub(crate) async fn insert_cart_batch<C>(
    db: &C,
    request: &BulkCartRequest,
) -> Result<Vec<cart::Model>>
where
    C: ConnectionTrait,
{
    if request.count == 0 || request.count > MAX_BULK_CARTS {
        return Err(Error::validation(
            "count",
            format!("Count must be between 1 and {MAX_BULK_CARTS}"),
        ));
    }
    let prefix = request.prefix.trim();
    if prefix.is_empty() {
        return Err(Error::validation("prefix", "Prefix is required"));
    }
    validate_battery_level(request.battery_level)?;
    reject_direct_in_use(request.status)?;

    let numbers = bulk_cart_numbers(prefix, request.start_number, request.count);
    let mut seen = HashSet::with_capacity(numbers.len());
    for number in &numbers {
        validate_cart_number(number)?;
        if !seen.insert(number.as_str()) {
            return Err(Error::DuplicateCartNumber {
                cart_number: number.clone(),
            });
        }
    }

    let existing = Cart::find()
        .filter(cart::Column::CartNumber.is_in(numbers.iter().cloned()))
        .order_by_asc(cart::Column::CartNumber)
        .one(db)
        .await?;
    if let Some(clash) = existing {
        return Err(Error::DuplicateCartNumber {
            cart_number: clash.cart_number,
        });
    }

    let mut created = Vec::with_capacity(numbers.len());
    for cart_number in numbers {
        let cart = cart::ActiveModel {
            cart_number: Set(cart_number),
            status: Set(request.status),
            battery_level: Set(request.battery_level),
            checkout_time: Set(None),
            return_by_time: Set(None),
            version: Set(0),
            ..Default::default()
        };
        created.push(cart.insert(db).await?);
    }
    Ok(created)
}

/// Creates a run of sequentially numbered carts, all or nothing.
///
/// # Errors
/// - `Error::Validation` if `count` is outside 1..=50 or the shared fields are invalid
/// - `Error::DuplicateCartNumber` for the first generated number that already exists or
///   repeats within the batch; nothing is written in that case
pub async fn bulk_create_carts(
    db: &DatabaseConnection,
    request: BulkCartRequest,
) -> Result<Vec<cart::Model>> {
    let txn = db.begin().await?;
    let created = insert_cart_batch(&txn, &request).await?;
    txn.commit().await?;
    info!(
        "Bulk created {} carts with prefix '{}'",
        created.len(),
        request.prefix.trim()
    );
    Ok(created)
}

/// Directly edits a cart's status or battery level.
///
/// Marking a cart available ends whatever session it was in: times and assignees are
/// cleared and the open history entry is closed at the current battery level. Maintenance
/// only changes the status.
pub async fn update_cart(
    db: &DatabaseConnection,
    time: &TimeService,
    cart_id: i64,
    patch: CartPatch,
) -> Result<cart::Model> {
    if let Some(level) = patch.battery_level {
        validate_battery_level(level)?;
    }
    if let Some(status) = patch.status {
        reject_direct_in_use(status)?;
    }

    let txn = db.begin().await?;
    let current = require_cart(&txn, cart_id).await?;
    let mut next = current.clone();

    if let Some(level) = patch.battery_level {
        next.battery_level = level;
    }

    if patch.status == Some(CartStatus::Available) {
        next.status = CartStatus::Available;
        next.checkout_time = None;
        next.return_by_time = None;

        CartAssignment::delete_many()
            .filter(cart_assignment::Column::CartId.eq(cart_id))
            .exec(&txn)
            .await?;

        let closed = close_session(
            &txn,
            cart_id,
            &SessionClose {
                return_time: time.now().with_timezone(&Utc),
                battery_level_end: Some(next.battery_level),
                notes: None,
            },
        )
        .await?;
        if !closed.is_empty() {
            info!("Cart {} marked available, closed its open session", cart_id);
        }
    } else if let Some(status) = patch.status {
        next.status = status;
    }

    let saved = persist_cart_state(&txn, &next).await?;
    txn.commit().await?;
    debug!("Updated cart {}", cart_id);
    Ok(saved)
}

/// Deletes history, assignment links and finally the carts themselves.
async fn purge_carts<C>(db: &C, cart_ids: &[i64]) -> Result<u64>
where
    C: ConnectionTrait,
{
    CartHistory::delete_many()
        .filter(cart_history::Column::CartId.is_in(cart_ids.iter().copied()))
        .exec(db)
        .await?;
    CartAssignment::delete_many()
        .filter(cart_assignment::Column::CartId.is_in(cart_ids.iter().copied()))
        .exec(db)
        .await?;
    let result = Cart::delete_many()
        .filter(cart::Column::Id.is_in(cart_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Deletes one cart together with its links and history.
pub async fn delete_cart(db: &DatabaseConnection, cart_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    require_cart(&txn, cart_id).await?;
    purge_carts(&txn, &[cart_id]).await?;
    txn.commit().await?;
    info!("Deleted cart {}", cart_id);
    Ok(())
}

/// Deletes several carts atomically; fails without deleting anything if an id is unknown.
///
/// Returns the number of carts removed.
pub async fn bulk_delete_carts(db: &DatabaseConnection, cart_ids: &[i64]) -> Result<u64> {
    let unique: Vec<i64> = cart_ids
        .iter()
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if unique.is_empty() {
        return Ok(0);
    }

    let txn = db.begin().await?;
    let found: HashSet<i64> = Cart::find()
        .filter(cart::Column::Id.is_in(unique.iter().copied()))
        .all(&txn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    if let Some(missing) = unique.iter().find(|id| !found.contains(id)) {
        return Err(Error::CartNotFound { id: *missing });
    }

    let deleted = purge_carts(&txn, &unique).await?;
    txn.commit().await?;
    info!("Bulk deleted {} carts", deleted);
    Ok(deleted)
}

/// Deletes the entire fleet along with all links and history.
pub async fn delete_all_carts(db: &DatabaseConnection) -> Result<u64> {
    let txn = db.begin().await?;
    CartHistory::delete_many().exec(&txn).await?;
    CartAssignment::delete_many().exec(&txn).await?;
    let result = Cart::delete_many().exec(&txn).await?;
    txn.commit().await?;
    info!("Deleted all {} carts", result.rows_affected);
    Ok(result.rows_affected)
}
