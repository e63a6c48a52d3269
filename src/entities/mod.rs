//! Entity module - Contains all SeaORM entity definitions for the database.
//! Carts and persons are independent roots; assignments link them while a cart
//! is in use, and history rows record each checkout-to-return session.

pub mod cart;
pub mod cart_assignment;
pub mod cart_history;
pub mod person;

// Re-export specific types to avoid conflicts
pub use cart::{CartStatus, Column as CartColumn, Entity as Cart, Model as CartModel};
pub use cart_assignment::{
    Column as CartAssignmentColumn, Entity as CartAssignment, Model as CartAssignmentModel,
};
pub use cart_history::{
    Column as CartHistoryColumn, Entity as CartHistory, Model as CartHistoryModel,
};
pub use person::{Column as PersonColumn, Entity as Person, Model as PersonModel, PersonRole};
