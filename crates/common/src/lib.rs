//! Shared types for the café order service.
//!
//! Identifiers, money and the entities that cross crate boundaries
//! (menu items, inventory items, orders) live here so that the store
//! and domain crates agree on a single representation.

pub mod model;
pub mod money;
pub mod types;

pub use model::{
    InventoryItem, MenuItem, NewOrder, Order, OrderLine, OrderStatus, RecipeIngredient,
};
pub use money::Money;
pub use types::{IngredientId, OrderId, ProductId};
