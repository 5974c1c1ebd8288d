//! Entities of the café: menu, inventory and orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{IngredientId, Money, OrderId, ProductId};

/// One ingredient of a menu item's recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub ingredient_id: IngredientId,
    /// Amount consumed per unit of the menu item, in the ingredient's unit.
    pub quantity: f64,
}

/// A sellable product with a fixed recipe and price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub ingredients: Vec<RecipeIngredient>,
}

/// Stock of one ingredient.
///
/// `quantity` is never negative; the stores enforce it on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: IngredientId,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Open ──┬──► Closed
///        └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order accepted and stock deducted, not yet served.
    #[default]
    Open,

    /// Order served (terminal state).
    Closed,

    /// Order abandoned before being served (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order can be closed in this state.
    pub fn can_close(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }

    /// Returns true if the order can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Cancelled)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Closed => "closed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(OrderStatus::Open),
            "closed" => Ok(OrderStatus::Closed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// A line of an order.
///
/// Product name and unit price are captured when the order is created, so
/// later menu edits do not rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns the total price for this line (quantity * unit_price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// An order ready to be inserted; identity and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_name: String,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub idempotency_key: Option<String>,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl Order {
    /// Builds the persisted form of `new` with the store-assigned identity.
    ///
    /// Every new order starts `open`.
    pub fn from_new(new: NewOrder, id: OrderId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_name: new.customer_name,
            lines: new.lines,
            total: new.total,
            status: OrderStatus::Open,
            created_at,
            idempotency_key: new.idempotency_key,
        }
    }
}
