use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    IngredientId, InventoryItem, MenuItem, Money, NewOrder, Order, OrderId, OrderStatus, ProductId,
};
use serde::Serialize;

use crate::{LeftoverQuery, Page, Result};

/// Read access to the menu, as needed while pricing an order.
#[async_trait]
pub trait MenuCatalog: Send + Sync {
    /// Resolves a product to its price and recipe.
    ///
    /// Returns None if the product is not on the menu.
    async fn resolve(&self, product_id: ProductId) -> Result<Option<MenuItem>>;
}

/// Read access to current stock levels.
///
/// A peek is only an estimate: by the time it returns, a concurrent order may
/// already have consumed the stock. The authoritative check is
/// [`TransactionalScope::conditional_deduct`].
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Returns the current stock of an ingredient, or None if it is unknown.
    async fn peek(&self, ingredient_id: IngredientId) -> Result<Option<InventoryItem>>;
}

/// Outcome of a guarded stock decrement.
#[derive(Debug, Clone, PartialEq)]
pub enum Deduction {
    /// Stock was decremented; `remaining` is the quantity left.
    Applied { remaining: f64 },

    /// Stock was left untouched because it is lower than the requested amount.
    Insufficient {
        name: String,
        available: f64,
        unit: String,
    },

    /// The ingredient no longer exists.
    Missing,
}

/// A unit of work spanning stock deduction and order insertion.
///
/// Nothing written through a scope is visible to other scopes until
/// [`commit`](TransactionalScope::commit) succeeds. Dropping a scope without
/// committing discards its writes, so a cancelled request leaves no trace.
#[async_trait]
pub trait TransactionalScope: Send {
    /// Decrements stock only if the current quantity covers `amount`.
    ///
    /// The check and the write are one atomic step per ingredient; two scopes
    /// racing on the same ingredient can never both pass the check against the
    /// same stock.
    async fn conditional_deduct(
        &mut self,
        ingredient_id: IngredientId,
        amount: f64,
    ) -> Result<Deduction>;

    /// Inserts an order header and its lines, returning the assigned identity.
    ///
    /// Fails with `DuplicateIdempotencyKey` if the key is already taken.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<(OrderId, DateTime<Utc>)>;

    /// Makes every write of this scope durable and visible.
    async fn commit(self) -> Result<()>;

    /// Discards every write of this scope.
    async fn rollback(self) -> Result<()>;
}

/// Opens transactional scopes.
#[async_trait]
pub trait Transactional: Send + Sync {
    type Scope: TransactionalScope + 'static;

    /// Begins a new unit of work.
    async fn begin(&self) -> Result<Self::Scope>;
}

/// Result of a guarded order status change.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusTransition {
    /// The order was in the expected state and now has the new status.
    Applied(Order),

    /// The order exists but was not in the expected state; nothing changed.
    Rejected(OrderStatus),

    /// No order with that id exists.
    Missing,
}

/// Access to persisted orders outside of order creation.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Retrieves an order with its lines.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Looks up the order created with an idempotency key.
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Order>>;

    /// Moves an order from `from` to `to` only if it is currently in `from`.
    async fn transition_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<StatusTransition>;

    /// Hard-deletes an order. Stock is not credited back.
    ///
    /// Returns false if the order did not exist.
    async fn delete_order(&self, order_id: OrderId) -> Result<bool>;
}

/// Menu maintenance.
#[async_trait]
pub trait MenuRepository: MenuCatalog {
    async fn insert_menu_item(&self, item: &MenuItem) -> Result<()>;

    async fn list_menu_items(&self) -> Result<Vec<MenuItem>>;

    /// Replaces name, description, price and recipe. Returns false if missing.
    async fn update_menu_item(&self, item: &MenuItem) -> Result<bool>;

    /// Returns false if the item did not exist.
    async fn delete_menu_item(&self, product_id: ProductId) -> Result<bool>;
}

/// Inventory maintenance (manual restocking and corrections).
#[async_trait]
pub trait InventoryRepository: InventoryLedger {
    async fn insert_inventory_item(&self, item: &InventoryItem) -> Result<()>;

    async fn list_inventory_items(&self) -> Result<Vec<InventoryItem>>;

    /// Overwrites name, quantity and unit. Returns false if missing.
    async fn update_inventory_item(&self, item: &InventoryItem) -> Result<bool>;

    /// Fails with `InUse` while a menu item still uses the ingredient.
    /// Returns false if the item did not exist.
    async fn delete_inventory_item(&self, ingredient_id: IngredientId) -> Result<bool>;

    /// Paginated listing of remaining stock.
    async fn leftovers(&self, query: &LeftoverQuery) -> Result<Page<InventoryItem>>;
}

/// Revenue over closed orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesTotal {
    pub total: Money,
    pub order_count: u64,
}

/// A product ranked by ordered quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u64,
}

/// Calendar unit that order counts are grouped by, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportBucket {
    /// Day of the month, 1 to 31.
    DayOfMonth,
    /// Month of the year, 1 to 12.
    Month,
}

/// Read-only aggregates over committed orders.
#[async_trait]
pub trait SalesReports: Send + Sync {
    /// Sums the totals of closed orders.
    async fn total_sales(&self) -> Result<SalesTotal>;

    /// Ranks products by quantity ordered across orders that were not
    /// cancelled, highest first, ties broken by name.
    async fn popular_items(&self, limit: usize) -> Result<Vec<PopularItem>>;

    /// Quantity ordered per product across orders that were not cancelled
    /// and were created in `[from, to)`. A missing bound is open. Same
    /// ordering as `popular_items`, without a limit.
    async fn ordered_items_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<PopularItem>>;

    /// Number of orders that were not cancelled and were created in
    /// `[from, to)`, keyed by bucket. Empty buckets are absent.
    async fn order_counts(
        &self,
        bucket: ReportBucket,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BTreeMap<u32, u64>>;
}
