use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use common::{
    IngredientId, InventoryItem, MenuItem, NewOrder, Order, OrderId, OrderStatus, ProductId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{
    LeftoverQuery, LeftoverSort, Page, Result, StoreError,
    store::{
        Deduction, InventoryLedger, InventoryRepository, MenuCatalog, MenuRepository, OrderStore,
        PopularItem, ReportBucket, SalesReports, SalesTotal, StatusTransition, Transactional,
        TransactionalScope,
    },
};

const DATA_FILE: &str = "cafe.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MemoryState {
    menu: BTreeMap<ProductId, MenuItem>,
    inventory: BTreeMap<IngredientId, InventoryItem>,
    orders: Vec<Order>,
}

/// In-memory store, optionally mirrored to a JSON file.
///
/// A transactional scope holds the write lock for its whole lifetime, so
/// units of work are serialized. Without a data directory everything is lost
/// on shutdown, which is what tests want.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    data_dir: Option<Arc<PathBuf>>,
}

impl MemoryStore {
    /// Creates a new empty, purely in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a file-backed store, loading `cafe.json` from `data_dir` if present.
    ///
    /// The directory is created when missing. Every committed change rewrites
    /// the file through a temporary file and a rename.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir).await?;

        let state = match tokio::fs::read(data_dir.join(DATA_FILE)).await {
            Ok(bytes) if bytes.is_empty() => MemoryState::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryState::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            path = %data_dir.display(),
            menu_items = state.menu.len(),
            inventory_items = state.inventory.len(),
            orders = state.orders.len(),
            "loaded file-backed store"
        );

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            data_dir: Some(Arc::new(data_dir)),
        })
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Applies `f` to the state under the write lock.
    ///
    /// When file-backed, `f` runs against a copy that replaces the live state
    /// only after it has been written out.
    async fn mutate<R>(&self, f: impl FnOnce(&mut MemoryState) -> Result<R>) -> Result<R> {
        let mut guard = self.state.write().await;
        match &self.data_dir {
            Some(dir) => {
                let mut next = guard.clone();
                let result = f(&mut next)?;
                persist(dir, &next).await?;
                *guard = next;
                Ok(result)
            }
            None => f(&mut guard),
        }
    }
}

async fn persist(dir: &Path, state: &MemoryState) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(state)?;
    let tmp = dir.join(format!("{DATA_FILE}.tmp"));
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, dir.join(DATA_FILE)).await?;
    Ok(())
}

/// Unit of work over a [`MemoryStore`].
///
/// Deductions and new orders are staged next to the locked state and only
/// folded in on commit.
pub struct MemoryScope {
    guard: OwnedRwLockWriteGuard<MemoryState>,
    data_dir: Option<Arc<PathBuf>>,
    staged_stock: BTreeMap<IngredientId, f64>,
    staged_orders: Vec<Order>,
}

impl MemoryScope {
    fn apply(&self, state: &mut MemoryState) {
        for (id, quantity) in &self.staged_stock {
            if let Some(item) = state.inventory.get_mut(id) {
                item.quantity = *quantity;
            }
        }
        state.orders.extend(self.staged_orders.iter().cloned());
    }

    fn key_taken(&self, key: &str) -> bool {
        self.guard
            .orders
            .iter()
            .chain(self.staged_orders.iter())
            .any(|o| o.idempotency_key.as_deref() == Some(key))
    }
}

#[async_trait]
impl TransactionalScope for MemoryScope {
    async fn conditional_deduct(
        &mut self,
        ingredient_id: IngredientId,
        amount: f64,
    ) -> Result<Deduction> {
        let Some(item) = self.guard.inventory.get(&ingredient_id) else {
            return Ok(Deduction::Missing);
        };

        let current = self
            .staged_stock
            .get(&ingredient_id)
            .copied()
            .unwrap_or(item.quantity);

        if current < amount {
            return Ok(Deduction::Insufficient {
                name: item.name.clone(),
                available: current,
                unit: item.unit.clone(),
            });
        }

        let remaining = current - amount;
        self.staged_stock.insert(ingredient_id, remaining);
        Ok(Deduction::Applied { remaining })
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<(OrderId, DateTime<Utc>)> {
        if let Some(key) = &order.idempotency_key
            && self.key_taken(key)
        {
            return Err(StoreError::DuplicateIdempotencyKey(key.clone()));
        }

        let id = OrderId::new();
        let created_at = Utc::now();
        self.staged_orders
            .push(Order::from_new(order.clone(), id, created_at));
        Ok((id, created_at))
    }

    async fn commit(mut self) -> Result<()> {
        match self.data_dir.clone() {
            Some(dir) => {
                let mut next = self.guard.clone();
                self.apply(&mut next);
                persist(&dir, &next).await?;
                *self.guard = next;
            }
            None => {
                let mut state = std::mem::take(&mut *self.guard);
                self.apply(&mut state);
                *self.guard = state;
            }
        }
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        // Staged writes die with the scope; the lock is released on drop.
        Ok(())
    }
}

#[async_trait]
impl Transactional for MemoryStore {
    type Scope = MemoryScope;

    async fn begin(&self) -> Result<MemoryScope> {
        let guard = self.state.clone().write_owned().await;
        Ok(MemoryScope {
            guard,
            data_dir: self.data_dir.clone(),
            staged_stock: BTreeMap::new(),
            staged_orders: Vec::new(),
        })
    }
}

#[async_trait]
impl MenuCatalog for MemoryStore {
    async fn resolve(&self, product_id: ProductId) -> Result<Option<MenuItem>> {
        Ok(self.state.read().await.menu.get(&product_id).cloned())
    }
}

#[async_trait]
impl InventoryLedger for MemoryStore {
    async fn peek(&self, ingredient_id: IngredientId) -> Result<Option<InventoryItem>> {
        Ok(self.state.read().await.inventory.get(&ingredient_id).cloned())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders = state.orders.clone();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn transition_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<StatusTransition> {
        self.mutate(|state| {
            let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) else {
                return Ok(StatusTransition::Missing);
            };
            if order.status != from {
                return Ok(StatusTransition::Rejected(order.status));
            }
            order.status = to;
            Ok(StatusTransition::Applied(order.clone()))
        })
        .await
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<bool> {
        self.mutate(|state| {
            let before = state.orders.len();
            state.orders.retain(|o| o.id != order_id);
            Ok(state.orders.len() != before)
        })
        .await
    }
}

#[async_trait]
impl MenuRepository for MemoryStore {
    async fn insert_menu_item(&self, item: &MenuItem) -> Result<()> {
        self.mutate(|state| {
            state.menu.insert(item.id, item.clone());
            Ok(())
        })
        .await
    }

    async fn list_menu_items(&self) -> Result<Vec<MenuItem>> {
        let state = self.state.read().await;
        let mut items: Vec<_> = state.menu.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn update_menu_item(&self, item: &MenuItem) -> Result<bool> {
        self.mutate(|state| match state.menu.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(true)
            }
            None => Ok(false),
        })
        .await
    }

    async fn delete_menu_item(&self, product_id: ProductId) -> Result<bool> {
        self.mutate(|state| Ok(state.menu.remove(&product_id).is_some()))
            .await
    }
}

#[async_trait]
impl InventoryRepository for MemoryStore {
    async fn insert_inventory_item(&self, item: &InventoryItem) -> Result<()> {
        self.mutate(|state| {
            state.inventory.insert(item.id, item.clone());
            Ok(())
        })
        .await
    }

    async fn list_inventory_items(&self) -> Result<Vec<InventoryItem>> {
        let state = self.state.read().await;
        let mut items: Vec<_> = state.inventory.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn update_inventory_item(&self, item: &InventoryItem) -> Result<bool> {
        self.mutate(|state| match state.inventory.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(true)
            }
            None => Ok(false),
        })
        .await
    }

    async fn delete_inventory_item(&self, ingredient_id: IngredientId) -> Result<bool> {
        self.mutate(|state| {
            let referenced = state.menu.values().any(|m| {
                m.ingredients
                    .iter()
                    .any(|i| i.ingredient_id == ingredient_id)
            });
            if referenced {
                return Err(StoreError::InUse {
                    entity: "Ingredient",
                    id: ingredient_id.to_string(),
                    referenced_by: "menu items",
                });
            }
            Ok(state.inventory.remove(&ingredient_id).is_some())
        })
        .await
    }

    async fn leftovers(&self, query: &LeftoverQuery) -> Result<Page<InventoryItem>> {
        let state = self.state.read().await;
        let mut items: Vec<_> = state.inventory.values().cloned().collect();
        match query.sort_by {
            LeftoverSort::Quantity => items.sort_by(|a, b| {
                b.quantity
                    .total_cmp(&a.quantity)
                    .then_with(|| a.name.cmp(&b.name))
            }),
            LeftoverSort::Name => items.sort_by(|a, b| a.name.cmp(&b.name)),
        }

        let total = items.len();
        let items = items
            .into_iter()
            .skip(query.offset())
            .take(query.page_size)
            .collect();

        Ok(Page {
            items,
            page: query.page,
            page_size: query.page_size,
            total,
        })
    }
}

#[async_trait]
impl SalesReports for MemoryStore {
    async fn total_sales(&self) -> Result<SalesTotal> {
        let state = self.state.read().await;
        let closed = state
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Closed);
        Ok(SalesTotal {
            total: closed.clone().map(|o| o.total).sum(),
            order_count: closed.count() as u64,
        })
    }

    async fn popular_items(&self, limit: usize) -> Result<Vec<PopularItem>> {
        let state = self.state.read().await;
        let mut items = rank_products(
            state
                .orders
                .iter()
                .filter(|o| o.status != OrderStatus::Cancelled),
        );
        items.truncate(limit);
        Ok(items)
    }

    async fn ordered_items_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<PopularItem>> {
        let state = self.state.read().await;
        Ok(rank_products(state.orders.iter().filter(|o| {
            o.status != OrderStatus::Cancelled
                && from.is_none_or(|from| o.created_at >= from)
                && to.is_none_or(|to| o.created_at < to)
        })))
    }

    async fn order_counts(
        &self,
        bucket: ReportBucket,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BTreeMap<u32, u64>> {
        let state = self.state.read().await;
        let mut counts = BTreeMap::new();
        for order in state.orders.iter().filter(|o| {
            o.status != OrderStatus::Cancelled && o.created_at >= from && o.created_at < to
        }) {
            let key = match bucket {
                ReportBucket::DayOfMonth => order.created_at.day(),
                ReportBucket::Month => order.created_at.month(),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// Sums line quantities per product, highest first, ties broken by name.
fn rank_products<'a>(orders: impl Iterator<Item = &'a Order>) -> Vec<PopularItem> {
    let mut by_product: HashMap<ProductId, PopularItem> = HashMap::new();

    for line in orders.flat_map(|o| o.lines.iter()) {
        let entry = by_product
            .entry(line.product_id)
            .or_insert_with(|| PopularItem {
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: 0,
            });
        entry.quantity += u64::from(line.quantity);
        if line.product_name > entry.product_name {
            entry.product_name = line.product_name.clone();
        }
    }

    let mut items: Vec<_> = by_product.into_values().collect();
    items.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, OrderLine, RecipeIngredient};

    fn ingredient(name: &str, quantity: f64, unit: &str) -> InventoryItem {
        InventoryItem {
            id: IngredientId::new(),
            name: name.to_string(),
            quantity,
            unit: unit.to_string(),
        }
    }

    fn new_order(key: Option<&str>) -> NewOrder {
        NewOrder {
            customer_name: "Ada".to_string(),
            lines: vec![OrderLine {
                product_id: ProductId::new(),
                product_name: "Latte".to_string(),
                quantity: 1,
                unit_price: Money::from_cents(450),
            }],
            total: Money::from_cents(450),
            idempotency_key: key.map(String::from),
        }
    }

    async fn seeded(items: &[&InventoryItem]) -> MemoryStore {
        let store = MemoryStore::new();
        for item in items {
            store.insert_inventory_item(item).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn conditional_deduct_applies_when_stock_suffices() {
        let milk = ingredient("milk", 300.0, "ml");
        let store = seeded(&[&milk]).await;

        let mut scope = store.begin().await.unwrap();
        let outcome = scope.conditional_deduct(milk.id, 200.0).await.unwrap();
        assert_eq!(outcome, Deduction::Applied { remaining: 100.0 });
        scope.commit().await.unwrap();

        let after = store.peek(milk.id).await.unwrap().unwrap();
        assert_eq!(after.quantity, 100.0);
    }

    #[tokio::test]
    async fn conditional_deduct_refuses_to_go_negative() {
        let milk = ingredient("milk", 150.0, "ml");
        let store = seeded(&[&milk]).await;

        let mut scope = store.begin().await.unwrap();
        let outcome = scope.conditional_deduct(milk.id, 200.0).await.unwrap();
        assert_eq!(
            outcome,
            Deduction::Insufficient {
                name: "milk".to_string(),
                available: 150.0,
                unit: "ml".to_string(),
            }
        );
        scope.rollback().await.unwrap();

        assert_eq!(store.peek(milk.id).await.unwrap().unwrap().quantity, 150.0);
    }

    #[tokio::test]
    async fn conditional_deduct_sees_earlier_deductions_in_same_scope() {
        let beans = ingredient("coffee_beans", 15.0, "g");
        let store = seeded(&[&beans]).await;

        let mut scope = store.begin().await.unwrap();
        assert!(matches!(
            scope.conditional_deduct(beans.id, 10.0).await.unwrap(),
            Deduction::Applied { .. }
        ));
        assert!(matches!(
            scope.conditional_deduct(beans.id, 10.0).await.unwrap(),
            Deduction::Insufficient { available, .. } if available == 5.0
        ));
    }

    #[tokio::test]
    async fn conditional_deduct_reports_missing_ingredient() {
        let store = MemoryStore::new();
        let mut scope = store.begin().await.unwrap();
        let outcome = scope
            .conditional_deduct(IngredientId::new(), 1.0)
            .await
            .unwrap();
        assert_eq!(outcome, Deduction::Missing);
    }

    #[tokio::test]
    async fn dropped_scope_leaves_no_trace() {
        let milk = ingredient("milk", 300.0, "ml");
        let store = seeded(&[&milk]).await;

        {
            let mut scope = store.begin().await.unwrap();
            scope.conditional_deduct(milk.id, 100.0).await.unwrap();
            scope.insert_order(&new_order(None)).await.unwrap();
        }

        assert_eq!(store.peek(milk.id).await.unwrap().unwrap().quantity, 300.0);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn commit_makes_order_visible() {
        let store = MemoryStore::new();
        let mut scope = store.begin().await.unwrap();
        let (id, created_at) = scope.insert_order(&new_order(None)).await.unwrap();
        scope.commit().await.unwrap();

        let order = store.get_order(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.created_at, created_at);
        assert_eq!(order.total, Money::from_cents(450));
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_is_rejected() {
        let store = MemoryStore::new();
        let mut scope = store.begin().await.unwrap();
        scope.insert_order(&new_order(Some("k1"))).await.unwrap();
        scope.commit().await.unwrap();

        let mut scope = store.begin().await.unwrap();
        let result = scope.insert_order(&new_order(Some("k1"))).await;
        assert!(matches!(
            result,
            Err(StoreError::DuplicateIdempotencyKey(ref k)) if k == "k1"
        ));
        // Reads wait for the scope's write lock.
        scope.rollback().await.unwrap();

        let found = store.find_by_idempotency_key("k1").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn transition_status_is_guarded() {
        let store = MemoryStore::new();
        let mut scope = store.begin().await.unwrap();
        let (id, _) = scope.insert_order(&new_order(None)).await.unwrap();
        scope.commit().await.unwrap();

        let first = store
            .transition_status(id, OrderStatus::Open, OrderStatus::Closed)
            .await
            .unwrap();
        assert!(matches!(first, StatusTransition::Applied(ref o) if o.status == OrderStatus::Closed));

        let second = store
            .transition_status(id, OrderStatus::Open, OrderStatus::Closed)
            .await
            .unwrap();
        assert_eq!(second, StatusTransition::Rejected(OrderStatus::Closed));

        let missing = store
            .transition_status(OrderId::new(), OrderStatus::Open, OrderStatus::Closed)
            .await
            .unwrap();
        assert_eq!(missing, StatusTransition::Missing);
    }

    #[tokio::test]
    async fn ingredient_in_use_cannot_be_deleted() {
        let milk = ingredient("milk", 300.0, "ml");
        let store = seeded(&[&milk]).await;
        let latte = MenuItem {
            id: ProductId::new(),
            name: "Latte".to_string(),
            description: String::new(),
            price: Money::from_cents(450),
            ingredients: vec![RecipeIngredient {
                ingredient_id: milk.id,
                quantity: 200.0,
            }],
        };
        store.insert_menu_item(&latte).await.unwrap();

        let result = store.delete_inventory_item(milk.id).await;
        assert!(matches!(result, Err(StoreError::InUse { .. })));

        assert!(store.delete_menu_item(latte.id).await.unwrap());
        assert!(store.delete_inventory_item(milk.id).await.unwrap());
        assert!(!store.delete_inventory_item(milk.id).await.unwrap());
    }

    #[tokio::test]
    async fn leftovers_are_sorted_and_paginated() {
        let a = ingredient("beans", 10.0, "g");
        let b = ingredient("milk", 300.0, "ml");
        let c = ingredient("water", 50.0, "ml");
        let store = seeded(&[&a, &b, &c]).await;

        let page = store
            .leftovers(&LeftoverQuery::new().page_size(2))
            .await
            .unwrap();
        let names: Vec<_> = page.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["milk", "water"]);
        assert_eq!(page.total, 3);
        assert!(page.has_next_page());

        let page = store
            .leftovers(
                &LeftoverQuery::new()
                    .sort_by(LeftoverSort::Name)
                    .page(2)
                    .page_size(2),
            )
            .await
            .unwrap();
        let names: Vec<_> = page.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["water"]);

        let page = store
            .leftovers(&LeftoverQuery::new().page(usize::MAX))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next_page());
    }

    #[tokio::test]
    async fn reports_skip_cancelled_and_count_closed_only() {
        let store = MemoryStore::new();
        let latte = ProductId::new();
        let mocha = ProductId::new();
        let line = |product_id, name: &str, quantity| OrderLine {
            product_id,
            product_name: name.to_string(),
            quantity,
            unit_price: Money::from_cents(400),
        };

        let mut ids = Vec::new();
        for lines in [
            vec![line(latte, "Latte", 2)],
            vec![line(latte, "Latte", 1), line(mocha, "Mocha", 1)],
            vec![line(mocha, "Mocha", 5)],
        ] {
            let total = lines.iter().map(|l| l.line_total()).sum();
            let mut scope = store.begin().await.unwrap();
            let (id, _) = scope
                .insert_order(&NewOrder {
                    customer_name: "Ada".to_string(),
                    lines,
                    total,
                    idempotency_key: None,
                })
                .await
                .unwrap();
            scope.commit().await.unwrap();
            ids.push(id);
        }

        store
            .transition_status(ids[0], OrderStatus::Open, OrderStatus::Closed)
            .await
            .unwrap();
        store
            .transition_status(ids[2], OrderStatus::Open, OrderStatus::Cancelled)
            .await
            .unwrap();

        let sales = store.total_sales().await.unwrap();
        assert_eq!(sales.total, Money::from_cents(800));
        assert_eq!(sales.order_count, 1);

        let popular = store.popular_items(10).await.unwrap();
        let ranked: Vec<_> = popular
            .iter()
            .map(|p| (p.product_name.as_str(), p.quantity))
            .collect();
        assert_eq!(ranked, [("Latte", 3), ("Mocha", 1)]);

        assert_eq!(store.popular_items(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dated_reports_respect_the_window() {
        use chrono::TimeZone;

        let store = MemoryStore::new();
        let latte = ProductId::new();
        let at = |m, d| Utc.with_ymd_and_hms(2024, m, d, 9, 30, 0).unwrap();

        let mut ids = Vec::new();
        for quantity in [1, 2, 3, 4] {
            let line = OrderLine {
                product_id: latte,
                product_name: "Latte".to_string(),
                quantity,
                unit_price: Money::from_cents(400),
            };
            let mut scope = store.begin().await.unwrap();
            let (id, _) = scope
                .insert_order(&NewOrder {
                    customer_name: "Ada".to_string(),
                    total: line.line_total(),
                    lines: vec![line],
                    idempotency_key: None,
                })
                .await
                .unwrap();
            scope.commit().await.unwrap();
            ids.push(id);
        }
        {
            let mut state = store.state.write().await;
            for (order, created_at) in state
                .orders
                .iter_mut()
                .zip([at(3, 1), at(3, 1), at(3, 15), at(4, 2)])
            {
                order.created_at = created_at;
            }
        }
        store
            .transition_status(ids[1], OrderStatus::Open, OrderStatus::Cancelled)
            .await
            .unwrap();

        let march = store
            .ordered_items_between(Some(at(3, 1)), Some(at(4, 1)))
            .await
            .unwrap();
        assert_eq!(march.len(), 1);
        assert_eq!(march[0].quantity, 4);

        let all = store.ordered_items_between(None, None).await.unwrap();
        assert_eq!(all[0].quantity, 8);

        let by_day = store
            .order_counts(ReportBucket::DayOfMonth, at(3, 1), at(4, 1))
            .await
            .unwrap();
        assert_eq!(by_day, BTreeMap::from([(1, 1), (15, 1)]));

        let by_month = store
            .order_counts(ReportBucket::Month, at(1, 1), at(12, 31))
            .await
            .unwrap();
        assert_eq!(by_month, BTreeMap::from([(3, 2), (4, 1)]));
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("cafe-store-{}", uuid::Uuid::new_v4()));
        let milk = ingredient("milk", 300.0, "ml");

        let store = MemoryStore::open(&dir).await.unwrap();
        store.insert_inventory_item(&milk).await.unwrap();
        let mut scope = store.begin().await.unwrap();
        scope.conditional_deduct(milk.id, 120.0).await.unwrap();
        let (order_id, _) = scope.insert_order(&new_order(None)).await.unwrap();
        scope.commit().await.unwrap();
        drop(store);

        let reopened = MemoryStore::open(&dir).await.unwrap();
        assert_eq!(
            reopened.peek(milk.id).await.unwrap().unwrap().quantity,
            180.0
        );
        assert!(reopened.get_order(order_id).await.unwrap().is_some());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
