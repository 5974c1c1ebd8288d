//! Integration tests for order fulfillment.
//!
//! These tests drive the engine against the in-memory store and check the
//! stock and order tables after every scenario, including concurrent ones.

use std::sync::Arc;

use async_trait::async_trait;
use common::{IngredientId, InventoryItem, MenuItem, Money, OrderStatus, ProductId, RecipeIngredient};
use domain::{DomainError, OrderFulfillmentEngine, OrderLineRequest, OrderRequest, ValidationError};
use futures_util::future::join_all;
use store::{
    InventoryLedger, InventoryRepository, MemoryStore, MenuCatalog, MenuRepository, OrderStore,
};

type Engine = OrderFulfillmentEngine<MemoryStore, MemoryStore, MemoryStore>;

struct Cafe {
    store: MemoryStore,
    engine: Arc<Engine>,
    beans: IngredientId,
    milk: IngredientId,
    water: IngredientId,
    latte: ProductId,
    americano: ProductId,
}

async fn stock(store: &MemoryStore, name: &str, quantity: f64, unit: &str) -> IngredientId {
    let item = InventoryItem {
        id: IngredientId::new(),
        name: name.to_string(),
        quantity,
        unit: unit.to_string(),
    };
    store.insert_inventory_item(&item).await.unwrap();
    item.id
}

async fn product(store: &MemoryStore, name: &str, cents: i64, recipe: &[(IngredientId, f64)]) -> ProductId {
    let item = MenuItem {
        id: ProductId::new(),
        name: name.to_string(),
        description: String::new(),
        price: Money::from_cents(cents),
        ingredients: recipe
            .iter()
            .map(|&(ingredient_id, quantity)| RecipeIngredient {
                ingredient_id,
                quantity,
            })
            .collect(),
    };
    store.insert_menu_item(&item).await.unwrap();
    item.id
}

/// Latte = 10g beans + 200ml milk, americano = 10g beans + 250ml water.
async fn cafe(beans: f64, milk: f64, water: f64) -> Cafe {
    let store = MemoryStore::new();
    let beans = stock(&store, "coffee_beans", beans, "g").await;
    let milk = stock(&store, "milk", milk, "ml").await;
    let water = stock(&store, "water", water, "ml").await;
    let latte = product(&store, "Latte", 450, &[(beans, 10.0), (milk, 200.0)]).await;
    let americano = product(&store, "Americano", 300, &[(beans, 10.0), (water, 250.0)]).await;

    let engine = Arc::new(OrderFulfillmentEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));

    Cafe {
        store,
        engine,
        beans,
        milk,
        water,
        latte,
        americano,
    }
}

async fn quantity(store: &MemoryStore, id: IngredientId) -> f64 {
    store.peek(id).await.unwrap().unwrap().quantity
}

fn lattes(cafe: &Cafe, n: i64) -> OrderRequest {
    OrderRequest::new("Ada", vec![OrderLineRequest::new(cafe.latte, n)])
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn latte_without_enough_milk_is_rejected() {
        let cafe = cafe(15.0, 150.0, 0.0).await;

        let err = cafe.engine.create_order(lattes(&cafe, 1)).await.unwrap_err();

        match err {
            DomainError::InsufficientStock {
                ingredient,
                needed,
                available,
                unit,
            } => {
                assert_eq!(ingredient, "milk");
                assert_eq!(needed, 200.0);
                assert_eq!(available, 150.0);
                assert_eq!(unit, "ml");
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(quantity(&cafe.store, cafe.beans).await, 15.0);
        assert_eq!(quantity(&cafe.store, cafe.milk).await, 150.0);
        assert!(cafe.store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_lattes_is_a_validation_error() {
        let cafe = cafe(15.0, 150.0, 0.0).await;

        let err = cafe.engine.create_order(lattes(&cafe, 0)).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::InvalidQuantity { quantity: 0, .. })
        ));
        assert_eq!(quantity(&cafe.store, cafe.milk).await, 150.0);
    }

    #[tokio::test]
    async fn two_concurrent_latte_orders_both_succeed() {
        // 1000 beans, 3000 milk, 5000 water; each order needs 20 beans and 400 milk.
        let cafe = cafe(1000.0, 3000.0, 5000.0).await;

        let results = join_all((0..2).map(|_| {
            let engine = cafe.engine.clone();
            let request = lattes(&cafe, 2);
            tokio::spawn(async move { engine.create_order(request).await })
        }))
        .await;

        for result in results {
            let order = result.unwrap().unwrap();
            assert_eq!(order.status, OrderStatus::Open);
            assert_eq!(order.total, Money::from_cents(900));
        }
        assert_eq!(quantity(&cafe.store, cafe.beans).await, 960.0);
        assert_eq!(quantity(&cafe.store, cafe.milk).await, 2200.0);
        assert_eq!(quantity(&cafe.store, cafe.water).await, 5000.0);

        let orders = cafe.store.list_orders().await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.status == OrderStatus::Open));
    }

    #[tokio::test]
    async fn mixed_order_sums_shared_ingredient() {
        let cafe = cafe(1000.0, 3000.0, 5000.0).await;

        let order = cafe
            .engine
            .create_order(OrderRequest::new(
                "Grace",
                vec![
                    OrderLineRequest::new(cafe.latte, 1),
                    OrderLineRequest::new(cafe.americano, 3),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(order.total, Money::from_cents(450 + 3 * 300));
        assert_eq!(order.lines[1].product_name, "Americano");
        assert_eq!(quantity(&cafe.store, cafe.beans).await, 960.0);
        assert_eq!(quantity(&cafe.store, cafe.milk).await, 2800.0);
        assert_eq!(quantity(&cafe.store, cafe.water).await, 4250.0);
    }

    #[tokio::test]
    async fn unknown_product_touches_nothing() {
        let cafe = cafe(1000.0, 3000.0, 5000.0).await;

        let err = cafe
            .engine
            .create_order(OrderRequest::new(
                "Ada",
                vec![
                    OrderLineRequest::new(cafe.latte, 1),
                    OrderLineRequest::new(ProductId::new(), 1),
                ],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::UnknownReference { entity: "Product", .. }));
        assert_eq!(quantity(&cafe.store, cafe.beans).await, 1000.0);
        assert_eq!(cafe.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn menu_edits_do_not_rewrite_history() {
        let cafe = cafe(1000.0, 3000.0, 5000.0).await;
        let order = cafe.engine.create_order(lattes(&cafe, 1)).await.unwrap();

        let mut latte = cafe.store.resolve(cafe.latte).await.unwrap().unwrap();
        latte.price = Money::from_cents(999);
        latte.name = "Big Latte".to_string();
        cafe.store.update_menu_item(&latte).await.unwrap();

        let stored = cafe.store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.lines[0].product_name, "Latte");
        assert_eq!(stored.lines[0].unit_price, Money::from_cents(450));
        assert_eq!(stored.total, Money::from_cents(450));
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn racing_orders_never_oversell() {
        // Enough milk for exactly three lattes.
        let cafe = cafe(1000.0, 600.0, 0.0).await;

        let results = join_all((0..8).map(|_| {
            let engine = cafe.engine.clone();
            let request = lattes(&cafe, 1);
            tokio::spawn(async move { engine.create_order(request).await })
        }))
        .await;

        let mut created = 0;
        for result in results {
            match result.unwrap() {
                Ok(_) => created += 1,
                Err(DomainError::InsufficientStock { ingredient, .. }) => {
                    assert_eq!(ingredient, "milk")
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(created, 3);
        assert_eq!(quantity(&cafe.store, cafe.milk).await, 0.0);
        assert_eq!(quantity(&cafe.store, cafe.beans).await, 970.0);
        assert_eq!(cafe.store.order_count().await, 3);
    }

    /// Ledger that always reports plenty of stock, so that shortfalls are
    /// only discovered by the conditional deduct inside the scope.
    struct OptimisticLedger(MemoryStore);

    #[async_trait]
    impl InventoryLedger for OptimisticLedger {
        async fn peek(&self, ingredient_id: IngredientId) -> store::Result<Option<InventoryItem>> {
            let item = self.0.peek(ingredient_id).await?;
            Ok(item.map(|mut item| {
                item.quantity = f64::MAX;
                item
            }))
        }
    }

    #[tokio::test]
    async fn shortfall_inside_scope_rolls_back_earlier_deductions() {
        let cafe = cafe(1000.0, 150.0, 0.0).await;
        let engine = OrderFulfillmentEngine::new(
            cafe.store.clone(),
            OptimisticLedger(cafe.store.clone()),
            cafe.store.clone(),
        );

        let err = engine.create_order(lattes(&cafe, 1)).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsufficientStock { ref ingredient, available, .. }
                if ingredient == "milk" && available == 150.0
        ));
        assert_eq!(quantity(&cafe.store, cafe.beans).await, 1000.0);
        assert_eq!(quantity(&cafe.store, cafe.milk).await, 150.0);
        assert_eq!(cafe.store.order_count().await, 0);
    }
}

mod idempotency {
    use super::*;

    #[tokio::test]
    async fn replay_returns_original_and_deducts_once() {
        let cafe = cafe(1000.0, 3000.0, 5000.0).await;
        let request = lattes(&cafe, 1).with_idempotency_key("req-42");

        let first = cafe.engine.create_order(request.clone()).await.unwrap();
        let second = cafe.engine.create_order(request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(quantity(&cafe.store, cafe.milk).await, 2800.0);
        assert_eq!(cafe.store.order_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_replays_create_one_order() {
        let cafe = cafe(1000.0, 3000.0, 5000.0).await;

        let results = join_all((0..4).map(|_| {
            let engine = cafe.engine.clone();
            let request = lattes(&cafe, 1).with_idempotency_key("same-key");
            tokio::spawn(async move { engine.create_order(request).await })
        }))
        .await;

        let ids: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap().unwrap().id)
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(quantity(&cafe.store, cafe.milk).await, 2800.0);
        assert_eq!(cafe.store.order_count().await, 1);
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn close_twice_fails_the_second_time() {
        let cafe = cafe(1000.0, 3000.0, 5000.0).await;
        let order = cafe.engine.create_order(lattes(&cafe, 1)).await.unwrap();

        let closed = cafe.engine.close_order(order.id).await.unwrap();
        assert_eq!(closed.status, OrderStatus::Closed);
        assert_eq!(closed.created_at, order.created_at);

        let err = cafe.engine.close_order(order.id).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyClosed { order_id, .. } if order_id == order.id));
    }

    #[tokio::test]
    async fn concurrent_closes_succeed_once() {
        let cafe = cafe(1000.0, 3000.0, 5000.0).await;
        let order_id = cafe.engine.create_order(lattes(&cafe, 1)).await.unwrap().id;

        let results = join_all((0..5).map(|_| {
            let engine = cafe.engine.clone();
            tokio::spawn(async move { engine.close_order(order_id).await })
        }))
        .await;

        let successes = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        assert_eq!(successes, 1);
    }
}
