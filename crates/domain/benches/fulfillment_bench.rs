use common::{IngredientId, InventoryItem, MenuItem, Money, ProductId, RecipeIngredient};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{OrderFulfillmentEngine, OrderLineRequest, OrderRequest};
use store::{InventoryRepository, MemoryStore, MenuRepository};

type Engine = OrderFulfillmentEngine<MemoryStore, MemoryStore, MemoryStore>;

async fn stocked_engine(products: usize) -> (Engine, Vec<ProductId>) {
    let store = MemoryStore::new();
    let mut ids = Vec::with_capacity(products);

    for i in 0..products {
        let ingredient = InventoryItem {
            id: IngredientId::new(),
            name: format!("ingredient-{i}"),
            quantity: f64::MAX / 2.0,
            unit: "g".to_string(),
        };
        store.insert_inventory_item(&ingredient).await.unwrap();

        let item = MenuItem {
            id: ProductId::new(),
            name: format!("product-{i}"),
            description: String::new(),
            price: Money::from_cents(350),
            ingredients: vec![RecipeIngredient {
                ingredient_id: ingredient.id,
                quantity: 10.0,
            }],
        };
        store.insert_menu_item(&item).await.unwrap();
        ids.push(item.id);
    }

    let engine = OrderFulfillmentEngine::new(store.clone(), store.clone(), store);
    (engine, ids)
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (engine, products) = rt.block_on(stocked_engine(1));

    c.bench_function("fulfillment/create_order_single_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                let request =
                    OrderRequest::new("Bench", vec![OrderLineRequest::new(products[0], 1)]);
                engine.create_order(request).await.unwrap();
            });
        });
    });
}

fn bench_create_order_many_lines(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (engine, products) = rt.block_on(stocked_engine(10));

    c.bench_function("fulfillment/create_order_ten_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let lines = products
                    .iter()
                    .map(|&id| OrderLineRequest::new(id, 2))
                    .collect();
                engine
                    .create_order(OrderRequest::new("Bench", lines))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_create_order, bench_create_order_many_lines);
criterion_main!(benches);
