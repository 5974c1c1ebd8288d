use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    IngredientId, InventoryItem, MenuItem, Money, NewOrder, Order, OrderId, OrderLine,
    OrderStatus, ProductId, RecipeIngredient,
};
use sqlx::{
    PgConnection, PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    LeftoverQuery, LeftoverSort, Page, Result, StoreError,
    store::{
        Deduction, InventoryLedger, InventoryRepository, MenuCatalog, MenuRepository, OrderStore,
        PopularItem, ReportBucket, SalesReports, SalesTotal, StatusTransition, Transactional,
        TransactionalScope,
    },
};

const IDEMPOTENCY_KEY_INDEX: &str = "orders_idempotency_key_unique";
const RECIPE_INGREDIENT_FK: &str = "menu_item_ingredients_ingredient_fk";

/// Guarded decrements tried before a racing restock is reported as a shortfall.
const MAX_DEDUCT_ATTEMPTS: usize = 3;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_inventory_item(row: &PgRow) -> Result<InventoryItem> {
        Ok(InventoryItem {
            id: IngredientId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            unit: row.try_get("unit")?,
        })
    }

    fn row_to_order_line(row: &PgRow) -> Result<OrderLine> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(OrderLine {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::Corrupt(format!("order line quantity {quantity}")))?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_popular_item(row: &PgRow) -> Result<PopularItem> {
        Ok(PopularItem {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: row.try_get::<i64, _>("quantity")? as u64,
        })
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_name: row.try_get("customer_name")?,
            lines,
            total: Money::from_cents(row.try_get("total_cents")?),
            status: parse_status(row.try_get("status")?)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            idempotency_key: row.try_get("idempotency_key")?,
        })
    }

    async fn load_order(conn: &mut PgConnection, order_id: OrderId) -> Result<Option<Order>> {
        let Some(header) = sqlx::query(
            r#"
            SELECT id, customer_name, total_cents, status, created_at, idempotency_key
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };

        let lines = sqlx::query(
            r#"
            SELECT product_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY line_no ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(Self::row_to_order_line)
        .collect::<Result<Vec<_>>>()?;

        Self::row_to_order(&header, lines).map(Some)
    }

    async fn load_recipes(
        &self,
        menu_item_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<RecipeIngredient>>> {
        let rows = sqlx::query(
            r#"
            SELECT menu_item_id, ingredient_id, quantity
            FROM menu_item_ingredients
            WHERE menu_item_id = ANY($1)
            ORDER BY menu_item_id, position ASC
            "#,
        )
        .bind(menu_item_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut recipes: HashMap<Uuid, Vec<RecipeIngredient>> = HashMap::new();
        for row in rows {
            recipes
                .entry(row.try_get("menu_item_id")?)
                .or_default()
                .push(RecipeIngredient {
                    ingredient_id: IngredientId::from_uuid(row.try_get::<Uuid, _>("ingredient_id")?),
                    quantity: row.try_get("quantity")?,
                });
        }
        Ok(recipes)
    }

    async fn insert_recipe(conn: &mut PgConnection, item: &MenuItem) -> Result<()> {
        for (position, ingredient) in item.ingredients.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO menu_item_ingredients (menu_item_id, ingredient_id, quantity, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(ingredient.ingredient_id.as_uuid())
            .bind(ingredient.quantity)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

fn parse_status(raw: String) -> Result<OrderStatus> {
    raw.parse().map_err(StoreError::Corrupt)
}

fn is_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint))
}

/// Decides what a guarded decrement that matched no row means, given the row
/// as re-read afterwards.
///
/// Returns None when a restock landed in between and another attempt is
/// allowed.
fn after_guard_miss(item: InventoryItem, amount: f64, attempt: usize) -> Option<Deduction> {
    if item.quantity >= amount && attempt < MAX_DEDUCT_ATTEMPTS {
        return None;
    }
    Some(Deduction::Insufficient {
        name: item.name,
        available: item.quantity,
        unit: item.unit,
    })
}

/// Unit of work backed by a database transaction.
///
/// Dropping it without committing rolls the transaction back.
pub struct PostgresScope {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TransactionalScope for PostgresScope {
    async fn conditional_deduct(
        &mut self,
        ingredient_id: IngredientId,
        amount: f64,
    ) -> Result<Deduction> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            // The WHERE clause is re-evaluated against the latest committed row
            // once a concurrent writer releases its lock.
            let updated = sqlx::query(
                r#"
                UPDATE inventory
                SET quantity = quantity - $2
                WHERE id = $1 AND quantity >= $2
                RETURNING quantity
                "#,
            )
            .bind(ingredient_id.as_uuid())
            .bind(amount)
            .fetch_optional(&mut *self.tx)
            .await?;

            if let Some(row) = updated {
                return Ok(Deduction::Applied {
                    remaining: row.try_get("quantity")?,
                });
            }

            let current = sqlx::query("SELECT id, name, quantity, unit FROM inventory WHERE id = $1")
                .bind(ingredient_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

            let Some(row) = current else {
                return Ok(Deduction::Missing);
            };
            let item = PostgresStore::row_to_inventory_item(&row)?;

            match after_guard_miss(item, amount, attempt) {
                Some(outcome) => return Ok(outcome),
                None => {
                    tracing::debug!(%ingredient_id, attempt, "stock changed during deduction, retrying");
                }
            }
        }
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<(OrderId, DateTime<Utc>)> {
        let id = OrderId::new();

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (id, customer_name, total_cents, status, idempotency_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(&order.customer_name)
        .bind(order.total.cents())
        .bind(OrderStatus::Open.as_str())
        .bind(&order.idempotency_key)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match &order.idempotency_key {
            Some(key) if is_constraint_violation(&e, IDEMPOTENCY_KEY_INDEX) => {
                StoreError::DuplicateIdempotencyKey(key.clone())
            }
            _ => StoreError::Database(e),
        })?;

        for (line_no, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, line_no, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(id.as_uuid())
            .bind(line_no as i32)
            .bind(line.product_id.as_uuid())
            .bind(&line.product_name)
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok((id, created_at))
    }

    async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::CommitOutcomeUnknown(e.to_string()))
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl Transactional for PostgresStore {
    type Scope = PostgresScope;

    async fn begin(&self) -> Result<PostgresScope> {
        Ok(PostgresScope {
            tx: self.pool.begin().await?,
        })
    }
}

#[async_trait]
impl MenuCatalog for PostgresStore {
    async fn resolve(&self, product_id: ProductId) -> Result<Option<MenuItem>> {
        let Some(row) = sqlx::query(
            "SELECT id, name, description, price_cents FROM menu_items WHERE id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let mut recipes = self.load_recipes(&[product_id.as_uuid()]).await?;
        Ok(Some(MenuItem {
            id: product_id,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            ingredients: recipes.remove(&product_id.as_uuid()).unwrap_or_default(),
        }))
    }
}

#[async_trait]
impl InventoryLedger for PostgresStore {
    async fn peek(&self, ingredient_id: IngredientId) -> Result<Option<InventoryItem>> {
        let row = sqlx::query("SELECT id, name, quantity, unit FROM inventory WHERE id = $1")
            .bind(ingredient_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_inventory_item).transpose()
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Self::load_order(&mut *conn, order_id).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let headers = sqlx::query(
            r#"
            SELECT id, customer_name, total_cents, status, created_at, idempotency_key
            FROM orders
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let ids = headers
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let line_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in &line_rows {
            lines
                .entry(row.try_get("order_id")?)
                .or_default()
                .push(Self::row_to_order_line(row)?);
        }

        headers
            .iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_order(row, lines.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM orders WHERE idempotency_key = $1")
            .bind(key)
            .fetch_optional(&mut *conn)
            .await?;

        match id {
            Some(id) => Self::load_order(&mut *conn, OrderId::from_uuid(id)).await,
            None => Ok(None),
        }
    }

    async fn transition_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<StatusTransition> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
            .bind(order_id.as_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let transition = if updated == 1 {
            match Self::load_order(&mut *tx, order_id).await? {
                Some(order) => StatusTransition::Applied(order),
                None => StatusTransition::Missing,
            }
        } else {
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                    .bind(order_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
            match status {
                Some(status) => StatusTransition::Rejected(parse_status(status)?),
                None => StatusTransition::Missing,
            }
        };

        tx.commit().await?;
        Ok(transition)
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MenuRepository for PostgresStore {
    async fn insert_menu_item(&self, item: &MenuItem) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO menu_items (id, name, description, price_cents)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.cents())
        .execute(&mut *tx)
        .await?;

        Self::insert_recipe(&mut *tx, item).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_menu_items(&self) -> Result<Vec<MenuItem>> {
        let rows = sqlx::query(
            "SELECT id, name, description, price_cents FROM menu_items ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut recipes = self.load_recipes(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| {
                Ok(MenuItem {
                    id: ProductId::from_uuid(id),
                    name: row.try_get("name")?,
                    description: row.try_get("description")?,
                    price: Money::from_cents(row.try_get("price_cents")?),
                    ingredients: recipes.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn update_menu_item(&self, item: &MenuItem) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE menu_items
            SET name = $2, description = $3, price_cents = $4
            WHERE id = $1
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.cents())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM menu_item_ingredients WHERE menu_item_id = $1")
            .bind(item.id.as_uuid())
            .execute(&mut *tx)
            .await?;
        Self::insert_recipe(&mut *tx, item).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_menu_item(&self, product_id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl InventoryRepository for PostgresStore {
    async fn insert_inventory_item(&self, item: &InventoryItem) -> Result<()> {
        sqlx::query("INSERT INTO inventory (id, name, quantity, unit) VALUES ($1, $2, $3, $4)")
            .bind(item.id.as_uuid())
            .bind(&item.name)
            .bind(item.quantity)
            .bind(&item.unit)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_inventory_items(&self) -> Result<Vec<InventoryItem>> {
        let rows = sqlx::query("SELECT id, name, quantity, unit FROM inventory ORDER BY name ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_inventory_item).collect()
    }

    async fn update_inventory_item(&self, item: &InventoryItem) -> Result<bool> {
        let result =
            sqlx::query("UPDATE inventory SET name = $2, quantity = $3, unit = $4 WHERE id = $1")
                .bind(item.id.as_uuid())
                .bind(&item.name)
                .bind(item.quantity)
                .bind(&item.unit)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_inventory_item(&self, ingredient_id: IngredientId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM inventory WHERE id = $1")
            .bind(ingredient_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_constraint_violation(&e, RECIPE_INGREDIENT_FK) {
                    return StoreError::InUse {
                        entity: "Ingredient",
                        id: ingredient_id.to_string(),
                        referenced_by: "menu items",
                    };
                }
                StoreError::Database(e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn leftovers(&self, query: &LeftoverQuery) -> Result<Page<InventoryItem>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory")
            .fetch_one(&self.pool)
            .await?;

        let order_by = match query.sort_by {
            LeftoverSort::Quantity => "quantity DESC, name ASC, id ASC",
            LeftoverSort::Name => "name ASC, id ASC",
        };
        let sql = format!(
            "SELECT id, name, quantity, unit FROM inventory ORDER BY {order_by} LIMIT $1 OFFSET $2"
        );

        let rows = sqlx::query(&sql)
            .bind(query.page_size as i64)
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: rows
                .iter()
                .map(Self::row_to_inventory_item)
                .collect::<Result<_>>()?,
            page: query.page,
            page_size: query.page_size,
            total: total as usize,
        })
    }
}

#[async_trait]
impl SalesReports for PostgresStore {
    async fn total_sales(&self) -> Result<SalesTotal> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_cents), 0)::BIGINT AS total, COUNT(*) AS order_count
            FROM orders
            WHERE status = $1
            "#,
        )
        .bind(OrderStatus::Closed.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesTotal {
            total: Money::from_cents(row.try_get("total")?),
            order_count: row.try_get::<i64, _>("order_count")? as u64,
        })
    }

    async fn popular_items(&self, limit: usize) -> Result<Vec<PopularItem>> {
        let rows = sqlx::query(
            r#"
            SELECT oi.product_id,
                   MAX(oi.product_name) AS product_name,
                   SUM(oi.quantity)::BIGINT AS quantity
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.status <> $1
            GROUP BY oi.product_id
            ORDER BY quantity DESC, product_name ASC
            LIMIT $2
            "#,
        )
        .bind(OrderStatus::Cancelled.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_popular_item).collect()
    }

    async fn ordered_items_between(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<PopularItem>> {
        let rows = sqlx::query(
            r#"
            SELECT oi.product_id,
                   MAX(oi.product_name) AS product_name,
                   SUM(oi.quantity)::BIGINT AS quantity
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.status <> $1
              AND ($2::TIMESTAMPTZ IS NULL OR o.created_at >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR o.created_at < $3)
            GROUP BY oi.product_id
            ORDER BY quantity DESC, product_name ASC
            "#,
        )
        .bind(OrderStatus::Cancelled.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_popular_item).collect()
    }

    async fn order_counts(
        &self,
        bucket: ReportBucket,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BTreeMap<u32, u64>> {
        let field = match bucket {
            ReportBucket::DayOfMonth => "DAY",
            ReportBucket::Month => "MONTH",
        };
        let sql = format!(
            r#"
            SELECT EXTRACT({field} FROM created_at AT TIME ZONE 'UTC')::INT AS bucket,
                   COUNT(*) AS order_count
            FROM orders
            WHERE status <> $1 AND created_at >= $2 AND created_at < $3
            GROUP BY bucket
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(OrderStatus::Cancelled.as_str())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok((
                    row.try_get::<i32, _>("bucket")? as u32,
                    row.try_get::<i64, _>("order_count")? as u64,
                ))
            })
            .collect()
    }
}
