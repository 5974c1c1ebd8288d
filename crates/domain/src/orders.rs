//! Read and delete access to persisted orders.

use common::{Order, OrderId};
use store::OrderStore;

use crate::error::{DomainError, Result};

/// Service for looking up and removing orders.
///
/// Creation and status changes go through
/// [`OrderFulfillmentEngine`](crate::OrderFulfillmentEngine).
pub struct OrderQueries<S> {
    store: S,
}

impl<S: OrderStore> OrderQueries<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists all orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))
    }

    /// Hard-deletes an order. Consumed stock stays consumed.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, order_id: OrderId) -> Result<()> {
        if !self.store.delete_order(order_id).await? {
            return Err(DomainError::not_found("Order", order_id));
        }
        tracing::info!(%order_id, "order deleted");
        Ok(())
    }
}
