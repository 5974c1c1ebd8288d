//! Order creation as one all-or-nothing unit of work.

use std::time::Instant;

use common::{Order, OrderId, OrderStatus};
use store::{
    InventoryLedger, MenuCatalog, OrderStore, StatusTransition, StoreError, Transactional,
    TransactionalScope,
};

use crate::aggregator::IngredientAggregator;
use crate::error::{DomainError, Result};
use crate::persister::OrderPersister;
use crate::reconciler::StockReconciler;
use crate::validator::{OrderRequest, OrderValidator};

enum Fulfilled {
    Created(Order),
    Replayed(Order),
}

/// Turns order requests into persisted orders without ever overselling.
///
/// Sequence: validate, aggregate, begin, reconcile, persist, commit. Any
/// failure after `begin` rolls the whole scope back. The engine keeps no
/// state between requests; coordination between concurrent requests is left
/// to the store's transactional scope.
pub struct OrderFulfillmentEngine<M, L, T> {
    catalog: M,
    ledger: L,
    store: T,
    validator: OrderValidator,
    reconciler: StockReconciler,
    persister: OrderPersister,
}

impl<M, L, T> OrderFulfillmentEngine<M, L, T>
where
    M: MenuCatalog,
    L: InventoryLedger,
    T: Transactional + OrderStore,
{
    /// Creates an engine over the given collaborators.
    pub fn new(catalog: M, ledger: L, store: T) -> Self {
        Self {
            catalog,
            ledger,
            store,
            validator: OrderValidator,
            reconciler: StockReconciler,
            persister: OrderPersister,
        }
    }

    /// Creates an order, deducting its ingredients from stock.
    ///
    /// With an idempotency key, repeating a request returns the order created
    /// by the first one and deducts stock only once.
    #[tracing::instrument(skip(self, request), fields(customer = %request.customer_name, lines = request.lines.len()))]
    pub async fn create_order(&self, request: OrderRequest) -> Result<Order> {
        let start = Instant::now();

        match self.fulfill(request).await {
            Ok(Fulfilled::Created(order)) => {
                metrics::counter!("orders_created_total").increment(1);
                metrics::histogram!("order_fulfillment_duration_seconds")
                    .record(start.elapsed().as_secs_f64());
                tracing::info!(order_id = %order.id, total = %order.total, "order created");
                Ok(order)
            }
            Ok(Fulfilled::Replayed(order)) => {
                metrics::counter!("orders_replayed_total").increment(1);
                tracing::info!(order_id = %order.id, "idempotent replay of existing order");
                Ok(order)
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.reason()).increment(1);
                match &e {
                    DomainError::Infrastructure(err) => {
                        tracing::error!(error = %err, "order creation failed")
                    }
                    other => tracing::info!(reason = other.reason(), %other, "order rejected"),
                }
                Err(e)
            }
        }
    }

    async fn fulfill(&self, request: OrderRequest) -> Result<Fulfilled> {
        let order = self.validator.validate(&request)?;

        if let Some(key) = &order.idempotency_key
            && let Some(existing) = self.store.find_by_idempotency_key(key).await?
        {
            return Ok(Fulfilled::Replayed(existing));
        }

        let aggregation = IngredientAggregator::new(&self.catalog, &self.ledger)
            .aggregate(&order.lines)
            .await?;

        let mut scope = self.store.begin().await?;

        if let Err(e) = self
            .reconciler
            .reconcile(&mut scope, &aggregation.needs)
            .await
        {
            return Err(abort(scope, e).await);
        }

        let persisted = self
            .persister
            .persist(
                &mut scope,
                order.customer_name,
                aggregation,
                order.idempotency_key,
            )
            .await;

        let created = match persisted {
            Ok(created) => created,
            Err(DomainError::Infrastructure(StoreError::DuplicateIdempotencyKey(key))) => {
                // A concurrent request with the same key won the race.
                let err = abort(
                    scope,
                    DomainError::Infrastructure(StoreError::DuplicateIdempotencyKey(key.clone())),
                )
                .await;
                return match self.store.find_by_idempotency_key(&key).await? {
                    Some(existing) => Ok(Fulfilled::Replayed(existing)),
                    None => Err(err),
                };
            }
            Err(e) => return Err(abort(scope, e).await),
        };

        scope.commit().await?;
        Ok(Fulfilled::Created(created))
    }

    /// Moves an open order to `closed`.
    #[tracing::instrument(skip(self))]
    pub async fn close_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.transition(order_id, OrderStatus::Closed).await?;
        metrics::counter!("orders_closed_total").increment(1);
        tracing::info!(%order_id, "order closed");
        Ok(order)
    }

    /// Moves an open order to `cancelled`. Stock is not credited back.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.transition(order_id, OrderStatus::Cancelled).await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, "order cancelled");
        Ok(order)
    }

    async fn transition(&self, order_id: OrderId, to: OrderStatus) -> Result<Order> {
        match self
            .store
            .transition_status(order_id, OrderStatus::Open, to)
            .await?
        {
            StatusTransition::Applied(order) => Ok(order),
            StatusTransition::Rejected(status) => {
                Err(DomainError::AlreadyClosed { order_id, status })
            }
            StatusTransition::Missing => Err(DomainError::not_found("Order", order_id)),
        }
    }
}

/// Rolls the scope back and hands the original error back to the caller.
async fn abort<S: TransactionalScope>(scope: S, err: DomainError) -> DomainError {
    if let Err(rollback_err) = scope.rollback().await {
        // The scope is gone either way; the original error matters more.
        tracing::error!(error = %rollback_err, "rollback failed");
    }
    err
}
