use common::{NewOrder, Order};
use store::TransactionalScope;

use crate::aggregator::Aggregation;
use crate::error::Result;

/// Writes the order header and lines inside the scope that deducted stock.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderPersister;

impl OrderPersister {
    /// Inserts the order with status `open`.
    ///
    /// The total comes from the prices captured during aggregation.
    pub async fn persist<S>(
        &self,
        scope: &mut S,
        customer_name: String,
        aggregation: Aggregation,
        idempotency_key: Option<String>,
    ) -> Result<Order>
    where
        S: TransactionalScope + ?Sized,
    {
        let new = NewOrder {
            customer_name,
            lines: aggregation.lines,
            total: aggregation.total,
            idempotency_key,
        };
        let (id, created_at) = scope.insert_order(&new).await?;
        Ok(Order::from_new(new, id, created_at))
    }
}
