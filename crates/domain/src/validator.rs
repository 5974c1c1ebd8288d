//! Structural checks on incoming order requests.

use common::ProductId;

use crate::error::ValidationError;

/// One requested line as received from the caller.
///
/// The quantity is signed so that zero and negative values reach the
/// validator instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl OrderLineRequest {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A request to create an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub customer_name: String,
    pub lines: Vec<OrderLineRequest>,
    pub idempotency_key: Option<String>,
}

impl OrderRequest {
    /// Creates a request without an idempotency key.
    pub fn new(customer_name: impl Into<String>, lines: Vec<OrderLineRequest>) -> Self {
        Self {
            customer_name: customer_name.into(),
            lines,
            idempotency_key: None,
        }
    }

    /// Attaches an idempotency key.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// A line that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// An order request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    /// Trimmed customer name.
    pub customer_name: String,
    pub lines: Vec<ValidatedLine>,
    /// None when absent or blank.
    pub idempotency_key: Option<String>,
}

/// Rejects structurally invalid order requests.
///
/// Rules are checked in order and the first failure wins:
/// 1. customer name is non-empty after trimming
/// 2. at least one line is present
/// 3. every quantity is a positive integer
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderValidator;

impl OrderValidator {
    pub fn validate(&self, request: &OrderRequest) -> Result<ValidatedOrder, ValidationError> {
        let customer_name = request.customer_name.trim();
        if customer_name.is_empty() {
            return Err(ValidationError::CustomerNameRequired);
        }

        if request.lines.is_empty() {
            return Err(ValidationError::NoItems);
        }

        let lines = request
            .lines
            .iter()
            .map(|line| {
                if line.quantity <= 0 {
                    return Err(ValidationError::InvalidQuantity {
                        product_id: line.product_id,
                        quantity: line.quantity,
                    });
                }
                let quantity =
                    u32::try_from(line.quantity).map_err(|_| ValidationError::QuantityTooLarge {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        max: u32::MAX,
                    })?;
                Ok(ValidatedLine {
                    product_id: line.product_id,
                    quantity,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let idempotency_key = request
            .idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(String::from);

        Ok(ValidatedOrder {
            customer_name: customer_name.to_string(),
            lines,
            idempotency_key,
        })
    }
}
