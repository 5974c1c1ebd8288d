//! Domain error types.

use chrono::NaiveDate;
use common::{IngredientId, OrderId, OrderStatus, ProductId};
use store::StoreError;
use thiserror::Error;

/// A request rejected before any stock is read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Customer name is empty or whitespace.
    #[error("Customer name is required")]
    CustomerNameRequired,

    /// The order has no lines.
    #[error("Order must contain at least one item")]
    NoItems,

    /// A line quantity is zero or negative.
    #[error("Invalid quantity {quantity} for product {product_id}: must be a positive integer")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// A line quantity does not fit the order line representation.
    #[error("Quantity {quantity} for product {product_id} exceeds the maximum of {max}")]
    QuantityTooLarge {
        product_id: ProductId,
        quantity: i64,
        max: u32,
    },

    /// The order total does not fit in the money representation.
    #[error("Order total is too large")]
    TotalOverflow,

    /// A required name is empty.
    #[error("{entity} name is required")]
    NameRequired { entity: &'static str },

    /// A menu price is zero or negative.
    #[error("Invalid price {cents}: must be greater than 0")]
    InvalidPrice { cents: i64 },

    /// A menu item without ingredients.
    #[error("Recipe must contain at least one ingredient")]
    EmptyRecipe,

    /// A recipe quantity is not a positive finite number.
    #[error("Invalid recipe quantity {quantity} for ingredient {ingredient_id}: must be greater than 0")]
    InvalidRecipeQuantity {
        ingredient_id: IngredientId,
        quantity: f64,
    },

    /// The same ingredient appears twice in one recipe.
    #[error("Ingredient {ingredient_id} is listed more than once")]
    DuplicateIngredient { ingredient_id: IngredientId },

    /// A stock quantity is negative or not finite.
    #[error("Invalid stock quantity {quantity}: must be a finite number >= 0")]
    InvalidStockQuantity { quantity: f64 },

    /// An inventory unit label is empty.
    #[error("Unit is required")]
    UnitRequired,

    /// A report period other than `day` or `month`.
    #[error("Invalid period '{0}': expected 'day' or 'month'")]
    InvalidPeriod(String),

    #[error("Month is required when period is 'day'")]
    MonthRequired,

    #[error("Invalid month '{0}'")]
    InvalidMonth(String),

    #[error("Invalid year {year}")]
    InvalidYear { year: i32 },

    /// Report window ends before it starts.
    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A resource addressed directly by id does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A request body references a product or ingredient that does not exist.
    #[error("Unknown {entity}: {id}")]
    UnknownReference { entity: &'static str, id: String },

    /// Stock of an ingredient does not cover the order.
    #[error("Not enough {ingredient}: need {needed:.2}{unit}, have {available:.2}{unit}")]
    InsufficientStock {
        ingredient: String,
        needed: f64,
        available: f64,
        unit: String,
    },

    /// The order is no longer open.
    #[error("Order {order_id} is already {status}")]
    AlreadyClosed {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The resource is still referenced and cannot be removed.
    #[error("{entity} {id} is still used by {referenced_by}")]
    InUse {
        entity: &'static str,
        id: String,
        referenced_by: &'static str,
    },

    /// The store failed.
    #[error("Store error: {0}")]
    Infrastructure(StoreError),
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InUse {
                entity,
                id,
                referenced_by,
            } => DomainError::InUse {
                entity,
                id,
                referenced_by,
            },
            other => DomainError::Infrastructure(other),
        }
    }
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn unknown(entity: &'static str, id: impl ToString) -> Self {
        DomainError::UnknownReference {
            entity,
            id: id.to_string(),
        }
    }

    /// Short label used for the `reason` of rejection metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation",
            DomainError::NotFound { .. } | DomainError::UnknownReference { .. } => "not_found",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::AlreadyClosed { .. } => "already_closed",
            DomainError::InUse { .. } => "in_use",
            DomainError::Infrastructure(_) => "infrastructure",
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
