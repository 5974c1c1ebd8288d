//! Domain layer for the café order service.
//!
//! This crate provides:
//! - `OrderFulfillmentEngine`, which validates, prices and persists orders
//!   while deducting their ingredients in one unit of work
//! - the components it is built from (`OrderValidator`,
//!   `IngredientAggregator`, `StockReconciler`, `OrderPersister`)
//! - services for menu and inventory maintenance, order lookups and reports

pub mod aggregator;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod menu;
pub mod orders;
pub mod persister;
pub mod reconciler;
pub mod reports;
pub mod validator;

pub use aggregator::{Aggregation, IngredientAggregator};
pub use engine::OrderFulfillmentEngine;
pub use error::{DomainError, Result, ValidationError};
pub use inventory::{InventoryItemDraft, InventoryService};
pub use menu::{MenuItemDraft, MenuService};
pub use orders::OrderQueries;
pub use persister::OrderPersister;
pub use reconciler::StockReconciler;
pub use reports::{PeriodCount, PeriodReport, ReportPeriod, ReportService};
pub use validator::{OrderLineRequest, OrderRequest, OrderValidator, ValidatedLine, ValidatedOrder};
