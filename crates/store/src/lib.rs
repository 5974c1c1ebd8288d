pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{IngredientId, OrderId, ProductId};
pub use error::{Result, StoreError};
pub use memory::{MemoryScope, MemoryStore};
pub use postgres::{PostgresScope, PostgresStore};
pub use query::{LeftoverQuery, LeftoverSort, Page};
pub use store::{
    Deduction, InventoryLedger, InventoryRepository, MenuCatalog, MenuRepository, OrderStore,
    PopularItem, ReportBucket, SalesReports, SalesTotal, StatusTransition, Transactional, TransactionalScope,
};
