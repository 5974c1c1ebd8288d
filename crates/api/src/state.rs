//! Shared application state.

use domain::{InventoryService, MenuService, OrderFulfillmentEngine, OrderQueries, ReportService};
use store::{InventoryRepository, MenuRepository, OrderStore, SalesReports, Transactional};

/// Everything a storage backend has to provide to serve the API.
pub trait CafeStore:
    MenuRepository + InventoryRepository + Transactional + OrderStore + SalesReports + Clone + 'static
{
}

impl<T> CafeStore for T where
    T: MenuRepository
        + InventoryRepository
        + Transactional
        + OrderStore
        + SalesReports
        + Clone
        + 'static
{
}

/// Shared application state accessible from all handlers.
pub struct AppState<S: CafeStore> {
    pub engine: OrderFulfillmentEngine<S, S, S>,
    pub orders: OrderQueries<S>,
    pub menu: MenuService<S, S>,
    pub inventory: InventoryService<S>,
    pub reports: ReportService<S>,
}

impl<S: CafeStore> AppState<S> {
    /// Wires every service to the same store.
    pub fn new(store: S) -> Self {
        Self {
            engine: OrderFulfillmentEngine::new(store.clone(), store.clone(), store.clone()),
            orders: OrderQueries::new(store.clone()),
            menu: MenuService::new(store.clone(), store.clone()),
            inventory: InventoryService::new(store.clone()),
            reports: ReportService::new(store),
        }
    }
}
