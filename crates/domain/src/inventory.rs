//! Inventory maintenance: manual restocking and corrections.

use common::{IngredientId, InventoryItem};
use store::{InventoryRepository, LeftoverQuery, Page};

use crate::error::{DomainError, Result, ValidationError};

/// Fields of an inventory item supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItemDraft {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

impl InventoryItemDraft {
    fn into_item(self, id: IngredientId) -> Result<InventoryItem> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::NameRequired {
                entity: "Inventory item",
            }
            .into());
        }
        if !(self.quantity.is_finite() && self.quantity >= 0.0) {
            return Err(ValidationError::InvalidStockQuantity {
                quantity: self.quantity,
            }
            .into());
        }
        let unit = self.unit.trim();
        if unit.is_empty() {
            return Err(ValidationError::UnitRequired.into());
        }

        Ok(InventoryItem {
            id,
            name: name.to_string(),
            quantity: self.quantity,
            unit: unit.to_string(),
        })
    }
}

/// Service for managing ingredient stock outside of order creation.
pub struct InventoryService<R> {
    repository: R,
}

impl<R: InventoryRepository> InventoryService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: InventoryItemDraft) -> Result<InventoryItem> {
        let item = draft.into_item(IngredientId::new())?;
        self.repository.insert_inventory_item(&item).await?;
        tracing::info!(ingredient_id = %item.id, quantity = item.quantity, "inventory item created");
        Ok(item)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<InventoryItem>> {
        Ok(self.repository.list_inventory_items().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, ingredient_id: IngredientId) -> Result<InventoryItem> {
        self.repository
            .peek(ingredient_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Inventory item", ingredient_id))
    }

    /// Overwrites name, quantity and unit; this is how stock is replenished.
    #[tracing::instrument(skip(self, draft))]
    pub async fn update(
        &self,
        ingredient_id: IngredientId,
        draft: InventoryItemDraft,
    ) -> Result<InventoryItem> {
        let item = draft.into_item(ingredient_id)?;
        if !self.repository.update_inventory_item(&item).await? {
            return Err(DomainError::not_found("Inventory item", ingredient_id));
        }
        tracing::info!(%ingredient_id, quantity = item.quantity, "inventory item updated");
        Ok(item)
    }

    /// Removes an ingredient that no recipe uses anymore.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, ingredient_id: IngredientId) -> Result<()> {
        if !self.repository.delete_inventory_item(ingredient_id).await? {
            return Err(DomainError::not_found("Inventory item", ingredient_id));
        }
        tracing::info!(%ingredient_id, "inventory item deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn leftovers(&self, query: LeftoverQuery) -> Result<Page<InventoryItem>> {
        Ok(self.repository.leftovers(&query).await?)
    }
}
