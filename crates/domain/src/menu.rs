//! Menu maintenance.

use std::collections::HashSet;

use common::{MenuItem, Money, ProductId, RecipeIngredient};
use store::{InventoryLedger, MenuRepository};

use crate::error::{DomainError, Result, ValidationError};

/// Fields of a menu item supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItemDraft {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub ingredients: Vec<RecipeIngredient>,
}

/// Service for managing the menu.
pub struct MenuService<R, L> {
    repository: R,
    ledger: L,
}

impl<R, L> MenuService<R, L>
where
    R: MenuRepository,
    L: InventoryLedger,
{
    pub fn new(repository: R, ledger: L) -> Self {
        Self { repository, ledger }
    }

    /// Adds a product to the menu.
    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: MenuItemDraft) -> Result<MenuItem> {
        let item = self.checked(ProductId::new(), draft).await?;
        self.repository.insert_menu_item(&item).await?;
        tracing::info!(product_id = %item.id, "menu item created");
        Ok(item)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<MenuItem>> {
        Ok(self.repository.list_menu_items().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, product_id: ProductId) -> Result<MenuItem> {
        self.repository
            .resolve(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Menu item", product_id))
    }

    /// Replaces name, description, price and recipe.
    ///
    /// Orders already placed keep the name and price they were sold at.
    #[tracing::instrument(skip(self, draft))]
    pub async fn update(&self, product_id: ProductId, draft: MenuItemDraft) -> Result<MenuItem> {
        let item = self.checked(product_id, draft).await?;
        if !self.repository.update_menu_item(&item).await? {
            return Err(DomainError::not_found("Menu item", product_id));
        }
        tracing::info!(%product_id, "menu item updated");
        Ok(item)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, product_id: ProductId) -> Result<()> {
        if !self.repository.delete_menu_item(product_id).await? {
            return Err(DomainError::not_found("Menu item", product_id));
        }
        tracing::info!(%product_id, "menu item deleted");
        Ok(())
    }

    async fn checked(&self, id: ProductId, draft: MenuItemDraft) -> Result<MenuItem> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ValidationError::NameRequired { entity: "Menu item" }.into());
        }
        if !draft.price.is_positive() {
            return Err(ValidationError::InvalidPrice {
                cents: draft.price.cents(),
            }
            .into());
        }
        if draft.ingredients.is_empty() {
            return Err(ValidationError::EmptyRecipe.into());
        }

        let mut seen = HashSet::new();
        for ingredient in &draft.ingredients {
            if !(ingredient.quantity.is_finite() && ingredient.quantity > 0.0) {
                return Err(ValidationError::InvalidRecipeQuantity {
                    ingredient_id: ingredient.ingredient_id,
                    quantity: ingredient.quantity,
                }
                .into());
            }
            if !seen.insert(ingredient.ingredient_id) {
                return Err(ValidationError::DuplicateIngredient {
                    ingredient_id: ingredient.ingredient_id,
                }
                .into());
            }
        }

        for ingredient in &draft.ingredients {
            if self.ledger.peek(ingredient.ingredient_id).await?.is_none() {
                return Err(DomainError::unknown("Ingredient", ingredient.ingredient_id));
            }
        }

        Ok(MenuItem {
            id,
            name: name.to_string(),
            description: draft.description.trim().to_string(),
            price: draft.price,
            ingredients: draft.ingredients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{IngredientId, InventoryItem};
    use store::{InventoryRepository, MemoryStore};

    async fn service_with_milk() -> (MenuService<MemoryStore, MemoryStore>, IngredientId) {
        let store = MemoryStore::new();
        let milk = InventoryItem {
            id: IngredientId::new(),
            name: "milk".to_string(),
            quantity: 1000.0,
            unit: "ml".to_string(),
        };
        store.insert_inventory_item(&milk).await.unwrap();
        (MenuService::new(store.clone(), store), milk.id)
    }

    fn draft(ingredient_id: IngredientId) -> MenuItemDraft {
        MenuItemDraft {
            name: "Latte".to_string(),
            description: "Espresso and milk".to_string(),
            price: Money::from_cents(450),
            ingredients: vec![RecipeIngredient {
                ingredient_id,
                quantity: 200.0,
            }],
        }
    }

    #[tokio::test]
    async fn create_get_update_delete() {
        let (service, milk) = service_with_milk().await;

        let created = service.create(draft(milk)).await.unwrap();
        assert_eq!(service.get(created.id).await.unwrap(), created);

        let mut changed = draft(milk);
        changed.price = Money::from_cents(500);
        let updated = service.update(created.id, changed).await.unwrap();
        assert_eq!(updated.price, Money::from_cents(500));
        assert_eq!(service.list().await.unwrap(), vec![updated]);

        service.delete(created.id).await.unwrap();
        assert!(matches!(
            service.get(created.id).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            service.delete(created.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_invalid_drafts() {
        let (service, milk) = service_with_milk().await;

        let mut no_name = draft(milk);
        no_name.name = " ".to_string();
        assert!(matches!(
            service.create(no_name).await,
            Err(DomainError::Validation(ValidationError::NameRequired { .. }))
        ));

        let mut free = draft(milk);
        free.price = Money::zero();
        assert!(matches!(
            service.create(free).await,
            Err(DomainError::Validation(ValidationError::InvalidPrice { cents: 0 }))
        ));

        let mut doubled = draft(milk);
        doubled.ingredients.push(doubled.ingredients[0].clone());
        assert!(matches!(
            service.create(doubled).await,
            Err(DomainError::Validation(ValidationError::DuplicateIngredient { .. }))
        ));

        let mut nan = draft(milk);
        nan.ingredients[0].quantity = f64::NAN;
        assert!(matches!(
            service.create(nan).await,
            Err(DomainError::Validation(ValidationError::InvalidRecipeQuantity { .. }))
        ));

        assert!(matches!(
            service.create(draft(IngredientId::new())).await,
            Err(DomainError::UnknownReference { entity: "Ingredient", .. })
        ));
    }

    #[tokio::test]
    async fn update_of_unknown_item_is_not_found() {
        let (service, milk) = service_with_milk().await;
        assert!(matches!(
            service.update(ProductId::new(), draft(milk)).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
