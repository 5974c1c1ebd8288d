//! Expansion of order lines into total ingredient consumption.

use std::collections::{BTreeMap, HashMap};

use common::{IngredientId, MenuItem, Money, OrderLine, ProductId};
use store::{InventoryLedger, MenuCatalog};

use crate::error::{DomainError, Result, ValidationError};
use crate::validator::ValidatedLine;

/// Priced lines and the stock they consume.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Total required quantity per ingredient, in ascending id order.
    pub needs: BTreeMap<IngredientId, f64>,
    /// Lines with product name and unit price captured.
    pub lines: Vec<OrderLine>,
    pub total: Money,
}

/// Resolves products and sums the ingredients an order needs.
///
/// Only reads: no stock is touched and no transaction is opened.
pub struct IngredientAggregator<'a, M: ?Sized, L: ?Sized> {
    catalog: &'a M,
    ledger: &'a L,
}

impl<'a, M, L> IngredientAggregator<'a, M, L>
where
    M: MenuCatalog + ?Sized,
    L: InventoryLedger + ?Sized,
{
    pub fn new(catalog: &'a M, ledger: &'a L) -> Self {
        Self { catalog, ledger }
    }

    /// Builds the aggregated needs map and the priced lines.
    ///
    /// Each distinct product is resolved once. Fails with `UnknownReference`
    /// for an unknown product or ingredient, and with `InsufficientStock` when
    /// a peek already shows the order cannot be served.
    pub async fn aggregate(&self, lines: &[ValidatedLine]) -> Result<Aggregation> {
        let mut menu: HashMap<ProductId, MenuItem> = HashMap::new();
        for line in lines {
            if menu.contains_key(&line.product_id) {
                continue;
            }
            let item = self
                .catalog
                .resolve(line.product_id)
                .await?
                .ok_or_else(|| DomainError::unknown("Product", line.product_id))?;
            menu.insert(line.product_id, item);
        }

        let mut needs: BTreeMap<IngredientId, f64> = BTreeMap::new();
        let mut priced = Vec::with_capacity(lines.len());
        let mut total = Money::zero();

        for line in lines {
            let item = &menu[&line.product_id];
            for ingredient in &item.ingredients {
                *needs.entry(ingredient.ingredient_id).or_default() +=
                    ingredient.quantity * f64::from(line.quantity);
            }

            let line_total = item
                .price
                .checked_multiply(line.quantity)
                .ok_or(ValidationError::TotalOverflow)?;
            total = total
                .checked_add(line_total)
                .ok_or(ValidationError::TotalOverflow)?;

            priced.push(OrderLine {
                product_id: item.id,
                product_name: item.name.clone(),
                quantity: line.quantity,
                unit_price: item.price,
            });
        }

        for (&ingredient_id, &needed) in &needs {
            let stock = self
                .ledger
                .peek(ingredient_id)
                .await?
                .ok_or_else(|| DomainError::unknown("Ingredient", ingredient_id))?;

            // Early exit only; the conditional deduct is the real check.
            if stock.quantity < needed {
                return Err(DomainError::InsufficientStock {
                    ingredient: stock.name,
                    needed,
                    available: stock.quantity,
                    unit: stock.unit,
                });
            }
        }

        Ok(Aggregation {
            needs,
            lines: priced,
            total,
        })
    }
}
