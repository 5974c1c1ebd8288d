use std::collections::BTreeMap;

use common::IngredientId;
use store::{Deduction, TransactionalScope};

use crate::error::{DomainError, Result};

/// Deducts aggregated needs from stock inside an open scope.
///
/// Each ingredient is a single conditional decrement, applied in ascending id
/// order so that concurrent scopes acquire row locks in the same order. The
/// first shortfall aborts; the caller is responsible for rolling back.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockReconciler;

impl StockReconciler {
    pub async fn reconcile<S>(&self, scope: &mut S, needs: &BTreeMap<IngredientId, f64>) -> Result<()>
    where
        S: TransactionalScope + ?Sized,
    {
        for (&ingredient_id, &needed) in needs {
            match scope.conditional_deduct(ingredient_id, needed).await? {
                Deduction::Applied { remaining } => {
                    tracing::debug!(%ingredient_id, needed, remaining, "stock deducted");
                }
                Deduction::Insufficient {
                    name,
                    available,
                    unit,
                } => {
                    return Err(DomainError::InsufficientStock {
                        ingredient: name,
                        needed,
                        available,
                        unit,
                    });
                }
                Deduction::Missing => {
                    return Err(DomainError::unknown("Ingredient", ingredient_id));
                }
            }
        }
        Ok(())
    }
}
