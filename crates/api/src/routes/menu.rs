//! Menu maintenance endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{IngredientId, MenuItem, Money, ProductId, RecipeIngredient};
use domain::MenuItemDraft;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::parse_id;
use crate::state::{AppState, CafeStore};

// -- Request types --

#[derive(Deserialize)]
pub struct MenuItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    pub ingredients: Vec<RecipeIngredientRequest>,
}

#[derive(Deserialize)]
pub struct RecipeIngredientRequest {
    pub ingredient_id: String,
    pub quantity: f64,
}

impl MenuItemRequest {
    fn into_draft(self) -> Result<MenuItemDraft, ApiError> {
        let ingredients = self
            .ingredients
            .into_iter()
            .map(|i| {
                Ok(RecipeIngredient {
                    ingredient_id: parse_id::<IngredientId>(&i.ingredient_id)?,
                    quantity: i.quantity,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(MenuItemDraft {
            name: self.name,
            description: self.description,
            price: Money::from_cents(self.price_cents),
            ingredients,
        })
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct MenuItemResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub ingredients: Vec<RecipeIngredientResponse>,
}

#[derive(Serialize)]
pub struct RecipeIngredientResponse {
    pub ingredient_id: String,
    pub quantity: f64,
}

impl From<MenuItem> for MenuItemResponse {
    fn from(item: MenuItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name,
            description: item.description,
            price_cents: item.price.cents(),
            ingredients: item
                .ingredients
                .into_iter()
                .map(|i| RecipeIngredientResponse {
                    ingredient_id: i.ingredient_id.to_string(),
                    quantity: i.quantity,
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /menu
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<MenuItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MenuItemResponse>), ApiError> {
    let Json(req) = payload?;
    let item = state.menu.create(req.into_draft()?).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// GET /menu
#[tracing::instrument(skip(state))]
pub async fn list<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<MenuItemResponse>>, ApiError> {
    let items = state.menu.list().await?;
    Ok(Json(items.into_iter().map(MenuItemResponse::from).collect()))
}

/// GET /menu/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id)?;
    Ok(Json(state.menu.get(product_id).await?.into()))
}

/// PUT /menu/{id}
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<MenuItemRequest>, JsonRejection>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id)?;
    let Json(req) = payload?;
    let item = state.menu.update(product_id, req.into_draft()?).await?;
    Ok(Json(item.into()))
}

/// DELETE /menu/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id: ProductId = parse_id(&id)?;
    state.menu.delete(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
