//! Inventory maintenance and leftovers endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{IngredientId, InventoryItem};
use domain::InventoryItemDraft;
use serde::{Deserialize, Serialize};
use store::{LeftoverQuery, LeftoverSort};

use crate::error::ApiError;
use crate::routes::parse_id;
use crate::state::{AppState, CafeStore};

// -- Request types --

#[derive(Deserialize)]
pub struct InventoryItemRequest {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

impl From<InventoryItemRequest> for InventoryItemDraft {
    fn from(req: InventoryItemRequest) -> Self {
        Self {
            name: req.name,
            quantity: req.quantity,
            unit: req.unit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeftoversParams {
    pub sort_by: Option<LeftoverSort>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl From<LeftoversParams> for LeftoverQuery {
    fn from(params: LeftoversParams) -> Self {
        let mut query = LeftoverQuery::new().sort_by(params.sort_by.unwrap_or_default());
        if let Some(page) = params.page {
            query = query.page(page);
        }
        if let Some(page_size) = params.page_size {
            query = query.page_size(page_size);
        }
        query
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct LeftoversResponse {
    pub items: Vec<InventoryItem>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub has_next_page: bool,
}

// -- Handlers --

/// POST /inventory
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<InventoryItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let Json(req) = payload?;
    let item = state.inventory.create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /inventory
#[tracing::instrument(skip(state))]
pub async fn list<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    Ok(Json(state.inventory.list().await?))
}

/// GET /inventory/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<InventoryItem>, ApiError> {
    let ingredient_id: IngredientId = parse_id(&id)?;
    Ok(Json(state.inventory.get(ingredient_id).await?))
}

/// PUT /inventory/{id}: overwrite stock, e.g. after a delivery.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<InventoryItemRequest>, JsonRejection>,
) -> Result<Json<InventoryItem>, ApiError> {
    let ingredient_id: IngredientId = parse_id(&id)?;
    let Json(req) = payload?;
    Ok(Json(state.inventory.update(ingredient_id, req.into()).await?))
}

/// DELETE /inventory/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ingredient_id: IngredientId = parse_id(&id)?;
    state.inventory.delete(ingredient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /inventory/leftovers?sort_by=quantity|name&page=&page_size=
#[tracing::instrument(skip(state, params))]
pub async fn leftovers<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<LeftoversParams>, QueryRejection>,
) -> Result<Json<LeftoversResponse>, ApiError> {
    let Query(params) = params?;
    let page = state.inventory.leftovers(params.into()).await?;
    Ok(Json(LeftoversResponse {
        has_next_page: page.has_next_page(),
        items: page.items,
        page: page.page,
        page_size: page.page_size,
        total: page.total,
    }))
}
