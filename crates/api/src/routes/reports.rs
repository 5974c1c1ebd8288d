//! Read-only sales reports.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use chrono::NaiveDate;
use domain::PeriodReport;
use serde::{Deserialize, Serialize};
use store::PopularItem;

use crate::error::ApiError;
use crate::state::{AppState, CafeStore};

#[derive(Serialize)]
pub struct TotalSalesResponse {
    pub total_cents: i64,
    pub order_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct PopularItemsParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct OrderedItemsParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub period: String,
    pub month: Option<String>,
    pub year: Option<i32>,
}

/// GET /reports/total-sales: revenue over closed orders.
#[tracing::instrument(skip(state))]
pub async fn total_sales<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<TotalSalesResponse>, ApiError> {
    let sales = state.reports.total_sales().await?;
    Ok(Json(TotalSalesResponse {
        total_cents: sales.total.cents(),
        order_count: sales.order_count,
    }))
}

/// GET /reports/popular-items?limit=: best sellers, most ordered first.
#[tracing::instrument(skip(state, params))]
pub async fn popular_items<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<PopularItemsParams>, QueryRejection>,
) -> Result<Json<Vec<PopularItem>>, ApiError> {
    let Query(params) = params?;
    Ok(Json(state.reports.popular_items(params.limit).await?))
}

/// GET /reports/ordered-items?start_date=&end_date=: quantity ordered per
/// product between two days, both inclusive.
#[tracing::instrument(skip(state, params))]
pub async fn ordered_items<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<OrderedItemsParams>, QueryRejection>,
) -> Result<Json<Vec<PopularItem>>, ApiError> {
    let Query(params) = params?;
    let items = state
        .reports
        .ordered_items(params.start_date, params.end_date)
        .await?;
    Ok(Json(items))
}

/// GET /reports/ordered-items-by-period?period=day|month&month=&year=:
/// orders placed per day of a month or per month of a year.
#[tracing::instrument(skip(state, params))]
pub async fn ordered_items_by_period<S: CafeStore>(
    State(state): State<Arc<AppState<S>>>,
    params: Result<Query<PeriodParams>, QueryRejection>,
) -> Result<Json<PeriodReport>, ApiError> {
    let Query(params) = params?;
    let report = state
        .reports
        .ordered_items_by_period(&params.period, params.month.as_deref(), params.year)
        .await?;
    Ok(Json(report))
}
