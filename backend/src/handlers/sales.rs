//! Sales HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use shared::types::Pagination;

use crate::services::sales::{CreateSaleInput, SaleFilter, SalesService};
use crate::AppState;

/// Commit a sale
pub async fn create_sale(
    State(state): State<AppState>,
    Json(input): Json<CreateSaleInput>,
) -> impl IntoResponse {
    let service = SalesService::new(state.db.clone());

    match service.create_sale(input).await {
        Ok(sale) => (StatusCode::CREATED, Json(sale)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List sales with optional customer, seller and date filters
pub async fn list_sales(
    State(state): State<AppState>,
    Query(filter): Query<SaleFilter>,
    Query(pagination): Query<Pagination>,
) -> impl IntoResponse {
    let service = SalesService::new(state.db.clone());

    match service.list_sales(filter, pagination).await {
        Ok(sales) => (StatusCode::OK, Json(serde_json::json!({ "sales": sales }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a sale with its lines
pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = SalesService::new(state.db.clone());

    match service.get_sale(sale_id).await {
        Ok(sale) => (StatusCode::OK, Json(sale)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a sale by its code
pub async fn get_sale_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    let service = SalesService::new(state.db.clone());

    match service.get_sale_by_code(&code).await {
        Ok(sale) => (StatusCode::OK, Json(sale)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel a sale, restoring its stock
pub async fn cancel_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = SalesService::new(state.db.clone());

    match service.cancel_sale(sale_id).await {
        Ok(sale) => (StatusCode::OK, Json(sale)).into_response(),
        Err(e) => e.into_response(),
    }
}
