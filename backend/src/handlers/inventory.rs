//! Lot intake HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::types::Pagination;

use crate::services::inventory::{CreateLotDetailInput, CreateLotInput, InventoryService};
use crate::AppState;

/// Body for creating a lot together with its detail lines
#[derive(Debug, Deserialize)]
pub struct CreateLotRequest {
    #[serde(flatten)]
    pub lot: CreateLotInput,
    pub details: Vec<CreateLotDetailInput>,
}

/// Create an empty lot; details are added per line afterwards
pub async fn create_lot(
    State(state): State<AppState>,
    Json(input): Json<CreateLotInput>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.db.clone());

    match service.create_lot(input).await {
        Ok(lot) => (StatusCode::CREATED, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a lot and its detail lines in one shot
pub async fn create_lot_complete(
    State(state): State<AppState>,
    Json(request): Json<CreateLotRequest>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.db.clone());

    match service
        .create_lot_with_details(request.lot, request.details)
        .await
    {
        Ok(lot) => (StatusCode::CREATED, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List lots, newest received first
pub async fn list_lots(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.db.clone());

    match service.list_lots(pagination).await {
        Ok(lots) => (StatusCode::OK, Json(serde_json::json!({ "lots": lots }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a single lot
pub async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.db.clone());

    match service.get_lot(lot_id).await {
        Ok(lot) => (StatusCode::OK, Json(lot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get the detail lines of a lot
pub async fn get_lot_details(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.db.clone());

    match service.get_lot_details(lot_id).await {
        Ok(details) => (
            StatusCode::OK,
            Json(serde_json::json!({ "details": details })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Add a detail line to an existing lot
pub async fn create_lot_detail(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<CreateLotDetailInput>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.db.clone());

    match service.create_lot_detail(lot_id, input).await {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}
