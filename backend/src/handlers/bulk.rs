//! Bulk conversion HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::types::Pagination;

use crate::services::bulk::{BulkConversionService, OpenBulkInput};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListConversionsQuery {
    #[serde(default)]
    pub active_only: bool,
    pub target_presentation_id: Option<Uuid>,
}

/// Open packaged units into loose stock
pub async fn open_bulk(
    State(state): State<AppState>,
    Json(input): Json<OpenBulkInput>,
) -> impl IntoResponse {
    let service = BulkConversionService::new(state.db.clone());

    match service.open_bulk(input).await {
        Ok(conversion) => (StatusCode::CREATED, Json(conversion)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List bulk conversions
pub async fn list_conversions(
    State(state): State<AppState>,
    Query(query): Query<ListConversionsQuery>,
    Query(pagination): Query<Pagination>,
) -> impl IntoResponse {
    let service = BulkConversionService::new(state.db.clone());

    match service
        .list_conversions(query.active_only, query.target_presentation_id, pagination)
        .await
    {
        Ok(conversions) => (
            StatusCode::OK,
            Json(serde_json::json!({ "conversions": conversions })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a bulk conversion
pub async fn get_conversion(
    State(state): State<AppState>,
    Path(conversion_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = BulkConversionService::new(state.db.clone());

    match service.get_conversion(conversion_id).await {
        Ok(conversion) => (StatusCode::OK, Json(conversion)).into_response(),
        Err(e) => e.into_response(),
    }
}
