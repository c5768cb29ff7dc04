//! Stock report HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::services::inventory::InventoryService;
use crate::services::stock::StockReportService;
use crate::AppState;

/// Stock report across all active presentations
pub async fn stock_report(State(state): State<AppState>) -> impl IntoResponse {
    let service = StockReportService::new(state.db.clone());

    match service.report().await {
        Ok(rows) => (StatusCode::OK, Json(serde_json::json!({ "stock": rows }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Total sellable quantity for one presentation
pub async fn available_stock(
    State(state): State<AppState>,
    Path(presentation_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = StockReportService::new(state.db.clone());

    match service.available_for(presentation_id).await {
        Ok(available) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "presentation_id": presentation_id,
                "available": available,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LotBreakdownQuery {
    /// When false, exhausted lot details are included
    #[serde(default = "default_available_only")]
    pub available_only: bool,
}

fn default_available_only() -> bool {
    true
}

/// Per-lot-detail breakdown for a presentation, in allocation order
pub async fn presentation_lot_details(
    State(state): State<AppState>,
    Path(presentation_id): Path<Uuid>,
    Query(query): Query<LotBreakdownQuery>,
) -> impl IntoResponse {
    let service = InventoryService::new(state.db.clone());

    match service
        .lot_details_by_presentation(presentation_id, query.available_only)
        .await
    {
        Ok(details) => (
            StatusCode::OK,
            Json(serde_json::json!({ "details": details })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
