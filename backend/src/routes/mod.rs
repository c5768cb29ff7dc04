//! Route definitions for the AgroStock backend

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Lot intake
        .nest("/lots", lot_routes())
        // Bulk opening
        .nest("/bulk-conversions", bulk_routes())
        // Sale commit and cancellation
        .nest("/sales", sale_routes())
        // Stock reporting
        .nest("/stock", stock_routes())
}

/// Lot intake routes
fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots).post(handlers::create_lot))
        .route("/complete", post(handlers::create_lot_complete))
        .route("/:lot_id", get(handlers::get_lot))
        .route(
            "/:lot_id/details",
            get(handlers::get_lot_details).post(handlers::create_lot_detail),
        )
}

/// Bulk conversion routes
fn bulk_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_conversions).post(handlers::open_bulk),
        )
        .route("/:conversion_id", get(handlers::get_conversion))
}

/// Sales routes
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route(
            "/:sale_id",
            get(handlers::get_sale).delete(handlers::cancel_sale),
        )
        .route("/code/:code", get(handlers::get_sale_by_code))
}

/// Stock report routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::stock_report))
        .route(
            "/:presentation_id/available",
            get(handlers::available_stock),
        )
        .route(
            "/:presentation_id/lot-details",
            get(handlers::presentation_lot_details),
        )
}
