use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with every rek endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/verify", get(handler::verify_handler))
        // reference data
        .route(
            "/v1/categories",
            get(handler::list_categories).post(handler::create_category),
        )
        .route("/v1/categories/:id", delete(handler::delete_category))
        .route(
            "/v1/manufacturers",
            get(handler::list_manufacturers).post(handler::create_manufacturer),
        )
        .route("/v1/manufacturers/:id", get(handler::get_manufacturer))
        .route(
            "/v1/suppliers",
            get(handler::list_suppliers).post(handler::create_supplier),
        )
        .route(
            "/v1/suppliers/:id",
            get(handler::get_supplier)
                .patch(handler::update_supplier)
                .delete(handler::delete_supplier),
        )
        .route(
            "/v1/locations",
            get(handler::list_locations).post(handler::create_location),
        )
        .route(
            "/v1/components",
            get(handler::list_components).post(handler::create_component),
        )
        .route(
            "/v1/components/:id",
            get(handler::get_component)
                .patch(handler::update_component)
                .delete(handler::delete_component),
        )
        // stock
        .route("/v1/stocks", get(handler::list_stocks))
        .route("/v1/stocks/adjust", post(handler::adjust_stock))
        .route("/v1/stocks/threshold", post(handler::set_threshold))
        // documents
        .route(
            "/v1/receipts",
            get(handler::list_receipts).post(handler::create_receipt),
        )
        .route("/v1/receipts/:id", get(handler::get_receipt))
        .route("/v1/receipts/:id/confirm", post(handler::confirm_receipt))
        .route("/v1/receipts/:id/cancel", post(handler::cancel_receipt))
        .route(
            "/v1/issues",
            get(handler::list_issues).post(handler::create_issue),
        )
        .route("/v1/issues/:id", get(handler::get_issue))
        .route("/v1/issues/:id/confirm", post(handler::confirm_issue))
        .route("/v1/issues/:id/cancel", post(handler::cancel_issue))
        .route(
            "/v1/inventories",
            get(handler::list_inventories).post(handler::create_inventory),
        )
        .route("/v1/inventories/:id", get(handler::get_inventory))
        // audit and reports
        .route("/v1/audit", get(handler::audit_handler))
        .route("/v1/reports/stock", get(handler::stock_report))
        .route("/v1/reports/summary", get(handler::summary_report))
        .route("/v1/reports/movements", get(handler::movements_report))
        .route(
            "/v1/reports/history/:component_id",
            get(handler::history_report),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
