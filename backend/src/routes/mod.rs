//! Route definitions for the image tagging service

use axum::{routing::get, Router};

use crate::{handlers, AppState};

/// Create image routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/images",
            get(handlers::list_images).post(handlers::upload_image),
        )
        .route("/images/:image_id", get(handlers::get_image))
}
