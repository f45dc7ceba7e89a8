use std::path::Path;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod openapi;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

/// API, health and API docs routes, without static assets.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::tasks::router())
        .route("/health", get(routes::health::health_check));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .with_state(state)
        .merge(
            SwaggerUi::new(openapi::DOCS_PATH)
                .url(openapi::SPEC_PATH, openapi::ApiDoc::openapi()),
        )
}

/// Full application: API, static frontend fallback, CORS and request tracing.
pub fn app(state: AppState, frontend_dir: &Path) -> Router {
    router(state)
        .fallback_service(ServeDir::new(frontend_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
