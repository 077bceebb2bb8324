// src/lib.rs

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc};

/// Monta o router completo com estado, documentação e camadas.
pub fn build_router(app_state: AppState) -> Router {
    let aforo_routes = Router::new()
        .route(
            "/recintos",
            get(handlers::aforo::list_venues).post(handlers::aforo::create_venue),
        )
        .route("/recintos/{id}", get(handlers::aforo::get_venue))
        .route("/recintos/{id}/ocupacion", get(handlers::aforo::get_occupancy))
        .route(
            "/recintos/{id}/movimientos",
            get(handlers::aforo::list_movements).post(handlers::aforo::record_movement),
        );

    let permisos_routes = Router::new()
        // Comerciantes
        .route(
            "/comerciantes",
            get(handlers::permisos::list_merchants).post(handlers::permisos::register_merchant),
        )
        .route(
            "/comerciantes/{id}",
            get(handlers::permisos::get_merchant).patch(handlers::permisos::update_merchant),
        )
        // Puestos
        .route(
            "/puestos",
            get(handlers::permisos::list_stalls).post(handlers::permisos::create_stall),
        )
        .route("/puestos/{id}", get(handlers::permisos::get_stall))
        // Permisos
        .route(
            "/permisos",
            get(handlers::permisos::list_permits).post(handlers::permisos::request_permit),
        )
        .route(
            "/permisos/{id}",
            get(handlers::permisos::get_permit).patch(handlers::permisos::transition_permit),
        );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health))
        .nest("/aforo", aforo_routes)
        .nest("/permisos", permisos_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
