// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- AFORO ---
        handlers::aforo::create_venue,
        handlers::aforo::list_venues,
        handlers::aforo::get_venue,
        handlers::aforo::get_occupancy,
        handlers::aforo::record_movement,
        handlers::aforo::list_movements,

        // --- PERMISOS ---
        handlers::permisos::register_merchant,
        handlers::permisos::list_merchants,
        handlers::permisos::get_merchant,
        handlers::permisos::update_merchant,
        handlers::permisos::create_stall,
        handlers::permisos::list_stalls,
        handlers::permisos::get_stall,
        handlers::permisos::request_permit,
        handlers::permisos::list_permits,
        handlers::permisos::get_permit,
        handlers::permisos::transition_permit,
    ),
    components(
        schemas(
            handlers::health::Health,

            // --- Aforo ---
            models::aforo::MovementKind,
            models::aforo::OccupancyStatus,
            models::aforo::Venue,
            models::aforo::VenueSummary,
            models::aforo::OccupancyReport,
            models::aforo::Movement,
            models::aforo::NewVenue,
            models::aforo::NewMovement,

            // --- Permisos ---
            models::permisos::PermitStatus,
            models::permisos::Merchant,
            models::permisos::NewMerchant,
            models::permisos::MerchantChanges,
            models::permisos::Stall,
            models::permisos::NewStall,
            models::permisos::Permit,
            models::permisos::NewPermit,
            models::permisos::PermitTransition,
        )
    ),
    tags(
        (name = "Health", description = "Estado do serviço"),
        (name = "Aforo", description = "Recintos e ocupação"),
        (name = "Permisos", description = "Comerciantes, puestos e permisos")
    )
)]
pub struct ApiDoc;
