// src/handlers/aforo.rs

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    common::{
        error::ApiError,
        extract::{ApiJson, ApiPath},
    },
    config::AppState,
    handlers::create_idempotent,
    middleware::{i18n::Locale, idempotency::IdempotencyKey},
    models::aforo::{Movement, NewMovement, NewVenue, OccupancyReport, Venue, VenueSummary},
};

// =========================================================================
//  RECINTOS
// =========================================================================

#[utoipa::path(
    post,
    path = "/aforo/recintos",
    tag = "Aforo",
    request_body = NewVenue,
    responses(
        (status = 200, description = "Recinto criado", body = Venue),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Nome já cadastrado")
    )
)]
pub async fn create_venue(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiJson(payload): ApiJson<NewVenue>,
) -> Result<impl IntoResponse, ApiError> {
    let venue = app_state
        .aforo_service
        .create_venue(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(venue)))
}

#[utoipa::path(
    get,
    path = "/aforo/recintos",
    tag = "Aforo",
    responses(
        (status = 200, description = "Recintos com ocupação e estado", body = Vec<VenueSummary>)
    )
)]
pub async fn list_venues(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let venues = app_state
        .aforo_service
        .list_venues()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(venues)))
}

#[utoipa::path(
    get,
    path = "/aforo/recintos/{id}",
    tag = "Aforo",
    params(("id" = i64, Path, description = "ID do recinto")),
    responses(
        (status = 200, description = "Recinto", body = Venue),
        (status = 404, description = "Recinto não encontrado")
    )
)]
pub async fn get_venue(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let venue = app_state
        .aforo_service
        .get_venue(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(venue))
}

// =========================================================================
//  OCUPAÇÃO
// =========================================================================

#[utoipa::path(
    get,
    path = "/aforo/recintos/{id}/ocupacion",
    tag = "Aforo",
    params(("id" = i64, Path, description = "ID do recinto")),
    responses(
        (status = 200, description = "Ocupação atual", body = OccupancyReport),
        (status = 404, description = "Recinto não encontrado")
    )
)]
pub async fn get_occupancy(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .aforo_service
        .get_occupancy(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/aforo/recintos/{id}/movimientos",
    tag = "Aforo",
    request_body = NewMovement,
    params(
        ("id" = i64, Path, description = "ID do recinto"),
        ("Idempotency-Key" = Option<uuid::Uuid>, Header, description = "Evita registrar o mesmo movimento duas vezes")
    ),
    responses(
        (status = 200, description = "Movimento registrado", body = Movement),
        (status = 400, description = "Quantidade inválida"),
        (status = 404, description = "Recinto não encontrado"),
        (status = 409, description = "Capacidade excedida ou ocupação negativa")
    )
)]
pub async fn record_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    key: IdempotencyKey,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<NewMovement>,
) -> Result<Response, ApiError> {
    let route = format!("POST /aforo/recintos/{}/movimientos", id);
    create_idempotent(
        &app_state,
        &locale,
        key,
        route,
        app_state.aforo_service.record_movement(id, payload),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/aforo/recintos/{id}/movimientos",
    tag = "Aforo",
    params(("id" = i64, Path, description = "ID do recinto")),
    responses(
        (status = 200, description = "Histórico de movimentos, do mais antigo ao mais recente", body = Vec<Movement>),
        (status = 404, description = "Recinto não encontrado")
    )
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state
        .aforo_service
        .list_movements(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(movements))
}
