// src/handlers/permisos.rs

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
    models::permisos::{
        Merchant, MerchantChanges, NewMerchant, NewPermit, NewStall, Permit, PermitTransition,
        Stall,
    },
};

// =========================================================================
//  1. COMERCIANTES
// =========================================================================

#[utoipa::path(
    post,
    path = "/permisos/comerciantes",
    tag = "Permisos",
    request_body = NewMerchant,
    responses(
        (status = 200, description = "Comerciante cadastrado", body = Merchant),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Cédula já cadastrada")
    )
)]
pub async fn register_merchant(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiJson(payload): ApiJson<NewMerchant>,
) -> Result<impl IntoResponse, ApiError> {
    let merchant = app_state
        .permisos_service
        .register_merchant(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(merchant)))
}

#[utoipa::path(
    get,
    path = "/permisos/comerciantes",
    tag = "Permisos",
    responses(
        (status = 200, description = "Comerciantes em ordem de cadastro", body = Vec<Merchant>)
    )
)]
pub async fn list_merchants(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let merchants = app_state
        .permisos_service
        .list_merchants()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(merchants))
}

#[utoipa::path(
    get,
    path = "/permisos/comerciantes/{id}",
    tag = "Permisos",
    params(("id" = i64, Path, description = "ID do comerciante")),
    responses(
        (status = 200, description = "Comerciante", body = Merchant),
        (status = 404, description = "Comerciante não encontrado")
    )
)]
pub async fn get_merchant(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let merchant = app_state
        .permisos_service
        .get_merchant(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(merchant))
}

// Desativar é `{"activo": false}`: comerciante não é apagado
#[utoipa::path(
    patch,
    path = "/permisos/comerciantes/{id}",
    tag = "Permisos",
    request_body = MerchantChanges,
    params(("id" = i64, Path, description = "ID do comerciante")),
    responses(
        (status = 200, description = "Comerciante atualizado", body = Merchant),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Comerciante não encontrado")
    )
)]
pub async fn update_merchant(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<MerchantChanges>,
) -> Result<impl IntoResponse, ApiError> {
    let merchant = app_state
        .permisos_service
        .update_merchant(id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(merchant))
}

// =========================================================================
//  2. PUESTOS
// =========================================================================

#[utoipa::path(
    post,
    path = "/permisos/puestos",
    tag = "Permisos",
    request_body = NewStall,
    responses(
        (status = 200, description = "Puesto criado", body = Stall),
        (status = 400, description = "Nome ausente")
    )
)]
pub async fn create_stall(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiJson(payload): ApiJson<NewStall>,
) -> Result<impl IntoResponse, ApiError> {
    let stall = app_state
        .permisos_service
        .create_stall(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(stall)))
}

#[utoipa::path(
    get,
    path = "/permisos/puestos",
    tag = "Permisos",
    responses((status = 200, description = "Puestos", body = Vec<Stall>))
)]
pub async fn list_stalls(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let stalls = app_state
        .permisos_service
        .list_stalls()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(stalls))
}

#[utoipa::path(
    get,
    path = "/permisos/puestos/{id}",
    tag = "Permisos",
    params(("id" = i64, Path, description = "ID do puesto")),
    responses(
        (status = 200, description = "Puesto", body = Stall),
        (status = 404, description = "Puesto não encontrado")
    )
)]
pub async fn get_stall(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let stall = app_state
        .permisos_service
        .get_stall(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(stall))
}

// =========================================================================
//  3. PERMISOS
// =========================================================================

#[utoipa::path(
    post,
    path = "/permisos/permisos",
    tag = "Permisos",
    request_body = NewPermit,
    params(
        ("Idempotency-Key" = Option<uuid::Uuid>, Header, description = "Evita pedidos duplicados")
    ),
    responses(
        (status = 200, description = "Permiso solicitado em PENDING", body = Permit),
        (status = 400, description = "Datas inválidas ou comerciante inativo"),
        (status = 404, description = "Comerciante ou puesto não encontrado"),
        (status = 409, description = "Período cruza um permiso aprovado")
    )
)]
pub async fn request_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    key: IdempotencyKey,
    ApiJson(payload): ApiJson<NewPermit>,
) -> Result<Response, ApiError> {
    create_idempotent(
        &app_state,
        &locale,
        key,
        "POST /permisos/permisos".to_string(),
        app_state.permisos_service.request_permit(payload),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/permisos/permisos",
    tag = "Permisos",
    responses((status = 200, description = "Permisos (vencidos já marcados)", body = Vec<Permit>))
)]
pub async fn list_permits(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let permits = app_state
        .permisos_service
        .list_permits()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permits))
}

#[utoipa::path(
    get,
    path = "/permisos/permisos/{id}",
    tag = "Permisos",
    params(("id" = i64, Path, description = "ID do permiso")),
    responses(
        (status = 200, description = "Permiso", body = Permit),
        (status = 404, description = "Permiso não encontrado")
    )
)]
pub async fn get_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let permit = app_state
        .permisos_service
        .get_permit(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permit))
}

#[utoipa::path(
    patch,
    path = "/permisos/permisos/{id}",
    tag = "Permisos",
    request_body = PermitTransition,
    params(("id" = i64, Path, description = "ID do permiso")),
    responses(
        (status = 200, description = "Estado alterado", body = Permit),
        (status = 404, description = "Permiso não encontrado"),
        (status = 409, description = "Transição inválida ou período cruza um permiso aprovado")
    )
)]
pub async fn transition_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<PermitTransition>,
) -> Result<impl IntoResponse, ApiError> {
    let permit = app_state
        .permisos_service
        .transition(id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permit))
}
