pub mod aforo;
pub mod health;
pub mod permisos;

use std::future::Future;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, idempotency::IdempotencyKey},
    services::idempotency::{Begin, CachedResponse},
};

/// Executa uma criação protegida por `Idempotency-Key`: a mesma chave na
/// mesma rota devolve a resposta guardada sem executar `create` de novo.
/// Sem chave, apenas executa. Respostas de erro não ficam guardadas.
pub(crate) async fn create_idempotent<T, F>(
    app_state: &AppState,
    locale: &Locale,
    key: IdempotencyKey,
    route: String,
    create: F,
) -> Result<Response, ApiError>
where
    T: Serialize,
    F: Future<Output = Result<T, AppError>>,
{
    let to_api = |e: AppError| e.to_api_error(locale, &app_state.i18n_store);

    let guard = match key.0 {
        None => None,
        Some(key) => match app_state.idempotency.begin(key, &route).map_err(to_api)? {
            Begin::Replay(cached) => return Ok(cached.into_response()),
            Begin::Fresh(guard) => Some(guard),
        },
    };

    let created = create.await.map_err(to_api)?;
    let body = serde_json::to_value(&created)
        .map_err(|e| to_api(AppError::InternalServerError(e.into())))?;

    if let Some(guard) = guard {
        guard.complete(CachedResponse {
            status: StatusCode::OK,
            body: body.clone(),
        });
    }

    Ok((StatusCode::OK, Json(body)).into_response())
}
