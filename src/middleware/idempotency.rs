// src/middleware/idempotency.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::ApiError;

// O nome do cabeçalho HTTP
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// `Idempotency-Key` opcional. Ausente: a requisição segue sem proteção
/// contra reenvio. Presente, precisa ser um UUID.
#[derive(Debug, Clone, Copy)]
pub struct IdempotencyKey(pub Option<Uuid>);

impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(IDEMPOTENCY_KEY_HEADER) else {
            return Ok(IdempotencyKey(None));
        };

        let value_str = value
            .to_str()
            .map_err(|_| ApiError::bad_request("Idempotency-Key contém caracteres inválidos."))?;

        let key = Uuid::parse_str(value_str.trim())
            .map_err(|_| ApiError::bad_request("Idempotency-Key inválida (não é um UUID)."))?;

        Ok(IdempotencyKey(Some(key)))
    }
}
