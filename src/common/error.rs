// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::permisos::PermitStatus,
};

/// As entidades que um erro pode referenciar (chave de tradução).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Venue,
    Merchant,
    Stall,
    Permit,
}

impl Entity {
    pub fn key(self) -> &'static str {
        match self {
            Entity::Venue => "venue",
            Entity::Merchant => "merchant",
            Entity::Stall => "stall",
            Entity::Permit => "permit",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Regras de validação que dependem do estado (ex.: datas invertidas)
    #[error("Campo inválido: {field} ({code})")]
    InvalidField { field: &'static str, code: &'static str },

    #[error("{} {id} não encontrado", entity.key())]
    NotFound { entity: Entity, id: i64 },

    #[error("{} com {field} '{value}' já existe", entity.key())]
    Conflict {
        entity: Entity,
        field: &'static str,
        value: String,
    },

    #[error("Recinto {venue_id}: {current} + {requested} excede a capacidade {capacity}")]
    CapacityExceeded {
        venue_id: i64,
        capacity: i32,
        current: i32,
        requested: i32,
    },

    #[error("Recinto {venue_id}: saída de {requested} com ocupação {current}")]
    NegativeOccupancy {
        venue_id: i64,
        current: i32,
        requested: i32,
    },

    #[error("Puesto {stall_id} já possui o permiso aprovado {conflicting_permit_id} no período")]
    Overlap {
        stall_id: i64,
        conflicting_permit_id: i64,
    },

    #[error("Transição inválida: {from} -> {to}")]
    InvalidTransition { from: PermitStatus, to: PermitStatus },

    #[error("Chave de idempotência reutilizada em outra rota")]
    IdempotencyKeyReused,

    #[error("Requisição com a mesma chave de idempotência ainda em andamento")]
    RequestInProgress,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

/// O erro que efetivamente vai para o cliente.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation",
            error: error.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "kind": self.kind,
            "error": self.error,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

// O validator reporta o nome do campo Rust; o cliente conhece o nome JSON
fn wire_field(field: &str) -> &str {
    match field {
        "name" => "nombre",
        "capacity_maximum" => "capacidad_maxima",
        "location" => "ubicacion",
        "kind" => "tipo",
        "quantity" => "cantidad",
        "national_id" => "cedula",
        "phone" => "telefono",
        "active" => "activo",
        "description" => "descripcion",
        "merchant_id" => "comerciante_id",
        "stall_id" => "puesto_id",
        "start_date" => "fecha_inicio",
        "end_date" => "fecha_fin",
        "status" => "estado",
        "rejection_reason" => "motivo_rechazo",
        other => other,
    }
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } => "validation",
            AppError::NotFound { .. } => "not_found",
            AppError::Conflict { .. }
            | AppError::IdempotencyKeyReused
            | AppError::RequestInProgress => "conflict",
            AppError::CapacityExceeded { .. } => "capacity_exceeded",
            AppError::NegativeOccupancy { .. } => "negative_occupancy",
            AppError::Overlap { .. } => "overlap",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. }
            | AppError::CapacityExceeded { .. }
            | AppError::NegativeOccupancy { .. }
            | AppError::Overlap { .. }
            | AppError::InvalidTransition { .. }
            | AppError::IdempotencyKeyReused
            | AppError::RequestInProgress => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Traduz o erro de domínio para a resposta HTTP no idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();
        let kind = self.kind();
        let lang = locale.0.as_str();

        let (error, details) = match &self {
            AppError::ValidationError(errors) => {
                // Código do erro por campo, o frontend só mostra a mensagem genérica
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let codes: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            let code = e.message.as_ref().unwrap_or(&e.code);
                            Value::String(code.to_string())
                        })
                        .collect();
                    details.insert(wire_field(&field).to_string(), Value::Array(codes));
                }
                (
                    store.translate(lang, "error.validation", &[]),
                    Some(Value::Object(details)),
                )
            }
            AppError::InvalidField { field, code } => {
                let mut details = serde_json::Map::new();
                details.insert(field.to_string(), json!([code]));
                (
                    store.translate(lang, "error.validation", &[]),
                    Some(Value::Object(details)),
                )
            }
            AppError::NotFound { entity, id } => {
                let name = store.translate(lang, &format!("entity.{}", entity.key()), &[]);
                (
                    store.translate(
                        lang,
                        "error.not_found",
                        &[("entity", name), ("id", id.to_string())],
                    ),
                    None,
                )
            }
            AppError::Conflict { entity, field, value } => {
                let name = store.translate(lang, &format!("entity.{}", entity.key()), &[]);
                (
                    store.translate(
                        lang,
                        "error.conflict",
                        &[
                            ("entity", name),
                            ("field", field.to_string()),
                            ("value", value.clone()),
                        ],
                    ),
                    Some(json!({ "field": field })),
                )
            }
            AppError::CapacityExceeded { venue_id, capacity, current, requested } => (
                store.translate(
                    lang,
                    "error.capacity_exceeded",
                    &[
                        ("capacity", capacity.to_string()),
                        ("current", current.to_string()),
                        ("requested", requested.to_string()),
                    ],
                ),
                Some(json!({
                    "recinto_id": venue_id,
                    "capacidad_maxima": capacity,
                    "ocupacion_actual": current,
                    "cantidad": requested,
                })),
            ),
            AppError::NegativeOccupancy { venue_id, current, requested } => (
                store.translate(
                    lang,
                    "error.negative_occupancy",
                    &[
                        ("current", current.to_string()),
                        ("requested", requested.to_string()),
                    ],
                ),
                Some(json!({
                    "recinto_id": venue_id,
                    "ocupacion_actual": current,
                    "cantidad": requested,
                })),
            ),
            AppError::Overlap { stall_id, conflicting_permit_id } => (
                store.translate(
                    lang,
                    "error.overlap",
                    &[
                        ("stall", stall_id.to_string()),
                        ("permit", conflicting_permit_id.to_string()),
                    ],
                ),
                Some(json!({
                    "puesto_id": stall_id,
                    "permiso_id": conflicting_permit_id,
                })),
            ),
            AppError::InvalidTransition { from, to } => (
                store.translate(
                    lang,
                    "error.invalid_transition",
                    &[("from", from.to_string()), ("to", to.to_string())],
                ),
                None,
            ),
            AppError::IdempotencyKeyReused => {
                (store.translate(lang, "error.idempotency_key_reused", &[]), None)
            }
            AppError::RequestInProgress => {
                (store.translate(lang, "error.request_in_progress", &[]), None)
            }
            // Falhas de infraestrutura: loga o detalhe, devolve mensagem genérica
            e @ (AppError::DatabaseError(_) | AppError::InternalServerError(_)) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (store.translate(lang, "error.internal", &[]), None)
            }
        };

        ApiError { status, kind, error, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> I18nStore {
        I18nStore::load("es").unwrap()
    }

    #[test]
    fn test_capacity_exceeded_maps_to_409_with_details() {
        let err = AppError::CapacityExceeded {
            venue_id: 1,
            capacity: 5000,
            current: 4800,
            requested: 300,
        };
        let api = err.to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.kind, "capacity_exceeded");
        assert!(api.error.contains("4800"));
        assert_eq!(api.details.unwrap()["capacidad_maxima"], 5000);
    }

    #[test]
    fn test_invalid_field_is_a_validation_error() {
        let err = AppError::InvalidField { field: "fecha_fin", code: "before_start" };
        let api = err.to_api_error(&Locale("es".into()), &store());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.kind, "validation");
        assert_eq!(api.details.unwrap(), json!({ "fecha_fin": ["before_start"] }));
    }

    #[test]
    fn test_validation_details_use_json_field_names() {
        use validator::Validate;

        let input = crate::models::permisos::PermitTransition {
            status: PermitStatus::Rejected,
            rejection_reason: Some("  ".into()),
        };
        let err = AppError::from(input.validate().unwrap_err());
        let api = err.to_api_error(&Locale("es".into()), &store());
        assert_eq!(api.details.unwrap(), json!({ "motivo_rechazo": ["required"] }));
    }

    #[test]
    fn test_not_found_is_localized() {
        let err = || AppError::NotFound { entity: Entity::Stall, id: 3 };
        let en = err().to_api_error(&Locale("en".into()), &store());
        let es = err().to_api_error(&Locale("es".into()), &store());
        assert_eq!(en.status, StatusCode::NOT_FOUND);
        assert_eq!(en.error, "Stall 3 not found.");
        assert_ne!(en.error, es.error);
    }

    #[test]
    fn test_internal_errors_do_not_leak() {
        let err = AppError::InternalServerError(anyhow::anyhow!("senha do banco: hunter2"));
        let api = err.to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.kind, "internal");
        assert!(!api.error.contains("hunter2"));
    }
}
