// src/models/aforo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::{common::error::AppError, models::validation::not_blank};

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_kind", rename_all = "lowercase")]
pub enum MovementKind {
    #[serde(rename = "entrada", alias = "entry")]
    Entry,
    #[serde(rename = "salida", alias = "exit")]
    Exit,
}

/// Estado derivado da razão ocupação / capacidade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupancyStatus {
    Normal,
    Warning,
    Full,
}

// Limite inferior (inclusivo) do WARNING, em porcentagem
pub const WARNING_THRESHOLD_PERCENT: i64 = 85;

impl OccupancyStatus {
    /// `WARNING` a partir de 85% (inclusivo), `FULL` a partir de 100%.
    /// Comparação em inteiros para não depender de arredondamento de float.
    pub fn from_counts(occupancy: i32, capacity: i32) -> Self {
        let occupancy = i64::from(occupancy);
        let capacity = i64::from(capacity);

        if occupancy >= capacity {
            OccupancyStatus::Full
        } else if occupancy * 100 >= capacity * WARNING_THRESHOLD_PERCENT {
            OccupancyStatus::Warning
        } else {
            OccupancyStatus::Normal
        }
    }
}

// --- RECINTO ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Venue {
    #[schema(example = 1)]
    pub id: i64,
    #[serde(rename = "nombre")]
    #[schema(example = "Plaza Mayor")]
    pub name: String,
    #[serde(rename = "capacidad_maxima")]
    #[schema(example = 5000)]
    pub capacity_maximum: i32,
    #[serde(rename = "ubicacion")]
    #[schema(example = "Centro")]
    pub location: String,
    #[serde(rename = "ocupacion_actual")]
    #[schema(example = 0)]
    pub current_occupancy: i32,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
}

impl Venue {
    /// Calcula a ocupação resultante do movimento sem alterar nada.
    /// O movimento é aplicado por inteiro ou rejeitado, nunca truncado.
    pub fn apply_movement(&self, kind: MovementKind, quantity: i32) -> Result<i32, AppError> {
        if quantity <= 0 {
            return Err(AppError::InvalidField {
                field: "cantidad",
                code: "must_be_positive",
            });
        }

        match kind {
            MovementKind::Entry => self
                .current_occupancy
                .checked_add(quantity)
                .filter(|next| *next <= self.capacity_maximum)
                .ok_or(AppError::CapacityExceeded {
                    venue_id: self.id,
                    capacity: self.capacity_maximum,
                    current: self.current_occupancy,
                    requested: quantity,
                }),
            MovementKind::Exit => {
                if quantity > self.current_occupancy {
                    return Err(AppError::NegativeOccupancy {
                        venue_id: self.id,
                        current: self.current_occupancy,
                        requested: quantity,
                    });
                }
                Ok(self.current_occupancy - quantity)
            }
        }
    }

    pub fn status(&self) -> OccupancyStatus {
        OccupancyStatus::from_counts(self.current_occupancy, self.capacity_maximum)
    }

    /// Porcentagem com duas casas decimais.
    pub fn occupancy_percentage(&self) -> Decimal {
        if self.capacity_maximum <= 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.current_occupancy) * Decimal::ONE_HUNDRED
            / Decimal::from(self.capacity_maximum))
        .round_dp(2)
    }

    pub fn report(&self) -> OccupancyReport {
        OccupancyReport {
            venue_id: self.id,
            name: self.name.clone(),
            current_occupancy: self.current_occupancy,
            capacity_maximum: self.capacity_maximum,
            percentage: self.occupancy_percentage(),
            status: self.status(),
        }
    }

    pub fn into_summary(self) -> VenueSummary {
        let percentage = self.occupancy_percentage();
        let status = self.status();
        VenueSummary {
            venue: self,
            percentage,
            status,
        }
    }
}

// --- MOVIMENTO (Histórico, somente inserção) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Movement {
    pub id: i64,
    #[serde(rename = "recinto_id")]
    pub venue_id: i64,
    #[serde(rename = "tipo")]
    pub kind: MovementKind,
    #[serde(rename = "cantidad")]
    #[schema(example = 300)]
    pub quantity: i32,
    pub timestamp: DateTime<Utc>,
}

// --- RESPOSTAS ---

/// Recinto com os campos derivados, usado na listagem.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VenueSummary {
    #[serde(flatten)]
    pub venue: Venue,
    #[serde(rename = "porcentaje_ocupacion")]
    #[schema(value_type = f64, example = 96.0)]
    pub percentage: Decimal,
    #[serde(rename = "estado")]
    pub status: OccupancyStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OccupancyReport {
    #[serde(rename = "recinto_id")]
    pub venue_id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "ocupacion_actual")]
    pub current_occupancy: i32,
    #[serde(rename = "capacidad_maxima")]
    pub capacity_maximum: i32,
    #[serde(rename = "porcentaje_ocupacion")]
    #[schema(value_type = f64, example = 96.0)]
    pub percentage: Decimal,
    #[serde(rename = "estado")]
    pub status: OccupancyStatus,
}

// --- PAYLOADS ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewVenue {
    #[serde(rename = "nombre")]
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "Plaza Mayor")]
    pub name: String,

    #[serde(rename = "capacidad_maxima")]
    #[validate(range(min = 1, message = "must_be_positive"))]
    #[schema(example = 5000)]
    pub capacity_maximum: i32,

    #[serde(rename = "ubicacion")]
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "Centro")]
    pub location: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewMovement {
    #[serde(rename = "tipo")]
    #[schema(example = "entrada")]
    pub kind: MovementKind,

    #[serde(rename = "cantidad")]
    #[validate(range(min = 1, message = "must_be_positive"))]
    #[schema(example = 300)]
    pub quantity: i32,
}
