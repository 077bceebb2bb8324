// src/services/aforo_service.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    common::error::{AppError, Entity},
    db::AforoStore,
    models::aforo::{
        Movement, NewMovement, NewVenue, OccupancyReport, OccupancyStatus, Venue, VenueSummary,
    },
};

#[derive(Clone)]
pub struct AforoService {
    store: Arc<dyn AforoStore>,
}

impl AforoService {
    pub fn new(store: Arc<dyn AforoStore>) -> Self {
        Self { store }
    }

    // =========================================================================
    //  RECINTOS
    // =========================================================================

    pub async fn create_venue(&self, input: NewVenue) -> Result<Venue, AppError> {
        let input = NewVenue {
            name: input.name.trim().to_string(),
            location: input.location.trim().to_string(),
            ..input
        };
        input.validate()?;

        let venue = self.store.create_venue(&input).await?;
        tracing::info!(
            venue_id = venue.id,
            capacity = venue.capacity_maximum,
            "Recinto '{}' criado",
            venue.name
        );
        Ok(venue)
    }

    pub async fn get_venue(&self, id: i64) -> Result<Venue, AppError> {
        self.store
            .find_venue(id)
            .await?
            .ok_or(AppError::NotFound { entity: Entity::Venue, id })
    }

    /// Em ordem de inserção, já com porcentagem e estado.
    pub async fn list_venues(&self) -> Result<Vec<VenueSummary>, AppError> {
        let venues = self.store.list_venues().await?;
        Ok(venues.into_iter().map(Venue::into_summary).collect())
    }

    // =========================================================================
    //  LIVRO DE OCUPAÇÃO
    // =========================================================================

    pub async fn record_movement(
        &self,
        venue_id: i64,
        input: NewMovement,
    ) -> Result<Movement, AppError> {
        input.validate()?;

        match self.store.record_movement(venue_id, input.kind, input.quantity).await {
            Ok((venue, movement)) => {
                tracing::info!(
                    venue_id,
                    movement_id = movement.id,
                    kind = ?movement.kind,
                    quantity = movement.quantity,
                    occupancy = venue.current_occupancy,
                    status = ?venue.status(),
                    "Movimento registrado"
                );
                Ok(movement)
            }
            Err(e @ (AppError::CapacityExceeded { .. } | AppError::NegativeOccupancy { .. })) => {
                tracing::warn!(
                    venue_id,
                    kind = ?input.kind,
                    quantity = input.quantity,
                    "Movimento rejeitado: {}",
                    e
                );
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub fn occupancy_status(venue: &Venue) -> OccupancyStatus {
        venue.status()
    }

    pub async fn get_occupancy(&self, venue_id: i64) -> Result<OccupancyReport, AppError> {
        let venue = self.get_venue(venue_id).await?;
        Ok(venue.report())
    }

    pub async fn list_movements(&self, venue_id: i64) -> Result<Vec<Movement>, AppError> {
        self.store.list_movements(venue_id).await
    }
}
