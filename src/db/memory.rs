// src/db/memory.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    common::error::{AppError, Entity},
    db::{AforoStore, PermisosStore},
    models::{
        aforo::{Movement, MovementKind, NewVenue, Venue},
        permisos::{
            Merchant, MerchantChanges, NewMerchant, NewPermit, NewStall, Permit, PermitStatus,
            PermitTransition, Stall,
        },
    },
};

// Armazenamento em processo, usado sem DATABASE_URL e nos testes.
// Um único mutex serializa todas as escritas, o que cobre a exclusão
// por recinto e por puesto.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    venues: Vec<Venue>,
    movements: Vec<Movement>,
    merchants: Vec<Merchant>,
    stalls: Vec<Stall>,
    permits: Vec<Permit>,
    last_id: i64,
}

impl MemoryState {
    // Sequência única para todas as tabelas, basta ser crescente
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AforoStore for MemoryStore {
    async fn create_venue(&self, input: &NewVenue) -> Result<Venue, AppError> {
        let mut state = self.state.lock().await;

        if state.venues.iter().any(|v| v.name == input.name) {
            return Err(AppError::Conflict {
                entity: Entity::Venue,
                field: "nombre",
                value: input.name.clone(),
            });
        }

        let venue = Venue {
            id: state.next_id(),
            name: input.name.clone(),
            capacity_maximum: input.capacity_maximum,
            location: input.location.clone(),
            current_occupancy: 0,
            created_at: Utc::now(),
        };
        state.venues.push(venue.clone());
        Ok(venue)
    }

    async fn find_venue(&self, id: i64) -> Result<Option<Venue>, AppError> {
        let state = self.state.lock().await;
        Ok(state.venues.iter().find(|v| v.id == id).cloned())
    }

    async fn list_venues(&self) -> Result<Vec<Venue>, AppError> {
        Ok(self.state.lock().await.venues.clone())
    }

    async fn record_movement(
        &self,
        venue_id: i64,
        kind: MovementKind,
        quantity: i32,
    ) -> Result<(Venue, Movement), AppError> {
        let mut state = self.state.lock().await;

        let index = state
            .venues
            .iter()
            .position(|v| v.id == venue_id)
            .ok_or(AppError::NotFound { entity: Entity::Venue, id: venue_id })?;

        let next_occupancy = state.venues[index].apply_movement(kind, quantity)?;

        let movement = Movement {
            id: state.next_id(),
            venue_id,
            kind,
            quantity,
            timestamp: Utc::now(),
        };
        state.venues[index].current_occupancy = next_occupancy;
        state.movements.push(movement.clone());

        Ok((state.venues[index].clone(), movement))
    }

    async fn list_movements(&self, venue_id: i64) -> Result<Vec<Movement>, AppError> {
        let state = self.state.lock().await;

        if !state.venues.iter().any(|v| v.id == venue_id) {
            return Err(AppError::NotFound { entity: Entity::Venue, id: venue_id });
        }

        Ok(state
            .movements
            .iter()
            .filter(|m| m.venue_id == venue_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PermisosStore for MemoryStore {
    async fn create_merchant(&self, input: &NewMerchant) -> Result<Merchant, AppError> {
        let mut state = self.state.lock().await;

        if state.merchants.iter().any(|m| m.national_id == input.national_id) {
            return Err(AppError::Conflict {
                entity: Entity::Merchant,
                field: "cedula",
                value: input.national_id.clone(),
            });
        }

        let merchant = Merchant {
            id: state.next_id(),
            name: input.name.clone(),
            national_id: input.national_id.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            active: true,
            registered_at: Utc::now(),
        };
        state.merchants.push(merchant.clone());
        Ok(merchant)
    }

    async fn find_merchant(&self, id: i64) -> Result<Option<Merchant>, AppError> {
        let state = self.state.lock().await;
        Ok(state.merchants.iter().find(|m| m.id == id).cloned())
    }

    async fn list_merchants(&self) -> Result<Vec<Merchant>, AppError> {
        Ok(self.state.lock().await.merchants.clone())
    }

    async fn update_merchant(
        &self,
        id: i64,
        changes: &MerchantChanges,
    ) -> Result<Merchant, AppError> {
        let mut state = self.state.lock().await;

        let merchant = state
            .merchants
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(AppError::NotFound { entity: Entity::Merchant, id })?;

        merchant.apply_changes(changes);
        Ok(merchant.clone())
    }

    async fn create_stall(&self, input: &NewStall) -> Result<Stall, AppError> {
        let mut state = self.state.lock().await;

        let stall = Stall {
            id: state.next_id(),
            name: input.name.clone(),
            description: input.description.clone(),
            location: input.location.clone(),
            created_at: Utc::now(),
        };
        state.stalls.push(stall.clone());
        Ok(stall)
    }

    async fn find_stall(&self, id: i64) -> Result<Option<Stall>, AppError> {
        let state = self.state.lock().await;
        Ok(state.stalls.iter().find(|s| s.id == id).cloned())
    }

    async fn list_stalls(&self) -> Result<Vec<Stall>, AppError> {
        Ok(self.state.lock().await.stalls.clone())
    }

    async fn create_permit(&self, input: &NewPermit) -> Result<Permit, AppError> {
        let mut state = self.state.lock().await;

        let merchant = state
            .merchants
            .iter()
            .find(|m| m.id == input.merchant_id)
            .ok_or_else(|| input.merchant_not_found())?;

        if !state.stalls.iter().any(|s| s.id == input.stall_id) {
            return Err(input.stall_not_found());
        }

        input.check_against(
            merchant,
            state.permits.iter().filter(|p| p.stall_id == input.stall_id),
        )?;

        let permit = Permit {
            id: state.next_id(),
            merchant_id: input.merchant_id,
            stall_id: input.stall_id,
            status: PermitStatus::Pending,
            start_date: input.start_date,
            end_date: input.end_date,
            rejection_reason: None,
            requested_at: Utc::now(),
            updated_at: None,
        };
        state.permits.push(permit.clone());
        Ok(permit)
    }

    async fn find_permit(&self, id: i64) -> Result<Option<Permit>, AppError> {
        let state = self.state.lock().await;
        Ok(state.permits.iter().find(|p| p.id == id).cloned())
    }

    async fn list_permits(&self) -> Result<Vec<Permit>, AppError> {
        Ok(self.state.lock().await.permits.clone())
    }

    async fn transition_permit(
        &self,
        id: i64,
        change: &PermitTransition,
    ) -> Result<Permit, AppError> {
        let mut state = self.state.lock().await;

        let index = state
            .permits
            .iter()
            .position(|p| p.id == id)
            .ok_or(AppError::NotFound { entity: Entity::Permit, id })?;

        let target = &state.permits[index];
        target.check_transition(
            change,
            state.permits.iter().filter(|p| p.stall_id == target.stall_id),
        )?;

        let permit = &mut state.permits[index];
        permit.status = change.status;
        if change.rejection_reason.is_some() {
            permit.rejection_reason = change.rejection_reason.clone();
        }
        permit.updated_at = Some(Utc::now());
        Ok(permit.clone())
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;

        let mut expired = 0;
        for permit in state.permits.iter_mut().filter(|p| p.is_overdue(now)) {
            permit.status = PermitStatus::Expired;
            permit.updated_at = Some(now);
            expired += 1;
        }
        Ok(expired)
    }
}
