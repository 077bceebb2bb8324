// src/db.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    models::{
        aforo::{Movement, MovementKind, NewVenue, Venue},
        permisos::{
            Merchant, MerchantChanges, NewMerchant, NewPermit, NewStall, Permit, PermitTransition,
            Stall,
        },
    },
};

pub mod aforo_repo;
pub use aforo_repo::PgAforoRepository;
pub mod permisos_repo;
pub use permisos_repo::PgPermisosRepository;
pub mod memory;
pub use memory::MemoryStore;

// =========================================================================
//  PORTAS DE ARMAZENAMENTO
// =========================================================================
// As operações que alteram estado são atômicas dentro do adaptador: a
// leitura, a regra de domínio e a escrita acontecem sob o mesmo bloqueio.

/// Recintos e o livro de movimentos.
#[async_trait]
pub trait AforoStore: Send + Sync {
    /// Falha com `Conflict` se já existir um recinto com o mesmo nome.
    async fn create_venue(&self, input: &NewVenue) -> Result<Venue, AppError>;

    async fn find_venue(&self, id: i64) -> Result<Option<Venue>, AppError>;

    /// Em ordem de inserção.
    async fn list_venues(&self) -> Result<Vec<Venue>, AppError>;

    /// Aplica o movimento com `Venue::apply_movement` e grava o histórico.
    /// Devolve o recinto já atualizado junto com o movimento.
    async fn record_movement(
        &self,
        venue_id: i64,
        kind: MovementKind,
        quantity: i32,
    ) -> Result<(Venue, Movement), AppError>;

    /// Falha com `NotFound` se o recinto não existir.
    async fn list_movements(&self, venue_id: i64) -> Result<Vec<Movement>, AppError>;
}

/// Comerciantes, puestos e permisos.
#[async_trait]
pub trait PermisosStore: Send + Sync {
    /// Falha com `Conflict` se a cédula já estiver cadastrada.
    async fn create_merchant(&self, input: &NewMerchant) -> Result<Merchant, AppError>;

    async fn find_merchant(&self, id: i64) -> Result<Option<Merchant>, AppError>;

    async fn list_merchants(&self) -> Result<Vec<Merchant>, AppError>;

    async fn update_merchant(
        &self,
        id: i64,
        changes: &MerchantChanges,
    ) -> Result<Merchant, AppError>;

    async fn create_stall(&self, input: &NewStall) -> Result<Stall, AppError>;

    async fn find_stall(&self, id: i64) -> Result<Option<Stall>, AppError>;

    async fn list_stalls(&self) -> Result<Vec<Stall>, AppError>;

    /// Valida as referências e a sobreposição com permisos aprovados do
    /// mesmo puesto, e cria o permiso em PENDING.
    async fn create_permit(&self, input: &NewPermit) -> Result<Permit, AppError>;

    async fn find_permit(&self, id: i64) -> Result<Option<Permit>, AppError>;

    async fn list_permits(&self) -> Result<Vec<Permit>, AppError>;

    /// Aplica a máquina de estados; ao aprovar, revalida a sobreposição.
    async fn transition_permit(
        &self,
        id: i64,
        change: &PermitTransition,
    ) -> Result<Permit, AppError>;

    /// Move para EXPIRED todo permiso APROVADO que terminou antes de `now`.
    /// Devolve quantos foram alterados.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}
