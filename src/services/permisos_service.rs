// src/services/permisos_service.rs

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::{AppError, Entity},
    db::PermisosStore,
    models::permisos::{
        Merchant, MerchantChanges, NewMerchant, NewPermit, NewStall, Permit, PermitTransition,
        Stall,
    },
};

#[derive(Clone)]
pub struct PermisosService {
    store: Arc<dyn PermisosStore>,
}

impl PermisosService {
    pub fn new(store: Arc<dyn PermisosStore>) -> Self {
        Self { store }
    }

    // =========================================================================
    //  1. COMERCIANTES
    // =========================================================================

    pub async fn register_merchant(&self, input: NewMerchant) -> Result<Merchant, AppError> {
        let input = NewMerchant {
            name: input.name.trim().to_string(),
            national_id: input.national_id.trim().to_string(),
            email: input.email.trim().to_string(),
            phone: input.phone.trim().to_string(),
        };
        input.validate()?;

        let merchant = self.store.create_merchant(&input).await?;
        tracing::info!(merchant_id = merchant.id, "Comerciante cadastrado");
        Ok(merchant)
    }

    pub async fn list_merchants(&self) -> Result<Vec<Merchant>, AppError> {
        self.store.list_merchants().await
    }

    pub async fn get_merchant(&self, id: i64) -> Result<Merchant, AppError> {
        self.store
            .find_merchant(id)
            .await?
            .ok_or(AppError::NotFound { entity: Entity::Merchant, id })
    }

    pub async fn update_merchant(
        &self,
        id: i64,
        changes: MerchantChanges,
    ) -> Result<Merchant, AppError> {
        let trim = |value: Option<String>| value.map(|v| v.trim().to_string());
        let changes = MerchantChanges {
            name: trim(changes.name),
            email: trim(changes.email),
            phone: trim(changes.phone),
            active: changes.active,
        };
        changes.validate()?;

        let merchant = self.store.update_merchant(id, &changes).await?;
        if changes.active == Some(false) {
            tracing::info!(merchant_id = id, "Comerciante desativado");
        }
        Ok(merchant)
    }

    // =========================================================================
    //  2. PUESTOS
    // =========================================================================

    pub async fn create_stall(&self, input: NewStall) -> Result<Stall, AppError> {
        let input = NewStall {
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            location: input.location.trim().to_string(),
        };
        input.validate()?;

        let stall = self.store.create_stall(&input).await?;
        tracing::info!(stall_id = stall.id, "Puesto '{}' criado", stall.name);
        Ok(stall)
    }

    pub async fn list_stalls(&self) -> Result<Vec<Stall>, AppError> {
        self.store.list_stalls().await
    }

    pub async fn get_stall(&self, id: i64) -> Result<Stall, AppError> {
        self.store
            .find_stall(id)
            .await?
            .ok_or(AppError::NotFound { entity: Entity::Stall, id })
    }

    // =========================================================================
    //  3. PERMISOS
    // =========================================================================

    pub async fn request_permit(&self, input: NewPermit) -> Result<Permit, AppError> {
        input.validate()?;
        input.check_range()?;

        match self.store.create_permit(&input).await {
            Ok(permit) => {
                tracing::info!(
                    permit_id = permit.id,
                    merchant_id = permit.merchant_id,
                    stall_id = permit.stall_id,
                    "Permiso solicitado"
                );
                Ok(permit)
            }
            Err(e @ AppError::Overlap { .. }) => {
                tracing::warn!(stall_id = input.stall_id, "Pedido de permiso rejeitado: {}", e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn transition(
        &self,
        permit_id: i64,
        change: PermitTransition,
    ) -> Result<Permit, AppError> {
        let change = PermitTransition {
            rejection_reason: change.rejection_reason.map(|r| r.trim().to_string()),
            ..change
        };
        change.validate()?;

        // Um permiso vencido precisa aparecer como EXPIRED antes da regra
        self.expire_overdue().await?;

        match self.store.transition_permit(permit_id, &change).await {
            Ok(permit) => {
                tracing::info!(permit_id, status = %permit.status, "Permiso atualizado");
                Ok(permit)
            }
            Err(e @ (AppError::InvalidTransition { .. } | AppError::Overlap { .. })) => {
                tracing::warn!(permit_id, to = %change.status, "Transição rejeitada: {}", e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_permits(&self) -> Result<Vec<Permit>, AppError> {
        self.expire_overdue().await?;
        self.store.list_permits().await
    }

    pub async fn get_permit(&self, id: i64) -> Result<Permit, AppError> {
        self.expire_overdue().await?;
        self.store
            .find_permit(id)
            .await?
            .ok_or(AppError::NotFound { entity: Entity::Permit, id })
    }

    async fn expire_overdue(&self) -> Result<(), AppError> {
        let expired = self.store.expire_overdue(Utc::now()).await?;
        if expired > 0 {
            tracing::info!(expired, "Permisos vencidos marcados como EXPIRED");
        }
        Ok(())
    }
}
