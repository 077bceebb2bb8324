// src/db/permisos_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    common::error::{AppError, Entity},
    db::PermisosStore,
    models::permisos::{
        Merchant, MerchantChanges, NewMerchant, NewPermit, NewStall, Permit, PermitStatus,
        PermitTransition, Stall,
    },
};

#[derive(Clone)]
pub struct PgPermisosRepository {
    pool: PgPool,
}

impl PgPermisosRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Trava o puesto: pedidos e aprovações do mesmo puesto ficam em fila
    async fn lock_stall(
        tx: &mut Transaction<'_, Postgres>,
        stall_id: i64,
    ) -> Result<bool, AppError> {
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM stalls WHERE id = $1 FOR UPDATE")
                .bind(stall_id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(locked.is_some())
    }

    async fn approved_permits_for_stall(
        tx: &mut Transaction<'_, Postgres>,
        stall_id: i64,
    ) -> Result<Vec<Permit>, AppError> {
        let permits = sqlx::query_as::<_, Permit>(
            "SELECT * FROM permits WHERE stall_id = $1 AND status = $2",
        )
        .bind(stall_id)
        .bind(PermitStatus::Approved)
        .fetch_all(&mut **tx)
        .await?;
        Ok(permits)
    }
}

#[async_trait]
impl PermisosStore for PgPermisosRepository {
    // =========================================================================
    //  COMERCIANTES
    // =========================================================================

    async fn create_merchant(&self, input: &NewMerchant) -> Result<Merchant, AppError> {
        sqlx::query_as::<_, Merchant>(
            r#"
            INSERT INTO merchants (name, national_id, email, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.national_id)
        .bind(&input.email)
        .bind(&input.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict {
                        entity: Entity::Merchant,
                        field: "cedula",
                        value: input.national_id.clone(),
                    };
                }
            }
            e.into()
        })
    }

    async fn find_merchant(&self, id: i64) -> Result<Option<Merchant>, AppError> {
        let merchant = sqlx::query_as::<_, Merchant>("SELECT * FROM merchants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(merchant)
    }

    async fn list_merchants(&self) -> Result<Vec<Merchant>, AppError> {
        let merchants = sqlx::query_as::<_, Merchant>("SELECT * FROM merchants ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(merchants)
    }

    async fn update_merchant(
        &self,
        id: i64,
        changes: &MerchantChanges,
    ) -> Result<Merchant, AppError> {
        // COALESCE mantém o valor atual quando o campo não veio
        sqlx::query_as::<_, Merchant>(
            r#"
            UPDATE merchants
            SET name = COALESCE($1, name),
                email = COALESCE($2, email),
                phone = COALESCE($3, phone),
                active = COALESCE($4, active)
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound { entity: Entity::Merchant, id })
    }

    // =========================================================================
    //  PUESTOS
    // =========================================================================

    async fn create_stall(&self, input: &NewStall) -> Result<Stall, AppError> {
        let stall = sqlx::query_as::<_, Stall>(
            r#"
            INSERT INTO stalls (name, description, location)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.location)
        .fetch_one(&self.pool)
        .await?;
        Ok(stall)
    }

    async fn find_stall(&self, id: i64) -> Result<Option<Stall>, AppError> {
        let stall = sqlx::query_as::<_, Stall>("SELECT * FROM stalls WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(stall)
    }

    async fn list_stalls(&self) -> Result<Vec<Stall>, AppError> {
        let stalls = sqlx::query_as::<_, Stall>("SELECT * FROM stalls ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(stalls)
    }

    // =========================================================================
    //  PERMISOS
    // =========================================================================

    async fn create_permit(&self, input: &NewPermit) -> Result<Permit, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Referências
        let merchant = sqlx::query_as::<_, Merchant>("SELECT * FROM merchants WHERE id = $1")
            .bind(input.merchant_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| input.merchant_not_found())?;

        if !Self::lock_stall(&mut tx, input.stall_id).await? {
            return Err(input.stall_not_found());
        }

        // 2. Regras (comerciante ativo, sem sobreposição)
        let approved = Self::approved_permits_for_stall(&mut tx, input.stall_id).await?;
        input.check_against(&merchant, &approved)?;

        // 3. Cria em PENDING
        let permit = sqlx::query_as::<_, Permit>(
            r#"
            INSERT INTO permits (merchant_id, stall_id, status, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(input.merchant_id)
        .bind(input.stall_id)
        .bind(PermitStatus::Pending)
        .bind(input.start_date)
        .bind(input.end_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(permit)
    }

    async fn find_permit(&self, id: i64) -> Result<Option<Permit>, AppError> {
        let permit = sqlx::query_as::<_, Permit>("SELECT * FROM permits WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(permit)
    }

    async fn list_permits(&self) -> Result<Vec<Permit>, AppError> {
        let permits = sqlx::query_as::<_, Permit>("SELECT * FROM permits ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(permits)
    }

    async fn transition_permit(
        &self,
        id: i64,
        change: &PermitTransition,
    ) -> Result<Permit, AppError> {
        let mut tx = self.pool.begin().await?;

        let permit = sqlx::query_as::<_, Permit>("SELECT * FROM permits WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound { entity: Entity::Permit, id })?;

        // Só a aprovação precisa enxergar os outros permisos do puesto
        let approved = if change.status == PermitStatus::Approved {
            Self::lock_stall(&mut tx, permit.stall_id).await?;
            Self::approved_permits_for_stall(&mut tx, permit.stall_id).await?
        } else {
            Vec::new()
        };

        permit.check_transition(change, &approved)?;

        let updated = sqlx::query_as::<_, Permit>(
            r#"
            UPDATE permits
            SET status = $1,
                rejection_reason = COALESCE($2, rejection_reason),
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(change.status)
        .bind(change.rejection_reason.as_deref())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE permits
            SET status = $1, updated_at = $2
            WHERE status = $3 AND end_date < $2
            "#,
        )
        .bind(PermitStatus::Expired)
        .bind(now)
        .bind(PermitStatus::Approved)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
