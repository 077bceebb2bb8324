// src/db/aforo_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::{AppError, Entity},
    db::AforoStore,
    models::aforo::{Movement, MovementKind, NewVenue, Venue},
};

#[derive(Clone)]
pub struct PgAforoRepository {
    pool: PgPool,
}

impl PgAforoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AforoStore for PgAforoRepository {
    async fn create_venue(&self, input: &NewVenue) -> Result<Venue, AppError> {
        sqlx::query_as::<_, Venue>(
            r#"
            INSERT INTO venues (name, capacity_maximum, location)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(input.capacity_maximum)
        .bind(&input.location)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Nome duplicado vira Conflict em vez de erro de banco
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict {
                        entity: Entity::Venue,
                        field: "nombre",
                        value: input.name.clone(),
                    };
                }
            }
            e.into()
        })
    }

    async fn find_venue(&self, id: i64) -> Result<Option<Venue>, AppError> {
        let venue = sqlx::query_as::<_, Venue>("SELECT * FROM venues WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(venue)
    }

    async fn list_venues(&self) -> Result<Vec<Venue>, AppError> {
        let venues = sqlx::query_as::<_, Venue>("SELECT * FROM venues ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(venues)
    }

    async fn record_movement(
        &self,
        venue_id: i64,
        kind: MovementKind,
        quantity: i32,
    ) -> Result<(Venue, Movement), AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Trava a linha do recinto até o commit (um escritor por recinto)
        let venue = sqlx::query_as::<_, Venue>("SELECT * FROM venues WHERE id = $1 FOR UPDATE")
            .bind(venue_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound { entity: Entity::Venue, id: venue_id })?;

        // 2. Regra de domínio (sem truncar)
        let next_occupancy = venue.apply_movement(kind, quantity)?;

        // 3. Atualiza o saldo
        let updated = sqlx::query_as::<_, Venue>(
            "UPDATE venues SET current_occupancy = $1 WHERE id = $2 RETURNING *",
        )
        .bind(next_occupancy)
        .bind(venue_id)
        .fetch_one(&mut *tx)
        .await?;

        // 4. Grava o histórico
        let movement = sqlx::query_as::<_, Movement>(
            r#"
            INSERT INTO movements (venue_id, kind, quantity)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(venue_id)
        .bind(kind)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((updated, movement))
    }

    async fn list_movements(&self, venue_id: i64) -> Result<Vec<Movement>, AppError> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM venues WHERE id = $1")
            .bind(venue_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound { entity: Entity::Venue, id: venue_id });
        }

        let movements = sqlx::query_as::<_, Movement>(
            "SELECT * FROM movements WHERE venue_id = $1 ORDER BY id ASC",
        )
        .bind(venue_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }
}
