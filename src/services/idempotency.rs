// src/services/idempotency.rs

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::common::error::AppError;

/// Resposta guardada para reenvio com a mesma `Idempotency-Key`.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Debug)]
enum EntryState {
    InFlight,
    Done(CachedResponse),
}

#[derive(Debug)]
struct Entry {
    route: String,
    state: EntryState,
    stored_at: Instant,
}

pub enum Begin<'a> {
    /// Primeira vez que a chave aparece: executar e depois `complete`.
    Fresh(IdempotencyGuard<'a>),
    Replay(CachedResponse),
}

pub struct IdempotencyCache {
    ttl: Duration,
    entries: Mutex<HashMap<Uuid, Entry>>,
}

impl IdempotencyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    // Um panic com o lock na mão não invalida o mapa
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn begin(&self, key: Uuid, route: &str) -> Result<Begin<'_>, AppError> {
        let mut entries = self.lock();
        let ttl = self.ttl;
        entries.retain(|_, e| e.stored_at.elapsed() < ttl);

        if let Some(entry) = entries.get(&key) {
            if entry.route != route {
                tracing::warn!(%key, route, "Chave de idempotência reutilizada em outra rota");
                return Err(AppError::IdempotencyKeyReused);
            }
            return match &entry.state {
                EntryState::InFlight => Err(AppError::RequestInProgress),
                EntryState::Done(cached) => {
                    tracing::info!(%key, route, "Reenviando resposta idempotente");
                    Ok(Begin::Replay(cached.clone()))
                }
            };
        }

        entries.insert(
            key,
            Entry {
                route: route.to_string(),
                state: EntryState::InFlight,
                stored_at: Instant::now(),
            },
        );

        Ok(Begin::Fresh(IdempotencyGuard {
            cache: self,
            key,
            completed: false,
        }))
    }
}

/// Reserva da chave enquanto a requisição roda. Se for descartada sem
/// `complete` (erro ou cancelamento), a chave é liberada.
pub struct IdempotencyGuard<'a> {
    cache: &'a IdempotencyCache,
    key: Uuid,
    completed: bool,
}

impl IdempotencyGuard<'_> {
    pub fn complete(mut self, response: CachedResponse) {
        let mut entries = self.cache.lock();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.state = EntryState::Done(response);
            entry.stored_at = Instant::now();
        }
        self.completed = true;
    }
}

impl Drop for IdempotencyGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.cache.lock().remove(&self.key);
        }
    }
}
