// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    common::i18n::I18nStore,
    db::{MemoryStore, PgAforoRepository, PgPermisosRepository},
    services::{
        aforo_service::AforoService, idempotency::IdempotencyCache,
        permisos_service::PermisosService,
    },
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub default_locale: String,
    pub idempotency_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            database_url: None,
            db_max_connections: 5,
            db_acquire_timeout: Duration::from_secs(3),
            default_locale: "es".to_string(),
            idempotency_ttl: Duration::from_secs(86_400),
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Settings::default();
        Ok(Self {
            bind_addr: env::var("APP_BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            db_acquire_timeout: Duration::from_secs(parse_var(
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.db_acquire_timeout.as_secs(),
            )?),
            default_locale: env::var("DEFAULT_LOCALE").unwrap_or(defaults.default_locale),
            idempotency_ttl: Duration::from_secs(parse_var(
                "IDEMPOTENCY_TTL_SECS",
                defaults.idempotency_ttl.as_secs(),
            )?),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválido: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub i18n_store: Arc<I18nStore>,
    pub aforo_service: AforoService,
    pub permisos_service: PermisosService,
    pub idempotency: Arc<IdempotencyCache>,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let Some(database_url) = settings.database_url.clone() else {
            tracing::warn!(
                "DATABASE_URL não definida: usando armazenamento em memória (dados se perdem ao reiniciar)"
            );
            return Self::in_memory(settings);
        };

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(settings.db_acquire_timeout)
            .connect(&database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!()
            .run(&db_pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados")?;

        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        // --- Monta o gráfico de dependências ---
        let aforo_service = AforoService::new(Arc::new(PgAforoRepository::new(db_pool.clone())));
        let permisos_service = PermisosService::new(Arc::new(PgPermisosRepository::new(db_pool)));

        Self::assemble(settings, aforo_service, permisos_service)
    }

    /// Estado completo sobre o `MemoryStore` (sem banco). Usado também nos testes.
    pub fn in_memory(settings: Settings) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let aforo_service = AforoService::new(store.clone());
        let permisos_service = PermisosService::new(store);

        Self::assemble(settings, aforo_service, permisos_service)
    }

    fn assemble(
        settings: Settings,
        aforo_service: AforoService,
        permisos_service: PermisosService,
    ) -> anyhow::Result<Self> {
        let i18n_store = I18nStore::load(&settings.default_locale)?;
        let idempotency = IdempotencyCache::new(settings.idempotency_ttl);

        Ok(Self {
            settings: Arc::new(settings),
            i18n_store: Arc::new(i18n_store),
            aforo_service,
            permisos_service,
            idempotency: Arc::new(idempotency),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr, "0.0.0.0:8000");
        assert_eq!(settings.default_locale, "es");
        assert_eq!(settings.idempotency_ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn test_unknown_default_locale_fails() {
        let settings = Settings {
            default_locale: "fr".to_string(),
            ..Settings::default()
        };
        assert!(AppState::in_memory(settings).is_err());
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let value: u32 = parse_var("CARNAVAL_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }
}
