// src/config.rs

use std::{env, str::FromStr, time::Duration};

use anyhow::Context;
use chrono::NaiveTime;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        ArrangementRepository, AuditRepository, CatalogRepository, ReportRepository, ReservationRepository,
        UserRepository,
    },
    services::{
        auth::AuthService, ArrangementService, AuditService, CatalogService, ReportService, ReservationService,
    },
};

// Configuração lida do ambiente (.env carregado pelo dotenvy)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub report_job_at: NaiveTime,
    pub transition_job_at: NaiveTime,
    pub scheduler_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave -> valor.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{} deve ser definida", key));

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), 5)?,
            report_job_at: parse_time_or("REPORT_JOB_AT", lookup("REPORT_JOB_AT"), (23, 59))?,
            transition_job_at: parse_time_or("TRANSITION_JOB_AT", lookup("TRANSITION_JOB_AT"), (1, 0))?,
            scheduler_enabled: parse_or("SCHEDULER_ENABLED", lookup("SCHEDULER_ENABLED"), true)?,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: {}", key, value)),
        None => Ok(default),
    }
}

fn parse_time_or(key: &str, raw: Option<String>, (hour, minute): (u32, u32)) -> anyhow::Result<NaiveTime> {
    match raw {
        Some(value) => NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .with_context(|| format!("{} deve estar no formato HH:MM: {}", key, value)),
        None => NaiveTime::from_hms_opt(hour, minute, 0).context("horário padrão inválido"),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub arrangement_service: ArrangementService,
    pub reservation_service: ReservationService,
    pub audit_service: AuditService,
    pub report_service: ReportService,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, config.jwt_secret.clone()))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_pool(db_pool: PgPool, jwt_secret: String) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let arrangement_repo = ArrangementRepository::new(db_pool.clone());
        let reservation_repo = ReservationRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());
        let report_repo = ReportRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo, jwt_secret);
        let catalog_service = CatalogService::new(catalog_repo);
        let audit_service = AuditService::new(audit_repo, arrangement_repo.clone());
        let arrangement_service = ArrangementService::new(
            arrangement_repo.clone(),
            reservation_repo.clone(),
            catalog_service.clone(),
            audit_service.clone(),
        );
        let reservation_service = ReservationService::new(
            reservation_repo,
            arrangement_repo,
            arrangement_service.clone(),
            catalog_service.clone(),
        );
        let report_service = ReportService::new(report_repo, catalog_service.clone());

        Self {
            db_pool,
            auth_service,
            catalog_service,
            arrangement_service,
            reservation_service,
            audit_service,
            report_service,
        }
    }
}
