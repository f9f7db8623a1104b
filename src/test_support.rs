// src/test_support.rs
// Fixtures para os testes de serviço contra o banco (#[sqlx::test]).

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{begin_scoped_transaction, TenantScope},
        error::AppError,
    },
    config::AppState,
    models::arrangement::CreateArrangementPayload,
};

pub(crate) fn state(pool: &PgPool) -> AppState {
    AppState::from_pool(pool.clone(), "segredo-de-teste".to_string())
}

/// Cria o tenant e devolve o escopo de sistema dele.
pub(crate) async fn tenant(pool: &PgPool, name: &str) -> Result<TenantScope, AppError> {
    let id = sqlx::query_scalar::<_, Uuid>("INSERT INTO tenants (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(TenantScope::system(id))
}

/// Catálogo mínimo de um tenant.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Catalog {
    pub baby_id: Uuid,
    pub package_id: Uuid,
    pub discount_id: Uuid,
}

impl Catalog {
    pub(crate) fn arrangement(&self, gift_card_id: Option<Uuid>) -> CreateArrangementPayload {
        CreateArrangementPayload {
            baby_id: self.baby_id,
            service_package_id: self.package_id,
            discount_id: Some(self.discount_id),
            gift_card_id,
            note: None,
        }
    }
}

/// Bebê "Lara" (061222333), pacote de 500.00 com `terms` termos e 60 dias, desconto de 10%.
pub(crate) async fn catalog(pool: &PgPool, scope: &TenantScope, terms: i32) -> Result<Catalog, AppError> {
    let mut tx = begin_scoped_transaction(pool, scope).await?;

    let baby_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO babies (tenant_id, name, phone_number) VALUES ($1, 'Lara', '061222333') RETURNING id",
    )
    .bind(scope.tenant_id)
    .fetch_one(&mut *tx)
    .await?;

    let package_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO service_packages (tenant_id, name, term_number, duration_days, price)
        VALUES ($1, 'Pacote', $2, 60, $3)
        RETURNING id
        "#,
    )
    .bind(scope.tenant_id)
    .bind(terms)
    .bind(Decimal::new(50000, 2))
    .fetch_one(&mut *tx)
    .await?;

    let discount_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO discounts (tenant_id, name, value, is_percentage) VALUES ($1, 'Irmãos', 10, TRUE) RETURNING id",
    )
    .bind(scope.tenant_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Catalog { baby_id, package_id, discount_id })
}

pub(crate) async fn gift_card(pool: &PgPool, scope: &TenantScope, serial: &str) -> Result<Uuid, AppError> {
    let mut tx = begin_scoped_transaction(pool, scope).await?;

    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO gift_cards (tenant_id, serial_number) VALUES ($1, $2) RETURNING id",
    )
    .bind(scope.tenant_id)
    .bind(serial)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(id)
}

/// `SELECT COUNT(*)` com um único parâmetro, dentro do escopo do tenant.
pub(crate) async fn count(pool: &PgPool, scope: &TenantScope, sql: &str, id: Uuid) -> Result<i64, AppError> {
    let mut tx = begin_scoped_transaction(pool, scope).await?;
    let total = sqlx::query_scalar::<_, i64>(sql).bind(id).fetch_one(&mut *tx).await?;
    tx.commit().await?;
    Ok(total)
}

pub(crate) async fn gift_card_used(pool: &PgPool, scope: &TenantScope, id: Uuid) -> Result<bool, AppError> {
    let mut tx = begin_scoped_transaction(pool, scope).await?;
    let used = sqlx::query_scalar::<_, bool>("SELECT used FROM gift_cards WHERE id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(used)
}
