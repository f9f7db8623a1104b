// src/services/catalog_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{begin_scoped_transaction, TenantScope},
        error::AppError,
    },
    db::CatalogRepository,
    models::catalog::{Baby, Discount, GiftCard, PaymentType, ServicePackage, Status},
};

// Consultas de catálogo usadas pelos motores de arranjo e reserva.
// Todo "não encontrado" (inclusive de outro tenant) vira NotFound com entidade e ID.
#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository) -> Self {
        Self { repo }
    }

    pub async fn find_baby<'e, E>(&self, executor: E, scope: &TenantScope, id: Uuid) -> Result<Baby, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let baby = self.repo.find_baby(executor, scope.tenant_id, id).await?;
        scope.require(baby.filter(|b| b.lifecycle.is_active()), "Bebê", id)
    }

    pub async fn find_service_package<'e, E>(
        &self,
        executor: E,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<ServicePackage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let package = self.repo.find_service_package(executor, scope.tenant_id, id).await?;
        scope.require(package.filter(|p| p.lifecycle.is_active()), "Pacote de serviço", id)
    }

    pub async fn find_discount<'e, E>(&self, executor: E, scope: &TenantScope, id: Uuid) -> Result<Discount, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let discount = self.repo.find_discount(executor, scope.tenant_id, id).await?;
        scope.require(discount, "Desconto", id)
    }

    pub async fn find_gift_card<'e, E>(&self, executor: E, scope: &TenantScope, id: Uuid) -> Result<GiftCard, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let card = self.repo.find_gift_card(executor, scope.tenant_id, id).await?;
        scope.require(card, "Cartão-presente", id)
    }

    pub async fn lock_gift_card<'e, E>(&self, executor: E, scope: &TenantScope, id: Uuid) -> Result<GiftCard, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let card = self.repo.find_gift_card_for_update(executor, scope.tenant_id, id).await?;
        scope.require(card, "Cartão-presente", id)
    }

    pub async fn update_gift_card_used<'e, E>(
        &self,
        executor: E,
        scope: &TenantScope,
        id: Uuid,
        used: bool,
    ) -> Result<GiftCard, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let card = self.repo.set_gift_card_used(executor, scope.tenant_id, id, used).await?;
        let card = scope.require(card, "Cartão-presente", id)?;

        tracing::info!(tenant = %scope.tenant_id, "🎁 Cartão-presente {} marcado como usado={}", card.serial_number, used);
        Ok(card)
    }

    pub async fn find_payment_type<'e, E>(
        &self,
        executor: E,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<PaymentType, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment_type = self.repo.find_payment_type(executor, scope.tenant_id, id).await?;
        scope.require(payment_type, "Tipo de pagamento", id)
    }

    // --- Status (dados globais) ---

    pub async fn find_status<'e, E>(&self, executor: E, id: Uuid) -> Result<Status, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_status(executor, id)
            .await?
            .ok_or_else(|| AppError::not_found("Status", id))
    }

    pub async fn find_status_by_code<'e, E>(&self, executor: E, code: &str) -> Result<Status, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_status_by_code(executor, code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Status não encontrado com código: {}", code)))
    }

    pub async fn find_statuses_by_type<'e, E>(&self, executor: E, type_code: &str) -> Result<Vec<Status>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.find_statuses_by_type(executor, type_code).await
    }

    // --- Tarefas de sistema ---

    pub async fn list_tenant_ids<'e, E>(&self, executor: E) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_tenant_ids(executor).await
    }

    pub async fn refresh_baby_months<'e, E>(&self, executor: E, scope: &TenantScope) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.refresh_baby_months(executor, scope.tenant_id).await
    }

    /// Tarefa noturna: atualiza a idade (em meses) dos bebês de todos os tenants.
    pub async fn refresh_all_baby_months(&self) -> Result<u64, AppError> {
        let pool = self.repo.get_pool();
        let mut updated = 0;

        for tenant_id in self.list_tenant_ids(pool).await? {
            let scope = TenantScope::system(tenant_id);
            let result = async {
                let mut tx = begin_scoped_transaction(pool, &scope).await?;
                let rows = self.refresh_baby_months(&mut *tx, &scope).await?;
                tx.commit().await?;
                Ok::<_, AppError>(rows)
            }
            .await;

            match result {
                Ok(rows) => updated += rows,
                Err(e) => tracing::error!(tenant = %tenant_id, "❌ Falha ao atualizar idade dos bebês: {:?}", e),
            }
        }

        tracing::info!(updated, "👶 Idade dos bebês atualizada");
        Ok(updated)
    }
}
