// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{Baby, Discount, GiftCard, PaymentType, ServicePackage, Status},
};

const STATUS_SELECT: &str = r#"
    SELECT s.id, s.code, s.name, st.code AS type_code
    FROM statuses s
    JOIN status_types st ON st.id = s.status_type_id
"#;

// Leitura dos dados de catálogo. O CRUD destes cadastros fica fora deste serviço.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  BEBÊS E PACOTES
    // =========================================================================

    pub async fn find_baby<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Baby>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let baby = sqlx::query_as::<_, Baby>(
            r#"
            SELECT id, tenant_id, name, surname, mother_name, phone_number, birth_date,
                   number_of_months, note, created_at, deleted_at, deleted_by_user_id
            FROM babies
            WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(baby)
    }

    pub async fn find_service_package<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ServicePackage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let package = sqlx::query_as::<_, ServicePackage>(
            r#"
            SELECT id, tenant_id, name, term_number, duration_days, price, note,
                   deleted_at, deleted_by_user_id
            FROM service_packages
            WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(package)
    }

    /// Recalcula a idade em meses de todos os bebês do tenant.
    pub async fn refresh_baby_months<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE babies
            SET number_of_months = (
                EXTRACT(YEAR FROM age(CURRENT_DATE, birth_date::date)) * 12
                + EXTRACT(MONTH FROM age(CURRENT_DATE, birth_date::date))
            )::int
            WHERE tenant_id = $1 AND birth_date IS NOT NULL AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  DESCONTOS, CARTÕES-PRESENTE E PAGAMENTO
    // =========================================================================

    pub async fn find_discount<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Discount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let discount = sqlx::query_as::<_, Discount>(
            "SELECT id, tenant_id, name, value, is_percentage FROM discounts WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(discount)
    }

    pub async fn find_gift_card<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<GiftCard>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let card = sqlx::query_as::<_, GiftCard>(
            r#"
            SELECT id, tenant_id, serial_number, expiration_date, used
            FROM gift_cards
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(card)
    }

    /// Trava o cartão até o fim da transação: a checagem de `used` e a marcação
    /// acontecem sem que outro arranjo pegue o mesmo cartão no meio.
    pub async fn find_gift_card_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<GiftCard>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let card = sqlx::query_as::<_, GiftCard>(
            r#"
            SELECT id, tenant_id, serial_number, expiration_date, used
            FROM gift_cards
            WHERE tenant_id = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(card)
    }

    pub async fn set_gift_card_used<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        used: bool,
    ) -> Result<Option<GiftCard>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let card = sqlx::query_as::<_, GiftCard>(
            r#"
            UPDATE gift_cards SET used = $3
            WHERE tenant_id = $1 AND id = $2
            RETURNING id, tenant_id, serial_number, expiration_date, used
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(used)
        .fetch_optional(executor)
        .await?;

        Ok(card)
    }

    pub async fn find_payment_type<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<PaymentType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment_type = sqlx::query_as::<_, PaymentType>(
            "SELECT id, tenant_id, code, name FROM payment_types WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(payment_type)
    }

    // =========================================================================
    //  STATUS (global, sem tenant)
    // =========================================================================

    pub async fn find_status<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Status>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let status = sqlx::query_as::<_, Status>(&format!("{} WHERE s.id = $1", STATUS_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(status)
    }

    pub async fn find_status_by_code<'e, E>(&self, executor: E, code: &str) -> Result<Option<Status>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let status = sqlx::query_as::<_, Status>(&format!("{} WHERE s.code = $1", STATUS_SELECT))
            .bind(code)
            .fetch_optional(executor)
            .await?;

        Ok(status)
    }

    pub async fn find_statuses_by_type<'e, E>(&self, executor: E, type_code: &str) -> Result<Vec<Status>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let statuses = sqlx::query_as::<_, Status>(&format!(
            "{} WHERE st.code = $1 ORDER BY s.code",
            STATUS_SELECT
        ))
        .bind(type_code)
        .fetch_all(executor)
        .await?;

        Ok(statuses)
    }

    // =========================================================================
    //  TENANTS (usado pelo agendador)
    // =========================================================================

    pub async fn list_tenant_ids<'e, E>(&self, executor: E) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM tenants ORDER BY created_at")
            .fetch_all(executor)
            .await?;

        Ok(ids)
    }
}
