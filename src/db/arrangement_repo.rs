// src/db/arrangement_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::PageRequest, error::AppError},
    models::arrangement::{
        Arrangement, ArrangementFilter, ArrangementShortRow, ArrangementValues, ArrangementViewRow,
    },
};

const ARRANGEMENT_COLUMNS: &str = r#"
    id, tenant_id, baby_id, service_package_id, discount_id, gift_card_id, payment_type_id,
    status_id, price, remaining_term, extend_duration_days, note, created_at, updated_at,
    created_by_user_id, updated_by_user_id, deleted_at, deleted_by_user_id
"#;

const VIEW_SELECT: &str = r#"
    SELECT a.id, a.tenant_id, a.created_at, a.note, a.price, a.remaining_term, a.extend_duration_days,
           b.id AS baby_id, b.name AS baby_name, b.surname AS baby_surname, b.phone_number AS baby_phone,
           sp.id AS service_package_id, sp.name AS service_package_name,
           s.id AS status_id, s.code AS status_code,
           d.id AS discount_id, d.value AS discount_value, d.is_percentage AS discount_is_percentage,
           pt.id AS payment_type_id, pt.name AS payment_type_name,
           gc.id AS gift_card_id, gc.serial_number AS gift_card_serial_number
    FROM arrangements a
    JOIN babies b ON b.id = a.baby_id
    JOIN service_packages sp ON sp.id = a.service_package_id
    JOIN statuses s ON s.id = a.status_id
    LEFT JOIN discounts d ON d.id = a.discount_id
    LEFT JOIN payment_types pt ON pt.id = a.payment_type_id
    LEFT JOIN gift_cards gc ON gc.id = a.gift_card_id
"#;

/// Monta o WHERE das listagens. O tenant e a exclusão lógica são sempre obrigatórios.
pub(crate) fn push_arrangement_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    tenant_id: Uuid,
    filter: &ArrangementFilter,
) {
    qb.push(" WHERE a.tenant_id = ").push_bind(tenant_id);
    qb.push(" AND a.deleted_at IS NULL");

    if let Some(id) = filter.baby_id {
        qb.push(" AND a.baby_id = ").push_bind(id);
    }
    if let Some(id) = filter.status_id {
        qb.push(" AND a.status_id = ").push_bind(id);
    }
    if let Some(id) = filter.service_package_id {
        qb.push(" AND a.service_package_id = ").push_bind(id);
    }
    if let Some(id) = filter.payment_type_id {
        qb.push(" AND a.payment_type_id = ").push_bind(id);
    }
    if let Some(id) = filter.gift_card_id {
        qb.push(" AND a.gift_card_id = ").push_bind(id);
    }
    if let Some(term) = filter.remaining_term {
        qb.push(" AND a.remaining_term = ").push_bind(term);
    }
    if let Some(price) = filter.start_price {
        qb.push(" AND a.price >= ").push_bind(price);
    }
    if let Some(price) = filter.end_price {
        qb.push(" AND a.price <= ").push_bind(price);
    }
    if let Some(id) = filter.arrangement_id {
        qb.push(" AND a.id = ").push_bind(id);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND a.created_at::timestamp >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND a.created_at::timestamp <= ").push_bind(end);
    }
}

#[derive(Clone)]
pub struct ArrangementRepository {
    pool: PgPool,
}

impl ArrangementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Arrangement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let arrangement = sqlx::query_as::<_, Arrangement>(&format!(
            "SELECT {} FROM arrangements WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL",
            ARRANGEMENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(arrangement)
    }

    /// Trava a linha do arranjo até o fim da transação (fluxos de reserva).
    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Arrangement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let arrangement = sqlx::query_as::<_, Arrangement>(&format!(
            "SELECT {} FROM arrangements WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL FOR UPDATE",
            ARRANGEMENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(arrangement)
    }

    /// Inclui arranjos excluídos: a auditoria continua legível depois da exclusão.
    pub async fn find_by_id_with_deleted<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Arrangement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let arrangement = sqlx::query_as::<_, Arrangement>(&format!(
            "SELECT {} FROM arrangements WHERE tenant_id = $1 AND id = $2",
            ARRANGEMENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(arrangement)
    }

    pub async fn find_view<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ArrangementViewRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, ArrangementViewRow>(&format!(
            "{} WHERE a.tenant_id = $1 AND a.id = $2 AND a.deleted_at IS NULL",
            VIEW_SELECT
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    pub async fn find_views<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &ArrangementFilter,
        page: PageRequest,
    ) -> Result<Vec<ArrangementViewRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(VIEW_SELECT);
        push_arrangement_filters(&mut qb, tenant_id, filter);
        qb.push(" ORDER BY a.created_at DESC, a.id DESC");
        qb.push(" LIMIT ").push_bind(page.limit());
        qb.push(" OFFSET ").push_bind(page.offset());

        let rows = qb.build_query_as::<ArrangementViewRow>().fetch_all(executor).await?;
        Ok(rows)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &ArrangementFilter,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM arrangements a");
        push_arrangement_filters(&mut qb, tenant_id, filter);

        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn total_price_sum<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &ArrangementFilter,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COALESCE(SUM(a.price), 0) FROM arrangements a");
        push_arrangement_filters(&mut qb, tenant_id, filter);

        let total = qb.build_query_scalar::<Decimal>().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn short_list<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<ArrangementShortRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ArrangementShortRow>(
            r#"
            SELECT a.id, b.name AS baby_name, b.surname AS baby_surname, b.phone_number AS baby_phone,
                   sp.name AS service_package_name
            FROM arrangements a
            JOIN babies b ON b.id = a.baby_id
            JOIN service_packages sp ON sp.id = a.service_package_id
            WHERE a.tenant_id = $1 AND a.deleted_at IS NULL AND a.remaining_term > 0
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    pub async fn exists_by_service_package<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        service_package_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM arrangements
                WHERE tenant_id = $1 AND service_package_id = $2 AND deleted_at IS NULL
            )
            "#,
        )
        .bind(tenant_id)
        .bind(service_package_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        values: &ArrangementValues,
        user_id: Option<Uuid>,
    ) -> Result<Arrangement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let arrangement = sqlx::query_as::<_, Arrangement>(&format!(
            r#"
            INSERT INTO arrangements (
                tenant_id, baby_id, service_package_id, discount_id, gift_card_id, payment_type_id,
                status_id, price, remaining_term, extend_duration_days, note,
                created_by_user_id, updated_by_user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {}
            "#,
            ARRANGEMENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(values.baby_id)
        .bind(values.service_package_id)
        .bind(values.discount_id)
        .bind(values.gift_card_id)
        .bind(values.payment_type_id)
        .bind(values.status_id)
        .bind(values.price)
        .bind(values.remaining_term)
        .bind(values.extend_duration_days)
        .bind(values.note.as_deref())
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(arrangement)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        values: &ArrangementValues,
        user_id: Option<Uuid>,
    ) -> Result<Option<Arrangement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let arrangement = sqlx::query_as::<_, Arrangement>(&format!(
            r#"
            UPDATE arrangements SET
                baby_id = $3, service_package_id = $4, discount_id = $5, gift_card_id = $6,
                payment_type_id = $7, status_id = $8, price = $9, remaining_term = $10,
                extend_duration_days = $11, note = $12,
                updated_by_user_id = $13, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            ARRANGEMENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(id)
        .bind(values.baby_id)
        .bind(values.service_package_id)
        .bind(values.discount_id)
        .bind(values.gift_card_id)
        .bind(values.payment_type_id)
        .bind(values.status_id)
        .bind(values.price)
        .bind(values.remaining_term)
        .bind(values.extend_duration_days)
        .bind(values.note.as_deref())
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(arrangement)
    }

    pub async fn soft_delete<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Option<Arrangement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let arrangement = sqlx::query_as::<_, Arrangement>(&format!(
            r#"
            UPDATE arrangements
            SET deleted_at = NOW(), deleted_by_user_id = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            ARRANGEMENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(arrangement)
    }

    /// Ajuste atômico de termos (+1 / -1). Retorna None quando o resultado
    /// ficaria negativo; nesse caso nada é alterado.
    pub async fn adjust_remaining_term<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        delta: i32,
    ) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let remaining = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE arrangements
            SET remaining_term = remaining_term + $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL
              AND remaining_term + $3 >= 0
            RETURNING remaining_term
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;

        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn filters_always_scope_by_tenant_and_skip_deleted() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM arrangements a");
        push_arrangement_filters(&mut qb, Uuid::new_v4(), &ArrangementFilter::default());

        let sql = qb.sql();
        assert!(sql.contains("WHERE a.tenant_id = $1"));
        assert!(sql.contains("a.deleted_at IS NULL"));
        assert!(!sql.contains("a.price"));
    }

    #[test]
    fn optional_filters_become_bound_predicates() {
        let filter = ArrangementFilter {
            baby_id: Some(Uuid::new_v4()),
            start_price: Some(Decimal::new(100, 0)),
            end_price: Some(Decimal::new(500, 0)),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            ..Default::default()
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM arrangements a");
        push_arrangement_filters(&mut qb, Uuid::new_v4(), &filter);

        let sql = qb.sql();
        assert!(sql.contains("a.baby_id = $2"));
        assert!(sql.contains("a.price >= $3"));
        assert!(sql.contains("a.price <= $4"));
        assert!(sql.contains("a.created_at::timestamp >= $5"));
        assert!(!sql.contains("a.status_id"));
    }
}
