// src/db/reservation_repo.rs

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::reservation::{
        Reservation, ReservationFilter, ReservationHistoryEntry, ReservationShortInfo, ReservationTableRow,
    },
};

// Colunas da reserva + código do status, lidas de "r" (tabela ou CTE) com JOIN em statuses.
const RESERVATION_PROJECTION: &str = r#"
    r.id, r.tenant_id, r.arrangement_id, r.status_id, s.code AS status_code,
    r.start_date, r.end_date, r.note, r.created_at, r.created_by_user_id, r.updated_by_user_id,
    r.deleted_at, r.deleted_by_user_id
"#;

const TABLE_SELECT: &str = r#"
    SELECT r.id, r.tenant_id, r.arrangement_id, a.remaining_term, r.created_at,
           r.start_date, r.end_date, r.note,
           s.id AS status_id, s.code AS status_code, s.name AS status_name, st.code AS status_type_code,
           b.id AS baby_id, b.name AS baby_name, b.surname AS baby_surname, b.phone_number AS baby_phone,
           sp.name AS service_package_name
    FROM reservations r
    JOIN statuses s ON s.id = r.status_id
    JOIN status_types st ON st.id = s.status_type_id
    JOIN arrangements a ON a.id = r.arrangement_id
    JOIN babies b ON b.id = a.baby_id
    JOIN service_packages sp ON sp.id = a.service_package_id
"#;

pub(crate) fn push_reservation_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    tenant_id: Uuid,
    filter: &ReservationFilter,
) {
    qb.push(" WHERE r.tenant_id = ").push_bind(tenant_id);
    qb.push(" AND r.deleted_at IS NULL");

    if let Some(id) = filter.status_id {
        qb.push(" AND r.status_id = ").push_bind(id);
    }
    if let Some(id) = filter.arrangement_id {
        qb.push(" AND r.arrangement_id = ").push_bind(id);
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND r.start_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND r.start_date <= ").push_bind(end);
    }
}

#[derive(Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
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
    ) -> Result<Option<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            SELECT {}
            FROM reservations r
            JOIN statuses s ON s.id = r.status_id
            WHERE r.tenant_id = $1 AND r.id = $2 AND r.deleted_at IS NULL
            "#,
            RESERVATION_PROJECTION
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(reservation)
    }

    pub async fn exists_by_arrangement<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        arrangement_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE tenant_id = $1 AND arrangement_id = $2 AND deleted_at IS NULL
            )
            "#,
        )
        .bind(tenant_id)
        .bind(arrangement_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    /// Primeira reserva do arranjo (ordem de criação). Abre a janela de validade do pacote.
    pub async fn first_by_arrangement<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        arrangement_id: Uuid,
    ) -> Result<Option<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            SELECT {}
            FROM reservations r
            JOIN statuses s ON s.id = r.status_id
            WHERE r.tenant_id = $1 AND r.arrangement_id = $2 AND r.deleted_at IS NULL
            ORDER BY r.created_at ASC, r.start_date ASC
            LIMIT 1
            "#,
            RESERVATION_PROJECTION
        ))
        .bind(tenant_id)
        .bind(arrangement_id)
        .fetch_optional(executor)
        .await?;

        Ok(reservation)
    }

    pub async fn short_info_by_arrangement<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        arrangement_id: Uuid,
    ) -> Result<Vec<ReservationShortInfo>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ReservationShortInfo>(
            r#"
            SELECT r.start_date, r.end_date, s.name AS status_name, s.code AS status_code
            FROM reservations r
            JOIN statuses s ON s.id = r.status_id
            WHERE r.tenant_id = $1 AND r.arrangement_id = $2 AND r.deleted_at IS NULL
            ORDER BY r.start_date ASC
            "#,
        )
        .bind(tenant_id)
        .bind(arrangement_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// Todas as linhas filtradas. A ordenação do dashboard é aplicada no serviço.
    pub async fn find_table_rows<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &ReservationFilter,
    ) -> Result<Vec<ReservationTableRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(TABLE_SELECT);
        push_reservation_filters(&mut qb, tenant_id, filter);
        qb.push(" ORDER BY r.start_date ASC");

        let rows = qb.build_query_as::<ReservationTableRow>().fetch_all(executor).await?;
        Ok(rows)
    }

    pub async fn find_by_status_on_date<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            SELECT {}
            FROM reservations r
            JOIN statuses s ON s.id = r.status_id
            WHERE r.tenant_id = $1 AND r.status_id = $2 AND r.start_date::date = $3
              AND r.deleted_at IS NULL
            FOR UPDATE OF r
            "#,
            RESERVATION_PROJECTION
        ))
        .bind(tenant_id)
        .bind(status_id)
        .bind(date)
        .fetch_all(executor)
        .await?;

        Ok(reservations)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        arrangement_id: Uuid,
        status_id: Uuid,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
        note: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<Reservation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            WITH r AS (
                INSERT INTO reservations (
                    tenant_id, arrangement_id, status_id, start_date, end_date, note,
                    created_by_user_id, updated_by_user_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                RETURNING *
            )
            SELECT {} FROM r JOIN statuses s ON s.id = r.status_id
            "#,
            RESERVATION_PROJECTION
        ))
        .bind(tenant_id)
        .bind(arrangement_id)
        .bind(status_id)
        .bind(start_date)
        .bind(end_date)
        .bind(note)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(reservation)
    }

    pub async fn update_status_and_note<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        status_id: Uuid,
        note: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<Option<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            WITH r AS (
                UPDATE reservations
                SET status_id = $3, note = $4, updated_by_user_id = $5
                WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL
                RETURNING *
            )
            SELECT {} FROM r JOIN statuses s ON s.id = r.status_id
            "#,
            RESERVATION_PROJECTION
        ))
        .bind(tenant_id)
        .bind(id)
        .bind(status_id)
        .bind(note)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(reservation)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        status_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status_id = $3, updated_by_user_id = COALESCE($4, updated_by_user_id)
            WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(status_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn soft_delete<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET deleted_at = NOW(), deleted_by_user_id = $3
            WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    //  HISTÓRICO (somente inserção)
    // =========================================================================

    pub async fn insert_history<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        reservation_id: Uuid,
        previous_status_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO reservation_status_history (tenant_id, reservation_id, status_id, action_by_user_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(tenant_id)
        .bind(reservation_id)
        .bind(previous_status_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn list_history<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<Vec<ReservationHistoryEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, ReservationHistoryEntry>(
            r#"
            SELECT h.id, h.reservation_id, h.status_id, s.code AS status_code, s.name AS status_name,
                   h.action_by_user_id, h.action_at
            FROM reservation_status_history h
            JOIN statuses s ON s.id = h.status_id
            WHERE h.tenant_id = $1 AND h.reservation_id = $2
            ORDER BY h.action_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(reservation_id)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_filters_bind_in_order() {
        let filter = ReservationFilter {
            status_id: Some(Uuid::new_v4()),
            arrangement_id: None,
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            end_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
        };

        let mut qb = QueryBuilder::<Postgres>::new(TABLE_SELECT);
        push_reservation_filters(&mut qb, Uuid::new_v4(), &filter);

        let sql = qb.sql();
        assert!(sql.contains("WHERE r.tenant_id = $1 AND r.deleted_at IS NULL"));
        assert!(sql.contains("r.status_id = $2"));
        assert!(sql.contains("r.start_date >= $3"));
        assert!(sql.contains("r.start_date <= $4"));
        assert!(!sql.contains("r.arrangement_id ="));
    }
}
