// src/db/report_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

// Agregados diários por tenant. A leitura dos relatórios fica fora deste serviço.
#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn delete_all<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            WITH reservation_rows AS (
                DELETE FROM reservation_daily_reports WHERE tenant_id = $1
            )
            DELETE FROM service_package_daily_reports WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete_reservation_reports_on<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        date: NaiveDate,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM reservation_daily_reports WHERE tenant_id = $1 AND date = $2")
            .bind(tenant_id)
            .bind(date)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_package_reports_on<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        date: NaiveDate,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result =
            sqlx::query("DELETE FROM service_package_daily_reports WHERE tenant_id = $1 AND date = $2")
                .bind(tenant_id)
                .bind(date)
                .execute(executor)
                .await?;
        Ok(result.rows_affected())
    }

    /// Datas distintas com reservas anteriores a `before`.
    pub async fn distinct_reservation_dates<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        before: NaiveDate,
    ) -> Result<Vec<NaiveDate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let dates = sqlx::query_scalar::<_, NaiveDate>(
            r#"
            SELECT DISTINCT start_date::date
            FROM reservations
            WHERE tenant_id = $1 AND start_date < $2::date AND deleted_at IS NULL
            ORDER BY 1
            "#,
        )
        .bind(tenant_id)
        .bind(before)
        .fetch_all(executor)
        .await?;

        Ok(dates)
    }

    /// Quantidade de reservas por (bebê, status de reserva) no dia.
    pub async fn insert_reservation_counts<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        date: NaiveDate,
        reservation_type_code: &str,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO reservation_daily_reports (tenant_id, date, baby_id, status_id, number_of_reservation)
            SELECT r.tenant_id, $2, a.baby_id, r.status_id, COUNT(*)::int
            FROM reservations r
            JOIN arrangements a ON a.id = r.arrangement_id
            JOIN statuses s ON s.id = r.status_id
            JOIN status_types st ON st.id = s.status_type_id
            WHERE r.tenant_id = $1 AND r.start_date::date = $2 AND r.deleted_at IS NULL
              AND st.code = $3
            GROUP BY r.tenant_id, a.baby_id, r.status_id
            "#,
        )
        .bind(tenant_id)
        .bind(date)
        .bind(reservation_type_code)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Quantidade de reservas por pacote de serviço no dia (zero para pacotes sem uso).
    pub async fn insert_package_usage<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        date: NaiveDate,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO service_package_daily_reports (tenant_id, date, service_package_id, number_of_used_packages)
            SELECT sp.tenant_id, $2, sp.id, COUNT(r.id)::int
            FROM service_packages sp
            LEFT JOIN arrangements a
                   ON a.service_package_id = sp.id AND a.tenant_id = sp.tenant_id
            LEFT JOIN reservations r
                   ON r.arrangement_id = a.id AND r.start_date::date = $2 AND r.deleted_at IS NULL
            WHERE sp.tenant_id = $1 AND sp.deleted_at IS NULL
            GROUP BY sp.tenant_id, sp.id
            "#,
        )
        .bind(tenant_id)
        .bind(date)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
