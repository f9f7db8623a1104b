// src/db/audit_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::arrangement::{
        ArrangementAuditEntry, ArrangementSnapshot, BabySnapshot, DiscountSnapshot, GiftCardSnapshot,
        LabelSnapshot, ServicePackageSnapshot, UserActionType,
    },
};

// Linha do JOIN auditoria + snapshot
#[derive(Debug, FromRow)]
struct AuditRow {
    audit_id: Uuid,
    arrangement_id: Uuid,
    action_type: String,
    action_by_user_id: Option<Uuid>,
    action_at: DateTime<Utc>,
    price: Decimal,
    remaining_term: i32,
    extend_duration_days: Option<i32>,
    note: Option<String>,
    baby: Json<BabySnapshot>,
    service_package: Json<ServicePackageSnapshot>,
    status: Json<LabelSnapshot>,
    discount: Option<Json<DiscountSnapshot>>,
    payment_type: Option<Json<LabelSnapshot>>,
    gift_card: Option<Json<GiftCardSnapshot>>,
}

impl TryFrom<AuditRow> for ArrangementAuditEntry {
    type Error = AppError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let action_type = row
            .action_type
            .parse::<UserActionType>()
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e)))?;

        Ok(ArrangementAuditEntry {
            audit_id: row.audit_id,
            arrangement_id: row.arrangement_id,
            action_type,
            action_by_user_id: row.action_by_user_id,
            action_at: row.action_at,
            snapshot: ArrangementSnapshot {
                price: row.price,
                remaining_term: row.remaining_term,
                extend_duration_days: row.extend_duration_days,
                note: row.note,
                baby: row.baby.0,
                service_package: row.service_package.0,
                status: row.status.0,
                discount: row.discount.map(|d| d.0),
                payment_type: row.payment_type.map(|p| p.0),
                gift_card: row.gift_card.map(|g| g.0),
            },
        })
    }
}

// Tabelas somente de inserção: este repositório não tem UPDATE nem DELETE.
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn insert_snapshot<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        snapshot: &ArrangementSnapshot,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO arrangement_snapshots (
                tenant_id, price, remaining_term, extend_duration_days, note,
                baby, service_package, status, discount, payment_type, gift_card
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(snapshot.price)
        .bind(snapshot.remaining_term)
        .bind(snapshot.extend_duration_days)
        .bind(snapshot.note.as_deref())
        .bind(Json(&snapshot.baby))
        .bind(Json(&snapshot.service_package))
        .bind(Json(&snapshot.status))
        .bind(snapshot.discount.as_ref().map(Json))
        .bind(snapshot.payment_type.as_ref().map(Json))
        .bind(snapshot.gift_card.as_ref().map(Json))
        .fetch_one(executor)
        .await?;

        Ok(id)
    }

    pub async fn insert_audit<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        arrangement_id: Uuid,
        snapshot_id: Uuid,
        action_type: UserActionType,
        user_id: Option<Uuid>,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO arrangement_audits (tenant_id, arrangement_id, snapshot_id, action_type, action_by_user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(arrangement_id)
        .bind(snapshot_id)
        .bind(action_type.as_str())
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(id)
    }

    pub async fn list_for_arrangement<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        arrangement_id: Uuid,
    ) -> Result<Vec<ArrangementAuditEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT au.id AS audit_id, au.arrangement_id, au.action_type, au.action_by_user_id, au.action_at,
                   sn.price, sn.remaining_term, sn.extend_duration_days, sn.note,
                   sn.baby, sn.service_package, sn.status, sn.discount, sn.payment_type, sn.gift_card
            FROM arrangement_audits au
            JOIN arrangement_snapshots sn ON sn.id = au.snapshot_id
            WHERE au.tenant_id = $1 AND au.arrangement_id = $2
            ORDER BY au.action_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(arrangement_id)
        .fetch_all(executor)
        .await?;

        rows.into_iter().map(ArrangementAuditEntry::try_from).collect()
    }
}
