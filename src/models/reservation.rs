// src/models/reservation.rs

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::db_utils::TenantOwned,
    models::{
        arrangement::{baby_label, ArrangementView, ShortDetails},
        catalog::{Lifecycle, Status},
    },
};

// ---
// 1. Reserva (uma visita agendada contra um arranjo)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub arrangement_id: Uuid,
    pub status_id: Uuid,
    // Vem do JOIN com statuses; o motor decide pelas regras a partir do código.
    #[schema(example = "term_reserved")]
    pub status_code: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by_user_id: Option<Uuid>,
    pub updated_by_user_id: Option<Uuid>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl TenantOwned for Reservation {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

// ---
// 2. Visões
// ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    pub reservation_id: Uuid,
    pub arrangement: ArrangementView,
    pub status: Status,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub created_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Linha da tabela de reservas (dashboard operacional).
#[derive(Debug, Clone, FromRow)]
pub struct ReservationTableRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub arrangement_id: Uuid,
    pub remaining_term: i32,
    pub created_at: DateTime<Utc>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub note: Option<String>,
    pub status_id: Uuid,
    pub status_code: String,
    pub status_name: String,
    pub status_type_code: String,
    pub baby_id: Uuid,
    pub baby_name: String,
    pub baby_surname: Option<String>,
    pub baby_phone: String,
    pub service_package_name: String,
}

impl TenantOwned for ReservationTableRow {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationTableView {
    pub reservation_id: Uuid,
    pub arrangement_id: Uuid,
    pub remaining_term: i32,
    pub created_at: DateTime<Utc>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub status: Status,
    pub baby_details: ShortDetails,
    pub service_package_name: String,
    pub note: Option<String>,
}

impl From<ReservationTableRow> for ReservationTableView {
    fn from(row: ReservationTableRow) -> Self {
        ReservationTableView {
            reservation_id: row.id,
            arrangement_id: row.arrangement_id,
            remaining_term: row.remaining_term,
            created_at: row.created_at,
            start_date: row.start_date,
            end_date: row.end_date,
            status: Status {
                id: row.status_id,
                code: row.status_code,
                name: row.status_name,
                type_code: row.status_type_code,
            },
            baby_details: ShortDetails::new(
                row.baby_id,
                baby_label(&row.baby_name, row.baby_surname.as_deref(), &row.baby_phone),
            ),
            service_package_name: row.service_package_name,
            note: row.note,
        }
    }
}

/// Resumo usado na tela do arranjo.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationShortInfo {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub status_name: String,
    pub status_code: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReservationFilter {
    pub status_id: Option<Uuid>,
    pub arrangement_id: Option<Uuid>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

// ---
// 3. Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationPayload {
    pub arrangement_id: Uuid,
    #[schema(example = "2024-05-10T09:00:00")]
    pub start_date: NaiveDateTime,
    #[validate(range(min = 1, max = 1440, message = "A duração deve estar entre 1 e 1440 minutos"))]
    pub duration_minutes: i32,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationPayload {
    pub status_id: Uuid,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

// ---
// 4. Histórico de status (somente inserção)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationHistoryEntry {
    pub id: Uuid,
    pub reservation_id: Uuid,
    // Status que a reserva tinha ANTES da mudança
    pub status_id: Uuid,
    pub status_code: String,
    pub status_name: String,
    pub action_by_user_id: Option<Uuid>,
    pub action_at: DateTime<Utc>,
}
