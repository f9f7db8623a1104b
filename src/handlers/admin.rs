// src/handlers/admin.rs

use axum::{extract::State, response::IntoResponse, Json};
use chrono::{Local, TimeDelta};
use validator::Validate;

use crate::{
    common::{
        db_utils::TenantScope,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::report::{GenerateReportsPayload, ReportRunSummary, TransitionSummary},
};

// Execuções sob demanda das tarefas noturnas, restritas ao tenant de quem chama.

// POST /api/admin/reports/generate
#[utoipa::path(
    post,
    path = "/api/admin/reports/generate",
    tag = "Admin",
    request_body = GenerateReportsPayload,
    responses(
        (status = 200, description = "Relatórios regenerados", body = ReportRunSummary),
        (status = 400, description = "Informe a data ou allDates")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn generate_reports(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    scope: TenantScope,
    Json(payload): Json<GenerateReportsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    tracing::info!(tenant = %scope.tenant_id, "🛠️ Relatórios solicitados por {}", user.email);

    let summary = app_state
        .report_service
        .generate_for_tenant(&scope, payload.scope())
        .await?;

    Ok(Json(summary))
}

// POST /api/admin/reservations/transition-expired
#[utoipa::path(
    post,
    path = "/api/admin/reservations/transition-expired",
    tag = "Admin",
    responses(
        (status = 200, description = "Reservas de ontem marcadas como utilizadas", body = TransitionSummary)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_expired(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    scope: TenantScope,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(tenant = %scope.tenant_id, "🛠️ Transição de reservas solicitada por {}", user.email);

    let yesterday = Local::now().date_naive() - TimeDelta::days(1);
    let transitioned = app_state
        .reservation_service
        .transition_expired(&scope, yesterday)
        .await?;

    Ok(Json(TransitionSummary { transitioned }))
}
