// src/handlers/reservations.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::TenantScope,
        error::{ApiError, AppError},
    },
    config::AppState,
    models::{
        arrangement::{Page, PageParams},
        reservation::{
            CreateReservationPayload, ReservationFilter, ReservationHistoryEntry, ReservationShortInfo,
            ReservationTableView, ReservationView, UpdateReservationPayload,
        },
    },
};

// =============================================================================
//  ESCRITA
// =============================================================================

// POST /api/reservations
#[utoipa::path(
    post,
    path = "/api/reservations",
    tag = "Reservations",
    request_body = CreateReservationPayload,
    responses(
        (status = 201, description = "Reserva criada (consome um termo do arranjo)", body = ReservationView),
        (status = 400, description = "Sem termos restantes ou validade do pacote expirada"),
        (status = 404, description = "Arranjo não encontrado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_reservation(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Json(payload): Json<CreateReservationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let view = app_state.reservation_service.create(&scope, payload).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

// PUT /api/reservations/{id}
#[utoipa::path(
    put,
    path = "/api/reservations/{id}",
    tag = "Reservations",
    request_body = UpdateReservationPayload,
    responses(
        (status = 200, description = "Reserva atualizada", body = ReservationView),
        (status = 400, description = "Transição de status inválida"),
        (status = 404, description = "Reserva ou status não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Reserva"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_reservation(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReservationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let view = app_state.reservation_service.update(&scope, id, payload).await?;

    Ok(Json(view))
}

// PUT /api/reservations/{id}/cancel
#[utoipa::path(
    put,
    path = "/api/reservations/{id}/cancel",
    tag = "Reservations",
    responses(
        (status = 200, description = "ID da reserva cancelada", body = Uuid),
        (status = 404, description = "Reserva não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Reserva"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_reservation(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let canceled = app_state.reservation_service.cancel(&scope, id).await?;
    Ok(Json(canceled))
}

// DELETE /api/reservations/{id}
#[utoipa::path(
    delete,
    path = "/api/reservations/{id}",
    tag = "Reservations",
    responses(
        (status = 200, description = "ID da reserva excluída", body = Uuid),
        (status = 404, description = "Reserva não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Reserva"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_reservation(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = app_state.reservation_service.delete(&scope, id).await?;
    Ok(Json(deleted))
}

// =============================================================================
//  LEITURA
// =============================================================================

// GET /api/reservations/{id}
#[utoipa::path(
    get,
    path = "/api/reservations/{id}",
    tag = "Reservations",
    responses(
        (status = 200, body = ReservationView),
        (status = 404, description = "Reserva não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Reserva"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_reservation(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state.reservation_service.find_by_id(&scope, id).await?;
    Ok(Json(view))
}

// GET /api/reservations
#[utoipa::path(
    get,
    path = "/api/reservations",
    tag = "Reservations",
    responses(
        (status = 200, description = "Hoje primeiro, depois futuras, depois passadas", body = Page<ReservationTableView>)
    ),
    params(
        ReservationFilter,
        PageParams,
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_reservations(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Query(filter): Query<ReservationFilter>,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .reservation_service
        .find_all(&scope, filter, page.into())
        .await?;
    Ok(Json(page))
}

// GET /api/reservations/by-arrangement/{id}
#[utoipa::path(
    get,
    path = "/api/reservations/by-arrangement/{id}",
    tag = "Reservations",
    responses(
        (status = 200, body = Vec<ReservationShortInfo>),
        (status = 404, description = "Arranjo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Arranjo"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn reservations_by_arrangement(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .reservation_service
        .find_by_arrangement_id(&scope, id)
        .await?;
    Ok(Json(items))
}

// GET /api/reservations/exists-by-arrangement/{id}
#[utoipa::path(
    get,
    path = "/api/reservations/exists-by-arrangement/{id}",
    tag = "Reservations",
    responses(
        (status = 200, description = "O arranjo possui reservas?", body = bool),
        (status = 404, description = "Arranjo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Arranjo"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn exists_by_arrangement(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let exists = app_state
        .reservation_service
        .exists_by_arrangement(&scope, id)
        .await?;
    Ok(Json(exists))
}

// GET /api/reservations/{id}/history
#[utoipa::path(
    get,
    path = "/api/reservations/{id}/history",
    tag = "Reservations",
    responses(
        (status = 200, description = "Mudanças de status (mais recente primeiro)", body = Vec<ReservationHistoryEntry>),
        (status = 404, description = "Reserva não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da Reserva"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn reservation_history(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = app_state.reservation_service.history(&scope, id).await?;
    Ok(Json(entries))
}
