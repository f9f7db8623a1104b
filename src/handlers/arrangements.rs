// src/handlers/arrangements.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::TenantScope,
        error::{ApiError, AppError},
    },
    config::AppState,
    models::arrangement::{
        ArrangementAuditEntry, ArrangementFilter, ArrangementView, CreateArrangementPayload, Page, PageParams,
        ShortDetails, UpdateArrangementPayload,
    },
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TotalPriceResponse {
    #[schema(example = 1350.00)]
    pub total_price: Decimal,
}

// =============================================================================
//  ESCRITA
// =============================================================================

// POST /api/arrangements
#[utoipa::path(
    post,
    path = "/api/arrangements",
    tag = "Arrangements",
    request_body = CreateArrangementPayload,
    responses(
        (status = 201, description = "Arranjo criado", body = ArrangementView),
        (status = 400, description = "Regra de negócio violada"),
        (status = 404, description = "Bebê, pacote, desconto ou cartão não encontrado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_arrangement(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Json(payload): Json<CreateArrangementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let view = app_state.arrangement_service.create(&scope, payload).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

// PUT /api/arrangements/{id}
#[utoipa::path(
    put,
    path = "/api/arrangements/{id}",
    tag = "Arrangements",
    request_body = UpdateArrangementPayload,
    responses(
        (status = 200, description = "Arranjo atualizado", body = ArrangementView),
        (status = 400, description = "Regra de negócio violada"),
        (status = 404, description = "Arranjo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Arranjo"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_arrangement(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateArrangementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let view = app_state.arrangement_service.update(&scope, id, payload).await?;

    Ok(Json(view))
}

// DELETE /api/arrangements/{id}
#[utoipa::path(
    delete,
    path = "/api/arrangements/{id}",
    tag = "Arrangements",
    responses(
        (status = 200, description = "ID do arranjo excluído", body = Uuid),
        (status = 400, description = "Arranjo possui reservas"),
        (status = 404, description = "Arranjo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Arranjo"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_arrangement(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = app_state.arrangement_service.delete(&scope, id).await?;
    Ok(Json(deleted))
}

// =============================================================================
//  LEITURA
// =============================================================================

// GET /api/arrangements/{id}
#[utoipa::path(
    get,
    path = "/api/arrangements/{id}",
    tag = "Arrangements",
    responses(
        (status = 200, body = ArrangementView),
        (status = 404, description = "Arranjo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Arranjo"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_arrangement(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state.arrangement_service.find_by_id(&scope, id).await?;
    Ok(Json(view))
}

// GET /api/arrangements
#[utoipa::path(
    get,
    path = "/api/arrangements",
    tag = "Arrangements",
    responses(
        (status = 200, description = "Página de arranjos (mais recentes primeiro)", body = Page<ArrangementView>)
    ),
    params(
        ArrangementFilter,
        PageParams,
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_arrangements(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Query(filter): Query<ArrangementFilter>,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .arrangement_service
        .find_all(&scope, filter, page.into())
        .await?;
    Ok(Json(page))
}

// GET /api/arrangements/total-price
#[utoipa::path(
    get,
    path = "/api/arrangements/total-price",
    tag = "Arrangements",
    responses(
        (status = 200, description = "Soma dos preços com os mesmos filtros da listagem", body = TotalPriceResponse)
    ),
    params(
        ArrangementFilter,
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn total_price(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Query(filter): Query<ArrangementFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let total_price = app_state
        .arrangement_service
        .find_total_price_sum(&scope, filter)
        .await?;
    Ok(Json(TotalPriceResponse { total_price }))
}

// GET /api/arrangements/short-list
#[utoipa::path(
    get,
    path = "/api/arrangements/short-list",
    tag = "Arrangements",
    responses(
        (status = 200, description = "Arranjos com termos restantes", body = Vec<ShortDetails>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn short_list(
    State(app_state): State<AppState>,
    scope: TenantScope,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state.arrangement_service.find_all_short_list(&scope).await?;
    Ok(Json(items))
}

// GET /api/arrangements/exists-by-service-package/{id}
#[utoipa::path(
    get,
    path = "/api/arrangements/exists-by-service-package/{id}",
    tag = "Arrangements",
    responses(
        (status = 200, description = "Existe arranjo ativo para o pacote?", body = bool),
        (status = 404, description = "Pacote não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Pacote de Serviço"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn exists_by_service_package(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let exists = app_state
        .arrangement_service
        .exists_by_service_package(&scope, id)
        .await?;
    Ok(Json(exists))
}

// GET /api/arrangements/{id}/audit
#[utoipa::path(
    get,
    path = "/api/arrangements/{id}/audit",
    tag = "Arrangements",
    responses(
        (status = 200, description = "Trilha de auditoria (mais recente primeiro)", body = Vec<ArrangementAuditEntry>),
        (status = 404, description = "Arranjo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Arranjo"),
        ("x-tenant-id" = Uuid, Header, description = "ID do Tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn arrangement_audit(
    State(app_state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = app_state.audit_service.list_for_arrangement(&scope, id).await?;
    Ok(Json(entries))
}
