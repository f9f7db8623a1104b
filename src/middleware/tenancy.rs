// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::common::{db_utils::TenantScope, error::AppError};

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Tenant da requisição. Primeiro o que a autenticação já resolveu,
/// depois o cabeçalho X-Tenant-ID. Sem nenhum dos dois a requisição é recusada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext(pub Uuid);

impl TenantContext {
    pub fn from_parts(parts: &Parts) -> Result<Self, AppError> {
        if let Some(resolved) = parts.extensions.get::<TenantContext>() {
            return Ok(*resolved);
        }

        Self::from_headers(&parts.headers)?.ok_or(AppError::TenantMissing)
    }

    /// Lê o cabeçalho. Ausente -> None; presente mas inválido -> erro.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, AppError> {
        let Some(value) = headers.get(TENANT_ID_HEADER) else {
            return Ok(None);
        };

        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(|tenant_id| Some(TenantContext(tenant_id)))
            .ok_or(AppError::TenantMissing)
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        TenantContext::from_parts(parts)
    }
}

// O escopo completo (tenant + usuário) é montado pelo tenant_guard.
impl<S> FromRequestParts<S> for TenantScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantScope>()
            .copied()
            .ok_or(AppError::TenantMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    async fn echo_tenant(TenantContext(tenant_id): TenantContext) -> String {
        tenant_id.to_string()
    }

    fn app() -> Router {
        Router::new().route("/", get(echo_tenant))
    }

    #[tokio::test]
    async fn reads_tenant_from_header() {
        let tenant = Uuid::new_v4();
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(TENANT_ID_HEADER, tenant.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, tenant.to_string().as_bytes());
    }

    #[tokio::test]
    async fn missing_or_invalid_header_is_rejected() {
        let missing = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let invalid = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(TENANT_ID_HEADER, "loja-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn resolved_tenant_wins_over_header() {
        let from_token = Uuid::new_v4();
        let mut request = Request::builder()
            .uri("/")
            .header(TENANT_ID_HEADER, Uuid::new_v4().to_string())
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(TenantContext(from_token));

        let (parts, _) = request.into_parts();
        assert_eq!(TenantContext::from_parts(&parts).unwrap(), TenantContext(from_token));
    }

    #[tokio::test]
    async fn scope_requires_guard() {
        async fn handler(scope: TenantScope) -> String {
            scope.tenant_id.to_string()
        }

        let response = Router::new()
            .route("/", get(handler))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
