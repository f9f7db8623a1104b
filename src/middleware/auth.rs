// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::{db_utils::TenantScope, error::AppError},
    config::AppState,
    middleware::tenancy::TenantContext,
    models::auth::User,
};

/// Extrai o token do cabeçalho `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::InvalidToken)
}

/// Decide o tenant da requisição: claim do token, senão o cabeçalho.
/// O usuário só pode agir dentro do próprio tenant.
pub fn resolve_tenant(
    claim_tenant: Option<Uuid>,
    header_tenant: Option<TenantContext>,
    user: &User,
) -> Result<Uuid, AppError> {
    let tenant_id = claim_tenant
        .or(header_tenant.map(|TenantContext(id)| id))
        .ok_or(AppError::TenantMissing)?;

    if tenant_id != user.tenant_id {
        tracing::warn!(user = %user.id, requested = %tenant_id, "🚫 Acesso negado ao tenant");
        return Err(AppError::TenantForbidden);
    }
    Ok(tenant_id)
}

// O middleware em si: autentica, resolve o tenant e monta o escopo da requisição.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Nada emprestado da requisição atravessa o await
    let token = bearer_token(request.headers())?.to_owned();
    let header_tenant = TenantContext::from_headers(request.headers())?;

    let (user, claims) = app_state
        .auth_service
        .validate_token(&token)
        .await?;

    let tenant_id = resolve_tenant(claims.tenant_id, header_tenant, &user)?;

    // Tudo isto vive só nas extensões desta requisição
    let extensions = request.extensions_mut();
    extensions.insert(TenantContext(tenant_id));
    extensions.insert(TenantScope::new(tenant_id, user.id));
    extensions.insert(AuthenticatedUser(user));

    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn user(tenant_id: Uuid) -> User {
        User {
            id: Uuid::new_v4(),
            tenant_id,
            email: "recepcao@babyspa.ba".into(),
            first_name: "Ana".into(),
            last_name: "Souza".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AppError::InvalidToken)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(AppError::InvalidToken)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }

    #[test]
    fn claim_tenant_takes_precedence() {
        let tenant = Uuid::new_v4();
        let owner = user(tenant);

        let resolved = resolve_tenant(Some(tenant), Some(TenantContext(Uuid::new_v4())), &owner);
        assert_eq!(resolved.unwrap(), tenant);

        let from_header = resolve_tenant(None, Some(TenantContext(tenant)), &owner);
        assert_eq!(from_header.unwrap(), tenant);
    }

    #[test]
    fn foreign_or_missing_tenant_is_rejected() {
        let owner = user(Uuid::new_v4());

        let foreign = resolve_tenant(None, Some(TenantContext(Uuid::new_v4())), &owner);
        assert!(matches!(foreign, Err(AppError::TenantForbidden)));

        let missing = resolve_tenant(None, None, &owner);
        assert!(matches!(missing, Err(AppError::TenantMissing)));
    }
}
