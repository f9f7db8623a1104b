use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

// Nosso tipo de erro interno. Os serviços só conhecem este tipo.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Entidade inexistente ou de outro tenant (as duas situações são idênticas para o chamador)
    #[error("{0}")]
    NotFound(String),

    // Violação de regra de negócio, a mensagem vai direto para o usuário
    #[error("{0}")]
    BusinessError(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Tenant não informado")]
    TenantMissing,

    #[error("Usuário não pertence ao tenant informado")]
    TenantForbidden,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} não encontrado(a) com ID: {}", entity, id))
    }

    pub fn business(message: impl Into<String>) -> Self {
        AppError::BusinessError(message.into())
    }
}

// O erro que sai pela API (status + corpo JSON)
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    error: "Um ou mais campos são inválidos.".to_string(),
                    details: Some(json!(details)),
                }
            }
            AppError::NotFound(message) => ApiError {
                status: StatusCode::NOT_FOUND,
                error: message,
                details: None,
            },
            AppError::BusinessError(message) => ApiError {
                status: StatusCode::BAD_REQUEST,
                error: message,
                details: None,
            },
            AppError::InvalidToken => ApiError {
                status: StatusCode::UNAUTHORIZED,
                error: "Token de autenticação inválido ou ausente.".to_string(),
                details: None,
            },
            AppError::UserNotFound => ApiError {
                status: StatusCode::UNAUTHORIZED,
                error: "Usuário não encontrado.".to_string(),
                details: None,
            },
            AppError::TenantMissing => ApiError {
                status: StatusCode::BAD_REQUEST,
                error: "O cabeçalho X-Tenant-ID é obrigatório.".to_string(),
                details: None,
            },
            AppError::TenantForbidden => ApiError {
                status: StatusCode::FORBIDDEN,
                error: "Sem acesso a este tenant.".to_string(),
                details: None,
            },
            // Todo o resto vira 500. O detalhe fica só no log.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: "Ocorreu um erro inesperado.".to_string(),
                    details: None,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_error_keeps_user_message_and_maps_to_400() {
        let api: ApiError = AppError::business("O desconto é maior que o preço do pacote!").into();

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "O desconto é maior que o preço do pacote!");
    }

    #[test]
    fn not_found_maps_to_404() {
        let api: ApiError = AppError::not_found("Arranjo", 7).into();

        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert!(api.error.contains("7"));
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let api: ApiError =
            AppError::InternalServerError(anyhow::anyhow!("senha do banco: hunter2")).into();

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("hunter2"));
    }

    #[test]
    fn missing_tenant_is_rejected_as_bad_request() {
        let api: ApiError = AppError::TenantMissing.into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);

        let api: ApiError = AppError::TenantForbidden.into();
        assert_eq!(api.status, StatusCode::FORBIDDEN);
    }
}
