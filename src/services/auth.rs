// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User},
};

// Só valida tokens. Emissão e senha ficam com o serviço de login.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String) -> Self {
        Self { user_repo, jwt_secret }
    }

    pub fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims)
    }

    /// Valida o token e carrega o usuário dono dele.
    pub async fn validate_token(&self, token: &str) -> Result<(User, Claims), AppError> {
        let claims = self.decode_claims(token)?;

        let user = self
            .user_repo
            .find_by_id(self.user_repo.get_pool(), claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)?;

        Ok((user, claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn service(secret: &str) -> AuthService {
        // Pool preguiçoso: nenhum teste aqui chega a abrir conexão.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/babyspa_test")
            .expect("url válida");
        AuthService::new(UserRepository::new(pool), secret.to_string())
    }

    fn token(secret: &str, tenant_id: Option<Uuid>, exp_offset_secs: i64) -> (Uuid, String) {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            tenant_id,
            exp: (now + exp_offset_secs) as usize,
            iat: now as usize,
        };
        let encoded = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("token");
        (claims.sub, encoded)
    }

    #[tokio::test]
    async fn decodes_claims_signed_with_same_secret() {
        let tenant = Uuid::new_v4();
        let (sub, jwt) = token("segredo", Some(tenant), 3600);

        let claims = service("segredo").decode_claims(&jwt).expect("claims");
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.tenant_id, Some(tenant));
    }

    #[tokio::test]
    async fn rejects_wrong_secret_and_expired_tokens() {
        let (_, jwt) = token("outro", None, 3600);
        assert!(matches!(service("segredo").decode_claims(&jwt), Err(AppError::InvalidToken)));

        let (_, expired) = token("segredo", None, -3600);
        assert!(matches!(service("segredo").decode_claims(&expired), Err(AppError::InvalidToken)));
    }
}
