//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod scheduler;
mod services;
#[cfg(test)]
mod test_support;

use crate::config::{AppConfig, AppState};
use crate::middleware::auth::tenant_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Sem configuração válida a aplicação não deve iniciar
    let config = AppConfig::from_env()?;
    let app_state = AppState::new(&config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let shutdown = CancellationToken::new();
    let jobs = if config.scheduler_enabled {
        scheduler::spawn(app_state.clone(), &config, shutdown.clone())
    } else {
        tracing::info!("⏸️ Agendador desativado (SCHEDULER_ENABLED=false)");
        Vec::new()
    };

    let app = router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Falha ao aguardar o sinal de encerramento: {}", e);
            }
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    for job in jobs {
        let _ = job.await;
    }

    tracing::info!("👋 Servidor encerrado");
    Ok(())
}

fn router(app_state: AppState) -> Router {
    let arrangement_routes = Router::new()
        .route("/"
               ,post(handlers::arrangements::create_arrangement)
               .get(handlers::arrangements::list_arrangements)
        )
        .route("/short-list", get(handlers::arrangements::short_list))
        .route("/total-price", get(handlers::arrangements::total_price))
        .route("/exists-by-service-package/{id}", get(handlers::arrangements::exists_by_service_package))
        .route("/{id}"
               ,get(handlers::arrangements::get_arrangement)
               .put(handlers::arrangements::update_arrangement)
               .delete(handlers::arrangements::delete_arrangement)
        )
        .route("/{id}/audit", get(handlers::arrangements::arrangement_audit))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let reservation_routes = Router::new()
        .route("/"
               ,post(handlers::reservations::create_reservation)
               .get(handlers::reservations::list_reservations)
        )
        .route("/by-arrangement/{id}", get(handlers::reservations::reservations_by_arrangement))
        .route("/exists-by-arrangement/{id}", get(handlers::reservations::exists_by_arrangement))
        .route("/{id}"
               ,get(handlers::reservations::get_reservation)
               .put(handlers::reservations::update_reservation)
               .delete(handlers::reservations::delete_reservation)
        )
        .route("/{id}/cancel", put(handlers::reservations::cancel_reservation))
        .route("/{id}/history", get(handlers::reservations::reservation_history))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let admin_routes = Router::new()
        .route("/reports/generate", post(handlers::admin::generate_reports))
        .route("/reservations/transition-expired", post(handlers::admin::transition_expired))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .route("/api/health", get(handlers::health::health))
        .nest("/api/arrangements", arrangement_routes)
        .nest("/api/reservations", reservation_routes)
        .nest("/api/admin", admin_routes)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use testresult::TestResult;
    use tower::ServiceExt;

    fn app() -> Result<Router, sqlx::Error> {
        // Pool preguiçoso: as rotas testadas aqui não chegam ao banco
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/babyspa_test")?;
        Ok(router(AppState::from_pool(pool, "segredo".into())))
    }

    #[tokio::test]
    async fn health_is_public() -> TestResult {
        let response = app()?
            .oneshot(Request::builder().uri("/api/health").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn tenant_routes_require_a_bearer_token() -> TestResult {
        for uri in ["/api/arrangements", "/api/reservations", "/api/arrangements/short-list"] {
            let response = app()?
                .oneshot(Request::builder().uri(uri).body(Body::empty())?)
                .await?;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
        Ok(())
    }

    #[tokio::test]
    async fn invalid_token_is_rejected_before_the_database() -> TestResult {
        let response = app()?
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/admin/reservations/transition-expired")
                    .header("authorization", "Bearer nao-e-um-jwt")
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
