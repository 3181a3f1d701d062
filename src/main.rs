//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
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
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::{admin_guard, auth_guard, client_area_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Cadastro e login (públicos)
    let public_auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Logout e eventos de sessão (sessão obrigatória)
    let session_routes = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .route("/events", get(handlers::auth::session_events))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let plan_routes = Router::new()
        .route("/", get(handlers::plans::list_plans))
        .route("/{id}", get(handlers::plans::get_plan));

    // Pedidos ficam fora do gate: o cliente com pendência precisa consultá-los
    let order_routes = Router::new()
        .route("/"
               ,post(handlers::orders::create_order)
               .get(handlers::orders::list_my_orders)
        )
        .route("/status", get(handlers::orders::my_order_status))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Área do cliente (sessão + pendência de pagamento)
    let card_routes = Router::new()
        .route("/", get(handlers::card::my_card))
        .route("/qrcode", get(handlers::card::my_card_qrcode))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            client_area_guard,
        ));

    let admin_routes = Router::new()
        .route("/orders", get(handlers::admin::list_orders))
        .route("/orders/{id}/status", patch(handlers::admin::update_order_status))
        .route("/orders/{id}/confirm-payment", post(handlers::admin::confirm_payment))
        .route("/profiles", get(handlers::admin::list_profiles))
        .route("/profiles/{id}/role", patch(handlers::admin::update_role))
        .route("/profiles/{id}/card", post(handlers::admin::issue_card))
        .route("/clinics"
               ,get(handlers::admin::list_clinics)
               .post(handlers::admin::create_clinic)
        )
        .route("/dashboard", get(handlers::admin::get_dashboard))
        .route("/finance", get(handlers::admin::get_finance))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/gate", get(handlers::gate::check_gate))
        .route("/api/validate-card"
               ,get(handlers::card::validate_card_query)
               .post(handlers::card::validate_card)
        )
        .nest("/api/auth", public_auth_routes.merge(session_routes))
        .nest("/api/users", user_routes)
        .nest("/api/plans", plan_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/card", card_routes)
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", settings.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}
