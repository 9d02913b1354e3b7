//src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;

fn router(app_state: AppState) -> Router {
    let max_upload_bytes = app_state.settings.max_upload_bytes;

    // Uploads: o corpo da requisição é a própria planilha
    let upload_routes = Router::new()
        .route("/api/imports/networks-branches", post(handlers::imports::upload_networks_branches))
        .route("/api/imports/employees", post(handlers::imports::upload_employees))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .route("/api/imports", get(handlers::imports::list_imports))
        .route("/api/networks-branches", get(handlers::tables::list_networks_branches))
        .route("/api/employees", get(handlers::tables::list_employees))
        .merge(upload_routes)
        .with_state(app_state)
}

#[tokio::main]
async fn main() {
    // RUST_LOG controla o nível; sem ele, "info"
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env().expect("Configuração inválida.");
    let bind_addr = settings.bind_addr.clone();

    let app_state = AppState::new(settings)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", bind_addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
