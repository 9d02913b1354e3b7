// src/handlers/tables.rs

// Leitura das tabelas carregadas, para os painéis do dashboard.

use axum::{extract::State, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    models::import::{Employee, NetworkBranch},
};

// GET /api/networks-branches
#[utoipa::path(
    get,
    path = "/api/networks-branches",
    tag = "Tables",
    responses(
        (status = 200, description = "Conteúdo atual de networks_branches", body = Vec<NetworkBranch>)
    )
)]
pub async fn list_networks_branches(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<NetworkBranch>>, AppError> {
    let rows = app_state.import_service.list_networks_branches().await?;
    Ok(Json(rows))
}

// GET /api/employees
#[utoipa::path(
    get,
    path = "/api/employees",
    tag = "Tables",
    responses(
        (status = 200, description = "Conteúdo atual de employees", body = Vec<Employee>)
    )
)]
pub async fn list_employees(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Employee>>, AppError> {
    let rows = app_state.import_service.list_employees().await?;
    Ok(Json(rows))
}
