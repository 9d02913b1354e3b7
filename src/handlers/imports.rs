// src/handlers/imports.rs

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::import::{ImportRecord, ImportSummary},
};

// Cabeçalho opcional com o nome original do arquivo enviado
const FILENAME_HEADER: &str = "x-filename";

fn filename_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FILENAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// POST /api/imports/networks-branches
#[utoipa::path(
    post,
    path = "/api/imports/networks-branches",
    tag = "Imports",
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "Planilha de redes e filiais (xlsx)"),
    params(
        ("x-filename" = Option<String>, Header, description = "Nome original do arquivo")
    ),
    responses(
        (status = 201, description = "Tabela networks_branches substituída", body = ImportSummary),
        (status = 400, description = "Arquivo ilegível"),
        (status = 422, description = "Colunas faltando ou linhas inválidas (lista completa)")
    )
)]
pub async fn upload_networks_branches(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state
        .import_service
        .import_networks_branches(body.to_vec(), filename_from(&headers))
        .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

// POST /api/imports/employees
#[utoipa::path(
    post,
    path = "/api/imports/employees",
    tag = "Imports",
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "Planilha de colaboradores (xlsx)"),
    params(
        ("x-filename" = Option<String>, Header, description = "Nome original do arquivo")
    ),
    responses(
        (status = 201, description = "Tabela employees substituída", body = ImportSummary),
        (status = 400, description = "Arquivo ilegível"),
        (status = 409, description = "Redes/filiais mudaram durante o envio"),
        (status = 422, description = "Colunas faltando ou linhas inválidas (lista completa)")
    )
)]
pub async fn upload_employees(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state
        .import_service
        .import_employees(body.to_vec(), filename_from(&headers))
        .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Quantidade de importações (1 a 100, padrão 10)
    #[validate(range(min = 1, max = 100, message = "O limite deve estar entre 1 e 100."))]
    pub limit: Option<i64>,
}

// GET /api/imports
#[utoipa::path(
    get,
    path = "/api/imports",
    tag = "Imports",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Últimas importações, mais recentes primeiro", body = Vec<ImportRecord>)
    )
)]
pub async fn list_imports(
    State(app_state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ImportRecord>>, AppError> {
    query.validate()?;

    let records = app_state
        .import_service
        .recent_imports(query.limit.unwrap_or(10))
        .await?;

    Ok(Json(records))
}
