// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Renov - Importação de Planilhas",
        description = "Carga de redes/filiais e colaboradores a partir de planilhas Excel"
    ),
    paths(
        // --- Imports ---
        handlers::imports::upload_networks_branches,
        handlers::imports::upload_employees,
        handlers::imports::list_imports,

        // --- Tables ---
        handlers::tables::list_networks_branches,
        handlers::tables::list_employees,
    ),
    components(
        schemas(
            models::import::TableId,
            models::import::ActiveStatus,
            models::import::NetworkBranch,
            models::import::Employee,
            models::import::ImportRecord,
            models::import::ImportSummary,
        )
    ),
    tags(
        (name = "Imports", description = "Upload de planilhas (substituição completa da tabela)"),
        (name = "Tables", description = "Conteúdo atual das tabelas carregadas")
    )
)]
pub struct ApiDoc;
