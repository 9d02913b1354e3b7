// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// ---
// Erros de linha (acumulados e devolvidos todos juntos)
// ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowError {
    #[error("Linha {line}: o campo obrigatório '{field}' está vazio.")]
    EmptyRequiredField { line: usize, field: String },

    #[error("Linha {line}: status inválido em '{field}': '{value}'. Use ATIVO/ATIVA/INATIVO/INATIVA ou SIM/NÃO.")]
    InvalidStatusValue { line: usize, field: String, value: String },

    #[error("Linha {line}: data inválida em '{field}': '{value}'. Use o formato AAAA-MM-DD.")]
    InvalidDateFormat { line: usize, field: String, value: String },

    #[error("Chave '{key}' repetida nas linhas {lines:?}.")]
    DuplicateKey { key: String, lines: Vec<usize> },

    #[error("Linha {line}: filial '{filial}' / rede '{rede}' não encontrada na base de redes e filiais.")]
    ReferentialIntegrity { line: usize, filial: String, rede: String },

    #[error("Linha {line}: filial de código '{codigo_filial}'{} não encontrada na base de redes e filiais.", network_code_suffix(.codigo_rede))]
    UnknownBranchCode { line: usize, codigo_filial: String, codigo_rede: Option<String> },
}

fn network_code_suffix(codigo_rede: &Option<String>) -> String {
    codigo_rede.as_deref().map(|code| format!(" (rede '{code}')")).unwrap_or_default()
}

impl RowError {
    /// Linha usada para ordenar o relatório.
    pub fn line(&self) -> usize {
        match self {
            RowError::EmptyRequiredField { line, .. }
            | RowError::InvalidStatusValue { line, .. }
            | RowError::InvalidDateFormat { line, .. }
            | RowError::ReferentialIntegrity { line, .. }
            | RowError::UnknownBranchCode { line, .. } => *line,
            RowError::DuplicateKey { lines, .. } => lines.first().copied().unwrap_or_default(),
        }
    }
}

// Uma coluna obrigatória que não foi encontrada no cabeçalho.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingColumn {
    pub field: String,
    pub accepted: Vec<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Colunas obrigatórias não encontradas: {}", .0.iter().map(|c| c.field.as_str()).collect::<Vec<_>>().join(", "))]
    MissingColumnError(Vec<MissingColumn>),

    #[error("A planilha contém {} erro(s) de validação", .0.len())]
    ValidationFailed(Vec<RowError>),

    #[error("Não foi possível ler a planilha: {0}")]
    InvalidWorkbook(String),

    #[error("A planilha não possui aba ou linha de cabeçalho")]
    EmptyWorkbook,

    #[error("A base de redes e filiais mudou durante a validação")]
    ReferenceSnapshotChanged,

    // Falha no meio da substituição: a transação é desfeita.
    #[error("Erro ao gravar a importação: {0}")]
    StorageCommitError(#[source] sqlx::Error),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::MissingColumnError(ref missing) => {
                let body = Json(json!({
                    "error": self.to_string(),
                    "stage": "header_rejected",
                    "missingColumns": missing,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::ValidationFailed(ref errors) => {
                // Cada erro leva a mensagem pronta para exibir no dashboard
                let details: Vec<_> = errors
                    .iter()
                    .map(|e| {
                        let mut value = serde_json::to_value(e).unwrap_or_default();
                        if let Some(obj) = value.as_object_mut() {
                            obj.insert("message".into(), e.to_string().into());
                        }
                        value
                    })
                    .collect();
                let body = Json(json!({
                    "error": self.to_string(),
                    "stage": "validation_failed",
                    "details": details,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::InvalidWorkbook(_) | AppError::EmptyWorkbook => {
                let body = Json(json!({
                    "error": self.to_string(),
                    "stage": "header_rejected",
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::ReferenceSnapshotChanged => (
                StatusCode::CONFLICT,
                "A base de redes e filiais foi atualizada durante o envio. Envie a planilha de colaboradores novamente.",
            ),
            AppError::StorageCommitError(ref e) => {
                tracing::error!("Falha no commit da importação: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Falha ao gravar a importação. Nenhuma alteração foi aplicada.",
                )
            }

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
