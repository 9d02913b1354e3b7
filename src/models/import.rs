// src/models/import.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. TableId (Qual tabela um upload substitui)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    NetworksBranches,
    Employees,
}

impl TableId {
    pub fn table_name(&self) -> &'static str {
        match self {
            TableId::NetworksBranches => "networks_branches",
            TableId::Employees => "employees",
        }
    }

    /// Valor gravado em `import_history.import_type`.
    pub fn import_type(&self) -> &'static str {
        match self {
            TableId::NetworksBranches => "redes_filiais",
            TableId::Employees => "colaboradores",
        }
    }

    // Chave do pg_advisory_xact_lock: um escritor por tabela.
    pub fn lock_key(&self) -> i64 {
        match self {
            TableId::NetworksBranches => 0x5245_4445_0001,
            TableId::Employees => 0x5245_4445_0002,
        }
    }
}

// ---
// 2. ActiveStatus (ATIVO / INATIVO)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActiveStatus {
    Ativo,
    Inativo,
}

impl ActiveStatus {
    /// Normaliza as grafias aceitas nas planilhas.
    /// Retorna `None` quando o texto não pertence a nenhuma das famílias.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "ATIVO" | "ATIVA" | "SIM" | "S" | "TRUE" | "1" => Some(ActiveStatus::Ativo),
            "INATIVO" | "INATIVA" | "NÃO" | "NAO" | "N" | "FALSE" | "0" => {
                Some(ActiveStatus::Inativo)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveStatus::Ativo => "ATIVO",
            ActiveStatus::Inativo => "INATIVO",
        }
    }
}

// ---
// 3. Linhas persistidas
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkBranch {
    pub id: Uuid,
    pub nome_rede: String,
    pub nome_filial: String,
    #[schema(example = "ATIVO")]
    pub ativo: String,
    #[schema(value_type = String, format = Date, example = "2024-01-10")]
    pub data_inicio: NaiveDate,
    pub codigo_rede: Option<String>,
    pub codigo_filial: Option<String>,
    pub cidade: Option<String>,
    pub estado: Option<String>,
    pub regiao: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub colaborador: String,
    pub filial: String,
    pub rede: String,
    #[schema(example = "ATIVO")]
    pub ativo: String,
    #[schema(value_type = String, format = Date, example = "2024-02-01")]
    pub data_cadastro: NaiveDate,
    pub codigo_colaborador: Option<String>,
    pub cargo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 4. Linhas normalizadas (saída do validador, entrada do writer)
// ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNetworkBranch {
    pub nome_rede: String,
    pub nome_filial: String,
    pub ativo: ActiveStatus,
    pub data_inicio: NaiveDate,
    pub codigo_rede: Option<String>,
    pub codigo_filial: Option<String>,
    pub cidade: Option<String>,
    pub estado: Option<String>,
    pub regiao: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub colaborador: String,
    pub filial: String,
    pub rede: String,
    pub ativo: ActiveStatus,
    pub data_cadastro: NaiveDate,
    pub codigo_colaborador: Option<String>,
    pub cargo: Option<String>,
}

// ---
// 5. BranchSnapshot (leitura consistente de networks_branches)
// ---
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, FromRow)]
pub struct BranchRef {
    pub nome_rede: String,
    pub nome_filial: String,
    pub codigo_rede: Option<String>,
    pub codigo_filial: Option<String>,
}

/// Foto somente-leitura das filiais persistidas, usada para validar
/// as referências dos colaboradores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSnapshot {
    entries: Vec<BranchRef>,
    pairs: HashSet<(String, String)>,
    by_code: HashMap<String, Vec<usize>>,
}

impl BranchSnapshot {
    pub fn new(mut entries: Vec<BranchRef>) -> Self {
        // Ordenado para que duas leituras do mesmo conteúdo sejam iguais
        entries.sort();

        let pairs = entries
            .iter()
            .map(|e| (e.nome_filial.clone(), e.nome_rede.clone()))
            .collect();

        let mut by_code: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            if let Some(code) = &entry.codigo_filial {
                by_code.entry(code.to_uppercase()).or_default().push(idx);
            }
        }

        Self { entries, pairs, by_code }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// O par (filial, rede) existe exatamente como informado?
    pub fn contains(&self, filial: &str, rede: &str) -> bool {
        self.pairs.contains(&(filial.to_string(), rede.to_string()))
    }

    /// Busca pela chave codificada. Quando `codigo_rede` é informado,
    /// a filial também precisa pertencer a essa rede.
    pub fn find_by_code(&self, codigo_filial: &str, codigo_rede: Option<&str>) -> Option<&BranchRef> {
        self.by_code
            .get(&codigo_filial.to_uppercase())?
            .iter()
            .map(|&idx| &self.entries[idx])
            .find(|entry| match codigo_rede {
                Some(rede) => entry
                    .codigo_rede
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(rede)),
                None => true,
            })
    }
}

// ---
// 6. Histórico de importações
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub id: Uuid,
    #[schema(example = "redes_filiais")]
    pub import_type: String,
    pub filename: Option<String>,
    pub row_count: i32,
    pub imported_at: DateTime<Utc>,
}

/// Resposta de um upload que chegou até o commit.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub table: TableId,
    pub import_id: Uuid,
    pub rows_committed: usize,
    pub committed_at: DateTime<Utc>,
}

// Estados de um upload. Só usados para log: não existe retomada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Received,
    HeaderResolved,
    RowsValidated,
    Committed,
    HeaderRejected,
    ValidationFailed,
}
