// src/db/memory_repo.rs

// ImportStore em memória para os testes de serviço.
// Segue as mesmas regras do Postgres: um escritor por vez, troca atômica
// no final e falhas injetáveis no meio da gravação.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::import_repo::{ImportStore, ReplaceLoad, TableRows},
    models::import::{BranchRef, BranchSnapshot, Employee, ImportRecord, NetworkBranch},
};

#[derive(Debug, Default, Clone)]
struct Tables {
    networks_branches: Vec<NetworkBranch>,
    employees: Vec<Employee>,
    history: Vec<ImportRecord>,
}

#[derive(Default)]
pub struct MemoryImportStore {
    tables: RwLock<Tables>,
    // Falha depois de N linhas gravadas no próximo replace
    fail_after_rows: Mutex<Option<usize>>,
}

impl MemoryImportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_replace_after(&self, rows: usize) {
        *self.fail_after_rows.lock().unwrap() = Some(rows);
    }

    fn snapshot_of(tables: &Tables) -> BranchSnapshot {
        BranchSnapshot::new(
            tables
                .networks_branches
                .iter()
                .map(|nb| BranchRef {
                    nome_rede: nb.nome_rede.clone(),
                    nome_filial: nb.nome_filial.clone(),
                    codigo_rede: nb.codigo_rede.clone(),
                    codigo_filial: nb.codigo_filial.clone(),
                })
                .collect(),
        )
    }

    fn injected_fault(written: usize, fail_after: Option<usize>) -> Result<(), AppError> {
        match fail_after {
            Some(limit) if written >= limit => Err(AppError::StorageCommitError(sqlx::Error::Protocol(
                "falha simulada durante o INSERT".into(),
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ImportStore for MemoryImportStore {
    async fn branch_snapshot(&self) -> Result<BranchSnapshot, AppError> {
        Ok(Self::snapshot_of(&*self.tables.read().await))
    }

    async fn replace_all(&self, load: ReplaceLoad) -> Result<ImportRecord, AppError> {
        // O write lock serializa os escritores e esconde o estado intermediário
        let mut tables = self.tables.write().await;
        let fail_after = self.fail_after_rows.lock().unwrap().take();

        let table = load.rows.table();
        let row_count = load.rows.len();
        let now = Utc::now();
        let mut staged = tables.clone();

        match load.rows {
            TableRows::NetworksBranches(rows) => {
                staged.networks_branches.clear();
                for (written, row) in rows.into_iter().enumerate() {
                    Self::injected_fault(written, fail_after)?;
                    staged.networks_branches.push(NetworkBranch {
                        id: Uuid::new_v4(),
                        nome_rede: row.nome_rede,
                        nome_filial: row.nome_filial,
                        ativo: row.ativo.as_str().to_string(),
                        data_inicio: row.data_inicio,
                        codigo_rede: row.codigo_rede,
                        codigo_filial: row.codigo_filial,
                        cidade: row.cidade,
                        estado: row.estado,
                        regiao: row.regiao,
                        created_at: now,
                        updated_at: now,
                    });
                }
            }
            TableRows::Employees { rows, validated_against } => {
                if Self::snapshot_of(&tables) != validated_against {
                    return Err(AppError::ReferenceSnapshotChanged);
                }
                staged.employees.clear();
                for (written, row) in rows.into_iter().enumerate() {
                    Self::injected_fault(written, fail_after)?;
                    staged.employees.push(Employee {
                        id: Uuid::new_v4(),
                        colaborador: row.colaborador,
                        filial: row.filial,
                        rede: row.rede,
                        ativo: row.ativo.as_str().to_string(),
                        data_cadastro: row.data_cadastro,
                        codigo_colaborador: row.codigo_colaborador,
                        cargo: row.cargo,
                        created_at: now,
                        updated_at: now,
                    });
                }
            }
        }

        let record = ImportRecord {
            id: Uuid::new_v4(),
            import_type: table.import_type().to_string(),
            filename: load.filename,
            row_count: row_count as i32,
            imported_at: now,
        };
        staged.history.push(record.clone());

        *tables = staged;
        Ok(record)
    }

    async fn list_networks_branches(&self) -> Result<Vec<NetworkBranch>, AppError> {
        Ok(self.tables.read().await.networks_branches.clone())
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, AppError> {
        Ok(self.tables.read().await.employees.clone())
    }

    async fn recent_imports(&self, limit: i64) -> Result<Vec<ImportRecord>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .history
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
