// src/services/import_service.rs

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::{
    common::error::AppError,
    db::{ImportStore, ReplaceLoad, TableRows},
    models::import::{Employee, ImportRecord, ImportSummary, NetworkBranch, TableId, UploadStage},
    services::{
        header_resolver::resolve_headers,
        layouts::{EMPLOYEE_FIELDS, NETWORK_BRANCH_FIELDS},
        row_validator::{validate_employees, validate_networks_branches},
        workbook::{read_first_sheet, RawSheet},
    },
};

#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn ImportStore>,
}

impl ImportService {
    pub fn new(store: Arc<dyn ImportStore>) -> Self {
        Self { store }
    }

    // =========================================================================
    //  UPLOADS
    // =========================================================================

    pub async fn import_networks_branches(
        &self,
        bytes: Vec<u8>,
        filename: Option<String>,
    ) -> Result<ImportSummary, AppError> {
        let sheet = Self::read_sheet(bytes).await?;
        self.import_sheet(TableId::NetworksBranches, sheet, filename, Utc::now().date_naive())
            .await
    }

    pub async fn import_employees(
        &self,
        bytes: Vec<u8>,
        filename: Option<String>,
    ) -> Result<ImportSummary, AppError> {
        let sheet = Self::read_sheet(bytes).await?;
        self.import_sheet(TableId::Employees, sheet, filename, Utc::now().date_naive())
            .await
    }

    // A leitura do xlsx é CPU pura: sai do runtime assíncrono
    async fn read_sheet(bytes: Vec<u8>) -> Result<RawSheet, AppError> {
        tokio::task::spawn_blocking(move || read_first_sheet(&bytes))
            .await
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("leitura da planilha abortada: {e}")))?
    }

    /// Received -> HeaderResolved -> RowsValidated -> Committed.
    ///
    /// Qualquer falha antes do commit deixa a tabela como estava.
    pub async fn import_sheet(
        &self,
        table: TableId,
        sheet: RawSheet,
        filename: Option<String>,
        upload_date: NaiveDate,
    ) -> Result<ImportSummary, AppError> {
        tracing::info!(
            table = table.table_name(),
            filename = filename.as_deref().unwrap_or("-"),
            rows = sheet.rows.len(),
            stage = ?UploadStage::Received,
            "Upload recebido"
        );

        let fields = match table {
            TableId::NetworksBranches => NETWORK_BRANCH_FIELDS,
            TableId::Employees => EMPLOYEE_FIELDS,
        };

        let headers = resolve_headers(&sheet.headers, fields).inspect_err(|e| {
            tracing::warn!(table = table.table_name(), stage = ?UploadStage::HeaderRejected, "{}", e);
        })?;
        tracing::debug!(table = table.table_name(), stage = ?UploadStage::HeaderResolved, columns = headers.len());

        let validated = match table {
            TableId::NetworksBranches => {
                validate_networks_branches(&sheet.rows, &headers, upload_date).map(TableRows::NetworksBranches)
            }
            TableId::Employees => {
                let snapshot = self.store.branch_snapshot().await?;
                tracing::debug!("Validando colaboradores contra {} filiais", snapshot.len());
                validate_employees(&sheet.rows, &headers, &snapshot, upload_date)
                    .map(|rows| TableRows::Employees { rows, validated_against: snapshot })
            }
        };

        let rows = validated.inspect_err(|e| {
            tracing::warn!(table = table.table_name(), stage = ?UploadStage::ValidationFailed, "{}", e);
        })?;
        tracing::debug!(table = table.table_name(), stage = ?UploadStage::RowsValidated, rows = rows.len());

        let record = self.store.replace_all(ReplaceLoad { rows, filename }).await?;

        tracing::info!(
            table = table.table_name(),
            rows = record.row_count,
            stage = ?UploadStage::Committed,
            "Tabela substituída"
        );

        Ok(ImportSummary {
            table,
            import_id: record.id,
            rows_committed: record.row_count as usize,
            committed_at: record.imported_at,
        })
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_networks_branches(&self) -> Result<Vec<NetworkBranch>, AppError> {
        self.store.list_networks_branches().await
    }

    pub async fn list_employees(&self) -> Result<Vec<Employee>, AppError> {
        self.store.list_employees().await
    }

    pub async fn recent_imports(&self, limit: i64) -> Result<Vec<ImportRecord>, AppError> {
        self.store.recent_imports(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::error::RowError,
        db::memory_repo::MemoryImportStore,
        models::import::BranchSnapshot,
        services::workbook::tests::xlsx,
    };

    fn service() -> (ImportService, Arc<MemoryImportStore>) {
        let store = Arc::new(MemoryImportStore::new());
        (ImportService::new(store.clone()), store)
    }

    fn networks_file(rows: &[&[Option<&str>]]) -> Vec<u8> {
        let header: &[Option<&str>] = &[Some("Nome da Filial"), Some("Nome da Rede"), Some("Ativa"), Some("Data de Início")];
        let mut all = vec![header];
        all.extend_from_slice(rows);
        xlsx(&all)
    }

    fn employees_file(rows: &[&[Option<&str>]]) -> Vec<u8> {
        let header: &[Option<&str>] =
            &[Some("Colaborador"), Some("Filial"), Some("Rede"), Some("Ativo"), Some("Data de Cadastro")];
        let mut all = vec![header];
        all.extend_from_slice(rows);
        xlsx(&all)
    }

    fn content(rows: &[NetworkBranch]) -> Vec<(String, String, String)> {
        let mut out: Vec<_> = rows
            .iter()
            .map(|r| (r.nome_rede.clone(), r.nome_filial.clone(), r.ativo.clone()))
            .collect();
        out.sort();
        out
    }

    #[tokio::test]
    async fn loja_centro_scenario_commits_both_files() {
        let (service, _) = service();

        let summary = service
            .import_networks_branches(
                networks_file(&[&[Some("Loja Centro"), None, Some("SIM"), Some("2024-01-10")]]),
                Some("redes.xlsx".into()),
            )
            .await
            .unwrap();
        assert_eq!(summary.table, TableId::NetworksBranches);
        assert_eq!(summary.rows_committed, 1);

        let branches = service.list_networks_branches().await.unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].nome_rede, "Loja Centro");
        assert_eq!(branches[0].nome_filial, "Loja Centro");
        assert_eq!(branches[0].ativo, "ATIVO");
        assert_eq!(branches[0].data_inicio, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(branches[0].created_at, branches[0].updated_at);

        let summary = service
            .import_employees(
                employees_file(&[&[Some("Ana"), Some("Loja Centro"), Some("Loja Centro"), Some("ATIVO"), Some("2024-02-01")]]),
                Some("colaboradores.xlsx".into()),
            )
            .await
            .unwrap();
        assert_eq!(summary.table, TableId::Employees);

        let employees = service.list_employees().await.unwrap();
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0].filial, "Loja Centro");

        let history = service.recent_imports(10).await.unwrap();
        let types: Vec<_> = history.iter().map(|h| h.import_type.as_str()).collect();
        assert_eq!(types, vec!["colaboradores", "redes_filiais"]);
        assert_eq!(history[1].filename.as_deref(), Some("redes.xlsx"));
    }

    #[tokio::test]
    async fn uploading_same_file_twice_replaces_instead_of_appending() {
        let (service, _) = service();
        let file = networks_file(&[
            &[Some("Filial A"), Some("Rede 1"), Some("ATIVA"), None],
            &[Some("Filial B"), Some("Rede 1"), Some("INATIVA"), None],
        ]);

        service.import_networks_branches(file.clone(), None).await.unwrap();
        let once = content(&service.list_networks_branches().await.unwrap());

        service.import_networks_branches(file, None).await.unwrap();
        let twice = content(&service.list_networks_branches().await.unwrap());

        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn storage_failure_mid_commit_keeps_previous_table() {
        let (service, store) = service();
        service
            .import_networks_branches(networks_file(&[&[Some("Filial A"), Some("Rede 1"), Some("SIM"), None]]), None)
            .await
            .unwrap();
        let before = content(&service.list_networks_branches().await.unwrap());

        store.fail_next_replace_after(2);
        let err = service
            .import_networks_branches(
                networks_file(&[
                    &[Some("Filial X"), Some("Rede 2"), Some("SIM"), None],
                    &[Some("Filial Y"), Some("Rede 2"), Some("SIM"), None],
                    &[Some("Filial Z"), Some("Rede 2"), Some("SIM"), None],
                ]),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::StorageCommitError(_)));
        assert_eq!(content(&service.list_networks_branches().await.unwrap()), before);
        assert_eq!(service.recent_imports(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn employee_with_unknown_branch_commits_nothing() {
        let (service, _) = service();
        service
            .import_networks_branches(networks_file(&[&[Some("Loja Centro"), None, Some("SIM"), None]]), None)
            .await
            .unwrap();
        service
            .import_employees(employees_file(&[&[Some("Ana"), Some("Loja Centro"), None, Some("SIM"), None]]), None)
            .await
            .unwrap();

        let err = service
            .import_employees(
                employees_file(&[
                    &[Some("Bia"), Some("Loja Centro"), None, Some("SIM"), None],
                    &[Some("Caio"), Some("Loja Sul"), Some("Rede Sul"), Some("SIM"), None],
                ]),
                None,
            )
            .await
            .unwrap_err();

        match err {
            AppError::ValidationFailed(errors) => assert_eq!(
                errors,
                vec![RowError::ReferentialIntegrity { line: 3, filial: "Loja Sul".into(), rede: "Rede Sul".into() }]
            ),
            other => panic!("erro inesperado: {other:?}"),
        }

        let employees = service.list_employees().await.unwrap();
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0].colaborador, "Ana");
    }

    #[tokio::test]
    async fn employees_before_networks_are_rejected() {
        let (service, _) = service();
        let err = service
            .import_employees(employees_file(&[&[Some("Ana"), Some("Loja Centro"), None, Some("SIM"), None]]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
        assert!(service.list_employees().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_header_rejects_without_touching_table() {
        let (service, _) = service();
        service
            .import_networks_branches(networks_file(&[&[Some("Filial A"), None, Some("SIM"), None]]), None)
            .await
            .unwrap();

        let bad = xlsx(&[&[Some("Rede"), Some("Cidade")], &[Some("R"), Some("SP")]]);
        let err = service.import_networks_branches(bad, None).await.unwrap_err();
        match err {
            AppError::MissingColumnError(missing) => {
                let fields: Vec<_> = missing.iter().map(|m| m.field.as_str()).collect();
                assert_eq!(fields, vec!["nome_filial", "ativo"]);
            }
            other => panic!("erro inesperado: {other:?}"),
        }
        assert_eq!(service.list_networks_branches().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_snapshot_is_rejected_at_commit() {
        let (service, store) = service();
        service
            .import_networks_branches(networks_file(&[&[Some("Loja Centro"), None, Some("SIM"), None]]), None)
            .await
            .unwrap();

        // Validado contra uma foto que não corresponde mais à tabela
        let stale = BranchSnapshot::default();
        let err = store
            .replace_all(ReplaceLoad {
                rows: TableRows::Employees { rows: vec![], validated_against: stale },
                filename: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReferenceSnapshotChanged));
    }

    #[tokio::test]
    async fn concurrent_replaces_never_mix_rows() {
        let (service, _) = service();
        let file_a = networks_file(&[
            &[Some("A1"), Some("Rede A"), Some("SIM"), None],
            &[Some("A2"), Some("Rede A"), Some("SIM"), None],
        ]);
        let file_b = networks_file(&[
            &[Some("B1"), Some("Rede B"), Some("SIM"), None],
            &[Some("B2"), Some("Rede B"), Some("SIM"), None],
            &[Some("B3"), Some("Rede B"), Some("SIM"), None],
        ]);

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            let file = if i % 2 == 0 { file_a.clone() } else { file_b.clone() };
            handles.push(tokio::spawn(async move { service.import_networks_branches(file, None).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let rows = service.list_networks_branches().await.unwrap();
        let redes: std::collections::HashSet<_> = rows.iter().map(|r| r.nome_rede.as_str()).collect();
        assert_eq!(redes.len(), 1);
        assert!(rows.len() == 2 || rows.len() == 3);
    }
}
