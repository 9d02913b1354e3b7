// src/db/import_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::import::{
        BranchRef, BranchSnapshot, Employee, ImportRecord, NetworkBranch, NewEmployee,
        NewNetworkBranch, TableId,
    },
};

// Limite de parâmetros do Postgres é 65535; 1000 linhas por INSERT fica folgado.
const INSERT_CHUNK: usize = 1000;

// =========================================================================
//  CONTRATO
// =========================================================================

/// Linhas já validadas, marcadas com a tabela que vão substituir.
#[derive(Debug, Clone)]
pub enum TableRows {
    NetworksBranches(Vec<NewNetworkBranch>),
    Employees {
        rows: Vec<NewEmployee>,
        /// Foto das filiais usada na validação. O commit só acontece
        /// se a tabela ainda estiver igual a ela.
        validated_against: BranchSnapshot,
    },
}

impl TableRows {
    pub fn table(&self) -> TableId {
        match self {
            TableRows::NetworksBranches(_) => TableId::NetworksBranches,
            TableRows::Employees { .. } => TableId::Employees,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TableRows::NetworksBranches(rows) => rows.len(),
            TableRows::Employees { rows, .. } => rows.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplaceLoad {
    pub rows: TableRows,
    pub filename: Option<String>,
}

/// Armazenamento das tabelas alimentadas por upload.
///
/// `replace_all` é atômico: quem lê vê a tabela antiga inteira ou a nova
/// inteira. Dois replaces da mesma tabela nunca se intercalam.
#[async_trait]
pub trait ImportStore: Send + Sync {
    async fn branch_snapshot(&self) -> Result<BranchSnapshot, AppError>;

    async fn replace_all(&self, load: ReplaceLoad) -> Result<ImportRecord, AppError>;

    async fn list_networks_branches(&self) -> Result<Vec<NetworkBranch>, AppError>;

    async fn list_employees(&self) -> Result<Vec<Employee>, AppError>;

    async fn recent_imports(&self, limit: i64) -> Result<Vec<ImportRecord>, AppError>;
}

// =========================================================================
//  POSTGRES
// =========================================================================

#[derive(Clone)]
pub struct ImportRepository {
    pool: PgPool,
}

impl ImportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_snapshot<'e, E>(executor: E) -> Result<BranchSnapshot, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let refs = sqlx::query_as::<_, BranchRef>(
            r#"
            SELECT nome_rede, nome_filial, codigo_rede, codigo_filial
            FROM networks_branches
            "#,
        )
            .fetch_all(executor)
            .await?;

        Ok(BranchSnapshot::new(refs))
    }

    async fn insert_networks_branches<'e, E>(
        executor: E,
        rows: &[NewNetworkBranch],
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO networks_branches (id, nome_rede, nome_filial, ativo, data_inicio, \
             codigo_rede, codigo_filial, cidade, estado, regiao, created_at, updated_at) ",
        );
        builder.push_values(rows, |mut b, row| {
            b.push_bind(Uuid::new_v4())
                .push_bind(row.nome_rede.clone())
                .push_bind(row.nome_filial.clone())
                .push_bind(row.ativo.as_str())
                .push_bind(row.data_inicio)
                .push_bind(row.codigo_rede.clone())
                .push_bind(row.codigo_filial.clone())
                .push_bind(row.cidade.clone())
                .push_bind(row.estado.clone())
                .push_bind(row.regiao.clone())
                .push_bind(now)
                .push_bind(now);
        });
        builder.build().execute(executor).await?;
        Ok(())
    }

    async fn insert_employees<'e, E>(
        executor: E,
        rows: &[NewEmployee],
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO employees (id, colaborador, filial, rede, ativo, data_cadastro, \
             codigo_colaborador, cargo, created_at, updated_at) ",
        );
        builder.push_values(rows, |mut b, row| {
            b.push_bind(Uuid::new_v4())
                .push_bind(row.colaborador.clone())
                .push_bind(row.filial.clone())
                .push_bind(row.rede.clone())
                .push_bind(row.ativo.as_str())
                .push_bind(row.data_cadastro)
                .push_bind(row.codigo_colaborador.clone())
                .push_bind(row.cargo.clone())
                .push_bind(now)
                .push_bind(now);
        });
        builder.build().execute(executor).await?;
        Ok(())
    }

    /// A substituição completa, dentro de uma única transação.
    async fn replace_in_transaction(&self, load: ReplaceLoad) -> Result<ImportRecord, AppError> {
        let table = load.rows.table();
        let row_count = load.rows.len();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(AppError::StorageCommitError)?;

        // 1. Um escritor por tabela (liberado no commit/rollback)
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(table.lock_key())
            .execute(&mut *tx)
            .await
            .map_err(AppError::StorageCommitError)?;

        match load.rows {
            TableRows::NetworksBranches(rows) => {
                sqlx::query("DELETE FROM networks_branches")
                    .execute(&mut *tx)
                    .await
                    .map_err(AppError::StorageCommitError)?;

                for chunk in rows.chunks(INSERT_CHUNK) {
                    Self::insert_networks_branches(&mut *tx, chunk, now)
                        .await
                        .map_err(AppError::StorageCommitError)?;
                }
            }
            TableRows::Employees { rows, validated_against } => {
                // 2. Congela redes/filiais até o commit e confere a foto da validação
                sqlx::query("LOCK TABLE networks_branches IN SHARE MODE")
                    .execute(&mut *tx)
                    .await
                    .map_err(AppError::StorageCommitError)?;

                let current = Self::fetch_snapshot(&mut *tx)
                    .await
                    .map_err(AppError::StorageCommitError)?;
                if current != validated_against {
                    // `tx` é descartada aqui: rollback implícito
                    return Err(AppError::ReferenceSnapshotChanged);
                }

                sqlx::query("DELETE FROM employees")
                    .execute(&mut *tx)
                    .await
                    .map_err(AppError::StorageCommitError)?;

                for chunk in rows.chunks(INSERT_CHUNK) {
                    Self::insert_employees(&mut *tx, chunk, now)
                        .await
                        .map_err(AppError::StorageCommitError)?;
                }
            }
        }

        // 3. Histórico na mesma transação
        let record = sqlx::query_as::<_, ImportRecord>(
            r#"
            INSERT INTO import_history (id, import_type, filename, row_count, imported_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, import_type, filename, row_count, imported_at
            "#,
        )
            .bind(Uuid::new_v4())
            .bind(table.import_type())
            .bind(load.filename)
            .bind(row_count as i32)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::StorageCommitError)?;

        tx.commit().await.map_err(AppError::StorageCommitError)?;

        Ok(record)
    }
}

#[async_trait]
impl ImportStore for ImportRepository {
    async fn branch_snapshot(&self) -> Result<BranchSnapshot, AppError> {
        Ok(Self::fetch_snapshot(&self.pool).await?)
    }

    async fn replace_all(&self, load: ReplaceLoad) -> Result<ImportRecord, AppError> {
        self.replace_in_transaction(load).await
    }

    async fn list_networks_branches(&self) -> Result<Vec<NetworkBranch>, AppError> {
        let rows = sqlx::query_as::<_, NetworkBranch>(
            r#"
            SELECT id, nome_rede, nome_filial, ativo, data_inicio,
                   codigo_rede, codigo_filial, cidade, estado, regiao,
                   created_at, updated_at
            FROM networks_branches
            ORDER BY nome_rede ASC, nome_filial ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, AppError> {
        let rows = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, colaborador, filial, rede, ativo, data_cadastro,
                   codigo_colaborador, cargo, created_at, updated_at
            FROM employees
            ORDER BY rede ASC, filial ASC, colaborador ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn recent_imports(&self, limit: i64) -> Result<Vec<ImportRecord>, AppError> {
        let rows = sqlx::query_as::<_, ImportRecord>(
            r#"
            SELECT id, import_type, filename, row_count, imported_at
            FROM import_history
            ORDER BY imported_at DESC
            LIMIT $1
            "#,
        )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
