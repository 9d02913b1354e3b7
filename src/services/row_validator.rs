// src/services/row_validator.rs

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    common::error::{AppError, RowError},
    models::import::{ActiveStatus, BranchSnapshot, NewEmployee, NewNetworkBranch},
    services::{
        header_resolver::HeaderMap,
        workbook::{CellValue, RawRow},
    },
};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

// =========================================================================
//  LINHA CANÔNICA
// =========================================================================

/// Uma linha da planilha vista pelos nomes canônicos dos campos.
struct CanonicalRow<'a> {
    row: &'a RawRow,
    headers: &'a HeaderMap,
}

impl<'a> CanonicalRow<'a> {
    fn new(row: &'a RawRow, headers: &'a HeaderMap) -> Self {
        Self { row, headers }
    }

    fn line(&self) -> usize {
        self.row.line
    }

    fn cell(&self, field: &str) -> &CellValue {
        match self.headers.position(field) {
            Some(idx) => self.row.cell(idx),
            None => &CellValue::Empty,
        }
    }

    fn text(&self, field: &str) -> Option<String> {
        self.cell(field).as_text()
    }

    fn required_text(&self, field: &str, errors: &mut Vec<RowError>) -> Option<String> {
        let value = self.text(field);
        if value.is_none() {
            errors.push(RowError::EmptyRequiredField { line: self.line(), field: field.to_string() });
        }
        value
    }

    fn required_status(&self, field: &str, errors: &mut Vec<RowError>) -> Option<ActiveStatus> {
        match parse_status(self.cell(field)) {
            Ok(Some(status)) => Some(status),
            Ok(None) => {
                errors.push(RowError::EmptyRequiredField { line: self.line(), field: field.to_string() });
                None
            }
            Err(value) => {
                errors.push(RowError::InvalidStatusValue { line: self.line(), field: field.to_string(), value });
                None
            }
        }
    }

    fn optional_status(&self, field: &str, errors: &mut Vec<RowError>) -> Option<ActiveStatus> {
        match parse_status(self.cell(field)) {
            Ok(status) => status,
            Err(value) => {
                errors.push(RowError::InvalidStatusValue { line: self.line(), field: field.to_string(), value });
                None
            }
        }
    }

    /// Data vazia cai na data do upload.
    fn date_or(&self, field: &str, default: NaiveDate, errors: &mut Vec<RowError>) -> Option<NaiveDate> {
        match parse_date(self.cell(field)) {
            Ok(Some(date)) => Some(date),
            Ok(None) => Some(default),
            Err(value) => {
                errors.push(RowError::InvalidDateFormat { line: self.line(), field: field.to_string(), value });
                None
            }
        }
    }
}

// =========================================================================
//  CONVERSÕES DE CÉLULA
// =========================================================================

/// `Ok(None)` para célula vazia, `Err(texto)` para valor fora das famílias aceitas.
pub fn parse_status(cell: &CellValue) -> Result<Option<ActiveStatus>, String> {
    match cell {
        CellValue::Empty => Ok(None),
        CellValue::Bool(true) => Ok(Some(ActiveStatus::Ativo)),
        CellValue::Bool(false) => Ok(Some(ActiveStatus::Inativo)),
        other => {
            let raw = other.as_text().unwrap_or_default();
            ActiveStatus::parse(&raw).map(Some).ok_or(raw)
        }
    }
}

pub fn parse_date(cell: &CellValue) -> Result<Option<NaiveDate>, String> {
    match cell {
        CellValue::Empty => Ok(None),
        CellValue::Date(date) => Ok(Some(*date)),
        CellValue::Text(raw) => {
            let raw = raw.trim();
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .or_else(|| {
                    DATETIME_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                        .map(|dt| dt.date())
                })
                .map(Some)
                .ok_or_else(|| raw.to_string())
        }
        // Números soltos não são datas: o Excel marca células de data como tal
        other => Err(other.as_text().unwrap_or_default()),
    }
}

// =========================================================================
//  CHAVES DUPLICADAS
// =========================================================================

/// Acumula chave -> linhas, preservando a ordem da primeira ocorrência.
#[derive(Default)]
struct KeyTracker {
    order: Vec<String>,
    lines: HashMap<String, Vec<usize>>,
}

impl KeyTracker {
    fn record(&mut self, key: String, line: usize) {
        let entry = self.lines.entry(key.clone()).or_default();
        if entry.is_empty() {
            self.order.push(key);
        }
        entry.push(line);
    }

    fn into_errors(mut self) -> Vec<RowError> {
        self.order
            .into_iter()
            .filter_map(|key| {
                let lines = self.lines.remove(&key)?;
                (lines.len() > 1).then_some(RowError::DuplicateKey { key, lines })
            })
            .collect()
    }
}

fn finish<T>(rows: Vec<T>, mut errors: Vec<RowError>, keys: KeyTracker) -> Result<Vec<T>, AppError> {
    errors.extend(keys.into_errors());
    if errors.is_empty() {
        return Ok(rows);
    }
    // Ordem estável por linha para o relatório
    errors.sort_by_key(RowError::line);
    Err(AppError::ValidationFailed(errors))
}

// =========================================================================
//  REDES E FILIAIS
// =========================================================================

/// Valida a planilha de redes/filiais inteira.
///
/// Ou devolve todas as linhas normalizadas, ou todos os erros encontrados.
pub fn validate_networks_branches(
    rows: &[RawRow],
    headers: &HeaderMap,
    upload_date: NaiveDate,
) -> Result<Vec<NewNetworkBranch>, AppError> {
    let mut errors = Vec::new();
    let mut keys = KeyTracker::default();
    let mut valid = Vec::with_capacity(rows.len());

    for raw in rows {
        let row = CanonicalRow::new(raw, headers);
        let errors_before = errors.len();

        let nome_filial = row.required_text("nome_filial", &mut errors);
        let ativo = row.required_status("ativo", &mut errors);
        let status_rede = row.optional_status("status_rede", &mut errors);
        let data_inicio = row.date_or("data_inicio", upload_date, &mut errors);

        // Filial independente é a própria rede
        let nome_rede = row.text("nome_rede").or_else(|| nome_filial.clone());
        let codigo_filial = row.text("codigo_filial");

        // A chave entra no rastreio mesmo quando a linha tem outros erros
        let key = match (&codigo_filial, &nome_rede, &nome_filial) {
            (Some(code), _, _) => Some(code.to_uppercase()),
            (None, Some(rede), Some(filial)) => Some(format!("{} / {}", rede.to_uppercase(), filial.to_uppercase())),
            _ => None,
        };
        if let Some(key) = key {
            keys.record(key, row.line());
        }

        if errors.len() > errors_before {
            continue;
        }
        let (Some(nome_filial), Some(nome_rede), Some(ativo), Some(data_inicio)) =
            (nome_filial, nome_rede, ativo, data_inicio)
        else {
            continue;
        };

        // Rede inativa desativa a filial
        let ativo = match status_rede {
            Some(ActiveStatus::Inativo) => ActiveStatus::Inativo,
            _ => ativo,
        };

        valid.push(NewNetworkBranch {
            nome_rede,
            nome_filial,
            ativo,
            data_inicio,
            codigo_rede: row.text("codigo_rede"),
            codigo_filial,
            cidade: row.text("cidade"),
            estado: row.text("estado"),
            regiao: row.text("regiao"),
        });
    }

    finish(valid, errors, keys)
}

// =========================================================================
//  COLABORADORES
// =========================================================================

/// Valida a planilha de colaboradores contra a foto de filiais persistidas.
pub fn validate_employees(
    rows: &[RawRow],
    headers: &HeaderMap,
    branches: &BranchSnapshot,
    upload_date: NaiveDate,
) -> Result<Vec<NewEmployee>, AppError> {
    let mut errors = Vec::new();
    let mut keys = KeyTracker::default();
    let mut valid = Vec::with_capacity(rows.len());

    for raw in rows {
        let row = CanonicalRow::new(raw, headers);
        let errors_before = errors.len();

        let colaborador = row.required_text("colaborador", &mut errors);
        let ativo = row.required_status("ativo", &mut errors);
        let data_cadastro = row.date_or("data_cadastro", upload_date, &mut errors);

        // (filial, rede) da linha. Código sem filial na base devolve os próprios
        // códigos: servem só para a chave, a linha já tem erro registrado.
        let reference = match row.text("codigo_filial") {
            Some(codigo_filial) => {
                let codigo_rede = row.text("codigo_rede");
                match branches.find_by_code(&codigo_filial, codigo_rede.as_deref()) {
                    Some(branch) => Some((branch.nome_filial.clone(), branch.nome_rede.clone())),
                    None => {
                        errors.push(RowError::UnknownBranchCode {
                            line: row.line(),
                            codigo_filial: codigo_filial.clone(),
                            codigo_rede: codigo_rede.clone(),
                        });
                        Some((codigo_filial, codigo_rede.unwrap_or_default()))
                    }
                }
            }
            None => row.required_text("filial", &mut errors).map(|filial| {
                let rede = row.text("rede").unwrap_or_else(|| filial.clone());
                if !branches.contains(&filial, &rede) {
                    errors.push(RowError::ReferentialIntegrity {
                        line: row.line(),
                        filial: filial.clone(),
                        rede: rede.clone(),
                    });
                }
                (filial, rede)
            }),
        };

        let codigo_colaborador = row.text("codigo_colaborador");
        let key = match (&codigo_colaborador, &colaborador, &reference) {
            (Some(code), _, _) => Some(code.to_uppercase()),
            (None, Some(nome), Some((filial, rede))) => Some(format!(
                "{} / {} / {}",
                nome.to_uppercase(),
                filial.to_uppercase(),
                rede.to_uppercase()
            )),
            _ => None,
        };
        if let Some(key) = key {
            keys.record(key, row.line());
        }

        if errors.len() > errors_before {
            continue;
        }
        let (Some(colaborador), Some(ativo), Some(data_cadastro), Some((filial, rede))) =
            (colaborador, ativo, data_cadastro, reference)
        else {
            continue;
        };

        valid.push(NewEmployee {
            colaborador,
            filial,
            rede,
            ativo,
            data_cadastro,
            codigo_colaborador,
            cargo: row.text("cargo"),
        });
    }

    finish(valid, errors, keys)
}
