// src/services/workbook.rs

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;

use crate::common::error::AppError;

// =========================================================================
//  CÉLULAS
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Representação textual da célula (sempre sem espaços nas pontas).
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            // 1.0 -> "1" (códigos numéricos digitados no Excel)
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Bool(b) => Some(if *b { "TRUE".into() } else { "FALSE".into() }),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(trimmed.to_string())
                }
            }
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            // Durações ficam como número; o calamine resolve o sistema 1900/1904
            Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) => CellValue::Date(datetime.date()),
                None => CellValue::Number(dt.as_f64()),
            },
            Data::Error(e) => CellValue::Text(format!("#{e:?}")),
        }
    }
}

// =========================================================================
//  PLANILHA
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Número da linha como o usuário vê no Excel (1 = primeira linha).
    pub line: usize,
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn cell(&self, idx: usize) -> &CellValue {
        self.cells.get(idx).unwrap_or(&CellValue::Empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Lê a primeira aba de um arquivo xlsx/xls/ods recebido em memória.
pub fn read_first_sheet(bytes: &[u8]) -> Result<RawSheet, AppError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AppError::InvalidWorkbook(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(AppError::EmptyWorkbook)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| AppError::InvalidWorkbook(e.to_string()))?;

    // O range começa na primeira célula usada, não necessariamente em A1
    let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);

    let mut rows_iter = range.rows().enumerate();

    let headers = loop {
        match rows_iter.next() {
            Some((_, row)) if row.iter().all(|c| CellValue::from(c).is_empty()) => continue,
            Some((_, row)) => {
                break row
                    .iter()
                    .map(|c| CellValue::from(c).as_text().unwrap_or_default())
                    .collect::<Vec<_>>();
            }
            None => return Err(AppError::EmptyWorkbook),
        }
    };

    let rows = rows_iter
        .map(|(idx, row)| RawRow {
            line: first_line + idx,
            cells: row.iter().map(CellValue::from).collect(),
        })
        // Linhas totalmente em branco (comuns no fim das exportações) são ignoradas
        .filter(|row| !row.cells.iter().all(CellValue::is_empty))
        .collect();

    tracing::debug!("Aba '{}' lida: {} colunas de cabeçalho", sheet_name, headers.len());

    Ok(RawSheet { sheet_name, headers, rows })
}
