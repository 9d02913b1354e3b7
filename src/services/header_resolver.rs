// src/services/header_resolver.rs

use std::collections::HashMap;

use crate::common::error::{AppError, MissingColumn};

// =========================================================================
//  DEFINIÇÃO DOS CAMPOS
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
    /// Pelo menos um dos campos com o mesmo grupo precisa existir.
    AnyOf(&'static str),
}

/// Um campo canônico e todas as grafias de cabeçalho que o identificam.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub spellings: &'static [&'static str],
    pub requirement: Requirement,
}

impl FieldSpec {
    pub const fn required(name: &'static str, spellings: &'static [&'static str]) -> Self {
        Self { name, spellings, requirement: Requirement::Required }
    }

    pub const fn optional(name: &'static str, spellings: &'static [&'static str]) -> Self {
        Self { name, spellings, requirement: Requirement::Optional }
    }

    pub const fn any_of(group: &'static str, name: &'static str, spellings: &'static [&'static str]) -> Self {
        Self { name, spellings, requirement: Requirement::AnyOf(group) }
    }
}

// =========================================================================
//  RESULTADO
// =========================================================================

/// Campo canônico -> índice da coluna na planilha.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    positions: HashMap<&'static str, usize>,
}

impl HeaderMap {
    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }

    #[cfg(test)]
    pub fn has(&self, field: &str) -> bool {
        self.positions.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }
}

/// "  Nome_da   FILIAL " -> "nome da filial"
pub fn normalize_header(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Mapeia os cabeçalhos encontrados para os campos canônicos.
///
/// A ordem das colunas é livre e colunas desconhecidas são ignoradas.
/// Se algum campo obrigatório (ou grupo) ficar sem coluna, todos os
/// faltantes são devolvidos de uma vez em `MissingColumnError`.
pub fn resolve_headers(headers: &[String], fields: &[FieldSpec]) -> Result<HeaderMap, AppError> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let mut positions = HashMap::new();
    for field in fields {
        let accepted: Vec<String> = field.spellings.iter().map(|s| normalize_header(s)).collect();
        // A coluna mais à esquerda vence quando há repetição
        if let Some(idx) = normalized.iter().position(|h| accepted.contains(h)) {
            positions.insert(field.name, idx);
        }
    }

    let mut missing = Vec::new();
    let mut groups_seen: Vec<&'static str> = Vec::new();

    for field in fields {
        match field.requirement {
            Requirement::Optional => {}
            Requirement::Required => {
                if !positions.contains_key(field.name) {
                    missing.push(MissingColumn {
                        field: field.name.to_string(),
                        accepted: field.spellings.iter().map(|s| s.to_string()).collect(),
                    });
                }
            }
            Requirement::AnyOf(group) => {
                if groups_seen.contains(&group) {
                    continue;
                }
                groups_seen.push(group);

                let members: Vec<&FieldSpec> = fields
                    .iter()
                    .filter(|f| f.requirement == Requirement::AnyOf(group))
                    .collect();

                if !members.iter().any(|f| positions.contains_key(f.name)) {
                    missing.push(MissingColumn {
                        field: members.iter().map(|f| f.name).collect::<Vec<_>>().join(" | "),
                        accepted: members
                            .iter()
                            .flat_map(|f| f.spellings.iter().map(|s| s.to_string()))
                            .collect(),
                    });
                }
            }
        }
    }

    if !missing.is_empty() {
        return Err(AppError::MissingColumnError(missing));
    }

    Ok(HeaderMap { positions })
}
