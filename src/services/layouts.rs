// src/services/layouts.rs

// Layouts de cabeçalho das duas planilhas.
// Cada campo aceita tanto o vocabulário "nomeado" (Nome da Filial, Ativa, ...)
// quanto o "codificado" (codigo_filial, status_filial, ...).

use super::header_resolver::FieldSpec;

pub const NETWORK_BRANCH_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("nome_filial", &["Nome da Filial", "nome_filial", "Filial"]),
    FieldSpec::optional("nome_rede", &["Nome da Rede", "nome_rede", "Rede"]),
    FieldSpec::required("ativo", &["Ativa", "Ativo", "status_filial", "Status", "Status da Filial"]),
    FieldSpec::optional("status_rede", &["status_rede", "Status da Rede"]),
    FieldSpec::optional(
        "data_inicio",
        &["Data de Início", "Data de Inicio", "data_inicio", "Data Início", "Início da Parceria"],
    ),
    FieldSpec::optional("codigo_rede", &["codigo_rede", "Código da Rede", "Codigo da Rede"]),
    FieldSpec::optional("codigo_filial", &["codigo_filial", "Código da Filial", "Codigo da Filial"]),
    FieldSpec::optional("cidade", &["cidade"]),
    FieldSpec::optional("estado", &["estado", "UF"]),
    FieldSpec::optional("regiao", &["regiao", "região"]),
];

pub const EMPLOYEE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("colaborador", &["Colaborador", "nome", "Nome do Colaborador"]),
    FieldSpec::any_of("filial", "filial", &["Filial", "nome_filial", "Nome da Filial"]),
    FieldSpec::any_of("filial", "codigo_filial", &["codigo_filial", "Código da Filial", "Codigo da Filial"]),
    FieldSpec::optional("rede", &["Rede", "nome_rede", "Nome da Rede"]),
    FieldSpec::optional("codigo_rede", &["codigo_rede", "Código da Rede", "Codigo da Rede"]),
    FieldSpec::required("ativo", &["Ativo", "Ativa", "status"]),
    FieldSpec::optional("data_cadastro", &["Data de Cadastro", "data_cadastro"]),
    FieldSpec::optional(
        "codigo_colaborador",
        &["codigo_colaborador", "Código do Colaborador", "Codigo do Colaborador"],
    ),
    FieldSpec::optional("cargo", &["cargo"]),
];
