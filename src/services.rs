pub mod header_resolver;
pub mod import_service;
pub mod layouts;
pub mod row_validator;
pub mod workbook;

pub use import_service::ImportService;
