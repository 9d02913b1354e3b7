pub mod import_repo;
pub use import_repo::{ImportRepository, ImportStore, ReplaceLoad, TableRows};

#[cfg(test)]
pub mod memory_repo;
