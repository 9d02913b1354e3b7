// src/handlers.rs

pub mod imports;
pub mod tables;
