// src/data_input/mod.rs

pub mod csv_export;
pub mod log_data;
pub mod log_import;
pub mod log_parser;
