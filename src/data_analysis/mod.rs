// src/data_analysis/mod.rs

pub mod crop;
pub mod flight_modes;
pub mod group_summary;
pub mod hover_metrics;
pub mod interpolation;
pub mod quaternion;
