// src/error.rs

use thiserror::Error;

/// Errors raised while reading, cropping, or analysing flight logs.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything the ULog decoder rejects: bad magic, malformed definitions, unknown types.
    #[error("ULog decoding failed: {0}")]
    Decode(String),

    #[error("Topic '{0}' not found in log")]
    MissingTopic(String),

    #[error("Field '{field}' not found in topic '{topic}'")]
    MissingField { topic: String, field: String },

    /// Crop window is empty or inverted.
    #[error("Invalid crop window [{start_us}, {end_us}] us: {reason}")]
    InvalidWindow {
        start_us: u64,
        end_us: u64,
        reason: String,
    },

    #[error("Invalid resample step: {0} s")]
    InvalidResampleStep(f64),

    #[error("Cannot interpolate {0}: series has no samples")]
    EmptySeries(String),

    #[error("Metrics unavailable for '{0}': neither position nor attitude sources present")]
    NoMetricSources(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Helpers for the errors raised most often by the analysis code.
pub mod helpers {
    use super::AnalysisError;

    pub fn missing_field(topic: impl Into<String>, field: impl Into<String>) -> AnalysisError {
        AnalysisError::MissingField {
            topic: topic.into(),
            field: field.into(),
        }
    }

    pub fn invalid_window(start_us: u64, end_us: u64, reason: impl Into<String>) -> AnalysisError {
        AnalysisError::InvalidWindow {
            start_us,
            end_us,
            reason: reason.into(),
        }
    }
}
