// src/config.rs

//! Analysis configuration, loaded from an optional JSON file.
//!
//! ```json
//! {
//!   "crop": { "resample_dt_s": 0.02, "start_offset_s": 5.0 },
//!   "groups": [ { "name": "baseline", "logs": ["a.ulg", "b.ulg"] } ]
//! }
//! ```
//! Omitted keys take the PX4 defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{FIELD_NAV_STATE, TOPIC_VEHICLE_STATUS};
use crate::data_analysis::crop::{default_mode_signal, CropOptions};
use crate::data_analysis::hover_metrics::MetricsSources;
use crate::data_input::log_data::FieldRef;
use crate::error::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub logs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub crop: CropOptions,
    pub sources: MetricsSources,
    /// Integer state signal shaded behind time-series plots.
    pub mode_overlay: Option<FieldRef>,
    pub groups: Vec<GroupConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            crop: CropOptions {
                mode_signal: default_mode_signal(),
                ..Default::default()
            },
            sources: MetricsSources::default(),
            mode_overlay: Some(FieldRef::new(TOPIC_VEHICLE_STATUS, FIELD_NAV_STATE)),
            groups: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Reads a JSON config. Relative group log paths are resolved against the file's directory.
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let text = fs::read_to_string(path)?;
        let mut config: AnalysisConfig = serde_json::from_str(&text)?;
        if let Some(base) = path.parent() {
            for group in &mut config.groups {
                for log in &mut group.logs {
                    if log.is_relative() {
                        *log = base.join(&*log);
                    }
                }
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_use_px4_topics() {
        let config = AnalysisConfig::default();
        assert_eq!(
            config.crop.mode_signal,
            Some(FieldRef::new("vehicle_control_mode", "flag_control_offboard_enabled"))
        );
        assert_eq!(config.sources.position_estimate.series, "vehicle_local_position");
        assert!(config.crop.resample_dt_s.is_none());
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        fs::write(
            &path,
            r#"{
                "crop": { "resample_dt_s": 0.02, "start_offset_s": 5.0 },
                "mode_overlay": null,
                "sources": {},
                "groups": [ { "name": "baseline", "logs": ["a.ulg", "/abs/b.ulg"] } ]
            }"#,
        )
        .unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.crop.resample_dt_s, Some(0.02));
        assert_eq!(config.crop.mode_signal, default_mode_signal());
        assert!(config.mode_overlay.is_none());
        assert_eq!(config.sources, MetricsSources::default());
        assert_eq!(config.groups[0].logs[0], dir.path().join("a.ulg"));
        assert_eq!(config.groups[0].logs[1], PathBuf::from("/abs/b.ulg"));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AnalysisConfig::load(&path),
            Err(crate::error::AnalysisError::Json(_))
        ));
    }
}
