// src/data_input/log_data.rs

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::constants::MICROS_PER_SECOND;
use crate::error::helpers::missing_field;
use crate::error::{AnalysisError, AnalysisResult};

/// How a field is interpolated when a series is resampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Boolean flag: nearest sample.
    Flag,
    /// Unit quaternion stored as `[w, x, y, z]`: slerp.
    Quaternion,
    /// Everything else: linear.
    Continuous,
}

/// One logged field. Scalars have a single column, arrays one column per element.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldColumn {
    pub name: String,
    pub kind: FieldKind,
    /// Shape (samples, width).
    pub values: Array2<f64>,
}

impl FieldColumn {
    pub fn new(name: impl Into<String>, kind: FieldKind, values: Array2<f64>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Single-column field from a plain vector.
    pub fn scalar(name: impl Into<String>, kind: FieldKind, values: Vec<f64>) -> Self {
        let len = values.len();
        let values = Array2::from_shape_vec((len, 1), values).unwrap_or_else(|_| Array2::zeros((len, 1)));
        Self::new(name, kind, values)
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn element(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.width()).then(|| self.values.column(index))
    }
}

/// Reference to a field (or one element of an array field) inside a named series.
/// `field` may carry an element index, e.g. `position[2]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub series: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(series: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            field: field.into(),
        }
    }
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.series, self.field)
    }
}

/// Splits `position[2]` into `("position", 2)`; a plain name selects element 0.
/// Only a trailing index is split, so flattened names like `esc[0].rpm` stay intact.
pub fn split_element(field_spec: &str) -> (&str, usize) {
    if let Some(stripped) = field_spec.strip_suffix(']') {
        if let Some((name, index)) = stripped.rsplit_once('[') {
            if let Ok(index) = index.parse::<usize>() {
                return (name, index);
            }
        }
    }
    (field_spec, 0)
}

/// Series key: the topic name, suffixed with the instance for multi-instance topics.
pub fn series_key(topic: &str, multi_id: u8) -> String {
    if multi_id == 0 {
        topic.to_string()
    } else {
        format!("{topic}_{multi_id}")
    }
}

/// Typed value of an info message or parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Array(Vec<f64>),
}

impl InfoValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            InfoValue::Integer(v) => Some(*v as f64),
            InfoValue::Float(v) => Some(*v),
            InfoValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoValue::Integer(v) => write!(f, "{v}"),
            InfoValue::Float(v) => write!(f, "{v}"),
            InfoValue::Bool(v) => write!(f, "{v}"),
            InfoValue::Text(v) => write!(f, "{v}"),
            InfoValue::Array(values) => {
                let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", joined.join(", "))
            }
        }
    }
}

/// A string message logged by the autopilot (`L` or `C`).
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedMessage {
    pub level: u8,
    pub tag: Option<u16>,
    pub timestamp_us: u64,
    pub text: String,
}

impl LoggedMessage {
    pub fn level_name(&self) -> &'static str {
        match self.level {
            b'0' => "EMERGENCY",
            b'1' => "ALERT",
            b'2' => "CRITICAL",
            b'3' => "ERROR",
            b'4' => "WARNING",
            b'5' => "NOTICE",
            b'6' => "INFO",
            b'7' => "DEBUG",
            _ => "UNKNOWN",
        }
    }
}

/// Logger dropout: data was lost for `duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dropout {
    pub duration_ms: u16,
    /// Timestamp of the last data sample seen before the dropout, if any.
    pub after_timestamp_us: Option<u64>,
}

/// Time-indexed table of samples for one logged topic instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub topic: String,
    pub multi_id: u8,
    pub timestamps_us: Vec<u64>,
    pub fields: Vec<FieldColumn>,
    /// Seconds since the first sample, present once a series has been resampled.
    pub elapsed_s: Option<Vec<f64>>,
}

impl TimeSeries {
    pub fn new(topic: impl Into<String>, multi_id: u8, timestamps_us: Vec<u64>) -> Self {
        Self {
            topic: topic.into(),
            multi_id,
            timestamps_us,
            fields: Vec::new(),
            elapsed_s: None,
        }
    }

    pub fn key(&self) -> String {
        series_key(&self.topic, self.multi_id)
    }

    pub fn len(&self) -> usize {
        self.timestamps_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps_us.is_empty()
    }

    pub fn start_us(&self) -> Option<u64> {
        self.timestamps_us.first().copied()
    }

    pub fn end_us(&self) -> Option<u64> {
        self.timestamps_us.last().copied()
    }

    pub fn push_field(&mut self, column: FieldColumn) {
        self.fields.push(column);
    }

    pub fn field(&self, name: &str) -> Option<&FieldColumn> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn require_field(&self, name: &str) -> AnalysisResult<&FieldColumn> {
        self.field(name).ok_or_else(|| missing_field(self.key(), name))
    }

    /// Values of one field element, e.g. `x` or `position[1]`.
    pub fn element_values(&self, field_spec: &str) -> AnalysisResult<Vec<f64>> {
        let (name, index) = split_element(field_spec);
        let column = self.require_field(name)?;
        column
            .element(index)
            .map(|view| view.to_vec())
            .ok_or_else(|| missing_field(self.key(), field_spec))
    }

    /// Sample times in seconds: the elapsed column if present, otherwise the timestamps.
    pub fn time_seconds(&self) -> Vec<f64> {
        match &self.elapsed_s {
            Some(elapsed) => elapsed.clone(),
            None => self
                .timestamps_us
                .iter()
                .map(|&t| t as f64 / MICROS_PER_SECOND)
                .collect(),
        }
    }

    /// Copy of the rows at `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> TimeSeries {
        TimeSeries {
            topic: self.topic.clone(),
            multi_id: self.multi_id,
            timestamps_us: indices.iter().map(|&i| self.timestamps_us[i]).collect(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldColumn::new(f.name.clone(), f.kind, f.values.select(Axis(0), indices)))
                .collect(),
            elapsed_s: self
                .elapsed_s
                .as_ref()
                .map(|e| indices.iter().map(|&i| e[i]).collect()),
        }
    }

    /// Shifts timestamps so that `origin_us` becomes zero.
    pub fn rebase(&mut self, origin_us: u64) {
        for t in &mut self.timestamps_us {
            *t = t.saturating_sub(origin_us);
        }
    }

    pub fn add_elapsed_seconds(&mut self) {
        let first = self.start_us().unwrap_or(0);
        self.elapsed_s = Some(
            self.timestamps_us
                .iter()
                .map(|&t| t.saturating_sub(first) as f64 / MICROS_PER_SECOND)
                .collect(),
        );
    }

    pub fn is_sorted(&self) -> bool {
        self.timestamps_us.windows(2).all(|w| w[0] <= w[1])
    }
}

/// One flight log held in memory.
#[derive(Debug, Clone, Default)]
pub struct FlightLog {
    pub name: String,
    pub source: Option<PathBuf>,
    pub start_timestamp_us: u64,
    pub info: BTreeMap<String, InfoValue>,
    pub parameters: BTreeMap<String, InfoValue>,
    pub messages: Vec<LoggedMessage>,
    pub dropouts: Vec<Dropout>,
    pub series: BTreeMap<String, TimeSeries>,
    /// Window this log was cropped to, in original log time (µs).
    pub crop_window: Option<(u64, u64)>,
}

impl FlightLog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn insert_series(&mut self, series: TimeSeries) {
        self.series.insert(series.key(), series);
    }

    pub fn series(&self, key: &str) -> Option<&TimeSeries> {
        self.series.get(key)
    }

    pub fn require_series(&self, key: &str) -> AnalysisResult<&TimeSeries> {
        self.series(key)
            .ok_or_else(|| AnalysisError::MissingTopic(key.to_string()))
    }

    /// Span covered by all non-empty series, in seconds.
    pub fn duration_s(&self) -> f64 {
        let start = self.series.values().filter_map(TimeSeries::start_us).min();
        let end = self.series.values().filter_map(TimeSeries::end_us).max();
        match (start, end) {
            (Some(s), Some(e)) if e > s => (e - s) as f64 / MICROS_PER_SECOND,
            _ => 0.0,
        }
    }

    pub fn info_text(&self, key: &str) -> Option<String> {
        self.info.get(key).map(|v| v.to_string())
    }
}

/// A named set of flights analysed together.
#[derive(Debug, Clone, Default)]
pub struct LogGroup {
    pub name: String,
    pub logs: Vec<FlightLog>,
}

impl LogGroup {
    pub fn new(name: impl Into<String>, logs: Vec<FlightLog>) -> Self {
        Self {
            name: name.into(),
            logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series() -> TimeSeries {
        let mut series = TimeSeries::new("vehicle_local_position", 0, vec![100, 200, 300]);
        series.push_field(FieldColumn::scalar("x", FieldKind::Continuous, vec![1.0, 2.0, 3.0]));
        series.push_field(FieldColumn::new(
            "position",
            FieldKind::Continuous,
            Array2::from_shape_vec((3, 2), vec![0.0, 10.0, 1.0, 11.0, 2.0, 12.0]).unwrap(),
        ));
        series
    }

    #[test]
    fn test_split_element() {
        assert_eq!(split_element("position[2]"), ("position", 2));
        assert_eq!(split_element("x"), ("x", 0));
        assert_eq!(split_element("esc[0].rpm"), ("esc[0].rpm", 0));
        assert_eq!(split_element("bad[x]"), ("bad[x]", 0));
    }

    #[test]
    fn test_series_key() {
        assert_eq!(series_key("vehicle_attitude", 0), "vehicle_attitude");
        assert_eq!(series_key("sensor_accel", 2), "sensor_accel_2");
    }

    #[test]
    fn test_element_values() {
        let series = sample_series();
        assert_eq!(series.element_values("x").unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.element_values("position[1]").unwrap(), vec![10.0, 11.0, 12.0]);
        assert!(series.element_values("position[5]").is_err());
        assert!(series.element_values("missing").is_err());
    }

    #[test]
    fn test_select_rows_and_rebase() {
        let mut selected = sample_series().select_rows(&[2, 0]);
        assert_eq!(selected.timestamps_us, vec![300, 100]);
        assert!(!selected.is_sorted());
        assert_eq!(selected.element_values("position[1]").unwrap(), vec![12.0, 10.0]);

        selected.rebase(100);
        assert_eq!(selected.timestamps_us, vec![200, 0]);
    }

    #[test]
    fn test_time_seconds_prefers_elapsed_column() {
        let mut series = sample_series();
        assert_eq!(series.time_seconds(), vec![0.0001, 0.0002, 0.0003]);
        series.rebase(100);
        series.add_elapsed_seconds();
        assert_eq!(series.time_seconds(), vec![0.0, 0.0001, 0.0002]);
    }

    #[test]
    fn test_flight_log_lookup() {
        let mut log = FlightLog::new("flight");
        log.insert_series(sample_series());
        let position = log.require_series("vehicle_local_position").unwrap();
        assert_eq!(position.element_values("x").unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            log.require_series("vehicle_attitude"),
            Err(AnalysisError::MissingTopic(_))
        ));
        assert!((log.duration_s() - 0.0002).abs() < 1e-12);
    }
}
