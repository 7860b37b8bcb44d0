// src/data_input/log_parser.rs

use log::{debug, info, warn};
use ndarray::Array2;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use yule_log::builder::ULogParserBuilder;
use yule_log::model::inst::{Field, FieldValue, ParameterValue};
use yule_log::model::msg::UlogMessage;

use crate::constants::QUATERNION_FIELD_NAMES;
use crate::data_input::log_data::{
    series_key, Dropout, FieldColumn, FieldKind, FlightLog, InfoValue, LogGroup, LoggedMessage, TimeSeries,
};
use crate::error::{AnalysisError, AnalysisResult};

/// Decides how a logged field is interpolated.
pub fn classify_field(name: &str, is_bool: bool, width: usize) -> FieldKind {
    if is_bool {
        FieldKind::Flag
    } else if width == 4 && QUATERNION_FIELD_NAMES.contains(&name) {
        FieldKind::Quaternion
    } else {
        FieldKind::Continuous
    }
}

/// One primitive (or primitive array) field of a decoded sample.
/// Nested formats are flattened into `parent.child` / `parent[i].child` names.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatValue {
    pub name: String,
    pub is_bool: bool,
    pub values: Vec<f64>,
}

impl FlatValue {
    fn new(name: &str, is_bool: bool, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            is_bool,
            values,
        }
    }
}

fn nested_name(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

/// Flattens a decoded field into numeric columns. Text (`char`) fields are dropped.
pub fn flatten_field(prefix: &str, field: &Field, out: &mut Vec<FlatValue>) {
    let name = nested_name(prefix, &field.name);
    let scalar = |v: f64| vec![v];
    match &field.value {
        FieldValue::ScalarU8(v) => out.push(FlatValue::new(&name, false, scalar(f64::from(*v)))),
        FieldValue::ScalarU16(v) => out.push(FlatValue::new(&name, false, scalar(f64::from(*v)))),
        FieldValue::ScalarU32(v) => out.push(FlatValue::new(&name, false, scalar(f64::from(*v)))),
        FieldValue::ScalarU64(v) => out.push(FlatValue::new(&name, false, scalar(*v as f64))),
        FieldValue::ScalarI8(v) => out.push(FlatValue::new(&name, false, scalar(f64::from(*v)))),
        FieldValue::ScalarI16(v) => out.push(FlatValue::new(&name, false, scalar(f64::from(*v)))),
        FieldValue::ScalarI32(v) => out.push(FlatValue::new(&name, false, scalar(f64::from(*v)))),
        FieldValue::ScalarI64(v) => out.push(FlatValue::new(&name, false, scalar(*v as f64))),
        FieldValue::ScalarF32(v) => out.push(FlatValue::new(&name, false, scalar(f64::from(*v)))),
        FieldValue::ScalarF64(v) => out.push(FlatValue::new(&name, false, scalar(*v))),
        FieldValue::ScalarBool(v) => out.push(FlatValue::new(&name, true, scalar(f64::from(u8::from(*v))))),
        FieldValue::ScalarChar(_) | FieldValue::ArrayChar(_) => {}
        FieldValue::ScalarOther(nested) => {
            for inner in &nested.fields {
                flatten_field(&name, inner, out);
            }
        }
        FieldValue::ArrayU8(v) => out.push(FlatValue::new(&name, false, v.iter().map(|&x| f64::from(x)).collect())),
        FieldValue::ArrayU16(v) => out.push(FlatValue::new(&name, false, v.iter().map(|&x| f64::from(x)).collect())),
        FieldValue::ArrayU32(v) => out.push(FlatValue::new(&name, false, v.iter().map(|&x| f64::from(x)).collect())),
        FieldValue::ArrayU64(v) => out.push(FlatValue::new(&name, false, v.iter().map(|&x| x as f64).collect())),
        FieldValue::ArrayI8(v) => out.push(FlatValue::new(&name, false, v.iter().map(|&x| f64::from(x)).collect())),
        FieldValue::ArrayI16(v) => out.push(FlatValue::new(&name, false, v.iter().map(|&x| f64::from(x)).collect())),
        FieldValue::ArrayI32(v) => out.push(FlatValue::new(&name, false, v.iter().map(|&x| f64::from(x)).collect())),
        FieldValue::ArrayI64(v) => out.push(FlatValue::new(&name, false, v.iter().map(|&x| x as f64).collect())),
        FieldValue::ArrayF32(v) => out.push(FlatValue::new(&name, false, v.iter().map(|&x| f64::from(x)).collect())),
        FieldValue::ArrayF64(v) => out.push(FlatValue::new(&name, false, v.clone())),
        FieldValue::ArrayBool(v) => out.push(FlatValue::new(
            &name,
            true,
            v.iter().map(|&x| f64::from(u8::from(x))).collect(),
        )),
        FieldValue::ArrayOther(items) => {
            for (i, item) in items.iter().enumerate() {
                let element = format!("{name}[{i}]");
                for inner in &item.fields {
                    flatten_field(&element, inner, out);
                }
            }
        }
    }
}

/// Typed info/parameter value.
pub fn info_value(value: &FieldValue) -> Option<InfoValue> {
    let info = match value {
        FieldValue::ScalarU8(v) => InfoValue::Integer(i64::from(*v)),
        FieldValue::ScalarU16(v) => InfoValue::Integer(i64::from(*v)),
        FieldValue::ScalarU32(v) => InfoValue::Integer(i64::from(*v)),
        FieldValue::ScalarU64(v) => InfoValue::Integer(*v as i64),
        FieldValue::ScalarI8(v) => InfoValue::Integer(i64::from(*v)),
        FieldValue::ScalarI16(v) => InfoValue::Integer(i64::from(*v)),
        FieldValue::ScalarI32(v) => InfoValue::Integer(i64::from(*v)),
        FieldValue::ScalarI64(v) => InfoValue::Integer(*v),
        FieldValue::ScalarF32(v) => InfoValue::Float(f64::from(*v)),
        FieldValue::ScalarF64(v) => InfoValue::Float(*v),
        FieldValue::ScalarBool(v) => InfoValue::Bool(*v),
        FieldValue::ScalarChar(c) => InfoValue::Text(c.to_string()),
        FieldValue::ArrayChar(chars) => {
            InfoValue::Text(chars.iter().collect::<String>().trim_end_matches('\0').to_string())
        }
        FieldValue::ArrayF32(v) => InfoValue::Array(v.iter().map(|&x| f64::from(x)).collect()),
        FieldValue::ArrayF64(v) => InfoValue::Array(v.clone()),
        FieldValue::ArrayI32(v) => InfoValue::Array(v.iter().map(|&x| f64::from(x)).collect()),
        FieldValue::ArrayU8(v) => InfoValue::Array(v.iter().map(|&x| f64::from(x)).collect()),
        _ => return None,
    };
    Some(info)
}

struct ColumnBuilder {
    name: String,
    kind: FieldKind,
    width: usize,
    rows: Vec<f64>,
}

/// Accumulates the samples of one topic instance, in arrival order.
pub struct SeriesBuilder {
    topic: String,
    multi_id: u8,
    timestamps_us: Vec<u64>,
    columns: Vec<ColumnBuilder>,
}

impl SeriesBuilder {
    pub fn new(topic: impl Into<String>, multi_id: u8) -> Self {
        Self {
            topic: topic.into(),
            multi_id,
            timestamps_us: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Appends one sample. The first sample fixes the column layout; later samples that
    /// miss a column or change its width contribute NaN for it.
    pub fn push(&mut self, timestamp_us: u64, values: Vec<FlatValue>) {
        if self.timestamps_us.is_empty() {
            self.columns = values
                .iter()
                .filter(|v| v.name != "timestamp")
                .map(|v| ColumnBuilder {
                    name: v.name.clone(),
                    kind: classify_field(&v.name, v.is_bool, v.values.len()),
                    width: v.values.len(),
                    rows: Vec::new(),
                })
                .collect();
        }
        self.timestamps_us.push(timestamp_us);

        let mut by_name: HashMap<String, Vec<f64>> = values.into_iter().map(|v| (v.name, v.values)).collect();
        for column in &mut self.columns {
            match by_name.remove(&column.name) {
                Some(row) if row.len() == column.width => column.rows.extend(row),
                _ => column.rows.extend(std::iter::repeat(f64::NAN).take(column.width)),
            }
        }
    }

    pub fn key(&self) -> String {
        series_key(&self.topic, self.multi_id)
    }

    /// Builds the series, stably sorted by timestamp.
    pub fn finish(self) -> AnalysisResult<TimeSeries> {
        let n = self.timestamps_us.len();
        let mut series = TimeSeries::new(self.topic, self.multi_id, self.timestamps_us);
        for column in self.columns {
            let values = Array2::from_shape_vec((n, column.width), column.rows)
                .map_err(|e| AnalysisError::Decode(format!("field '{}': {e}", column.name)))?;
            series.push_field(FieldColumn::new(column.name, column.kind, values));
        }
        if !series.is_sorted() {
            warn!("Series '{}' is not time-ordered; sorting by timestamp", series.key());
            let mut order: Vec<usize> = (0..series.len()).collect();
            order.sort_by_key(|&i| series.timestamps_us[i]);
            series = series.select_rows(&order);
        }
        Ok(series)
    }
}

/// Parses a `.ulg` file into a [`FlightLog`] with one series per logged topic instance.
pub fn parse_log_file(input_file_path: &Path) -> AnalysisResult<FlightLog> {
    info!("Reading ULog '{}'", input_file_path.display());
    let reader = BufReader::new(File::open(input_file_path)?);

    let name = input_file_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "log".to_string());
    let mut log = flight_log_from_reader(&name, reader)?;
    log.source = Some(input_file_path.to_path_buf());

    info!(
        "Loaded '{}': {} series, {:.1}s, {} logged messages, {} dropouts",
        log.name,
        log.series.len(),
        log.duration_s(),
        log.messages.len(),
        log.dropouts.len()
    );
    Ok(log)
}

/// Streams a ULog through the decoder and collects it into the in-memory tabular form.
/// A decoding error after data has been read is treated as a log cut short (power loss)
/// and ends the log with a warning.
pub fn flight_log_from_reader<R: std::io::Read>(name: &str, reader: R) -> AnalysisResult<FlightLog> {
    let parser = ULogParserBuilder::new(reader)
        .include_header(true)
        .build()
        .map_err(|e| AnalysisError::Decode(e.to_string()))?;

    let mut log = FlightLog::new(name);
    // msg_id -> series key of the current subscription
    let mut subscriptions: HashMap<u16, (String, u8)> = HashMap::new();
    let mut builders: BTreeMap<String, SeriesBuilder> = BTreeMap::new();
    let mut last_data_timestamp: Option<u64> = None;

    for message in parser {
        let message = match message {
            Ok(message) => message,
            Err(e) if last_data_timestamp.is_some() => {
                warn!("'{name}': log ends early ({e}); keeping the data read so far");
                break;
            }
            Err(e) => return Err(AnalysisError::Decode(e.to_string())),
        };

        match message {
            UlogMessage::Header(header) => log.start_timestamp_us = header.timestamp,
            UlogMessage::Info(entry) => {
                if let Some(value) = info_value(&entry.value) {
                    log.info.insert(entry.key, value);
                }
            }
            UlogMessage::Parameter(param) => {
                let field_value = match param.value {
                    ParameterValue::INT32(v) => FieldValue::ScalarI32(v),
                    ParameterValue::FLOAT(v) => FieldValue::ScalarF32(v),
                };
                if let Some(value) = info_value(&field_value) {
                    log.parameters.insert(param.key, value);
                }
            }
            UlogMessage::AddSubscription(sub) => {
                debug!("Subscription {}: {} (instance {})", sub.msg_id, sub.message_name, sub.multi_id);
                subscriptions.insert(sub.msg_id, (sub.message_name, sub.multi_id));
            }
            UlogMessage::LoggedData(data) => {
                let Some((topic, multi_id)) = subscriptions.get(&data.msg_id) else {
                    debug!("Skipping data for unsubscribed message id {}", data.msg_id);
                    continue;
                };
                let mut values = Vec::with_capacity(data.data.fields.len());
                for field in &data.data.fields {
                    flatten_field("", field, &mut values);
                }
                // A topic re-subscribed under a new msg id appends to the same series.
                builders
                    .entry(series_key(topic, *multi_id))
                    .or_insert_with(|| SeriesBuilder::new(topic.clone(), *multi_id))
                    .push(data.timestamp, values);
                last_data_timestamp = Some(data.timestamp);
            }
            UlogMessage::LoggedString(entry) => log.messages.push(LoggedMessage {
                level: entry.level as u8,
                tag: None,
                timestamp_us: entry.timestamp,
                text: entry.msg,
            }),
            UlogMessage::TaggedLoggedString(entry) => log.messages.push(LoggedMessage {
                level: entry.level as u8,
                tag: entry.tag,
                timestamp_us: entry.timestamp,
                text: entry.msg,
            }),
            UlogMessage::DropoutMark(dropout) => {
                // yule_log only exposes the dropout duration through its Display impl.
                let duration: u16 = dropout.to_string().parse().expect("dropout duration is a u16");
                debug!("Dropout of {} ms", duration);
                log.dropouts.push(Dropout {
                    duration_ms: duration,
                    after_timestamp_us: last_data_timestamp,
                });
            }
            _ => {}
        }
    }

    for (_, builder) in builders {
        log.insert_series(builder.finish()?);
    }
    Ok(log)
}

/// Parses several logs into a named group. Logs that fail to parse are reported and skipped.
pub fn parse_log_group(name: &str, paths: &[impl AsRef<Path>]) -> LogGroup {
    let mut logs = Vec::with_capacity(paths.len());
    for path in paths {
        match parse_log_file(path.as_ref()) {
            Ok(log) => logs.push(log),
            Err(e) => warn!("Skipping '{}' in group '{}': {}", path.as_ref().display(), name, e),
        }
    }
    LogGroup::new(name, logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f64, ok: bool) -> Vec<FlatValue> {
        vec![
            FlatValue::new("value", false, vec![value]),
            FlatValue::new("ok", true, vec![f64::from(u8::from(ok))]),
        ]
    }

    #[test]
    fn test_classify_field() {
        assert_eq!(classify_field("armed", true, 1), FieldKind::Flag);
        assert_eq!(classify_field("q", false, 4), FieldKind::Quaternion);
        assert_eq!(classify_field("q_d", false, 4), FieldKind::Quaternion);
        assert_eq!(classify_field("delta_q_reset", false, 4), FieldKind::Quaternion);
        assert_eq!(classify_field("q", false, 3), FieldKind::Continuous);
        assert_eq!(classify_field("x", false, 1), FieldKind::Continuous);
    }

    #[test]
    fn test_unsorted_samples_are_sorted() {
        let mut builder = SeriesBuilder::new("sensor", 0);
        builder.push(300, sample(3.0, true));
        builder.push(100, sample(1.0, false));
        builder.push(200, sample(2.0, true));
        assert_eq!(builder.key(), "sensor");

        let series = builder.finish().unwrap();
        assert_eq!(series.timestamps_us, vec![100, 200, 300]);
        assert_eq!(series.element_values("value").unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.require_field("ok").unwrap().kind, FieldKind::Flag);
        assert_eq!(series.element_values("ok").unwrap(), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_layout_mismatch_fills_nan() {
        let mut builder = SeriesBuilder::new("sensor", 1);
        builder.push(100, vec![FlatValue::new("q", false, vec![1.0, 0.0, 0.0, 0.0])]);
        builder.push(200, vec![FlatValue::new("q", false, vec![1.0, 0.0])]);
        builder.push(300, Vec::new());
        assert_eq!(builder.key(), "sensor_1");

        let series = builder.finish().unwrap();
        let q = series.require_field("q").unwrap();
        assert_eq!(q.kind, FieldKind::Quaternion);
        assert_eq!(q.values.shape(), &[3, 4]);
        assert_eq!(q.values[[0, 0]], 1.0);
        assert!(q.values[[1, 0]].is_nan());
        assert!(q.values[[2, 3]].is_nan());
    }

    #[test]
    fn test_timestamp_field_is_not_a_column() {
        let mut builder = SeriesBuilder::new("sensor", 0);
        builder.push(
            100,
            vec![
                FlatValue::new("timestamp", false, vec![100.0]),
                FlatValue::new("x", false, vec![0.5]),
            ],
        );
        let series = builder.finish().unwrap();
        assert!(series.field("timestamp").is_none());
        assert_eq!(series.element_values("x").unwrap(), vec![0.5]);
    }
}
