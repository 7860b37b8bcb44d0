// src/data_analysis/crop.rs

//! Cropping a group of flights to comparable time windows, with optional resampling
//! onto a uniform grid.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{FIELD_OFFBOARD_ENABLED, FLAG_ON_THRESHOLD, MICROS_PER_SECOND, TOPIC_CONTROL_MODE};
use crate::data_analysis::interpolation::resample_column;
use crate::data_input::log_data::{FieldRef, FlightLog, LogGroup, TimeSeries};
use crate::error::helpers::invalid_window;
use crate::error::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropOptions {
    /// Boolean signal whose last active interval defines the window.
    /// `None` crops to the overlap of all series. Deserialising without the key selects
    /// PX4's offboard flag; `null` disables it.
    #[serde(default = "default_mode_signal")]
    pub mode_signal: Option<FieldRef>,
    /// Seconds skipped at the start of the window.
    pub start_offset_s: Option<f64>,
    /// Maximum window length in seconds, counted from the (offset) start.
    pub duration_s: Option<f64>,
    /// Resample step in seconds. `None` keeps the logged samples.
    pub resample_dt_s: Option<f64>,
}

pub fn default_mode_signal() -> Option<FieldRef> {
    Some(FieldRef::new(TOPIC_CONTROL_MODE, FIELD_OFFBOARD_ENABLED))
}

/// Closed interval `[start_us, end_us]` in log time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropWindow {
    pub start_us: u64,
    pub end_us: u64,
}

impl CropWindow {
    pub fn new(start_us: u64, end_us: u64) -> Self {
        Self { start_us, end_us }
    }

    pub fn duration_s(&self) -> f64 {
        self.end_us.saturating_sub(self.start_us) as f64 / MICROS_PER_SECOND
    }

    pub fn contains(&self, t_us: u64) -> bool {
        (self.start_us..=self.end_us).contains(&t_us)
    }
}

fn seconds_to_us(name: &str, seconds: f64) -> AnalysisResult<u64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid_window(0, 0, format!("{name} must be a non-negative number of seconds, got {seconds}")));
    }
    Ok((seconds * MICROS_PER_SECOND).round() as u64)
}

/// Last interval in which the flag is on: from its last rising edge to the next falling
/// edge, or to the end of the signal.
pub fn find_mode_window(series: &TimeSeries, field_spec: &str) -> AnalysisResult<CropWindow> {
    let values = series.element_values(field_spec)?;
    let on: Vec<bool> = values.iter().map(|&v| v > FLAG_ON_THRESHOLD).collect();

    let last_rise = (0..on.len())
        .filter(|&i| on[i] && (i == 0 || !on[i - 1]))
        .last()
        .ok_or_else(|| {
            invalid_window(
                series.start_us().unwrap_or(0),
                series.end_us().unwrap_or(0),
                format!("mode signal {}.{} is never active", series.key(), field_spec),
            )
        })?;

    let fall = (last_rise + 1..on.len()).find(|&i| !on[i]);
    let start_us = series.timestamps_us[last_rise];
    let end_us = match fall {
        Some(i) => series.timestamps_us[i],
        None => series.timestamps_us[series.len() - 1],
    };
    debug!(
        "Mode window from {}.{}: [{}, {}] us",
        series.key(),
        field_spec,
        start_us,
        end_us
    );
    Ok(CropWindow::new(start_us, end_us))
}

/// Time span covered by every series with at least two samples.
pub fn find_overlap_window(log: &FlightLog) -> AnalysisResult<CropWindow> {
    let covered = log.series.values().filter(|s| s.len() >= 2);
    let mut start_us: Option<u64> = None;
    let mut end_us: Option<u64> = None;
    for series in covered {
        if let (Some(s), Some(e)) = (series.start_us(), series.end_us()) {
            start_us = Some(start_us.map_or(s, |current| current.max(s)));
            end_us = Some(end_us.map_or(e, |current| current.min(e)));
        }
    }
    match (start_us, end_us) {
        (Some(s), Some(e)) => Ok(CropWindow::new(s, e)),
        _ => Err(invalid_window(0, 0, format!("log '{}' has no series to overlap", log.name))),
    }
}

/// Window for one log: mode or overlap window, narrowed by offset and duration.
pub fn determine_window(log: &FlightLog, options: &CropOptions) -> AnalysisResult<CropWindow> {
    let base = match &options.mode_signal {
        Some(signal) => find_mode_window(log.require_series(&signal.series)?, &signal.field)?,
        None => find_overlap_window(log)?,
    };

    let mut window = base;
    if let Some(offset) = options.start_offset_s {
        window.start_us = window.start_us.saturating_add(seconds_to_us("start offset", offset)?);
    }
    if let Some(duration) = options.duration_s {
        let limit = window.start_us.saturating_add(seconds_to_us("duration", duration)?);
        window.end_us = window.end_us.min(limit);
    }

    if window.end_us <= window.start_us {
        return Err(invalid_window(window.start_us, window.end_us, "window is empty"));
    }
    Ok(window)
}

/// Uniform grid of multiples of `dt_s` inside the window, in µs.
pub fn build_time_grid(window: &CropWindow, dt_s: f64) -> AnalysisResult<Vec<u64>> {
    if !dt_s.is_finite() || dt_s <= 0.0 {
        return Err(AnalysisError::InvalidResampleStep(dt_s));
    }
    let dt_us = (dt_s * MICROS_PER_SECOND).round() as u64;
    if dt_us == 0 {
        return Err(AnalysisError::InvalidResampleStep(dt_s));
    }

    let first = window.start_us.div_ceil(dt_us) * dt_us;
    let last = window.end_us / dt_us * dt_us;
    if first > last {
        return Err(invalid_window(
            window.start_us,
            window.end_us,
            format!("window is shorter than one resample step of {dt_s} s"),
        ));
    }
    Ok((first..=last).step_by(dt_us as usize).collect())
}

/// Samples inside the window, rebased so the window start is zero.
pub fn truncate_series(series: &TimeSeries, window: &CropWindow) -> TimeSeries {
    let from = series.timestamps_us.partition_point(|&t| t < window.start_us);
    let to = series.timestamps_us.partition_point(|&t| t <= window.end_us);
    let indices: Vec<usize> = (from..to.max(from)).collect();
    let mut cropped = series.select_rows(&indices);
    cropped.rebase(window.start_us);
    cropped
}

/// Series resampled onto `grid` with the per-kind policy, rebased to the first grid point,
/// with the elapsed-seconds column added.
pub fn resample_series(series: &TimeSeries, grid: &[u64]) -> AnalysisResult<TimeSeries> {
    let mut resampled = TimeSeries::new(series.topic.clone(), series.multi_id, grid.to_vec());
    for column in &series.fields {
        resampled.push_field(resample_column(column, &series.timestamps_us, grid)?);
    }
    if let Some(&origin) = grid.first() {
        resampled.rebase(origin);
    }
    resampled.add_elapsed_seconds();
    Ok(resampled)
}

/// Whether any part of the series' sampled span falls inside the window.
fn overlaps_window(series: &TimeSeries, window: &CropWindow) -> bool {
    match (series.start_us(), series.end_us()) {
        (Some(start), Some(end)) => start <= window.end_us && end >= window.start_us,
        _ => false,
    }
}

/// Crops one log to its window. Series left without samples are dropped.
pub fn crop_log(log: &FlightLog, options: &CropOptions) -> AnalysisResult<FlightLog> {
    let window = determine_window(log, options)?;
    let grid = match options.resample_dt_s {
        Some(dt) => Some(build_time_grid(&window, dt)?),
        None => None,
    };
    // Resampled logs cover the grid and are rebased to its first point; everything else
    // covers the window and is rebased to its start.
    let kept = match grid.as_ref().and_then(|g| Some((*g.first()?, *g.last()?))) {
        Some((first, last)) => CropWindow::new(first, last),
        None => window,
    };
    let origin_us = kept.start_us;

    let mut cropped = FlightLog {
        name: log.name.clone(),
        source: log.source.clone(),
        start_timestamp_us: log.start_timestamp_us,
        info: log.info.clone(),
        parameters: log.parameters.clone(),
        crop_window: Some((window.start_us, window.end_us)),
        ..Default::default()
    };

    for series in log.series.values() {
        let result = match &grid {
            Some(grid) if overlaps_window(series, &window) => Some(resample_series(series, grid)?),
            Some(_) => None,
            None => Some(truncate_series(series, &window)).filter(|s| !s.is_empty()),
        };
        match result {
            Some(series) => cropped.insert_series(series),
            None => warn!("'{}': series '{}' has no samples in the crop window, dropped", log.name, series.key()),
        }
    }

    cropped.messages = log
        .messages
        .iter()
        .filter(|m| kept.contains(m.timestamp_us))
        .cloned()
        .map(|mut m| {
            m.timestamp_us = m.timestamp_us.saturating_sub(origin_us);
            m
        })
        .collect();
    cropped.dropouts = log
        .dropouts
        .iter()
        .filter(|d| d.after_timestamp_us.map_or(false, |t| kept.contains(t)))
        .cloned()
        .map(|mut d| {
            d.after_timestamp_us = d.after_timestamp_us.map(|t| t.saturating_sub(origin_us));
            d
        })
        .collect();

    info!(
        "Cropped '{}' to [{:.3}, {:.3}] s ({:.2} s){}",
        log.name,
        window.start_us as f64 / MICROS_PER_SECOND,
        window.end_us as f64 / MICROS_PER_SECOND,
        window.duration_s(),
        match (&grid, options.resample_dt_s) {
            (Some(g), Some(dt)) => format!(", resampled at {dt} s ({} samples)", g.len()),
            _ => String::new(),
        }
    );
    Ok(cropped)
}

/// Crops every log of a group, each to its own window. Logs that cannot be cropped are
/// reported and left out; the call fails only if no log could be cropped.
pub fn crop_log_group(group: &LogGroup, options: &CropOptions) -> AnalysisResult<LogGroup> {
    let mut logs = Vec::with_capacity(group.logs.len());
    let mut last_error = None;
    for log in &group.logs {
        match crop_log(log, options) {
            Ok(cropped) => logs.push(cropped),
            Err(e) => {
                warn!("Skipping '{}' in group '{}': {}", log.name, group.name, e);
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) if logs.is_empty() => Err(e),
        _ => Ok(LogGroup::new(group.name.clone(), logs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::log_data::{FieldColumn, FieldKind};
    use crate::data_input::log_data::LoggedMessage;
    use ndarray::Array2;

    fn mode_series(timestamps: Vec<u64>, flags: Vec<f64>) -> TimeSeries {
        let mut series = TimeSeries::new("vehicle_control_mode", 0, timestamps);
        series.push_field(FieldColumn::scalar("flag_control_offboard_enabled", FieldKind::Flag, flags));
        series
    }

    fn position_series(timestamps: Vec<u64>) -> TimeSeries {
        let x: Vec<f64> = timestamps.iter().map(|&t| t as f64 / 1_000.0).collect();
        let mut series = TimeSeries::new("vehicle_local_position", 0, timestamps);
        series.push_field(FieldColumn::scalar("x", FieldKind::Continuous, x));
        series
    }

    fn sample_log() -> FlightLog {
        let mut log = FlightLog::new("flight");
        log.insert_series(mode_series(
            vec![0, 1_000, 2_000, 3_000, 4_000, 5_000, 6_000, 7_000],
            vec![0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        ));
        log.insert_series(position_series((0..=80).map(|i| i * 100).collect()));
        log
    }

    fn offboard() -> FieldRef {
        FieldRef::new("vehicle_control_mode", "flag_control_offboard_enabled")
    }

    #[test]
    fn test_mode_window_uses_last_active_interval() {
        let log = sample_log();
        let window = find_mode_window(log.series("vehicle_control_mode").unwrap(), "flag_control_offboard_enabled").unwrap();
        assert_eq!(window, CropWindow::new(4_000, 6_000));
    }

    #[test]
    fn test_mode_window_active_until_end_or_from_start() {
        let series = mode_series(vec![10, 20, 30], vec![1.0, 1.0, 1.0]);
        let window = find_mode_window(&series, "flag_control_offboard_enabled").unwrap();
        assert_eq!(window, CropWindow::new(10, 30));

        let never = mode_series(vec![10, 20, 30], vec![0.0, 0.0, 0.0]);
        assert!(matches!(
            find_mode_window(&never, "flag_control_offboard_enabled"),
            Err(AnalysisError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_overlap_window_ignores_short_series() {
        let mut log = FlightLog::new("flight");
        log.insert_series(position_series(vec![100, 200, 900]));
        log.insert_series(mode_series(vec![300, 800], vec![0.0, 1.0]));
        log.insert_series(TimeSeries::new("single", 0, vec![5_000]));
        assert_eq!(find_overlap_window(&log).unwrap(), CropWindow::new(300, 800));
    }

    #[test]
    fn test_offset_and_duration_narrow_window() {
        let log = sample_log();
        let options = CropOptions {
            mode_signal: Some(offboard()),
            start_offset_s: Some(0.0005),
            duration_s: Some(0.001),
            resample_dt_s: None,
        };
        assert_eq!(determine_window(&log, &options).unwrap(), CropWindow::new(4_500, 5_500));

        let too_late = CropOptions {
            start_offset_s: Some(10.0),
            ..options
        };
        assert!(matches!(
            determine_window(&log, &too_late),
            Err(AnalysisError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_time_grid_snaps_to_step_multiples() {
        let grid = build_time_grid(&CropWindow::new(1_250, 1_700), 0.0002).unwrap();
        assert_eq!(grid, vec![1_400, 1_600]);
        assert!(matches!(
            build_time_grid(&CropWindow::new(0, 10), 0.0),
            Err(AnalysisError::InvalidResampleStep(_))
        ));
        assert!(build_time_grid(&CropWindow::new(1_100, 1_150), 0.0002).is_err());
    }

    #[test]
    fn test_crop_without_resampling_keeps_inclusive_window() {
        let log = sample_log();
        let options = CropOptions {
            mode_signal: Some(offboard()),
            ..Default::default()
        };
        let cropped = crop_log(&log, &options).unwrap();
        assert_eq!(cropped.crop_window, Some((4_000, 6_000)));

        let mode = cropped.series("vehicle_control_mode").unwrap();
        assert_eq!(mode.timestamps_us, vec![0, 1_000, 2_000]);
        assert!(mode.elapsed_s.is_none());

        let position = cropped.series("vehicle_local_position").unwrap();
        assert_eq!(position.len(), 21);
        assert_eq!(position.timestamps_us[0], 0);
        assert_eq!(position.element_values("x").unwrap()[0], 4.0);
    }

    #[test]
    fn test_crop_with_resampling_uses_common_grid() {
        let log = sample_log();
        let options = CropOptions {
            mode_signal: Some(offboard()),
            resample_dt_s: Some(0.00025),
            ..Default::default()
        };
        let cropped = crop_log(&log, &options).unwrap();
        let mode = cropped.series("vehicle_control_mode").unwrap();
        let position = cropped.series("vehicle_local_position").unwrap();

        assert_eq!(mode.timestamps_us, position.timestamps_us);
        assert_eq!(position.len(), 9);
        assert_eq!(position.timestamps_us[1], 250);
        assert_eq!(position.elapsed_s.as_ref().unwrap()[8], 0.002);
        // 4.25 ms interpolated linearly.
        assert!((position.element_values("x").unwrap()[1] - 4.25).abs() < 1e-9);
        // Flags take the nearest sample; 5.5 ms is a tie and keeps the earlier one.
        let flags = mode.element_values("flag_control_offboard_enabled").unwrap();
        assert_eq!(flags[6], 1.0);
        assert_eq!(flags[7], 0.0);
    }

    #[test]
    fn test_crop_keeps_messages_inside_window() {
        let mut log = sample_log();
        for t in [500, 4_500] {
            log.messages.push(LoggedMessage {
                level: 6,
                tag: None,
                timestamp_us: t,
                text: format!("at {t}"),
            });
        }
        let options = CropOptions {
            mode_signal: Some(offboard()),
            ..Default::default()
        };
        let cropped = crop_log(&log, &options).unwrap();
        assert_eq!(cropped.messages.len(), 1);
        assert_eq!(cropped.messages[0].timestamp_us, 500);
    }

    #[test]
    fn test_series_ending_before_window_is_dropped() {
        let mut log = sample_log();
        let mut early = TimeSeries::new("early_topic", 0, vec![0, 100]);
        early.push_field(FieldColumn::scalar("value", FieldKind::Continuous, vec![9.0, 9.0]));
        log.insert_series(early);

        for resample_dt_s in [None, Some(0.0005)] {
            let options = CropOptions {
                mode_signal: Some(offboard()),
                resample_dt_s,
                ..Default::default()
            };
            let cropped = crop_log(&log, &options).unwrap();
            assert!(cropped.series("early_topic").is_none(), "resample {resample_dt_s:?}");
            assert!(cropped.series("vehicle_local_position").is_some());
        }
    }

    #[test]
    fn test_resampled_messages_follow_grid() {
        let mut log = sample_log();
        for t in [4_100, 4_500] {
            log.messages.push(LoggedMessage {
                level: b'6',
                tag: None,
                timestamp_us: t,
                text: format!("at {t}"),
            });
        }
        let options = CropOptions {
            mode_signal: Some(offboard()),
            resample_dt_s: Some(0.0003),
            ..Default::default()
        };
        let cropped = crop_log(&log, &options).unwrap();
        // Grid runs 4.2 ms ..= 6.0 ms; 4.1 ms lies before its first point.
        assert_eq!(cropped.series("vehicle_local_position").unwrap().len(), 7);
        assert_eq!(cropped.messages.len(), 1);
        assert_eq!(cropped.messages[0].timestamp_us, 300);
    }

    #[test]
    fn test_crop_log_group_skips_failing_logs() {
        let mut no_mode = FlightLog::new("no_mode");
        no_mode.insert_series(position_series(vec![0, 100, 200]));
        let group = LogGroup::new("group", vec![sample_log(), no_mode]);
        let options = CropOptions {
            mode_signal: Some(offboard()),
            ..Default::default()
        };

        let cropped = crop_log_group(&group, &options).unwrap();
        assert_eq!(cropped.logs.len(), 1);
        assert_eq!(cropped.logs[0].name, "flight");

        let only_failing = LogGroup::new("group", vec![cropped.logs[0].clone(), FlightLog::new("empty")]);
        assert!(crop_log_group(&only_failing, &CropOptions::default()).is_ok());
        assert!(crop_log_group(&LogGroup::new("g", vec![FlightLog::new("empty")]), &options).is_err());
    }

    #[test]
    fn test_resample_quaternion_series() {
        let mut series = TimeSeries::new("vehicle_attitude", 0, vec![0, 1_000]);
        series.push_field(FieldColumn::new(
            "q",
            FieldKind::Quaternion,
            Array2::from_shape_vec((2, 4), vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]).unwrap(),
        ));
        let resampled = resample_series(&series, &[0, 500, 1_000]).unwrap();
        assert_eq!(resampled.require_field("q").unwrap().values.nrows(), 3);
        assert_eq!(resampled.element_values("q[0]").unwrap(), vec![1.0, 1.0, 1.0]);
    }
}
