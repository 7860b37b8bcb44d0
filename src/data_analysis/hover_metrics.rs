// src/data_analysis/hover_metrics.rs

//! Hover tracking performance: position and attitude error between setpoint and estimate.

use log::{debug, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::axis_names::AXIS_COUNT;
use crate::constants::{
    FIELD_ATTITUDE, FIELD_ATTITUDE_SETPOINT, TOPIC_ATTITUDE, TOPIC_ATTITUDE_SETPOINT, TOPIC_LOCAL_POSITION,
    TOPIC_TRAJECTORY_SETPOINT,
};
use crate::data_analysis::interpolation::{interp_linear, interp_slerp};
use crate::data_analysis::quaternion::{euler_angles, from_px4_row, geodesic_distance, relative_rotation};
use crate::data_input::log_data::{split_element, FlightLog, TimeSeries};
use crate::error::helpers::missing_field;
use crate::error::{AnalysisError, AnalysisResult};

/// Mean, RMS and largest magnitude of the finite samples of an error signal.
/// All three are NaN when there are no finite samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorStats {
    pub mean: f64,
    pub rms: f64,
    pub max_abs: f64,
    pub samples: usize,
}

impl ErrorStats {
    pub fn from_samples<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut max_abs = 0.0_f64;
        let mut samples = 0usize;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            sum += v;
            sum_sq += v * v;
            max_abs = max_abs.max(v.abs());
            samples += 1;
        }
        if samples == 0 {
            return Self {
                mean: f64::NAN,
                rms: f64::NAN,
                max_abs: f64::NAN,
                samples,
            };
        }
        let n = samples as f64;
        Self {
            mean: sum / n,
            rms: (sum_sq / n).sqrt(),
            max_abs,
            samples,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionMetrics {
    /// Setpoint minus estimate per local-frame axis (m).
    pub axes: [ErrorStats; AXIS_COUNT],
    /// Euclidean norm of the error vector (m).
    pub norm: ErrorStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttitudeMetrics {
    /// Roll, pitch, yaw of the error rotation (deg).
    pub axes_deg: [ErrorStats; AXIS_COUNT],
    /// Rotation angle between setpoint and estimate (deg).
    pub distance_deg: ErrorStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverMetrics {
    pub log_name: String,
    pub duration_s: f64,
    pub position: Option<PositionMetrics>,
    pub attitude: Option<AttitudeMetrics>,
}

/// Three fields of one series forming a position vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSource {
    pub series: String,
    pub fields: [String; AXIS_COUNT],
}

impl VectorSource {
    pub fn new(series: &str, fields: [&str; AXIS_COUNT]) -> Self {
        Self {
            series: series.to_string(),
            fields: fields.map(str::to_string),
        }
    }
}

/// A `[w, x, y, z]` quaternion field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuaternionSource {
    pub series: String,
    pub field: String,
}

impl QuaternionSource {
    pub fn new(series: &str, field: &str) -> Self {
        Self {
            series: series.to_string(),
            field: field.to_string(),
        }
    }
}

/// Where the estimate and setpoint signals live in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSources {
    pub position_estimate: VectorSource,
    pub position_setpoint: VectorSource,
    pub attitude_estimate: QuaternionSource,
    pub attitude_setpoint: QuaternionSource,
}

impl Default for MetricsSources {
    fn default() -> Self {
        Self {
            position_estimate: VectorSource::new(TOPIC_LOCAL_POSITION, ["x", "y", "z"]),
            position_setpoint: VectorSource::new(
                TOPIC_TRAJECTORY_SETPOINT,
                ["position[0]", "position[1]", "position[2]"],
            ),
            attitude_estimate: QuaternionSource::new(TOPIC_ATTITUDE, FIELD_ATTITUDE),
            attitude_setpoint: QuaternionSource::new(TOPIC_ATTITUDE_SETPOINT, FIELD_ATTITUDE_SETPOINT),
        }
    }
}

/// Position error over the estimate's time base.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionErrorSeries {
    pub time_s: Vec<f64>,
    pub axes: [Vec<f64>; AXIS_COUNT],
    pub norm: Vec<f64>,
}

/// Attitude error over the estimate's time base, in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeErrorSeries {
    pub time_s: Vec<f64>,
    pub axes_deg: [Vec<f64>; AXIS_COUNT],
    pub distance_deg: Vec<f64>,
}

fn vector_values(series: &TimeSeries, fields: &[String; AXIS_COUNT]) -> AnalysisResult<Array2<f64>> {
    let mut values = Array2::<f64>::zeros((series.len(), AXIS_COUNT));
    for (axis, field) in fields.iter().enumerate() {
        let column = series.element_values(field)?;
        values.column_mut(axis).assign(&ndarray::Array1::from(column));
    }
    Ok(values)
}

fn quaternion_values(series: &TimeSeries, field: &str) -> AnalysisResult<Array2<f64>> {
    let (name, _) = split_element(field);
    let column = series.require_field(name)?;
    if column.width() != 4 {
        return Err(missing_field(series.key(), format!("{name} (4-element quaternion)")));
    }
    Ok(column.values.clone())
}

// Rows at times the setpoint never covered become NaN; the setpoint is not extrapolated.
fn mask_outside_span(values: &mut Array2<f64>, times_us: &[u64], span: &TimeSeries) {
    let (Some(start_us), Some(end_us)) = (span.start_us(), span.end_us()) else {
        values.fill(f64::NAN);
        return;
    };
    for (mut row, &t) in values.rows_mut().into_iter().zip(times_us) {
        if t < start_us || t > end_us {
            row.fill(f64::NAN);
        }
    }
}

/// Setpoint minus estimate, with the setpoint interpolated linearly onto the estimate times.
/// Estimate samples outside the setpoint's time span are NaN.
pub fn position_error_series(log: &FlightLog, sources: &MetricsSources) -> AnalysisResult<PositionErrorSeries> {
    let estimate = log.require_series(&sources.position_estimate.series)?;
    let setpoint = log.require_series(&sources.position_setpoint.series)?;
    let est = vector_values(estimate, &sources.position_estimate.fields)?;
    let mut sp = vector_values(setpoint, &sources.position_setpoint.fields)?;

    if setpoint.timestamps_us != estimate.timestamps_us {
        debug!(
            "Aligning '{}' onto '{}' ({} -> {} samples)",
            setpoint.key(),
            estimate.key(),
            setpoint.len(),
            estimate.len()
        );
        sp = interp_linear(&setpoint.timestamps_us, sp.view(), &estimate.timestamps_us)?;
        mask_outside_span(&mut sp, &estimate.timestamps_us, setpoint);
    }

    let error = sp - &est;
    let axes: [Vec<f64>; AXIS_COUNT] = std::array::from_fn(|axis| error.column(axis).to_vec());
    let norm = error
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|v| v * v).sum::<f64>().sqrt())
        .collect();

    Ok(PositionErrorSeries {
        time_s: estimate.time_seconds(),
        axes,
        norm,
    })
}

/// Error rotation `q_d ⊗ conj(q)` as roll/pitch/yaw and geodesic distance, in degrees.
/// The setpoint is slerped onto the estimate times and not extrapolated past its own span.
pub fn attitude_error_series(log: &FlightLog, sources: &MetricsSources) -> AnalysisResult<AttitudeErrorSeries> {
    let estimate = log.require_series(&sources.attitude_estimate.series)?;
    let setpoint = log.require_series(&sources.attitude_setpoint.series)?;
    let q = quaternion_values(estimate, &sources.attitude_estimate.field)?;
    let mut q_d = quaternion_values(setpoint, &sources.attitude_setpoint.field)?;

    if setpoint.timestamps_us != estimate.timestamps_us {
        q_d = interp_slerp(&setpoint.timestamps_us, q_d.view(), &estimate.timestamps_us)?;
        mask_outside_span(&mut q_d, &estimate.timestamps_us, setpoint);
    }

    let n = estimate.len();
    let mut axes_deg: [Vec<f64>; AXIS_COUNT] = std::array::from_fn(|_| Vec::with_capacity(n));
    let mut distance_deg = Vec::with_capacity(n);
    for (est_row, sp_row) in q.rows().into_iter().zip(q_d.rows()) {
        match (from_px4_row(est_row), from_px4_row(sp_row)) {
            (Some(est_q), Some(sp_q)) => {
                let error = relative_rotation(&sp_q, &est_q);
                for (axis, angle) in euler_angles(&error).iter().enumerate() {
                    axes_deg[axis].push(angle.to_degrees());
                }
                distance_deg.push(geodesic_distance(&sp_q, &est_q).to_degrees());
            }
            _ => {
                for axis in axes_deg.iter_mut() {
                    axis.push(f64::NAN);
                }
                distance_deg.push(f64::NAN);
            }
        }
    }

    Ok(AttitudeErrorSeries {
        time_s: estimate.time_seconds(),
        axes_deg,
        distance_deg,
    })
}

pub fn position_metrics(errors: &PositionErrorSeries) -> PositionMetrics {
    PositionMetrics {
        axes: std::array::from_fn(|axis| ErrorStats::from_samples(errors.axes[axis].iter().copied())),
        norm: ErrorStats::from_samples(errors.norm.iter().copied()),
    }
}

pub fn attitude_metrics(errors: &AttitudeErrorSeries) -> AttitudeMetrics {
    AttitudeMetrics {
        axes_deg: std::array::from_fn(|axis| ErrorStats::from_samples(errors.axes_deg[axis].iter().copied())),
        distance_deg: ErrorStats::from_samples(errors.distance_deg.iter().copied()),
    }
}

// Missing or empty inputs make a metrics block unavailable; anything else is a real failure.
fn optional_block<T>(log_name: &str, block: &str, result: AnalysisResult<T>) -> AnalysisResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(
            e @ (AnalysisError::MissingTopic(_) | AnalysisError::MissingField { .. } | AnalysisError::EmptySeries(_)),
        ) => {
            warn!("'{log_name}': no {block} metrics: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Position and attitude tracking statistics for one (usually cropped) log.
pub fn calculate_hover_metrics(log: &FlightLog, sources: &MetricsSources) -> AnalysisResult<HoverMetrics> {
    let position = optional_block(
        &log.name,
        "position",
        position_error_series(log, sources).map(|e| position_metrics(&e)),
    )?;
    let attitude = optional_block(
        &log.name,
        "attitude",
        attitude_error_series(log, sources).map(|e| attitude_metrics(&e)),
    )?;

    if position.is_none() && attitude.is_none() {
        return Err(AnalysisError::NoMetricSources(log.name.clone()));
    }

    Ok(HoverMetrics {
        log_name: log.name.clone(),
        duration_s: log.duration_s(),
        position,
        attitude,
    })
}
