// src/plot_functions/plot_attitude_tracking.rs

use std::error::Error;
use std::path::Path;

use crate::axis_names::{ATTITUDE_AXIS_NAMES, AXIS_COUNT};
use crate::constants::{COLOR_ESTIMATE, COLOR_SETPOINT, LINE_WIDTH_PLOT};
use crate::data_analysis::hover_metrics::MetricsSources;
use crate::data_analysis::quaternion::{euler_angles, from_px4_row};
use crate::data_input::log_data::{split_element, FieldRef, FlightLog, TimeSeries};
use crate::plot_framework::{draw_stacked_plot, PlotConfig, PlotSeries};
use crate::plot_functions::mode_overlay::mode_overlay_spans;
use crate::plot_functions::stacked_plot_path;
use crate::types::AxisPoints;

/// Roll, pitch and yaw in degrees over time. Invalid quaternions give NaN gaps.
pub fn euler_points(series: &TimeSeries, field_spec: &str) -> Option<AxisPoints> {
    let column = series.field(split_element(field_spec).0)?;
    if column.width() != 4 {
        return None;
    }
    let mut points: AxisPoints = Default::default();
    for (t, row) in series.time_seconds().into_iter().zip(column.values.rows()) {
        let angles = from_px4_row(row)
            .map(|q| euler_angles(&q).map(f64::to_degrees))
            .unwrap_or([f64::NAN; AXIS_COUNT]);
        for (axis, angle) in angles.into_iter().enumerate() {
            points[axis].push((t, angle));
        }
    }
    Some(points)
}

/// Generates the stacked Attitude Setpoint vs Estimate plot (roll, pitch, yaw), with mode shading.
pub fn plot_attitude_tracking(
    log: &FlightLog,
    sources: &MetricsSources,
    overlay: Option<&FieldRef>,
    output_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let output_file = stacked_plot_path(output_dir, &log.name, "AttitudeTracking");
    let plot_type_name = "Attitude";
    let spans = mode_overlay_spans(log, overlay);

    let estimate = log
        .series(&sources.attitude_estimate.series)
        .and_then(|s| euler_points(s, &sources.attitude_estimate.field));
    let setpoint = log
        .series(&sources.attitude_setpoint.series)
        .and_then(|s| euler_points(s, &sources.attitude_setpoint.field));
    if estimate.is_none() && setpoint.is_none() {
        println!(
            "\nINFO: Skipping Attitude Tracking Plot for '{}': no attitude quaternions in the log.",
            log.name
        );
        return Ok(());
    }

    draw_stacked_plot(
        &output_file,
        &log.name,
        plot_type_name,
        &ATTITUDE_AXIS_NAMES,
        move |axis_index| {
            let mut series = Vec::new();
            if let Some(points) = &setpoint {
                series.push(PlotSeries::line(
                    points[axis_index].clone(),
                    "Setpoint",
                    *COLOR_SETPOINT,
                    LINE_WIDTH_PLOT,
                ));
            }
            if let Some(points) = &estimate {
                series.push(PlotSeries::line(
                    points[axis_index].clone(),
                    "Estimate",
                    *COLOR_ESTIMATE,
                    LINE_WIDTH_PLOT,
                ));
            }

            let mut config = PlotConfig::fitted(
                format!("{} Setpoint vs Estimate", ATTITUDE_AXIS_NAMES[axis_index]),
                series,
                "Time (s)",
                "Angle (deg)",
            )?;
            config.shaded_spans = spans.clone();
            Some(config)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::log_data::{FieldColumn, FieldKind};
    use nalgebra::UnitQuaternion;
    use ndarray::Array2;

    #[test]
    fn test_euler_points() {
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5);
        let mut series = TimeSeries::new("vehicle_attitude", 0, vec![0, 1_000_000]);
        series.push_field(FieldColumn::new(
            "q",
            FieldKind::Quaternion,
            Array2::from_shape_vec((2, 4), vec![q.w, q.i, q.j, q.k, 0.0, 0.0, 0.0, 0.0]).unwrap(),
        ));

        let points = euler_points(&series, "q").unwrap();
        assert!((points[2][0].1 - 0.5_f64.to_degrees()).abs() < 1e-9);
        assert!(points[0][0].1.abs() < 1e-9);
        assert_eq!(points[2][1].0, 1.0);
        assert!(points[2][1].1.is_nan());
        assert!(euler_points(&series, "missing").is_none());
    }
}
