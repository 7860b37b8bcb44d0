// src/plot_functions/plot_hover_error.rs

use std::error::Error;
use std::path::Path;

use crate::axis_names::{ATTITUDE_AXIS_NAMES, POSITION_AXIS_NAMES};
use crate::constants::{COLOR_ATTITUDE_ERROR, COLOR_AXIS, COLOR_ERROR_NORM, LINE_WIDTH_LEGEND, LINE_WIDTH_PLOT};
use crate::data_analysis::hover_metrics::{
    attitude_error_series, attitude_metrics, position_error_series, position_metrics, MetricsSources,
};
use crate::data_input::log_data::{FieldRef, FlightLog};
use crate::plot_framework::{draw_stacked_plot, PlotConfig, PlotSeries};
use crate::plot_functions::mode_overlay::mode_overlay_spans;
use crate::plot_functions::stacked_plot_path;

const ROW_NAMES: [&str; 2] = ["Position", "Attitude"];

fn zip_time(time_s: &[f64], values: &[f64]) -> Vec<(f64, f64)> {
    time_s.iter().copied().zip(values.iter().copied()).collect()
}

/// Generates the stacked Hover Error plot: per-axis and norm position error on top,
/// per-axis and geodesic attitude error below.
pub fn plot_hover_error(
    log: &FlightLog,
    sources: &MetricsSources,
    overlay: Option<&FieldRef>,
    output_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let output_file = stacked_plot_path(output_dir, &log.name, "HoverError");
    let plot_type_name = "Hover Error";
    let spans = mode_overlay_spans(log, overlay);

    let position = position_error_series(log, sources).ok();
    let attitude = attitude_error_series(log, sources).ok();
    if position.is_none() && attitude.is_none() {
        println!(
            "\nINFO: Skipping Hover Error Plot for '{}': no setpoint/estimate pairs in the log.",
            log.name
        );
        return Ok(());
    }

    draw_stacked_plot(&output_file, &log.name, plot_type_name, &ROW_NAMES, |row| {
        let mut config = match row {
            0 => {
                let errors = position.as_ref()?;
                let metrics = position_metrics(errors);
                let mut series: Vec<PlotSeries> = POSITION_AXIS_NAMES
                    .iter()
                    .enumerate()
                    .map(|(axis, name)| {
                        PlotSeries::line(
                            zip_time(&errors.time_s, &errors.axes[axis]),
                            format!("{name} (RMS {:.3} m)", metrics.axes[axis].rms),
                            *COLOR_AXIS[axis],
                            LINE_WIDTH_PLOT,
                        )
                    })
                    .collect();
                series.push(PlotSeries::line(
                    zip_time(&errors.time_s, &errors.norm),
                    format!("Norm (RMS {:.3} m, max {:.3} m)", metrics.norm.rms, metrics.norm.max_abs),
                    *COLOR_ERROR_NORM,
                    LINE_WIDTH_LEGEND,
                ));
                PlotConfig::fitted(
                    "Position Error (Setpoint - Estimate)",
                    series,
                    "Time (s)",
                    "Error (m)",
                )?
            }
            _ => {
                let errors = attitude.as_ref()?;
                let metrics = attitude_metrics(errors);
                let mut series: Vec<PlotSeries> = ATTITUDE_AXIS_NAMES
                    .iter()
                    .enumerate()
                    .map(|(axis, name)| {
                        PlotSeries::line(
                            zip_time(&errors.time_s, &errors.axes_deg[axis]),
                            format!("{name} (RMS {:.2} deg)", metrics.axes_deg[axis].rms),
                            *COLOR_AXIS[axis],
                            LINE_WIDTH_PLOT,
                        )
                    })
                    .collect();
                series.push(PlotSeries::line(
                    zip_time(&errors.time_s, &errors.distance_deg),
                    format!(
                        "Geodesic (RMS {:.2} deg, max {:.2} deg)",
                        metrics.distance_deg.rms, metrics.distance_deg.max_abs
                    ),
                    *COLOR_ATTITUDE_ERROR,
                    LINE_WIDTH_LEGEND,
                ));
                PlotConfig::fitted("Attitude Error", series, "Time (s)", "Error (deg)")?
            }
        };
        config.shaded_spans = spans.clone();
        Some(config)
    })
}
