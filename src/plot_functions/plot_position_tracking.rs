// src/plot_functions/plot_position_tracking.rs

use std::error::Error;
use std::path::Path;

use crate::axis_names::POSITION_AXIS_NAMES;
use crate::constants::{COLOR_ESTIMATE, COLOR_SETPOINT, LINE_WIDTH_PLOT};
use crate::data_analysis::hover_metrics::MetricsSources;
use crate::data_input::log_data::{FieldRef, FlightLog};
use crate::plot_framework::{draw_stacked_plot, PlotConfig, PlotSeries};
use crate::plot_functions::mode_overlay::mode_overlay_spans;
use crate::plot_functions::{stacked_plot_path, time_points};

/// Generates the stacked Position Setpoint vs Estimate plot (X, Y, Z), with mode shading.
pub fn plot_position_tracking(
    log: &FlightLog,
    sources: &MetricsSources,
    overlay: Option<&FieldRef>,
    output_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let output_file = stacked_plot_path(output_dir, &log.name, "PositionTracking");
    let plot_type_name = "Position";
    let spans = mode_overlay_spans(log, overlay);

    let estimate = log.series(&sources.position_estimate.series);
    let setpoint = log.series(&sources.position_setpoint.series);
    if estimate.is_none() && setpoint.is_none() {
        println!(
            "\nINFO: Skipping Position Tracking Plot for '{}': neither '{}' nor '{}' is in the log.",
            log.name, sources.position_estimate.series, sources.position_setpoint.series
        );
        return Ok(());
    }

    draw_stacked_plot(
        &output_file,
        &log.name,
        plot_type_name,
        &POSITION_AXIS_NAMES,
        |axis_index| {
            let mut series = Vec::new();
            if let Some(points) =
                setpoint.and_then(|s| time_points(s, &sources.position_setpoint.fields[axis_index]))
            {
                series.push(PlotSeries::line(points, "Setpoint", *COLOR_SETPOINT, LINE_WIDTH_PLOT));
            }
            if let Some(points) =
                estimate.and_then(|s| time_points(s, &sources.position_estimate.fields[axis_index]))
            {
                series.push(PlotSeries::line(points, "Estimate", *COLOR_ESTIMATE, LINE_WIDTH_PLOT));
            }

            let mut config = PlotConfig::fitted(
                format!("{} Position Setpoint vs Estimate", POSITION_AXIS_NAMES[axis_index]),
                series,
                "Time (s)",
                "Position (m)",
            )?;
            config.shaded_spans = spans.clone();
            Some(config)
        },
    )
}
