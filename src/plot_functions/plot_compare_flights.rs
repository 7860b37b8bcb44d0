// src/plot_functions/plot_compare_flights.rs

use std::error::Error;
use std::path::Path;

use crate::axis_names::POSITION_AXIS_NAMES;
use crate::constants::LINE_WIDTH_PLOT;
use crate::data_analysis::hover_metrics::{
    attitude_error_series, position_error_series, AttitudeErrorSeries, MetricsSources, PositionErrorSeries,
};
use crate::data_input::log_data::FlightLog;
use crate::plot_framework::{draw_stacked_plot, PlotConfig, PlotSeries};
use crate::plot_functions::{category_color, stacked_plot_path};

const ROW_NAMES: [&str; 4] = ["X (North)", "Y (East)", "Z (Down)", "Attitude"];

/// Overlays the position error of each flight per axis, plus the attitude geodesic error,
/// one colour per flight. Flights are expected to be cropped to comparable windows.
pub fn plot_compare_flights(
    logs: &[FlightLog],
    sources: &MetricsSources,
    title: &str,
    output_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    if logs.is_empty() {
        println!("\nINFO: Skipping Flight Comparison Plot for '{title}': no flights.");
        return Ok(());
    }
    let output_file = stacked_plot_path(output_dir, title, "CompareFlights");
    let plot_type_name = "Flight Comparison";

    let errors: Vec<(&str, Option<PositionErrorSeries>, Option<AttitudeErrorSeries>)> = logs
        .iter()
        .map(|log| {
            (
                log.name.as_str(),
                position_error_series(log, sources).ok(),
                attitude_error_series(log, sources).ok(),
            )
        })
        .collect();

    draw_stacked_plot(&output_file, title, plot_type_name, &ROW_NAMES, |row| {
        let mut series = Vec::new();
        for (flight_index, (name, position, attitude)) in errors.iter().enumerate() {
            let data: Option<Vec<(f64, f64)>> = if row < POSITION_AXIS_NAMES.len() {
                position.as_ref().map(|e| {
                    e.time_s
                        .iter()
                        .copied()
                        .zip(e.axes[row].iter().copied())
                        .collect()
                })
            } else {
                attitude.as_ref().map(|e| {
                    e.time_s
                        .iter()
                        .copied()
                        .zip(e.distance_deg.iter().copied())
                        .collect()
                })
            };
            if let Some(data) = data {
                series.push(PlotSeries::line(
                    data,
                    name.to_string(),
                    category_color(flight_index),
                    LINE_WIDTH_PLOT,
                ));
            }
        }
        let (chart_title, y_label) = if row < POSITION_AXIS_NAMES.len() {
            (format!("{} Position Error", ROW_NAMES[row]), "Error (m)")
        } else {
            ("Attitude Geodesic Error".to_string(), "Error (deg)")
        };
        PlotConfig::fitted(chart_title, series, "Time (s)", y_label)
    })
}
