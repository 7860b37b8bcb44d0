// src/plot_functions/plot_compare_groups.rs

use plotters::style::colors::BLACK;
use std::error::Error;
use std::path::Path;

use crate::data_analysis::group_summary::GroupSummary;
use crate::data_analysis::hover_metrics::{ErrorStats, HoverMetrics};
use crate::plot_framework::{calculate_range, draw_stacked_plot, PlotConfig, PlotSeries};
use crate::plot_functions::{category_color, stacked_plot_path};

const ROW_NAMES: [&str; 2] = ["Position", "Attitude"];
// Horizontal spread of per-flight markers around the group position.
const FLIGHT_JITTER: f64 = 0.2;

/// Per-flight markers at `group_index ± jitter`.
fn flight_points<F>(flights: &[HoverMetrics], group_index: usize, stat: F) -> Vec<(f64, f64)>
where
    F: Fn(&HoverMetrics) -> Option<ErrorStats>,
{
    let n = flights.len();
    flights
        .iter()
        .enumerate()
        .filter_map(|(i, m)| {
            let offset = if n > 1 {
                -FLIGHT_JITTER + 2.0 * FLIGHT_JITTER * i as f64 / (n - 1) as f64
            } else {
                0.0
            };
            stat(m)
                .filter(|s| !s.is_empty())
                .map(|s| (group_index as f64 + offset, s.rms))
        })
        .collect()
}

/// Plots the RMS position error norm and RMS attitude error of every flight, grouped along
/// the x axis, with the group mean drawn as a black marker.
pub fn plot_compare_groups(
    groups: &[(GroupSummary, Vec<HoverMetrics>)],
    title: &str,
    output_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    if groups.is_empty() {
        println!("\nINFO: Skipping Group Comparison Plot for '{title}': no groups.");
        return Ok(());
    }
    let output_file = stacked_plot_path(output_dir, title, "CompareGroups");
    let plot_type_name = "Group Comparison";
    let names: Vec<String> = groups.iter().map(|(summary, _)| summary.name.clone()).collect();

    draw_stacked_plot(&output_file, title, plot_type_name, &ROW_NAMES, |row| {
        let mut series = Vec::new();
        let mut means = Vec::new();
        for (group_index, (summary, flights)) in groups.iter().enumerate() {
            let (points, mean) = if row == 0 {
                (
                    flight_points(flights, group_index, |m| m.position.map(|p| p.norm)),
                    summary.position_norm.map(|s| s.mean_rms),
                )
            } else {
                (
                    flight_points(flights, group_index, |m| m.attitude.map(|a| a.distance_deg)),
                    summary.attitude_distance_deg.map(|s| s.mean_rms),
                )
            };
            if !points.is_empty() {
                series.push(PlotSeries::markers(points, summary.name.clone(), category_color(group_index)));
            }
            if let Some(mean) = mean {
                means.push((group_index as f64, mean));
            }
        }
        if series.is_empty() {
            return None;
        }
        series.push(PlotSeries::markers(means, "Group mean", BLACK));

        let y_max = series
            .iter()
            .flat_map(|s| s.data.iter().map(|&(_, y)| y))
            .fold(0.0_f64, f64::max);
        let (_, y_hi) = calculate_range(0.0, y_max);
        let (chart_title, y_label) = if row == 0 {
            ("RMS Position Error Norm per Flight", "RMS error (m)")
        } else {
            ("RMS Attitude Error per Flight", "RMS error (deg)")
        };
        Some(PlotConfig {
            title: chart_title.to_string(),
            x_range: -0.5..(names.len() as f64 - 0.5),
            y_range: 0.0..y_hi,
            series,
            x_label: "Group".to_string(),
            y_label: y_label.to_string(),
            shaded_spans: Vec::new(),
            x_tick_labels: Some(names.clone()),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_analysis::hover_metrics::PositionMetrics;

    fn flight(rms: f64) -> HoverMetrics {
        let stats = ErrorStats {
            mean: 0.0,
            rms,
            max_abs: rms * 2.0,
            samples: 5,
        };
        HoverMetrics {
            log_name: format!("flight_{rms}"),
            duration_s: 10.0,
            position: Some(PositionMetrics {
                axes: [stats; 3],
                norm: stats,
            }),
            attitude: None,
        }
    }

    #[test]
    fn test_flight_points_spread_around_group() {
        let flights = vec![flight(0.1), flight(0.2), flight(0.3)];
        let points = flight_points(&flights, 2, |m| m.position.map(|p| p.norm));
        assert_eq!(points.len(), 3);
        assert!((points[0].0 - 1.8).abs() < 1e-12);
        assert!((points[1].0 - 2.0).abs() < 1e-12);
        assert!((points[2].0 - 2.2).abs() < 1e-12);
        assert_eq!(points[2].1, 0.3);

        let single = flight_points(&flights[..1], 0, |m| m.position.map(|p| p.norm));
        assert_eq!(single, vec![(0.0, 0.1)]);
        assert!(flight_points(&flights, 0, |m| m.attitude.map(|a| a.distance_deg)).is_empty());
    }
}
