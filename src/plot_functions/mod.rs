// src/plot_functions/mod.rs

pub mod mode_overlay;
pub mod plot_attitude_tracking;
pub mod plot_compare_flights;
pub mod plot_compare_groups;
pub mod plot_hover_error;
pub mod plot_position_tracking;

use plotters::style::RGBColor;
use std::path::{Path, PathBuf};

use crate::data_input::log_data::TimeSeries;
use crate::types::TimePoints;

/// `(time_s, value)` pairs of one field element, or `None` if the field is missing.
pub fn time_points(series: &TimeSeries, field_spec: &str) -> Option<TimePoints> {
    let values = series.element_values(field_spec).ok()?;
    Some(series.time_seconds().into_iter().zip(values).collect())
}

/// Distinct colour for the n-th flight or group in comparison plots.
pub fn category_color(index: usize) -> RGBColor {
    let palette = &colorous::CATEGORY10;
    let c = palette[index % palette.len()];
    RGBColor(c.r, c.g, c.b)
}

pub fn stacked_plot_path(output_dir: &Path, root_name: &str, plot_name: &str) -> PathBuf {
    output_dir.join(format!("{root_name}_{plot_name}_stacked.png"))
}
