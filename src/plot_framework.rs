// src/plot_framework.rs

use plotters::backend::BitMapBackend;
use plotters::chart::{ChartBuilder, SeriesLabelPosition};
use plotters::coord::Shift;
use plotters::drawing::{DrawingArea, IntoDrawingArea};
use plotters::element::{Circle, PathElement, Rectangle, Text};
use plotters::series::LineSeries;
use plotters::style::colors::{BLACK, RED, WHITE};
use plotters::style::{Color, IntoFont, RGBColor};

use std::error::Error;
use std::ops::Range;
use std::path::Path;

use crate::constants::{
    FONT_SIZE_AXIS_LABEL, FONT_SIZE_CHART_TITLE, FONT_SIZE_LEGEND, FONT_SIZE_MAIN_TITLE, FONT_SIZE_MESSAGE,
    LINE_WIDTH_LEGEND, PLOT_HEIGHT, PLOT_WIDTH,
};

const MARKER_RADIUS: i32 = 4;

/// Calculate plot range with padding.
/// Adds 15% padding, or a fixed padding for very small ranges.
pub fn calculate_range(min_val: f64, max_val: f64) -> (f64, f64) {
    let (min, max) = if min_val <= max_val {
        (min_val, max_val)
    } else {
        (max_val, min_val)
    };
    let range = (max - min).abs();
    let padding = if range < 1e-6 { 0.5 } else { range * 0.15 };
    (min - padding, max + padding)
}

/// Axis tick label: `k`/`M` suffixes for large values, two decimals below one,
/// one decimal for fractional values below ten.
pub fn format_tick_label(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if magnitude >= 1000.0 {
        format!("{:.0}k", value / 1000.0)
    } else if magnitude == 0.0 {
        "0".to_string()
    } else if magnitude < 1.0 {
        format!("{value:.2}")
    } else if magnitude < 10.0 && value.fract() != 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.0}")
    }
}

/// Draw a "Data Unavailable" message on a plot area.
pub fn draw_unavailable_message(
    area: &DrawingArea<BitMapBackend, Shift>,
    row_name: &str,
    plot_type: &str,
    reason: &str,
) -> Result<(), Box<dyn Error>> {
    // Constants for text rendering
    const CHAR_WIDTH_RATIO: f32 = 0.6; // Approximate character width relative to font size
    const LINE_HEIGHT_SPACING: i32 = 4;

    let (x_range, y_range) = area.get_pixel_range();
    let (width, height) = (
        (x_range.end - x_range.start) as u32,
        (y_range.end - y_range.start) as u32,
    );
    let message = format!("{row_name} {plot_type} Data Unavailable:\n{reason}");

    let estimated_char_width = (FONT_SIZE_MESSAGE as f32 * CHAR_WIDTH_RATIO) as i32;
    let estimated_line_height = FONT_SIZE_MESSAGE + LINE_HEIGHT_SPACING;

    let lines: Vec<&str> = message.split('\n').collect();
    let max_line_length = lines.iter().map(|line| line.len()).max().unwrap_or(0);
    let estimated_text_width = max_line_length.saturating_mul(estimated_char_width as usize) as i32;
    let estimated_text_height = lines.len().saturating_mul(estimated_line_height as usize) as i32;

    let center_x = width as i32 / 2 - estimated_text_width / 2;
    let center_y = height as i32 / 2 - estimated_text_height / 2;

    let text_style = ("sans-serif", FONT_SIZE_MESSAGE).into_font().color(&RED);
    area.draw(&Text::new(message, (center_x, center_y), text_style))?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesStyle {
    #[default]
    Line,
    Markers,
}

#[derive(Clone)]
pub struct PlotSeries {
    pub data: Vec<(f64, f64)>,
    pub label: String,
    pub color: RGBColor,
    pub stroke_width: u32,
    pub style: SeriesStyle,
}

impl PlotSeries {
    pub fn line(data: Vec<(f64, f64)>, label: impl Into<String>, color: RGBColor, stroke_width: u32) -> Self {
        Self {
            data,
            label: label.into(),
            color,
            stroke_width,
            style: SeriesStyle::Line,
        }
    }

    pub fn markers(data: Vec<(f64, f64)>, label: impl Into<String>, color: RGBColor) -> Self {
        Self {
            data,
            label: label.into(),
            color,
            stroke_width: 1,
            style: SeriesStyle::Markers,
        }
    }
}

/// A time span shaded behind the data (e.g. a flight mode).
#[derive(Clone)]
pub struct ShadedSpan {
    pub start: f64,
    pub end: f64,
    pub color: RGBColor,
    pub opacity: f64, // 0.0 to 1.0
    pub label: String,
}

#[derive(Clone)]
pub struct PlotConfig {
    pub title: String,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
    pub series: Vec<PlotSeries>,
    pub x_label: String,
    pub y_label: String,
    pub shaded_spans: Vec<ShadedSpan>,
    /// Category names for integer x positions (group comparison plots).
    pub x_tick_labels: Option<Vec<String>>,
}

impl PlotConfig {
    /// Config with ranges fitted to the series: the x range spans the data, the y range
    /// is padded with [`calculate_range`]. `None` if no series has a finite point.
    pub fn fitted(
        title: impl Into<String>,
        series: Vec<PlotSeries>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Option<Self> {
        let (x_range, y_range) = data_ranges(&series)?;
        Some(Self {
            title: title.into(),
            x_range,
            y_range,
            series,
            x_label: x_label.into(),
            y_label: y_label.into(),
            shaded_spans: Vec::new(),
            x_tick_labels: None,
        })
    }
}

/// Ranges covering every finite point of the series.
pub fn data_ranges(series: &[PlotSeries]) -> Option<(Range<f64>, Range<f64>)> {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &(x, y) in series.iter().flat_map(|s| s.data.iter()) {
        if x.is_finite() && y.is_finite() {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }
    if !x_min.is_finite() {
        return None;
    }
    if x_max - x_min < 1e-9 {
        x_min -= 0.5;
        x_max += 0.5;
    }
    let (y_lo, y_hi) = calculate_range(y_min, y_max);
    Some((x_min..x_max, y_lo..y_hi))
}

/// Splits a series at non-finite values so gaps are not bridged by a line.
pub fn finite_segments(data: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for &(x, y) in data {
        if x.is_finite() && y.is_finite() {
            current.push((x, y));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn category_label(x: f64, names: &[String]) -> String {
    let index = x.round();
    if (x - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    names.get(index as usize).cloned().unwrap_or_default()
}

/// Draws a single chart from a PlotConfig: shaded spans first, then the series, then the legend.
pub fn draw_single_chart(
    area: &DrawingArea<BitMapBackend, Shift>,
    plot_config: &PlotConfig,
) -> Result<(), Box<dyn Error>> {
    let mut chart = ChartBuilder::on(area)
        .caption(&plot_config.title, ("sans-serif", FONT_SIZE_CHART_TITLE))
        .margin(5)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(plot_config.x_range.clone(), plot_config.y_range.clone())?;

    let x_formatter = |x: &f64| match &plot_config.x_tick_labels {
        Some(names) => category_label(*x, names),
        None => format_tick_label(*x),
    };
    let y_formatter = |y: &f64| format_tick_label(*y);
    let x_label_count = plot_config
        .x_tick_labels
        .as_ref()
        .map_or(20, |names| names.len().max(1) * 2 + 1);

    chart
        .configure_mesh()
        .x_desc(&plot_config.x_label)
        .y_desc(&plot_config.y_label)
        .x_labels(x_label_count)
        .y_labels(10)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .light_line_style(WHITE.mix(0.7))
        .label_style(("sans-serif", FONT_SIZE_AXIS_LABEL))
        .draw()?;

    // Shading goes under the data.
    for span in &plot_config.shaded_spans {
        let start = span.start.max(plot_config.x_range.start);
        let end = span.end.min(plot_config.x_range.end);
        if end <= start {
            continue;
        }
        chart.draw_series(std::iter::once(Rectangle::new(
            [(start, plot_config.y_range.start), (end, plot_config.y_range.end)],
            span.color.mix(span.opacity).filled(),
        )))?;
    }

    let mut legend_series_count = 0;

    for s in &plot_config.series {
        let color = s.color;
        match s.style {
            SeriesStyle::Line => {
                let segments = finite_segments(&s.data);
                for (segment_index, segment) in segments.into_iter().enumerate() {
                    let drawn = chart.draw_series(LineSeries::new(segment, color.stroke_width(s.stroke_width)))?;
                    // One legend entry per series, attached to its first segment.
                    if segment_index == 0 && !s.label.is_empty() {
                        drawn.label(&s.label).legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(LINE_WIDTH_LEGEND))
                        });
                        legend_series_count += 1;
                    }
                }
            }
            SeriesStyle::Markers => {
                let points: Vec<(f64, f64)> = s
                    .data
                    .iter()
                    .copied()
                    .filter(|(x, y)| x.is_finite() && y.is_finite())
                    .collect();
                if points.is_empty() {
                    continue;
                }
                let drawn = chart.draw_series(
                    points
                        .into_iter()
                        .map(move |p| Circle::new(p, MARKER_RADIUS, color.filled())),
                )?;
                if !s.label.is_empty() {
                    drawn
                        .label(&s.label)
                        .legend(move |(x, y)| Circle::new((x + 10, y), MARKER_RADIUS, color.filled()));
                    legend_series_count += 1;
                }
            }
        }
    }

    // Span labels go at the end of the legend, once per label.
    let mut labelled: Vec<&str> = Vec::new();
    for span in &plot_config.shaded_spans {
        if span.label.is_empty() || labelled.contains(&span.label.as_str()) {
            continue;
        }
        labelled.push(&span.label);
        let rect_color = span.color.mix(0.4);
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(plot_config.x_range.start, plot_config.y_range.start)],
                rect_color.stroke_width(0),
            )))?
            .label(&span.label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], rect_color.filled()));
        legend_series_count += 1;
    }

    if legend_series_count > 0 {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", FONT_SIZE_LEGEND))
            .draw()?;
    }
    Ok(())
}

/// Renders one PNG with a row per entry of `row_names`, stacked vertically.
/// Rows for which `get_row_config` returns `None`, or whose config has no drawable data,
/// show a placeholder message instead.
pub fn draw_stacked_plot<F>(
    output_path: &Path,
    root_name: &str,
    plot_type_name: &str,
    row_names: &[&str],
    mut get_row_config: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(usize) -> Option<PlotConfig>,
{
    let root_area = BitMapBackend::new(output_path, (PLOT_WIDTH, PLOT_HEIGHT)).into_drawing_area();
    root_area.fill(&WHITE)?;
    root_area.draw(&Text::new(
        root_name,
        (10, 10),
        ("sans-serif", FONT_SIZE_MAIN_TITLE).into_font().color(&BLACK),
    ))?;
    let margined_root_area = root_area.margin(50, 5, 5, 5);
    let sub_plot_areas = margined_root_area.split_evenly((row_names.len().max(1), 1));
    let mut any_row_plotted = false;

    for (row_index, (area, row_name)) in sub_plot_areas.iter().zip(row_names).enumerate() {
        match get_row_config(row_index) {
            Some(plot_config) => {
                let has_data = plot_config
                    .series
                    .iter()
                    .any(|s| s.data.iter().any(|(x, y)| x.is_finite() && y.is_finite()));
                let valid_ranges = plot_config.x_range.end > plot_config.x_range.start
                    && plot_config.y_range.end > plot_config.y_range.start;
                if has_data && valid_ranges {
                    draw_single_chart(area, &plot_config)?;
                    any_row_plotted = true;
                } else {
                    let reason = if !has_data { "No data points" } else { "Invalid ranges" };
                    draw_unavailable_message(area, row_name, plot_type_name, reason)?;
                }
            }
            None => {
                draw_unavailable_message(area, row_name, plot_type_name, "Topic or field not in log")?;
            }
        }
    }

    root_area.present()?;
    if any_row_plotted {
        println!("  Stacked plot saved as '{}'.", output_path.display());
    } else {
        println!(
            "  '{}' holds only placeholder messages: no data available for any row.",
            output_path.display()
        );
    }
    Ok(())
}
