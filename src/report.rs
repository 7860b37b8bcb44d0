// src/report.rs

//! Metrics tables: CSV (one row per flight or group), JSON (full structure) and console output.

use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::axis_names::{position_axis_short, AXIS_COUNT};
use crate::data_analysis::group_summary::{GroupSummary, StatSummary};
use crate::data_analysis::hover_metrics::{ErrorStats, HoverMetrics};
use crate::error::AnalysisResult;

const ATTITUDE_AXIS_SHORT: [&str; AXIS_COUNT] = ["roll", "pitch", "yaw"];

#[derive(Debug, Serialize)]
pub struct MetricsReport<'a> {
    pub tool_version: &'a str,
    pub flights: &'a [HoverMetrics],
    pub groups: &'a [GroupSummary],
}

fn number(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.6}")
    } else {
        String::new()
    }
}

// Column prefixes in output order, paired with how to pick each block from a flight.
fn stat_blocks(metrics: &HoverMetrics) -> Vec<(String, Option<ErrorStats>)> {
    let mut blocks = Vec::with_capacity(2 * AXIS_COUNT + 2);
    for axis in 0..AXIS_COUNT {
        blocks.push((
            format!("pos_{}_m", position_axis_short(axis)),
            metrics.position.map(|p| p.axes[axis]),
        ));
    }
    blocks.push(("pos_norm_m".to_string(), metrics.position.map(|p| p.norm)));
    for (axis, name) in ATTITUDE_AXIS_SHORT.iter().enumerate() {
        blocks.push((format!("att_{name}_deg"), metrics.attitude.map(|a| a.axes_deg[axis])));
    }
    blocks.push(("att_dist_deg".to_string(), metrics.attitude.map(|a| a.distance_deg)));
    blocks
}

pub fn metrics_csv_header() -> Vec<String> {
    let empty = HoverMetrics {
        log_name: String::new(),
        duration_s: 0.0,
        position: None,
        attitude: None,
    };
    let mut header = vec!["log".to_string(), "duration_s".to_string()];
    for (prefix, _) in stat_blocks(&empty) {
        for stat in ["mean", "rms", "max_abs"] {
            header.push(format!("{prefix}_{stat}"));
        }
    }
    header
}

pub fn metrics_csv_record(metrics: &HoverMetrics) -> Vec<String> {
    let mut record = vec![metrics.log_name.clone(), number(metrics.duration_s)];
    for (_, stats) in stat_blocks(metrics) {
        match stats {
            Some(s) => record.extend([number(s.mean), number(s.rms), number(s.max_abs)]),
            None => record.extend([String::new(), String::new(), String::new()]),
        }
    }
    record
}

pub fn write_metrics_csv(metrics: &[HoverMetrics], path: &Path) -> AnalysisResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(metrics_csv_header())?;
    for m in metrics {
        wtr.write_record(metrics_csv_record(m))?;
    }
    wtr.flush()?;
    Ok(())
}

fn group_blocks(summary: &GroupSummary) -> Vec<(String, Option<StatSummary>)> {
    let mut blocks = Vec::with_capacity(2 * AXIS_COUNT + 2);
    for axis in 0..AXIS_COUNT {
        blocks.push((format!("pos_{}_m", position_axis_short(axis)), summary.position_axes[axis]));
    }
    blocks.push(("pos_norm_m".to_string(), summary.position_norm));
    for (axis, name) in ATTITUDE_AXIS_SHORT.iter().enumerate() {
        blocks.push((format!("att_{name}_deg"), summary.attitude_axes_deg[axis]));
    }
    blocks.push(("att_dist_deg".to_string(), summary.attitude_distance_deg));
    blocks
}

pub fn write_group_csv(groups: &[GroupSummary], path: &Path) -> AnalysisResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["group".to_string(), "flights".to_string()];
    if let Some(first) = groups.first() {
        for (prefix, _) in group_blocks(first) {
            for stat in ["mean_rms", "mean_max_abs", "worst_max_abs"] {
                header.push(format!("{prefix}_{stat}"));
            }
        }
    }
    wtr.write_record(&header)?;
    for summary in groups {
        let mut record = vec![summary.name.clone(), summary.flights.to_string()];
        for (_, stats) in group_blocks(summary) {
            match stats {
                Some(s) => record.extend([number(s.mean_rms), number(s.mean_max_abs), number(s.worst_max_abs)]),
                None => record.extend([String::new(), String::new(), String::new()]),
            }
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_metrics_json(report: &MetricsReport<'_>, path: &Path) -> AnalysisResult<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Writes `<name>_metrics.csv`, `<name>_metrics.json` and, for grouped runs,
/// `<name>_groups.csv` into `output_dir`. Returns the files written.
pub fn write_report(
    output_dir: &Path,
    name: &str,
    flights: &[HoverMetrics],
    groups: &[GroupSummary],
) -> AnalysisResult<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    let csv_path = output_dir.join(format!("{name}_metrics.csv"));
    write_metrics_csv(flights, &csv_path)?;
    written.push(csv_path);

    if !groups.is_empty() {
        let group_path = output_dir.join(format!("{name}_groups.csv"));
        write_group_csv(groups, &group_path)?;
        written.push(group_path);
    }

    let json_path = output_dir.join(format!("{name}_metrics.json"));
    let report = MetricsReport {
        tool_version: crate::crate_version(),
        flights,
        groups,
    };
    write_metrics_json(&report, &json_path)?;
    written.push(json_path);

    info!("Report '{}': {} file(s) in '{}'", name, written.len(), output_dir.display());
    Ok(written)
}

fn cell(stats: Option<f64>) -> String {
    match stats {
        Some(v) if v.is_finite() => format!("{v:>10.3}"),
        _ => format!("{:>10}", "-"),
    }
}

/// Console summary, one line per flight.
pub fn print_metrics_table(metrics: &[HoverMetrics]) {
    println!(
        "\n{:<28} {:>8} {:>10} {:>10} {:>10} {:>10}",
        "Flight", "Dur (s)", "Pos RMS", "Pos max", "Att RMS", "Att max"
    );
    println!("{:<28} {:>8} {:>10} {:>10} {:>10} {:>10}", "", "", "(m)", "(m)", "(deg)", "(deg)");
    for m in metrics {
        let position = m.position.map(|p| p.norm);
        let attitude = m.attitude.map(|a| a.distance_deg);
        println!(
            "{:<28} {:>8.1} {} {} {} {}",
            m.log_name,
            m.duration_s,
            cell(position.map(|s| s.rms)),
            cell(position.map(|s| s.max_abs)),
            cell(attitude.map(|s| s.rms)),
            cell(attitude.map(|s| s.max_abs)),
        );
    }
}

/// Console summary, one line per group.
pub fn print_group_table(groups: &[GroupSummary]) {
    println!(
        "\n{:<20} {:>7} {:>10} {:>10} {:>10} {:>10}",
        "Group", "Flights", "Pos RMS", "Pos worst", "Att RMS", "Att worst"
    );
    for g in groups {
        println!(
            "{:<20} {:>7} {} {} {} {}",
            g.name,
            g.flights,
            cell(g.position_norm.map(|s| s.mean_rms)),
            cell(g.position_norm.map(|s| s.worst_max_abs)),
            cell(g.attitude_distance_deg.map(|s| s.mean_rms)),
            cell(g.attitude_distance_deg.map(|s| s.worst_max_abs)),
        );
    }
}
