// src/data_analysis/group_summary.rs

use serde::Serialize;

use crate::axis_names::AXIS_COUNT;
use crate::data_analysis::hover_metrics::{ErrorStats, HoverMetrics};

/// One metric aggregated over the flights of a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatSummary {
    pub mean_rms: f64,
    pub mean_max_abs: f64,
    pub worst_max_abs: f64,
    pub flights: usize,
}

impl StatSummary {
    /// Aggregates per-flight statistics, ignoring flights without samples.
    /// Returns `None` when no flight contributes.
    pub fn from_stats<'a, I: IntoIterator<Item = &'a ErrorStats>>(stats: I) -> Option<Self> {
        let stats: Vec<&ErrorStats> = stats.into_iter().filter(|s| !s.is_empty()).collect();
        if stats.is_empty() {
            return None;
        }
        let n = stats.len() as f64;
        Some(Self {
            mean_rms: stats.iter().map(|s| s.rms).sum::<f64>() / n,
            mean_max_abs: stats.iter().map(|s| s.max_abs).sum::<f64>() / n,
            worst_max_abs: stats.iter().map(|s| s.max_abs).fold(f64::NEG_INFINITY, f64::max),
            flights: stats.len(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub flights: usize,
    pub position_axes: [Option<StatSummary>; AXIS_COUNT],
    pub position_norm: Option<StatSummary>,
    pub attitude_axes_deg: [Option<StatSummary>; AXIS_COUNT],
    pub attitude_distance_deg: Option<StatSummary>,
}

/// Averages the per-flight metrics of one group.
pub fn summarize_group(name: &str, metrics: &[HoverMetrics]) -> GroupSummary {
    let positions: Vec<_> = metrics.iter().filter_map(|m| m.position.as_ref()).collect();
    let attitudes: Vec<_> = metrics.iter().filter_map(|m| m.attitude.as_ref()).collect();

    GroupSummary {
        name: name.to_string(),
        flights: metrics.len(),
        position_axes: std::array::from_fn(|axis| StatSummary::from_stats(positions.iter().map(|p| &p.axes[axis]))),
        position_norm: StatSummary::from_stats(positions.iter().map(|p| &p.norm)),
        attitude_axes_deg: std::array::from_fn(|axis| {
            StatSummary::from_stats(attitudes.iter().map(|a| &a.axes_deg[axis]))
        }),
        attitude_distance_deg: StatSummary::from_stats(attitudes.iter().map(|a| &a.distance_deg)),
    }
}
