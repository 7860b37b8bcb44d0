// src/data_analysis/flight_modes.rs

use serde::Serialize;

use crate::constants::FLAG_ON_THRESHOLD;
use crate::data_input::log_data::TimeSeries;
use crate::error::AnalysisResult;

/// Interval during which a state signal held one value. Times in seconds, matching
/// [`TimeSeries::time_seconds`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeSpan {
    pub start_s: f64,
    pub end_s: f64,
    pub value: i64,
    pub label: String,
}

/// Human-readable PX4 navigation state (`vehicle_status.nav_state`).
pub fn nav_state_name(nav_state: u8) -> String {
    let name = match nav_state {
        0 => "Manual",
        1 => "Altitude",
        2 => "Position",
        3 => "Mission",
        4 => "Hold",
        5 => "Return",
        6 => "Position Slow",
        10 => "Acro",
        12 => "Descend",
        13 => "Termination",
        14 => "Offboard",
        15 => "Stabilized",
        17 => "Takeoff",
        18 => "Land",
        19 => "Follow Target",
        20 => "Precision Land",
        21 => "Orbit",
        22 => "VTOL Takeoff",
        23..=30 => return format!("External {}", nav_state - 22),
        _ => return format!("Unknown ({nav_state})"),
    };
    name.to_string()
}

// Groups consecutive samples with the same state. Each span ends where the next begins;
// the last one ends at the final sample. Samples with no state (NaN) are skipped.
fn spans_by_state<F>(times: &[f64], states: &[Option<i64>], label: F) -> Vec<ModeSpan>
where
    F: Fn(i64) -> Option<String>,
{
    let mut spans: Vec<ModeSpan> = Vec::new();
    let mut current: Option<(f64, i64)> = None;
    let close = |spans: &mut Vec<ModeSpan>, start_s: f64, value: i64, end_s: f64| {
        if let Some(label) = label(value) {
            spans.push(ModeSpan {
                start_s,
                end_s,
                value,
                label,
            });
        }
    };

    for (&t, &state) in times.iter().zip(states) {
        let Some(state) = state else { continue };
        match current {
            Some((_, value)) if value == state => {}
            Some((start, value)) => {
                close(&mut spans, start, value, t);
                current = Some((t, state));
            }
            None => current = Some((t, state)),
        }
    }
    if let (Some((start, value)), Some(&last)) = (current, times.last()) {
        close(&mut spans, start, value, last);
    }
    spans
}

/// Contiguous spans of an integer state signal, labelled with the PX4 navigation state name.
pub fn mode_spans(series: &TimeSeries, field_spec: &str) -> AnalysisResult<Vec<ModeSpan>> {
    let values = series.element_values(field_spec)?;
    let states: Vec<Option<i64>> = values
        .iter()
        .map(|v| v.is_finite().then(|| v.round() as i64))
        .collect();
    Ok(spans_by_state(&series.time_seconds(), &states, |value| {
        Some(match u8::try_from(value) {
            Ok(state) => nav_state_name(state),
            Err(_) => format!("Unknown ({value})"),
        })
    }))
}

/// Spans where a boolean flag is on, labelled with the flag name.
pub fn flag_spans(series: &TimeSeries, field_spec: &str) -> AnalysisResult<Vec<ModeSpan>> {
    let values = series.element_values(field_spec)?;
    let states: Vec<Option<i64>> = values
        .iter()
        .map(|v| v.is_finite().then(|| i64::from(*v > FLAG_ON_THRESHOLD)))
        .collect();
    Ok(spans_by_state(&series.time_seconds(), &states, |value| {
        (value == 1).then(|| field_spec.to_string())
    }))
}
