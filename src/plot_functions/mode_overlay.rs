// src/plot_functions/mode_overlay.rs

use log::debug;
use plotters::style::RGBColor;

use crate::constants::MODE_SPAN_OPACITY;
use crate::data_analysis::flight_modes::{flag_spans, mode_spans, ModeSpan};
use crate::data_input::log_data::{split_element, FieldKind, FieldRef, FlightLog};
use crate::plot_framework::ShadedSpan;

/// Fixed colour per state value so a mode looks the same in every plot.
pub fn mode_color(value: i64) -> RGBColor {
    let palette = &colorous::PASTEL1;
    let c = palette[value.rem_euclid(palette.len() as i64) as usize];
    RGBColor(c.r, c.g, c.b)
}

fn to_shaded(span: ModeSpan) -> ShadedSpan {
    ShadedSpan {
        start: span.start_s,
        end: span.end_s,
        color: mode_color(span.value),
        opacity: MODE_SPAN_OPACITY,
        label: span.label,
    }
}

/// Background spans for the overlay signal: flag fields shade where the flag is on,
/// other fields shade one span per state. Empty if the signal is not in the log.
pub fn mode_overlay_spans(log: &FlightLog, overlay: Option<&FieldRef>) -> Vec<ShadedSpan> {
    let Some(overlay) = overlay else {
        return Vec::new();
    };
    let Some(series) = log.series(&overlay.series) else {
        debug!("No mode overlay for '{}': '{}' not in log", log.name, overlay.series);
        return Vec::new();
    };
    let is_flag = series
        .field(split_element(&overlay.field).0)
        .is_some_and(|f| f.kind == FieldKind::Flag);
    let spans = if is_flag {
        flag_spans(series, &overlay.field)
    } else {
        mode_spans(series, &overlay.field)
    };
    match spans {
        Ok(spans) => spans.into_iter().map(to_shaded).collect(),
        Err(e) => {
            debug!("No mode overlay for '{}': {}", log.name, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::log_data::{FieldColumn, TimeSeries};

    #[test]
    fn test_mode_color_is_stable() {
        assert_eq!(mode_color(14), mode_color(14));
        assert_eq!(mode_color(0), mode_color(colorous::PASTEL1.len() as i64));
        assert_eq!(mode_color(-1), mode_color(colorous::PASTEL1.len() as i64 - 1));
    }

    #[test]
    fn test_overlay_spans() {
        let mut log = FlightLog::new("flight");
        let mut status = TimeSeries::new("vehicle_status", 0, vec![0, 1_000_000, 2_000_000]);
        status.push_field(FieldColumn::scalar("nav_state", FieldKind::Continuous, vec![2.0, 14.0, 14.0]));
        status.push_field(FieldColumn::scalar("armed", FieldKind::Flag, vec![0.0, 1.0, 1.0]));
        log.insert_series(status);

        let spans = mode_overlay_spans(&log, Some(&FieldRef::new("vehicle_status", "nav_state")));
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].label, "Offboard");
        assert_eq!((spans[1].start, spans[1].end), (1.0, 2.0));

        let flags = mode_overlay_spans(&log, Some(&FieldRef::new("vehicle_status", "armed")));
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].label, "armed");

        assert!(mode_overlay_spans(&log, Some(&FieldRef::new("missing", "x"))).is_empty());
        assert!(mode_overlay_spans(&log, None).is_empty());
    }
}
