// tests/ulog_pipeline_test.rs
//
// Builds a small synthetic ULog hover flight and runs it through
// parse -> crop -> metrics -> report.

use std::fs;
use std::path::Path;

use px4_hover_analysis::data_analysis::crop::{crop_log, crop_log_group, CropOptions};
use px4_hover_analysis::data_analysis::hover_metrics::{calculate_hover_metrics, MetricsSources};
use px4_hover_analysis::data_input::log_data::FieldRef;
use px4_hover_analysis::data_input::log_parser::{parse_log_file, parse_log_group};
use px4_hover_analysis::error::AnalysisError;
use px4_hover_analysis::report::write_report;
use tempfile::tempdir;

// "ULog" followed by 0x01 0x12 0x35.
const ULOG_MAGIC: [u8; 7] = [0x55, 0x4c, 0x6f, 0x67, 0x01, 0x12, 0x35];
const T0_US: u64 = 1_000_000;
const YAW_SETPOINT_DEG: f64 = 10.0;

struct ULogBuilder {
    bytes: Vec<u8>,
}

impl ULogBuilder {
    fn new() -> Self {
        let mut bytes = ULOG_MAGIC.to_vec();
        bytes.push(1);
        bytes.extend_from_slice(&0u64.to_le_bytes());
        let mut builder = Self { bytes };
        // Flag bits: no compat/incompat flags, no appended data.
        builder.message(b'B', &[0u8; 40]);
        builder
    }

    fn message(&mut self, msg_type: u8, payload: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        self.bytes.push(msg_type);
        self.bytes.extend_from_slice(payload);
        self
    }

    fn format(&mut self, definition: &str) -> &mut Self {
        self.message(b'F', definition.as_bytes())
    }

    fn info_text(&mut self, key: &str, value: &str) -> &mut Self {
        let key = format!("char[{}] {}", value.len(), key);
        let mut payload = vec![key.len() as u8];
        payload.extend_from_slice(key.as_bytes());
        payload.extend_from_slice(value.as_bytes());
        self.message(b'I', &payload)
    }

    fn subscribe(&mut self, msg_id: u16, name: &str) -> &mut Self {
        let mut payload = vec![0u8];
        payload.extend_from_slice(&msg_id.to_le_bytes());
        payload.extend_from_slice(name.as_bytes());
        self.message(b'A', &payload)
    }

    fn data(&mut self, msg_id: u16, timestamp_us: u64, body: &[u8]) -> &mut Self {
        let mut payload = msg_id.to_le_bytes().to_vec();
        payload.extend_from_slice(&timestamp_us.to_le_bytes());
        payload.extend_from_slice(body);
        self.message(b'D', &payload)
    }

    fn logged(&mut self, timestamp_us: u64, text: &str) -> &mut Self {
        let mut payload = vec![b'6'];
        payload.extend_from_slice(&timestamp_us.to_le_bytes());
        payload.extend_from_slice(text.as_bytes());
        self.message(b'L', &payload)
    }

    fn write(&self, path: &Path) {
        fs::write(path, &self.bytes).unwrap();
    }
}

fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Ten seconds of hover at 10 Hz with offboard active from 2 s to 8 s.
/// The setpoint sits 0.1 m north of the estimate and 10 degrees of yaw away from it.
fn hover_flight() -> ULogBuilder {
    let mut ulog = ULogBuilder::new();
    ulog.format("vehicle_control_mode:uint64_t timestamp;bool flag_control_offboard_enabled;uint8_t[7] _padding0;")
        .format("vehicle_local_position:uint64_t timestamp;float x;float y;float z;")
        .format("trajectory_setpoint:uint64_t timestamp;float[3] position;")
        .format("vehicle_attitude:uint64_t timestamp;float[4] q;")
        .format("vehicle_attitude_setpoint:uint64_t timestamp;float[4] q_d;")
        .info_text("ver_hw", "PX4_SITL")
        .subscribe(0, "vehicle_control_mode")
        .subscribe(1, "vehicle_local_position")
        .subscribe(2, "trajectory_setpoint")
        .subscribe(3, "vehicle_attitude")
        .subscribe(4, "vehicle_attitude_setpoint");

    let half_yaw = (YAW_SETPOINT_DEG / 2.0).to_radians();
    let q_d = floats(&[half_yaw.cos() as f32, 0.0, 0.0, half_yaw.sin() as f32]);
    let identity = floats(&[1.0, 0.0, 0.0, 0.0]);

    for step in 0..=100u64 {
        let t = T0_US + step * 100_000;
        if step % 5 == 0 {
            let offboard = (20..80).contains(&step);
            let mut body = vec![u8::from(offboard)];
            body.extend_from_slice(&[0u8; 7]);
            ulog.data(0, t, &body);
        }
        ulog.data(1, t, &floats(&[0.0, 0.0, -2.0]));
        ulog.data(3, t, &identity);
        if step % 2 == 0 {
            ulog.data(2, t, &floats(&[0.1, 0.0, -2.0]));
            ulog.data(4, t, &q_d);
        }
    }
    ulog.logged(T0_US + 1_000_000, "Armed")
        .logged(T0_US + 5_000_000, "Hovering");
    ulog
}

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() < tolerance,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_parse_synthetic_flight() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hover.ulg");
    hover_flight().write(&path);

    let log = parse_log_file(&path).unwrap();
    assert_eq!(log.name, "hover");
    assert_eq!(log.series.len(), 5);
    assert_eq!(log.series["vehicle_local_position"].len(), 101);
    assert_eq!(log.series["trajectory_setpoint"].len(), 51);
    assert_eq!(log.series["vehicle_control_mode"].len(), 21);
    assert_eq!(log.messages.len(), 2);
    assert!(log.info.contains_key("ver_hw"));

    let position = log.series["trajectory_setpoint"]
        .element_values("position[0]")
        .unwrap();
    assert_close(position[0], 0.1, 1e-6);
    assert_close(log.duration_s(), 10.0, 1e-9);
}

#[test]
fn test_crop_to_offboard_window() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hover.ulg");
    hover_flight().write(&path);
    let log = parse_log_file(&path).unwrap();

    let cropped = crop_log(&log, &serde_json::from_str::<CropOptions>("{}").unwrap()).unwrap();
    // Offboard rises at 2 s and the first "off" sample is at 8 s.
    assert_eq!(cropped.crop_window, Some((T0_US + 2_000_000, T0_US + 8_000_000)));

    let position = &cropped.series["vehicle_local_position"];
    assert_eq!(position.len(), 61);
    assert_eq!(position.timestamps_us[0], 0);
    assert_eq!(position.timestamps_us[60], 6_000_000);

    // Only the message inside the window survives, rebased to the window start.
    assert_eq!(cropped.messages.len(), 1);
    assert_eq!(cropped.messages[0].timestamp_us, 3_000_000);
    assert_eq!(cropped.messages[0].text, "Hovering");
}

#[test]
fn test_crop_with_offset_duration_and_resampling() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hover.ulg");
    hover_flight().write(&path);
    let log = parse_log_file(&path).unwrap();

    let options = CropOptions {
        mode_signal: Some(FieldRef::new("vehicle_control_mode", "flag_control_offboard_enabled")),
        start_offset_s: Some(1.0),
        duration_s: Some(2.0),
        resample_dt_s: Some(0.05),
    };
    let cropped = crop_log(&log, &options).unwrap();
    assert_eq!(cropped.crop_window, Some((T0_US + 3_000_000, T0_US + 5_000_000)));

    for series in cropped.series.values() {
        assert_eq!(series.len(), 41, "series {}", series.key());
        assert_eq!(series.timestamps_us[0], 0);
        let time = series.time_seconds();
        assert_close(time[40], 2.0, 1e-9);
    }
    let setpoint_x = cropped.series["trajectory_setpoint"]
        .element_values("position[0]")
        .unwrap();
    assert!(setpoint_x.iter().all(|v| (v - 0.1).abs() < 1e-6));

    // Every sample in the window is inside the offboard interval.
    let flag = cropped.series["vehicle_control_mode"]
        .element_values("flag_control_offboard_enabled")
        .unwrap();
    assert!(flag.iter().all(|&v| v == 1.0));
}

#[test]
fn test_hover_metrics_and_report() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hover.ulg");
    hover_flight().write(&path);
    let log = parse_log_file(&path).unwrap();
    let cropped = crop_log(&log, &serde_json::from_str::<CropOptions>("{}").unwrap()).unwrap();

    let metrics = calculate_hover_metrics(&cropped, &MetricsSources::default()).unwrap();
    assert_close(metrics.duration_s, 6.0, 1e-9);

    let position = metrics.position.expect("position metrics");
    assert_eq!(position.axes[0].samples, 61);
    assert_close(position.axes[0].mean, 0.1, 1e-6);
    assert_close(position.axes[0].rms, 0.1, 1e-6);
    assert_close(position.axes[1].max_abs, 0.0, 1e-9);
    assert_close(position.axes[2].max_abs, 0.0, 1e-9);
    assert_close(position.norm.rms, 0.1, 1e-6);

    let attitude = metrics.attitude.expect("attitude metrics");
    assert_close(attitude.distance_deg.mean, YAW_SETPOINT_DEG, 1e-3);
    assert_close(attitude.axes_deg[2].mean, YAW_SETPOINT_DEG, 1e-3);
    assert_close(attitude.axes_deg[0].max_abs, 0.0, 1e-3);

    let out = dir.path().join("out");
    let written = write_report(&out, "hover", &[metrics], &[]).unwrap();
    assert_eq!(written.len(), 2);
    let csv_text = fs::read_to_string(out.join("hover_metrics.csv")).unwrap();
    assert!(csv_text.lines().nth(1).unwrap().starts_with("hover,6.000000,"));
}

#[test]
fn test_metrics_without_attitude_topics() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hover.ulg");
    hover_flight().write(&path);
    let mut log = parse_log_file(&path).unwrap();
    log.series.remove("vehicle_attitude_setpoint");

    let metrics = calculate_hover_metrics(&log, &MetricsSources::default()).unwrap();
    assert!(metrics.position.is_some());
    assert!(metrics.attitude.is_none());

    log.series.remove("trajectory_setpoint");
    assert!(matches!(
        calculate_hover_metrics(&log, &MetricsSources::default()),
        Err(AnalysisError::NoMetricSources(_))
    ));
}

#[test]
fn test_group_skips_unreadable_logs() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.ulg");
    let bad = dir.path().join("bad.ulg");
    hover_flight().write(&good);
    fs::write(&bad, b"not a ulog file").unwrap();

    assert!(matches!(parse_log_file(&bad), Err(AnalysisError::Decode(_))));

    let group = parse_log_group("session", &[&good, &bad]);
    assert_eq!(group.logs.len(), 1);

    let cropped = crop_log_group(&group, &CropOptions::default()).unwrap();
    assert_eq!(cropped.logs.len(), 1);
    // Without a mode signal the window is the overlap of all series.
    assert_eq!(cropped.logs[0].crop_window, Some((T0_US, T0_US + 10_000_000)));
}
