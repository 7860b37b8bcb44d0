// src/constants.rs

use plotters::style::colors::full_palette::{BLUE_700, GREEN_700, INDIGO, ORANGE, PURPLE, RED, TEAL};
use plotters::style::RGBColor;

pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

// Plot dimensions.
pub const PLOT_WIDTH: u32 = 1920;
pub const PLOT_HEIGHT: u32 = 1080;

// Font sizes.
pub const FONT_SIZE_MAIN_TITLE: i32 = 24;
pub const FONT_SIZE_CHART_TITLE: i32 = 20;
pub const FONT_SIZE_AXIS_LABEL: i32 = 14;
pub const FONT_SIZE_LEGEND: i32 = 13;
pub const FONT_SIZE_MESSAGE: i32 = 18;

// --- Well-known PX4 topics and fields ---
pub const TOPIC_LOCAL_POSITION: &str = "vehicle_local_position";
pub const TOPIC_TRAJECTORY_SETPOINT: &str = "trajectory_setpoint";
pub const TOPIC_ATTITUDE: &str = "vehicle_attitude";
pub const TOPIC_ATTITUDE_SETPOINT: &str = "vehicle_attitude_setpoint";
pub const TOPIC_CONTROL_MODE: &str = "vehicle_control_mode";
pub const TOPIC_VEHICLE_STATUS: &str = "vehicle_status";

pub const FIELD_OFFBOARD_ENABLED: &str = "flag_control_offboard_enabled";
pub const FIELD_NAV_STATE: &str = "nav_state";
pub const FIELD_ATTITUDE: &str = "q";
pub const FIELD_ATTITUDE_SETPOINT: &str = "q_d";

/// Width-4 fields interpolated with slerp: attitude, attitude setpoint, reset delta.
pub const QUATERNION_FIELD_NAMES: [&str; 3] = ["q", "q_d", "delta_q_reset"];

/// Boolean flag values above this are treated as "on".
pub const FLAG_ON_THRESHOLD: f64 = 0.5;

// --- Plot Color Assignments ---
pub const COLOR_ESTIMATE: &RGBColor = &BLUE_700;
pub const COLOR_SETPOINT: &RGBColor = &ORANGE;
pub const COLOR_ATTITUDE_ERROR: &RGBColor = &PURPLE;
pub const COLOR_ERROR_NORM: &RGBColor = &GREEN_700;
/// Per-axis error traces: X/roll, Y/pitch, Z/yaw.
pub const COLOR_AXIS: [&RGBColor; 3] = [&RED, &TEAL, &INDIGO];

// Opacity of mode overlay shading behind the data.
pub const MODE_SPAN_OPACITY: f64 = 0.18;

// Stroke widths for lines
pub const LINE_WIDTH_PLOT: u32 = 1;
pub const LINE_WIDTH_LEGEND: u32 = 2;
