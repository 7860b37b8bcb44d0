// src/types.rs
// Type aliases to reduce complexity warnings

use crate::axis_names::AXIS_COUNT;

// Compile-time assertion: per-axis arrays below assume three axes.
const _: () = assert!(AXIS_COUNT == 3, "AXIS_COUNT must be 3 for x/y/z and roll/pitch/yaw");

// Plot data types
pub type TimePoints = Vec<(f64, f64)>;
pub type AxisPoints = [TimePoints; AXIS_COUNT];
