/// Centralized axis naming utilities
///
/// Provides consistent axis names for position (local NED frame) and attitude plots.

pub const AXIS_COUNT: usize = 3;

/// Position axes of the PX4 local frame.
pub const POSITION_AXIS_NAMES: [&str; AXIS_COUNT] = ["X (North)", "Y (East)", "Z (Down)"];

/// Attitude axes, matching the order of `UnitQuaternion::euler_angles`.
pub const ATTITUDE_AXIS_NAMES: [&str; AXIS_COUNT] = ["Roll", "Pitch", "Yaw"];

/// Short position axis label used in CSV headers and series names.
///
/// # Panics
/// Panics if index is greater than 2
pub fn position_axis_short(index: usize) -> &'static str {
    match index {
        0 => "x",
        1 => "y",
        2 => "z",
        _ => panic!(
            "Invalid axis index: {}. Expected 0 (x), 1 (y), or 2 (z)",
            index
        ),
    }
}
