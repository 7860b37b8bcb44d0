// src/data_analysis/quaternion.rs

//! Quaternion helpers on top of nalgebra. PX4 logs quaternions as `[w, x, y, z]`.

use nalgebra::{Quaternion, UnitQuaternion};
use ndarray::ArrayView1;

// Below this norm a logged quaternion is treated as invalid (e.g. an unset setpoint).
const MIN_QUATERNION_NORM: f64 = 1e-6;
// Below this sine of the half-angle between inputs slerp falls back to nlerp.
const SLERP_EPSILON: f64 = 1e-6;

pub const NAN_QUATERNION_ROW: [f64; 4] = [f64::NAN; 4];

/// Builds a unit quaternion from a `[w, x, y, z]` row, normalising it.
/// Returns `None` for non-finite or near-zero input.
pub fn from_px4_row(row: ArrayView1<'_, f64>) -> Option<UnitQuaternion<f64>> {
    if row.len() < 4 {
        return None;
    }
    from_wxyz(row[0], row[1], row[2], row[3])
}

pub fn from_wxyz(w: f64, x: f64, y: f64, z: f64) -> Option<UnitQuaternion<f64>> {
    let q = Quaternion::new(w, x, y, z);
    if !q.coords.iter().all(|c| c.is_finite()) || q.norm() < MIN_QUATERNION_NORM {
        return None;
    }
    Some(UnitQuaternion::from_quaternion(q))
}

pub fn to_px4_row(q: &UnitQuaternion<f64>) -> [f64; 4] {
    [q.w, q.i, q.j, q.k]
}

/// Spherical linear interpolation along the shorter arc, `t` in `[0, 1]`.
pub fn slerp(q0: &UnitQuaternion<f64>, q1: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    q0.try_slerp(q1, t, SLERP_EPSILON)
        .unwrap_or_else(|| nlerp(q0, q1, t))
}

// Normalised linear interpolation, used where slerp is ill-conditioned (nearly equal inputs).
fn nlerp(q0: &UnitQuaternion<f64>, q1: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    let a = *q0.quaternion();
    let mut b = *q1.quaternion();
    // q and -q are the same rotation; flip to stay on the short arc.
    if a.dot(&b) < 0.0 {
        b = -b;
    }
    UnitQuaternion::from_quaternion(a * (1.0 - t) + b * t)
}

/// Rotation taking the estimate onto the setpoint: `q_d ⊗ conj(q)`.
pub fn relative_rotation(desired: &UnitQuaternion<f64>, estimate: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    desired * estimate.conjugate()
}

/// Geodesic distance between two orientations, in radians, within `[0, π]`.
pub fn geodesic_distance(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>) -> f64 {
    relative_rotation(a, b).angle()
}

/// Roll, pitch, yaw (ZYX convention) in radians.
pub fn euler_angles(q: &UnitQuaternion<f64>) -> [f64; 3] {
    let (roll, pitch, yaw) = q.euler_angles();
    [roll, pitch, yaw]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn yaw(angle: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(0.0, 0.0, angle)
    }

    #[test]
    fn test_row_round_trip_normalises() {
        let q = from_px4_row(arr1(&[2.0, 0.0, 0.0, 0.0]).view()).unwrap();
        assert_eq!(to_px4_row(&q), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_invalid_rows_are_rejected() {
        assert!(from_px4_row(arr1(&[0.0, 0.0, 0.0, 0.0]).view()).is_none());
        assert!(from_px4_row(arr1(&[f64::NAN, 0.0, 0.0, 1.0]).view()).is_none());
        assert!(from_px4_row(arr1(&[1.0, 0.0, 0.0]).view()).is_none());
    }

    #[test]
    fn test_slerp_midpoint() {
        let q = slerp(&yaw(0.0), &yaw(FRAC_PI_2), 0.5);
        let [_, _, y] = euler_angles(&q);
        assert!((y - FRAC_PI_2 / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_slerp_endpoints() {
        let a = yaw(0.3);
        let b = yaw(1.2);
        assert!(geodesic_distance(&slerp(&a, &b, 0.0), &a) < 1e-6);
        assert!(geodesic_distance(&slerp(&a, &b, 1.0), &b) < 1e-6);
    }

    #[test]
    fn test_slerp_takes_short_arc_for_negated_input() {
        let a = yaw(0.2);
        let negated = UnitQuaternion::new_unchecked(-*yaw(0.6).quaternion());
        let mid = slerp(&a, &negated, 0.5);
        let [_, _, y] = euler_angles(&mid);
        assert!((y - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_slerp_nearly_equal_inputs() {
        let a = yaw(0.5);
        let b = yaw(0.5 + 1e-9);
        let mid = slerp(&a, &b, 0.5);
        assert!(mid.coords.iter().all(|c| c.is_finite()));
        assert!(geodesic_distance(&mid, &a) < 1e-6);
        assert!(geodesic_distance(&nlerp(&a, &b, 1.0), &b) < 1e-6);
    }

    #[test]
    fn test_geodesic_distance() {
        assert!((geodesic_distance(&yaw(0.0), &yaw(0.5)) - 0.5).abs() < 1e-12);
        assert!((geodesic_distance(&yaw(-PI + 0.1), &yaw(PI - 0.1)) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_relative_rotation_recovers_offset() {
        let estimate = UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3);
        let offset = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.25);
        let desired = offset * estimate;
        let error = relative_rotation(&desired, &estimate);
        assert!(error.angle_to(&offset) < 1e-6);
    }
}
