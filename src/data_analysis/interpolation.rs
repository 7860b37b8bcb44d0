// src/data_analysis/interpolation.rs

//! Resampling of field columns onto a new time grid.
//!
//! Each method holds the first/last sample outside the source time range.

use ndarray::{Array2, ArrayView2};

use crate::data_analysis::quaternion::{from_px4_row, slerp, to_px4_row, NAN_QUATERNION_ROW};
use crate::data_input::log_data::{FieldColumn, FieldKind};
use crate::error::{AnalysisError, AnalysisResult};

/// Position of an output time relative to the source samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bracket {
    /// Before the first sample, on a sample, or past the last one: use this row.
    Hold(usize),
    /// Strictly between rows `i` and `i + 1`; `fraction` in `(0, 1)`.
    Between { lower: usize, fraction: f64 },
}

/// Locates `t` among sorted source timestamps.
pub fn bracket(source_t: &[u64], t: u64) -> Bracket {
    let n = source_t.len();
    // First index whose timestamp is > t.
    let upper = source_t.partition_point(|&s| s <= t);
    if upper == 0 {
        return Bracket::Hold(0);
    }
    let lower = upper - 1;
    if upper == n || source_t[lower] == t {
        return Bracket::Hold(lower);
    }
    let t0 = source_t[lower];
    let t1 = source_t[upper];
    let fraction = (t - t0) as f64 / (t1 - t0) as f64;
    Bracket::Between { lower, fraction }
}

fn check_input(name: &str, source_t: &[u64], values: &ArrayView2<'_, f64>) -> AnalysisResult<()> {
    if source_t.is_empty() || values.nrows() == 0 {
        return Err(AnalysisError::EmptySeries(name.to_string()));
    }
    debug_assert_eq!(source_t.len(), values.nrows());
    Ok(())
}

/// Linear interpolation, element by element.
pub fn interp_linear(
    source_t: &[u64],
    values: ArrayView2<'_, f64>,
    target_t: &[u64],
) -> AnalysisResult<Array2<f64>> {
    check_input("linear field", source_t, &values)?;
    let width = values.ncols();
    let mut out = Array2::<f64>::zeros((target_t.len(), width));
    for (row, &t) in target_t.iter().enumerate() {
        match bracket(source_t, t) {
            Bracket::Hold(i) => out.row_mut(row).assign(&values.row(i)),
            Bracket::Between { lower, fraction } => {
                for col in 0..width {
                    let v0 = values[[lower, col]];
                    let v1 = values[[lower + 1, col]];
                    out[[row, col]] = v0 + fraction * (v1 - v0);
                }
            }
        }
    }
    Ok(out)
}

/// Nearest-sample interpolation between the sample before and after; ties take the earlier one.
pub fn interp_nearest(
    source_t: &[u64],
    values: ArrayView2<'_, f64>,
    target_t: &[u64],
) -> AnalysisResult<Array2<f64>> {
    check_input("flag field", source_t, &values)?;
    let mut out = Array2::<f64>::zeros((target_t.len(), values.ncols()));
    for (row, &t) in target_t.iter().enumerate() {
        let source_row = match bracket(source_t, t) {
            Bracket::Hold(i) => i,
            Bracket::Between { lower, fraction } if fraction <= 0.5 => lower,
            Bracket::Between { lower, .. } => lower + 1,
        };
        out.row_mut(row).assign(&values.row(source_row));
    }
    Ok(out)
}

/// Spherical linear interpolation of `[w, x, y, z]` rows.
/// Invalid source quaternions yield NaN rows wherever they are needed.
pub fn interp_slerp(
    source_t: &[u64],
    values: ArrayView2<'_, f64>,
    target_t: &[u64],
) -> AnalysisResult<Array2<f64>> {
    check_input("quaternion field", source_t, &values)?;
    let mut out = Array2::<f64>::zeros((target_t.len(), 4));
    for (row, &t) in target_t.iter().enumerate() {
        let q = match bracket(source_t, t) {
            Bracket::Hold(i) => from_px4_row(values.row(i)),
            Bracket::Between { lower, fraction } => {
                match (from_px4_row(values.row(lower)), from_px4_row(values.row(lower + 1))) {
                    (Some(q0), Some(q1)) => Some(slerp(&q0, &q1, fraction)),
                    _ => None,
                }
            }
        };
        let resampled = q.map(|q| to_px4_row(&q)).unwrap_or(NAN_QUATERNION_ROW);
        for (col, v) in resampled.iter().enumerate() {
            out[[row, col]] = *v;
        }
    }
    Ok(out)
}

/// Resamples one column with the method its kind calls for.
pub fn resample_column(column: &FieldColumn, source_t: &[u64], target_t: &[u64]) -> AnalysisResult<FieldColumn> {
    let view = column.values.view();
    let values = match column.kind {
        FieldKind::Flag => interp_nearest(source_t, view, target_t),
        FieldKind::Quaternion if column.width() == 4 => interp_slerp(source_t, view, target_t),
        FieldKind::Quaternion | FieldKind::Continuous => interp_linear(source_t, view, target_t),
    }
    .map_err(|e| match e {
        AnalysisError::EmptySeries(_) => AnalysisError::EmptySeries(column.name.clone()),
        other => other,
    })?;
    Ok(FieldColumn::new(column.name.clone(), column.kind, values))
}
