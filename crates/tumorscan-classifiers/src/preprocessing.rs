//! Intensity normalization applied before samples reach the classifier.
//!
//! Normalization is per sample and fit-free: every lane of values along the
//! chosen axis is divided by its own L2 norm, so nothing learned on the
//! training batch is reused on the test batch.

use ndarray::{Array, Array4, ArrayBase, Axis, Data, Dimension};

/// Axis of an `(n, height, width, channels)` batch that [`normalize_batch`]
/// normalizes along.
pub const NORMALIZATION_AXIS: Axis = Axis(1);

/// Divide every lane along `axis` by its L2 norm. Lanes with zero norm are
/// left unchanged (the norm is treated as 1).
///
/// For non-negative input the output lies in `[0, 1]`, and applying the
/// function to its own output is a no-op up to floating point tolerance.
pub fn l2_normalize<S, D>(x: &ArrayBase<S, D>, axis: Axis) -> Array<f32, D>
where
    S: Data,
    S::Elem: Copy + Into<f32>,
    D: Dimension,
{
    let mut out: Array<f32, D> = x.mapv(|v| v.into());
    for mut lane in out.lanes_mut(axis) {
        let norm = lane.iter().map(|v| v * v).sum::<f32>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        lane.mapv_inplace(|v| v / norm);
    }
    out
}

/// Normalize an image batch along the height axis.
pub fn normalize_batch<S>(x: &ArrayBase<S, ndarray::Ix4>) -> Array4<f32>
where
    S: Data,
    S::Elem: Copy + Into<f32>,
{
    l2_normalize(x, NORMALIZATION_AXIS)
}
