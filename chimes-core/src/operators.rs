//! Tensor primitives that cross shape boundaries.
//!
//! Sector-indexed matrices follow a single convention throughout the crate:
//! the first axis is the "row" sector (the origin of a flow) and the second axis is the
//! "column" sector (its destination). `M[[i, j]]` is therefore the flow from sector `i` to
//! sector `j`.
//!
//! These functions are total over well-shaped inputs. Shape agreement is established when a
//! model is built, so mismatched lengths here indicate a bug upstream and panic like
//! `ndarray::Array::dot` does.

use ndarray::{Array1, Array2, Axis};

/// The sector axis of a matrix that is reduced by [`sum_axis`].
pub const ROW_AXIS: usize = 0;
/// See [`ROW_AXIS`].
pub const COLUMN_AXIS: usize = 1;

/// Reduce a matrix to a vector by summing over one sector axis.
///
/// Summing over [`COLUMN_AXIS`] yields the row totals ("total sent by sector `i`"), summing
/// over [`ROW_AXIS`] yields the column totals ("total received by sector `j`").
///
/// # Panics
///
/// Panics if `axis` is not 0 or 1.
pub fn sum_axis(matrix: &Array2<f64>, axis: usize) -> Array1<f64> {
    assert!(axis < 2, "a sector matrix has two axes, got axis {}", axis);
    matrix.sum_axis(Axis(axis))
}

/// Swap the two sector axes of a matrix.
///
/// Converts a "from -> to" matrix into a "to -> from" matrix.
pub fn transpose(matrix: &Array2<f64>) -> Array2<f64> {
    matrix.t().to_owned()
}

/// Contract a matrix against a vector over the column sector axis.
///
/// $$ y_i = \sum_j M_{ij} v_j $$
pub fn matrix_vector_product(matrix: &Array2<f64>, vector: &Array1<f64>) -> Array1<f64> {
    matrix.dot(vector)
}

/// Contract two vectors over the sector axis.
///
/// Typically used for expenditure totals such as price times quantity.
pub fn weighted_dot(lhs: &Array1<f64>, rhs: &Array1<f64>) -> f64 {
    lhs.dot(rhs)
}
