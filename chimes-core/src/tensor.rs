//! Values held by fields: scalars, per-sector vectors and sector-by-sector matrices.
//!
//! Vectors are columns over their sector axis. When a vector meets a matrix in an
//! elementwise operation it is treated as an `n x 1` matrix, so `v[i]` scales row `i`.
//! A row is obtained by transposing a vector, which yields a `1 x n` matrix.

use crate::operators;
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Concrete shape of a field once its dimension tags are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Scalar,
    Vector(usize),
    Matrix(usize, usize),
}

impl Shape {
    /// Number of elements held by a tensor of this shape.
    pub fn len(&self) -> usize {
        match self {
            Shape::Scalar => 1,
            Shape::Vector(n) => *n,
            Shape::Matrix(rows, cols) => rows * cols,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of sector axes (0, 1 or 2).
    pub fn rank(&self) -> usize {
        match self {
            Shape::Scalar => 0,
            Shape::Vector(_) => 1,
            Shape::Matrix(_, _) => 2,
        }
    }

    fn as_matrix_dim(&self) -> Option<(usize, usize)> {
        match self {
            Shape::Scalar => None,
            Shape::Vector(n) => Some((*n, 1)),
            Shape::Matrix(rows, cols) => Some((*rows, *cols)),
        }
    }

    /// Shape of an elementwise operation between `self` and `other`.
    ///
    /// Returns `None` if the shapes cannot be broadcast against each other.
    pub fn broadcast(self, other: Shape) -> Option<Shape> {
        match (self, other) {
            (Shape::Scalar, s) | (s, Shape::Scalar) => Some(s),
            (Shape::Vector(a), Shape::Vector(b)) => (a == b).then_some(Shape::Vector(a)),
            _ => {
                let lhs = self.as_matrix_dim()?;
                let rhs = other.as_matrix_dim()?;
                broadcast_dim(lhs, rhs).map(|(rows, cols)| Shape::Matrix(rows, cols))
            }
        }
    }

    /// Shape after swapping the sector axes.
    pub fn transpose(self) -> Shape {
        match self {
            Shape::Scalar => Shape::Scalar,
            Shape::Vector(n) => Shape::Matrix(1, n),
            Shape::Matrix(rows, cols) => Shape::Matrix(cols, rows),
        }
    }

    /// Returns true if a value of shape `produced` can be stored in a field of this shape.
    ///
    /// Scalars are broadcast uniformly, everything else must match exactly.
    pub fn accepts(&self, produced: Shape) -> bool {
        produced == Shape::Scalar || produced == *self
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => write!(f, "scalar"),
            Shape::Vector(n) => write!(f, "[{}]", n),
            Shape::Matrix(rows, cols) => write!(f, "[{} x {}]", rows, cols),
        }
    }
}

fn broadcast_axis(a: usize, b: usize) -> Option<usize> {
    match (a, b) {
        _ if a == b => Some(a),
        (1, b) => Some(b),
        (a, 1) => Some(a),
        _ => None,
    }
}

fn broadcast_dim(lhs: (usize, usize), rhs: (usize, usize)) -> Option<(usize, usize)> {
    Some((broadcast_axis(lhs.0, rhs.0)?, broadcast_axis(lhs.1, rhs.1)?))
}

/// The value of a field at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tensor {
    Scalar(f64),
    Vector(Array1<f64>),
    Matrix(Array2<f64>),
}

impl Tensor {
    /// A tensor of the given shape with every element set to `value`.
    pub fn filled(shape: Shape, value: f64) -> Self {
        match shape {
            Shape::Scalar => Tensor::Scalar(value),
            Shape::Vector(n) => Tensor::Vector(Array1::from_elem(n, value)),
            Shape::Matrix(rows, cols) => Tensor::Matrix(Array2::from_elem((rows, cols), value)),
        }
    }

    pub fn zeros(shape: Shape) -> Self {
        Self::filled(shape, 0.0)
    }

    pub fn shape(&self) -> Shape {
        match self {
            Tensor::Scalar(_) => Shape::Scalar,
            Tensor::Vector(v) => Shape::Vector(v.len()),
            Tensor::Matrix(m) => {
                let (rows, cols) = m.dim();
                Shape::Matrix(rows, cols)
            }
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Tensor::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&Array1<f64>> {
        match self {
            Tensor::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Array2<f64>> {
        match self {
            Tensor::Matrix(m) => Some(m),
            _ => None,
        }
    }

    fn matrix_view(&self) -> Option<ArrayView2<'_, f64>> {
        match self {
            Tensor::Scalar(_) => None,
            Tensor::Vector(v) => Some(v.view().insert_axis(Axis(1))),
            Tensor::Matrix(m) => Some(m.view()),
        }
    }

    /// Flattened copy of the elements in row-major order.
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Tensor::Scalar(v) => vec![*v],
            Tensor::Vector(v) => v.iter().copied().collect(),
            Tensor::Matrix(m) => m.iter().copied().collect(),
        }
    }

    /// Returns true if no element is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        match self {
            Tensor::Scalar(v) => v.is_finite(),
            Tensor::Vector(v) => v.iter().all(|x| x.is_finite()),
            Tensor::Matrix(m) => m.iter().all(|x| x.is_finite()),
        }
    }

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Tensor {
        match self {
            Tensor::Scalar(v) => Tensor::Scalar(f(*v)),
            Tensor::Vector(v) => Tensor::Vector(v.mapv(f)),
            Tensor::Matrix(m) => Tensor::Matrix(m.mapv(f)),
        }
    }

    /// Combine two tensors elementwise following the broadcasting rules of [`Shape::broadcast`].
    ///
    /// Returns `None` if the shapes are incompatible.
    pub fn zip_with(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> Option<Tensor> {
        match (self, other) {
            (Tensor::Scalar(a), Tensor::Scalar(b)) => Some(Tensor::Scalar(f(*a, *b))),
            (Tensor::Scalar(a), rhs) => Some(rhs.map(|x| f(*a, x))),
            (lhs, Tensor::Scalar(b)) => Some(lhs.map(|x| f(x, *b))),
            (Tensor::Vector(a), Tensor::Vector(b)) => {
                if a.len() != b.len() {
                    return None;
                }
                Some(Tensor::Vector(
                    Zip::from(a).and(b).map_collect(|&x, &y| f(x, y)),
                ))
            }
            _ => {
                let lhs = self.matrix_view()?;
                let rhs = other.matrix_view()?;
                let dim = broadcast_dim(lhs.dim(), rhs.dim())?;
                let lhs = lhs.broadcast(dim)?;
                let rhs = rhs.broadcast(dim)?;
                Some(Tensor::Matrix(
                    Zip::from(lhs).and(rhs).map_collect(|&x, &y| f(x, y)),
                ))
            }
        }
    }

    /// Expand a scalar to `shape`. Tensors that already have `shape` are returned unchanged.
    ///
    /// Returns `None` for any other combination.
    pub fn broadcast_to(&self, shape: Shape) -> Option<Tensor> {
        match self {
            Tensor::Scalar(v) => Some(Tensor::filled(shape, *v)),
            other if other.shape() == shape => Some(other.clone()),
            _ => None,
        }
    }

    /// `self + factor * increment`, keeping the shape of `self`.
    pub fn scaled_add(&self, factor: f64, increment: &Tensor) -> Option<Tensor> {
        let result = self.zip_with(increment, |x, dx| x + factor * dx)?;
        (result.shape() == self.shape()).then_some(result)
    }

    /// See [`operators::sum_axis`]. Summing a vector over its only axis yields a scalar.
    pub fn sum_axis(&self, axis: usize) -> Option<Tensor> {
        match (self, axis) {
            (Tensor::Vector(v), 0) => Some(Tensor::Scalar(v.sum())),
            (Tensor::Matrix(m), 0 | 1) => Some(Tensor::Vector(operators::sum_axis(m, axis))),
            _ => None,
        }
    }

    /// See [`operators::transpose`]. A vector becomes a `1 x n` row.
    pub fn transpose(&self) -> Tensor {
        match self {
            Tensor::Scalar(v) => Tensor::Scalar(*v),
            Tensor::Vector(v) => Tensor::Matrix(v.view().insert_axis(Axis(0)).to_owned()),
            Tensor::Matrix(m) => Tensor::Matrix(operators::transpose(m)),
        }
    }

    /// See [`operators::matrix_vector_product`].
    pub fn matrix_vector_product(&self, vector: &Tensor) -> Option<Tensor> {
        match (self, vector) {
            (Tensor::Matrix(m), Tensor::Vector(v)) if m.ncols() == v.len() => Some(
                Tensor::Vector(operators::matrix_vector_product(m, v)),
            ),
            _ => None,
        }
    }

    /// See [`operators::weighted_dot`].
    pub fn weighted_dot(&self, other: &Tensor) -> Option<Tensor> {
        match (self, other) {
            (Tensor::Vector(a), Tensor::Vector(b)) if a.len() == b.len() => {
                Some(Tensor::Scalar(operators::weighted_dot(a, b)))
            }
            _ => None,
        }
    }
}

impl From<f64> for Tensor {
    fn from(value: f64) -> Self {
        Tensor::Scalar(value)
    }
}

impl From<Array1<f64>> for Tensor {
    fn from(value: Array1<f64>) -> Self {
        Tensor::Vector(value)
    }
}

impl From<Array2<f64>> for Tensor {
    fn from(value: Array2<f64>) -> Self {
        Tensor::Matrix(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn broadcast_rules() {
        assert_eq!(
            Shape::Scalar.broadcast(Shape::Vector(3)),
            Some(Shape::Vector(3))
        );
        assert_eq!(Shape::Vector(2).broadcast(Shape::Vector(3)), None);
        assert_eq!(
            Shape::Vector(2).broadcast(Shape::Matrix(2, 4)),
            Some(Shape::Matrix(2, 4))
        );
        assert_eq!(Shape::Vector(3).broadcast(Shape::Matrix(2, 2)), None);
        // column times row is an outer product
        assert_eq!(
            Shape::Vector(2).broadcast(Shape::Vector(2).transpose()),
            Some(Shape::Matrix(2, 2))
        );
        assert_eq!(Shape::Matrix(2, 3).broadcast(Shape::Matrix(3, 2)), None);
    }

    #[test]
    fn broadcast_is_commutative() {
        let shapes = [
            Shape::Scalar,
            Shape::Vector(2),
            Shape::Vector(3),
            Shape::Matrix(2, 2),
            Shape::Matrix(1, 2),
            Shape::Matrix(2, 3),
        ];
        for a in shapes {
            for b in shapes {
                assert_eq!(a.broadcast(b), b.broadcast(a), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn vector_scales_matrix_rows() {
        let v = Tensor::from(array![1.0, 10.0]);
        let m = Tensor::from(array![[1.0, 2.0], [3.0, 4.0]]);
        let result = v.zip_with(&m, |a, b| a * b).unwrap();
        assert_eq!(result, Tensor::from(array![[1.0, 2.0], [30.0, 40.0]]));
    }

    #[test]
    fn row_scales_matrix_columns() {
        let p = Tensor::from(array![1.0, 10.0]);
        let m = Tensor::from(array![[1.0, 2.0], [3.0, 4.0]]);
        let result = m.zip_with(&p.transpose(), |a, b| a * b).unwrap();
        assert_eq!(result, Tensor::from(array![[1.0, 20.0], [3.0, 40.0]]));
    }

    #[test]
    fn incompatible_shapes() {
        let a = Tensor::from(array![1.0, 2.0]);
        let b = Tensor::from(array![1.0, 2.0, 3.0]);
        assert!(a.zip_with(&b, |x, y| x + y).is_none());
    }

    #[test]
    fn scalar_broadcast() {
        let t = Tensor::Scalar(0.5).broadcast_to(Shape::Matrix(2, 3)).unwrap();
        assert_eq!(t.shape(), Shape::Matrix(2, 3));
        assert!(t.to_vec().iter().all(|x| *x == 0.5));
        assert!(Tensor::from(array![1.0])
            .broadcast_to(Shape::Vector(2))
            .is_none());
    }

    #[test]
    fn scaled_add_keeps_shape() {
        let x = Tensor::from(array![1.0, 2.0]);
        let dx = Tensor::Scalar(1.0);
        assert_eq!(x.scaled_add(0.5, &dx).unwrap(), Tensor::from(array![1.5, 2.5]));

        // Adding a matrix to a vector would change its shape
        let m = Tensor::zeros(Shape::Matrix(2, 2));
        assert!(x.scaled_add(1.0, &m).is_none());
    }

    #[test]
    fn finiteness() {
        assert!(Tensor::from(array![1.0, 2.0]).is_finite());
        assert!(!Tensor::from(array![1.0, f64::NAN]).is_finite());
        assert!(!Tensor::Scalar(f64::INFINITY).is_finite());
    }

    #[test]
    fn vector_transpose_is_row() {
        let row = Tensor::from(array![1.0, 2.0]).transpose();
        assert_eq!(row.shape(), Shape::Matrix(1, 2));
    }
}
