//! Static shape inference and evaluation of expressions.
//!
//! Both walk the tree with the same rules, so an expression whose shape could be inferred at
//! model build cannot fail on shapes while stepping.

use super::Expr;
use crate::tensor::{Shape, Tensor};
use std::borrow::Cow;
use std::fmt;

fn reduce_shape(shape: Shape, axis: usize) -> Option<Shape> {
    match (shape, axis) {
        (Shape::Vector(_), 0) => Some(Shape::Scalar),
        (Shape::Matrix(_, cols), 0) => Some(Shape::Vector(cols)),
        (Shape::Matrix(rows, _), 1) => Some(Shape::Vector(rows)),
        _ => None,
    }
}

impl<V: fmt::Display> Expr<V> {
    /// Infer the shape of the value this expression produces.
    ///
    /// `shape_of` provides the shape of each variable. The error describes the first
    /// sub-expression whose operands cannot be combined.
    pub fn infer_shape<F>(&self, shape_of: &F) -> Result<Shape, String>
    where
        F: Fn(&V) -> Option<Shape>,
    {
        match self {
            Expr::Constant(_) => Ok(Shape::Scalar),
            Expr::Var(v) => shape_of(v).ok_or_else(|| format!("no shape known for input '{}'", v)),
            Expr::Unary(_, arg) => arg.infer_shape(shape_of),
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.infer_shape(shape_of)?;
                let r = rhs.infer_shape(shape_of)?;
                l.broadcast(r).ok_or_else(|| {
                    format!(
                        "cannot combine {} and {} with '{}' in `{}`",
                        l,
                        r,
                        op.symbol(),
                        self
                    )
                })
            }
            Expr::SumAxis(arg, axis) => {
                let shape = arg.infer_shape(shape_of)?;
                reduce_shape(shape, *axis).ok_or_else(|| {
                    format!("cannot sum a {} value over axis {} in `{}`", shape, axis, self)
                })
            }
            Expr::Transpose(arg) => Ok(arg.infer_shape(shape_of)?.transpose()),
            Expr::MatVec(m, v) => {
                let m_shape = m.infer_shape(shape_of)?;
                let v_shape = v.infer_shape(shape_of)?;
                match (m_shape, v_shape) {
                    (Shape::Matrix(rows, cols), Shape::Vector(n)) if cols == n => {
                        Ok(Shape::Vector(rows))
                    }
                    _ => Err(format!(
                        "matmul needs a matrix and a vector of matching length, got {} and {} in `{}`",
                        m_shape, v_shape, self
                    )),
                }
            }
            Expr::Dot(lhs, rhs) => {
                let l = lhs.infer_shape(shape_of)?;
                let r = rhs.infer_shape(shape_of)?;
                match (l, r) {
                    (Shape::Vector(a), Shape::Vector(b)) if a == b => Ok(Shape::Scalar),
                    _ => Err(format!(
                        "dot needs two vectors of the same length, got {} and {} in `{}`",
                        l, r, self
                    )),
                }
            }
        }
    }

    /// Evaluate the expression, reading inputs through `lookup`.
    pub fn evaluate<'t, F>(&self, lookup: &F) -> Result<Tensor, String>
    where
        F: Fn(&V) -> Option<&'t Tensor>,
    {
        self.evaluate_cow(lookup).map(Cow::into_owned)
    }

    fn evaluate_cow<'t, F>(&self, lookup: &F) -> Result<Cow<'t, Tensor>, String>
    where
        F: Fn(&V) -> Option<&'t Tensor>,
    {
        let mismatch = |a: &Tensor, b: &Tensor| {
            format!(
                "incompatible operands {} and {} in `{}`",
                a.shape(),
                b.shape(),
                self
            )
        };

        let value = match self {
            Expr::Constant(c) => Tensor::Scalar(*c),
            Expr::Var(v) => {
                return lookup(v)
                    .map(Cow::Borrowed)
                    .ok_or_else(|| format!("no value for input '{}'", v))
            }
            Expr::Unary(op, arg) => arg.evaluate_cow(lookup)?.map(|x| op.apply(x)),
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.evaluate_cow(lookup)?;
                let r = rhs.evaluate_cow(lookup)?;
                l.zip_with(&r, |a, b| op.apply(a, b))
                    .ok_or_else(|| mismatch(&*l, &*r))?
            }
            Expr::SumAxis(arg, axis) => {
                let value = arg.evaluate_cow(lookup)?;
                value.sum_axis(*axis).ok_or_else(|| {
                    format!(
                        "cannot sum a {} value over axis {} in `{}`",
                        value.shape(),
                        axis,
                        self
                    )
                })?
            }
            Expr::Transpose(arg) => arg.evaluate_cow(lookup)?.transpose(),
            Expr::MatVec(m, v) => {
                let m = m.evaluate_cow(lookup)?;
                let v = v.evaluate_cow(lookup)?;
                m.matrix_vector_product(&v).ok_or_else(|| mismatch(&*m, &*v))?
            }
            Expr::Dot(lhs, rhs) => {
                let l = lhs.evaluate_cow(lookup)?;
                let r = rhs.evaluate_cow(lookup)?;
                l.weighted_dot(&r).ok_or_else(|| mismatch(&*l, &*r))?
            }
        };
        Ok(Cow::Owned(value))
    }
}
