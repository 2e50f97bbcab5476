//! Evaluators expressed as data.
//!
//! An [`Expr`] is a pure expression over named inputs. Expressions can be assembled with the
//! usual arithmetic operators,
//!
//! ```
//! use chimes_core::expr::{var, sum_axis, Expr};
//!
//! let growth: Expr = var("kappa") / var("nu") - var("delta");
//! let totals = sum_axis(var("Gamma"), 1);
//! assert_eq!(growth.to_string(), "kappa / nu - delta");
//! assert_eq!(totals.to_string(), "sum_axis(Gamma, 1)");
//! ```
//!
//! or parsed from text, which is also how they are serialised:
//!
//! ```
//! use chimes_core::expr::Expr;
//!
//! let expr: Expr = "omega * (phillips - alpha)".parse().unwrap();
//! assert_eq!(expr.variables(), vec!["omega", "phillips", "alpha"]);
//! ```
//!
//! Variables are generic so the same tree can be rewritten to refer to value slots once a
//! model is built (`Expr<usize>`).

mod eval;
mod parser;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

use crate::errors::{ChimesError, ChimesResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl UnaryOp {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => -x,
            UnaryOp::Exp => x.exp(),
            UnaryOp::Ln => x.ln(),
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Abs => x.abs(),
        }
    }

    fn function_name(self) -> Option<&'static str> {
        match self {
            UnaryOp::Neg => None,
            UnaryOp::Exp => Some("exp"),
            UnaryOp::Ln => Some("ln"),
            UnaryOp::Sqrt => Some("sqrt"),
            UnaryOp::Abs => Some("abs"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Min,
    Max,
}

impl BinaryOp {
    pub fn apply(self, x: f64, y: f64) -> f64 {
        match self {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
            BinaryOp::Pow => x.powf(y),
            BinaryOp::Min => x.min(y),
            BinaryOp::Max => x.max(y),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 4,
            BinaryOp::Min | BinaryOp::Max => ATOM_PRECEDENCE,
        }
    }
}

const NEG_PRECEDENCE: u8 = 3;
const ATOM_PRECEDENCE: u8 = 5;

/// A pure expression over inputs of type `V`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<V = String> {
    Constant(f64),
    Var(V),
    Unary(UnaryOp, Box<Expr<V>>),
    Binary(BinaryOp, Box<Expr<V>>, Box<Expr<V>>),
    /// Sum over one sector axis, see [`crate::operators::sum_axis`].
    SumAxis(Box<Expr<V>>, usize),
    /// See [`crate::operators::transpose`].
    Transpose(Box<Expr<V>>),
    /// See [`crate::operators::matrix_vector_product`].
    MatVec(Box<Expr<V>>, Box<Expr<V>>),
    /// See [`crate::operators::weighted_dot`].
    Dot(Box<Expr<V>>, Box<Expr<V>>),
}

impl<V> Expr<V> {
    pub fn unary(op: UnaryOp, arg: Expr<V>) -> Self {
        Expr::Unary(op, Box::new(arg))
    }

    pub fn binary(op: BinaryOp, lhs: Expr<V>, rhs: Expr<V>) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Variables referenced by the expression, in order of first appearance.
    pub fn variables(&self) -> Vec<&V>
    where
        V: PartialEq,
    {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a V>)
    where
        V: PartialEq,
    {
        match self {
            Expr::Constant(_) => {}
            Expr::Var(v) => {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
            Expr::Unary(_, arg) | Expr::SumAxis(arg, _) | Expr::Transpose(arg) => {
                arg.collect_variables(out)
            }
            Expr::Binary(_, lhs, rhs) | Expr::MatVec(lhs, rhs) | Expr::Dot(lhs, rhs) => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
        }
    }

    /// Rebuild the expression, replacing every variable with the expression returned by `f`.
    pub fn try_map_vars<W, E, F>(&self, f: &mut F) -> Result<Expr<W>, E>
    where
        F: FnMut(&V) -> Result<Expr<W>, E>,
    {
        Ok(match self {
            Expr::Constant(c) => Expr::Constant(*c),
            Expr::Var(v) => f(v)?,
            Expr::Unary(op, arg) => Expr::Unary(*op, Box::new(arg.try_map_vars(f)?)),
            Expr::Binary(op, lhs, rhs) => Expr::Binary(
                *op,
                Box::new(lhs.try_map_vars(f)?),
                Box::new(rhs.try_map_vars(f)?),
            ),
            Expr::SumAxis(arg, axis) => Expr::SumAxis(Box::new(arg.try_map_vars(f)?), *axis),
            Expr::Transpose(arg) => Expr::Transpose(Box::new(arg.try_map_vars(f)?)),
            Expr::MatVec(m, v) => Expr::MatVec(
                Box::new(m.try_map_vars(f)?),
                Box::new(v.try_map_vars(f)?),
            ),
            Expr::Dot(lhs, rhs) => Expr::Dot(
                Box::new(lhs.try_map_vars(f)?),
                Box::new(rhs.try_map_vars(f)?),
            ),
        })
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Constant(c) if *c < 0.0 => NEG_PRECEDENCE,
            Expr::Unary(UnaryOp::Neg, _) => NEG_PRECEDENCE,
            Expr::Binary(op, _, _) => op.precedence(),
            _ => ATOM_PRECEDENCE,
        }
    }
}

impl<V: fmt::Display> Expr<V> {
    fn fmt_with_precedence(&self, f: &mut fmt::Formatter<'_>, required: u8) -> fmt::Result {
        if self.precedence() < required {
            write!(f, "(")?;
            self.fmt_inner(f)?;
            write!(f, ")")
        } else {
            self.fmt_inner(f)
        }
    }

    fn fmt_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(c) => write!(f, "{}", c),
            Expr::Var(v) => write!(f, "{}", v),
            Expr::Unary(UnaryOp::Neg, arg) => {
                write!(f, "-")?;
                arg.fmt_with_precedence(f, NEG_PRECEDENCE)
            }
            Expr::Unary(op, arg) => {
                write!(f, "{}(", op.function_name().unwrap_or_default())?;
                arg.fmt_inner(f)?;
                write!(f, ")")
            }
            Expr::Binary(op @ (BinaryOp::Min | BinaryOp::Max), lhs, rhs) => {
                write!(f, "{}({}, {})", op.symbol(), lhs, rhs)
            }
            Expr::Binary(op, lhs, rhs) => {
                let prec = op.precedence();
                // `^` is right associative, the others are left associative
                let (lhs_prec, rhs_prec) = match op {
                    BinaryOp::Pow => (prec + 1, prec),
                    _ => (prec, prec + 1),
                };
                lhs.fmt_with_precedence(f, lhs_prec)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_with_precedence(f, rhs_prec)
            }
            Expr::SumAxis(arg, axis) => write!(f, "sum_axis({}, {})", arg, axis),
            Expr::Transpose(arg) => write!(f, "transpose({})", arg),
            Expr::MatVec(m, v) => write!(f, "matmul({}, {})", m, v),
            Expr::Dot(lhs, rhs) => write!(f, "dot({}, {})", lhs, rhs),
        }
    }
}

impl<V: fmt::Display> fmt::Display for Expr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_inner(f)
    }
}

impl FromStr for Expr {
    type Err = ChimesError;

    fn from_str(s: &str) -> ChimesResult<Self> {
        parser::parse(s)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Constant(value)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Var(value.to_string())
    }
}

/// Reference to the field called `name`.
pub fn var(name: impl Into<String>) -> Expr {
    Expr::Var(name.into())
}

pub fn constant(value: f64) -> Expr {
    Expr::Constant(value)
}

pub fn exp(arg: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Exp, arg.into())
}

pub fn ln(arg: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Ln, arg.into())
}

pub fn sqrt(arg: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Sqrt, arg.into())
}

pub fn abs(arg: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Abs, arg.into())
}

pub fn pow(base: impl Into<Expr>, exponent: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOp::Pow, base.into(), exponent.into())
}

pub fn min(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOp::Min, lhs.into(), rhs.into())
}

pub fn max(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::binary(BinaryOp::Max, lhs.into(), rhs.into())
}

pub fn sum_axis(arg: impl Into<Expr>, axis: usize) -> Expr {
    Expr::SumAxis(Box::new(arg.into()), axis)
}

pub fn transpose(arg: impl Into<Expr>) -> Expr {
    Expr::Transpose(Box::new(arg.into()))
}

pub fn matmul(matrix: impl Into<Expr>, vector: impl Into<Expr>) -> Expr {
    Expr::MatVec(Box::new(matrix.into()), Box::new(vector.into()))
}

pub fn dot(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::Dot(Box::new(lhs.into()), Box::new(rhs.into()))
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }

        impl $trait<f64> for Expr {
            type Output = Expr;

            fn $method(self, rhs: f64) -> Expr {
                Expr::binary($op, self, Expr::Constant(rhs))
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, Expr::Constant(self), rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(Div, div, BinaryOp::Div);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}
