//! Symbolic integrands for boundary assembly.
//!
//! An [`Expression`] describes the integrand of a boundary integral in terms of the test
//! function (`phi_i`), geometric quantities of the face and nodal fields. For example, the
//! weak form of a prescribed normal flux `∫ (g n)·∇φ_i` is written as
//!
//! ```
//! # use levelset_assembly::expression::Expression;
//! let g = Expression::constant(2.0);
//! let integrand = Expression::dot(g * Expression::normal(), Expression::grad_phi_i());
//! assert_eq!(integrand.to_string(), "dot(2 * n, grad(phi_i))");
//! ```
//!
//! Before assembly, an expression is compiled into an [`Evaluation`], which checks that the
//! shapes of all operands are compatible and determines which basis data is needed.
use crate::levelset::NodalField;
use crate::Real;
use nalgebra::{Point3, Vector3};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

mod evaluation;

pub use evaluation::*;

/// A scalar function of the physical position.
pub type ScalarFunction<T> = Arc<dyn Fn(&Point3<T>) -> T + Send + Sync>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Norm,
    Transpose,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Dot,
}

/// A symbolic integrand.
#[derive(Clone)]
pub enum Expression<T: Real> {
    Constant(T),
    Vector(Vector3<T>),
    /// The test function. Scalar for scalar spaces, `e_b φ_i` for three-component spaces.
    Phi,
    /// The physical gradient of the test function. For three-component spaces, the matrix
    /// whose row `b` is `∇φ_i` for component `b`.
    GradPhi,
    /// The outward unit normal of the face.
    Normal,
    /// The physical position of the quadrature point.
    Position,
    /// One of the two reference tangents of the face, mapped to physical space.
    Tangent(usize),
    /// The value of a nodal field.
    Value(Arc<NodalField<T>>),
    /// The gradient of a nodal field. For three-component fields, row `c` is the gradient of
    /// component `c`.
    Grad(Arc<NodalField<T>>),
    Function(ScalarFunction<T>),
    Unary(UnaryOp, Box<Expression<T>>),
    Binary(BinaryOp, Box<Expression<T>>, Box<Expression<T>>),
}

impl<T: Real> Expression<T> {
    pub fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    pub fn vector(value: Vector3<T>) -> Self {
        Self::Vector(value)
    }

    pub fn phi_i() -> Self {
        Self::Phi
    }

    pub fn grad_phi_i() -> Self {
        Self::GradPhi
    }

    pub fn normal() -> Self {
        Self::Normal
    }

    pub fn position() -> Self {
        Self::Position
    }

    /// Tangent `k`, for `k` either 0 or 1.
    pub fn tangent(k: usize) -> Self {
        Self::Tangent(k)
    }

    pub fn value(field: Arc<NodalField<T>>) -> Self {
        Self::Value(field)
    }

    pub fn grad(field: Arc<NodalField<T>>) -> Self {
        Self::Grad(field)
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Point3<T>) -> T + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    pub fn dot(a: Self, b: Self) -> Self {
        Self::Binary(BinaryOp::Dot, Box::new(a), Box::new(b))
    }

    /// The Euclidean norm of a vector, or the Frobenius norm of a matrix.
    pub fn norm(a: Self) -> Self {
        Self::Unary(UnaryOp::Norm, Box::new(a))
    }

    pub fn transpose(a: Self) -> Self {
        Self::Unary(UnaryOp::Transpose, Box::new(a))
    }

    /// Whether the expression depends on the test function.
    pub fn depends_on_test_function(&self) -> bool {
        match self {
            Self::Phi | Self::GradPhi => true,
            Self::Unary(_, a) => a.depends_on_test_function(),
            Self::Binary(_, a, b) => a.depends_on_test_function() || b.depends_on_test_function(),
            _ => false,
        }
    }
}

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Real> $trait for Expression<T> {
            type Output = Expression<T>;

            fn $method(self, rhs: Self) -> Self::Output {
                Expression::Binary($op, Box::new(self), Box::new(rhs))
            }
        }
    };
}

impl_binary_operator!(Add, add, BinaryOp::Add);
impl_binary_operator!(Sub, sub, BinaryOp::Sub);
impl_binary_operator!(Mul, mul, BinaryOp::Mul);
impl_binary_operator!(Div, div, BinaryOp::Div);

impl<T: Real> Neg for Expression<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::Unary(UnaryOp::Neg, Box::new(self))
    }
}

impl<T: Real> Display for Expression<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => write!(f, "{c}"),
            Self::Vector(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Self::Phi => write!(f, "phi_i"),
            Self::GradPhi => write!(f, "grad(phi_i)"),
            Self::Normal => write!(f, "n"),
            Self::Position => write!(f, "x"),
            Self::Tangent(k) => write!(f, "t{k}"),
            Self::Value(field) => write!(f, "u[{}]", field.num_components()),
            Self::Grad(field) => write!(f, "grad(u[{}])", field.num_components()),
            Self::Function(_) => write!(f, "f(x)"),
            Self::Unary(UnaryOp::Neg, a) => write!(f, "-({a})"),
            Self::Unary(UnaryOp::Norm, a) => write!(f, "norm({a})"),
            Self::Unary(UnaryOp::Transpose, a) => write!(f, "transpose({a})"),
            Self::Binary(BinaryOp::Dot, a, b) => write!(f, "dot({a}, {b})"),
            Self::Binary(op, a, b) => {
                let symbol = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::Dot => unreachable!(),
                };
                // Parenthesize sums and differences nested in other binary operations
                let wrap = |e: &Expression<T>| match e {
                    Self::Binary(BinaryOp::Add | BinaryOp::Sub, _, _) => format!("({e})"),
                    _ => format!("{e}"),
                };
                write!(f, "{} {symbol} {}", wrap(a), wrap(b))
            }
        }
    }
}

impl<T: Real> Debug for Expression<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({self})")
    }
}
