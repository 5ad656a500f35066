//! Quadrature rules for the reference domains used by boundary (face) integration.
//!
//! Rules are given in plain `f64` arrays so that they can be used independently of any linear
//! algebra library. The reference interval is `[-1, 1]` and the reference triangle is the
//! triangle with vertices `(-1, -1)`, `(1, -1)` and `(-1, 1)`, which has area `2`.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod triangle;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable {
        /// The requested polynomial strength.
        strength: usize,
    },
    /// Newton's method did not find the roots of a Legendre polynomial.
    NotConverged {
        /// The requested number of points of the Gauss rule.
        num_points: usize,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable { strength } => {
                write!(f, "no quadrature rule of strength {strength} is available")
            }
            Self::NotConverged { num_points } => {
                write!(f, "failed to compute the {num_points}-point Gauss rule")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A D-dimensional rule, stored as `(weights, points)`.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A rule on the reference interval.
pub type Rule1d = Rule<1>;

/// A rule on the reference triangle.
pub type Rule2d = Rule<2>;
