//! Quadrature rules on the reference triangle, used for integration over tetrahedron faces.
use crate::Real;
use nalgebra::{convert, Point2};
use num::Zero;
use std::ops::{AddAssign, Mul};
use std::sync::atomic::{AtomicU64, Ordering};

pub use levelset_quadrature::Error as QuadratureError;

pub mod adapter;
pub mod subdivide;

pub type QuadraturePair2d<T> = (Vec<T>, Vec<Point2<T>>);

/// A quadrature rule on the reference triangle, consisting of weights and points.
pub trait Quadrature<T: Real> {
    fn weights(&self) -> &[T];
    fn points(&self) -> &[Point2<T>];

    /// Approximates the integral of the given function using this quadrature rule.
    fn integrate<U, Function>(&self, f: Function) -> U
    where
        Function: Fn(&Point2<T>) -> U,
        U: Zero + Mul<T, Output = U> + AddAssign<U>,
    {
        let mut integral = U::zero();
        for (w, p) in self.weights().iter().zip(self.points()) {
            integral += f(p) * *w;
        }
        integral
    }
}

impl<T, A, B> Quadrature<T> for (A, B)
where
    T: Real,
    A: AsRef<[T]>,
    B: AsRef<[Point2<T>]>,
{
    fn weights(&self) -> &[T] {
        self.0.as_ref()
    }

    fn points(&self) -> &[Point2<T>] {
        self.1.as_ref()
    }
}

impl<T: Real, X: Quadrature<T>> Quadrature<T> for &X {
    fn weights(&self) -> &[T] {
        X::weights(self)
    }

    fn points(&self) -> &[Point2<T>] {
        X::points(self)
    }
}

/// Identifies the content of a [`FaceQuadrature`].
///
/// Every rule receives a fresh identifier when it is created and whenever its content is
/// rebuilt, so two rules with the same identifier are guaranteed to have the same points and
/// weights. Evaluators use this to skip re-tabulation when the bound rule has not changed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuadratureId(u64);

impl QuadratureId {
    fn fresh() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A quadrature rule on the reference triangle with an identity.
///
/// Clones share the identity of the original.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceQuadrature<T: Real> {
    id: QuadratureId,
    weights: Vec<T>,
    points: Vec<Point2<T>>,
}

impl<T: Real> FaceQuadrature<T> {
    /// # Panics
    ///
    /// Panics if the number of weights and points differ.
    pub fn from_weights_and_points(weights: Vec<T>, points: Vec<Point2<T>>) -> Self {
        assert_eq!(weights.len(), points.len(), "weights and points must have the same length");
        Self {
            id: QuadratureId::fresh(),
            weights,
            points,
        }
    }

    /// A rule with no points, which integrates every function to zero.
    pub fn empty() -> Self {
        Self::from_weights_and_points(Vec::new(), Vec::new())
    }

    /// A rule on the reference triangle that integrates polynomials of the given total degree exactly.
    pub fn triangle(strength: usize) -> Result<Self, QuadratureError> {
        let (weights, points) = levelset_quadrature::triangle::triangle(strength)?;
        let weights = weights.into_iter().map(convert).collect();
        let points = points
            .into_iter()
            .map(|[x, y]| Point2::new(convert(x), convert(y)))
            .collect();
        Ok(Self::from_weights_and_points(weights, points))
    }

    pub fn id(&self) -> QuadratureId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Replaces the content of the rule, reusing its storage. The rule receives a new identity.
    pub fn rebuild(&mut self, build: impl FnOnce(&mut Vec<T>, &mut Vec<Point2<T>>)) {
        self.weights.clear();
        self.points.clear();
        build(&mut self.weights, &mut self.points);
        assert_eq!(
            self.weights.len(),
            self.points.len(),
            "weights and points must have the same length"
        );
        self.id = QuadratureId::fresh();
    }

    pub fn into_pair(self) -> QuadraturePair2d<T> {
        (self.weights, self.points)
    }
}

impl<T: Real> Quadrature<T> for FaceQuadrature<T> {
    fn weights(&self) -> &[T] {
        &self.weights
    }

    fn points(&self) -> &[Point2<T>] {
        &self.points
    }
}

impl<T: Real> From<QuadraturePair2d<T>> for FaceQuadrature<T> {
    fn from((weights, points): QuadraturePair2d<T>) -> Self {
        Self::from_weights_and_points(weights, points)
    }
}
