//! Quadrature rules for the reference interval `[-1, 1]`.

use crate::{Error, Rule1d};
use std::f64::consts::PI;

const MAX_NEWTON_ITERATIONS: usize = 100;

/// Evaluates the Legendre polynomial `P_n` and its derivative at `x`.
///
/// The derivative is obtained from the identity
/// `(x^2 - 1) P_n'(x) = n (x P_n(x) - P_{n - 1}(x))`, which is singular at `|x| = 1`.
/// Only use this in the open interval `(-1, 1)`.
fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    // Bonnet's recursion: m P_m = (2m - 1) x P_{m - 1} - (m - 1) P_{m - 2}
    let (mut current, mut previous) = (1.0, 0.0);
    for m in 1..=n {
        let m = m as f64;
        let next = ((2.0 * m - 1.0) * x * current - (m - 1.0) * previous) / m;
        previous = current;
        current = next;
    }
    let derivative = n as f64 * (x * current - previous) / (x * x - 1.0);
    (current, derivative)
}

/// Gauss-Legendre quadrature for the reference interval `[-1, 1]`.
///
/// With `n` points the rule integrates polynomials of degree `2n - 1` exactly.
///
/// # Panics
///
/// Panics if `num_points == 0`.
pub fn gauss(num_points: usize) -> Result<Rule1d, Error> {
    gauss_with_max_iterations(num_points, MAX_NEWTON_ITERATIONS)
}

fn gauss_with_max_iterations(num_points: usize, max_iterations: usize) -> Result<Rule1d, Error> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let mut points = vec![[0.0]; n];
    let mut weights = vec![0.0; n];

    // Roots are symmetric about the origin, so we only search for the first half
    for i in 0..(n + 1) / 2 {
        // Chebyshev-like initial guess, refined with Newton's method
        let x0 = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let x = newton_legendre_root(n, x0, max_iterations).ok_or(Error::NotConverged { num_points })?;
        let derivative = legendre_with_derivative(n, x).1;

        let w = 2.0 / ((1.0 - x * x) * derivative * derivative);
        points[i] = [-x];
        weights[i] = w;
        points[n - 1 - i] = [x];
        weights[n - 1 - i] = w;
    }

    Ok((weights, points))
}

fn newton_legendre_root(n: usize, mut x: f64, max_iterations: usize) -> Option<f64> {
    for _ in 0..max_iterations {
        let (p, dp) = legendre_with_derivative(n, x);
        let dx = p / dp;
        x -= dx;
        if dx.abs() <= 1e-15 {
            return Some(x);
        }
    }
    None
}
