//! Helpers shared by the test suites of the workspace.

use nalgebra::{DVector, Scalar};

/// Asserts that two vectors or matrices agree entrywise up to an absolute tolerance.
///
/// Prints both operands and their difference on failure.
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = &$x - &$y;

        let max_absdiff = diff.abs().max();
        if !(max_absdiff <= $tol) {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
            panic!("assert_approx_matrix_eq failed: max abs diff {:e}", max_absdiff);
        }
    }};
}

/// Asserts that evaluating the given expression panics.
#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::{catch_unwind, AssertUnwindSafe};
        let expr_string = stringify!($e);
        let result = catch_unwind(AssertUnwindSafe(|| $e));
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Returns the indices of all nonzero entries of the vector.
pub fn nonzero_indices<T: Scalar + PartialEq + Default>(v: &DVector<T>) -> Vec<usize> {
    let zero = T::default();
    v.iter()
        .enumerate()
        .filter(|(_, x)| **x != zero)
        .map(|(i, _)| i)
        .collect()
}
