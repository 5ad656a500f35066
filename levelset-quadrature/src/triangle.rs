//! Quadrature rules for the reference triangle with vertices `(-1, -1)`, `(1, -1)`, `(-1, 1)`.
//!
//! Low strengths use tabulated fully symmetric rules. Higher strengths fall back to collapsed
//! Gauss rules, i.e. tensor products of Gauss rules pulled back to the triangle through the
//! Duffy transformation. Collapsed rules are not symmetric, but exist for any strength.

use crate::univariate::gauss;
use crate::{Error, Point, Rule2d};

/// The largest strength for which [`triangle`] returns a rule.
pub const MAX_STRENGTH: usize = 30;

/// Area of the reference triangle.
const REFERENCE_AREA: f64 = 2.0;

/// Maps barycentric coordinates to a point in the reference triangle.
fn from_barycentric([l0, l1, l2]: [f64; 3]) -> Point<2> {
    [-l0 + l1 - l2, -l0 - l1 + l2]
}

/// Expands symmetric orbits `(weight, barycentric generator)` into a rule.
///
/// Weights are normalized to a triangle of unit area.
fn expand_orbits(orbits: &[(f64, [f64; 3])]) -> Rule2d {
    let mut weights = Vec::new();
    let mut points = Vec::new();
    for &(w, [a, b, c]) in orbits {
        let mut permutations = vec![[a, b, c], [b, c, a], [c, a, b], [a, c, b], [c, b, a], [b, a, c]];
        permutations.sort_by(|x, y| x.partial_cmp(y).unwrap());
        permutations.dedup();
        for lambda in permutations {
            weights.push(w * REFERENCE_AREA);
            points.push(from_barycentric(lambda));
        }
    }
    (weights, points)
}

/// Returns a quadrature rule for the reference triangle that integrates polynomials of total
/// degree `strength` exactly.
///
/// Returns [`Error::NoRuleAvailable`] if `strength > MAX_STRENGTH`.
pub fn triangle(strength: usize) -> Result<Rule2d, Error> {
    #[allow(clippy::excessive_precision)]
    let rule = match strength {
        0 | 1 => expand_orbits(&[(1.0, [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0])]),
        2 => expand_orbits(&[(1.0 / 3.0, [2.0 / 3.0, 1.0 / 6.0, 1.0 / 6.0])]),
        3 | 4 => expand_orbits(&[
            (0.223381589678011, [0.108103018168070, 0.445948490915965, 0.445948490915965]),
            (0.109951743655322, [0.816847572980459, 0.091576213509771, 0.091576213509771]),
        ]),
        5 => expand_orbits(&[
            (0.225, [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]),
            (0.132394152788506, [0.059715871789770, 0.470142064105115, 0.470142064105115]),
            (0.125939180544827, [0.797426985353087, 0.101286507323456, 0.101286507323456]),
        ]),
        s if s <= MAX_STRENGTH => collapsed_gauss(s)?,
        _ => return Err(Error::NoRuleAvailable { strength }),
    };
    Ok(rule)
}

/// A collapsed Gauss rule of the given strength.
///
/// The square `[-1, 1]^2` is mapped onto the reference triangle by
/// `(u, v) -> ((1 + u)(1 - v) / 2 - 1, v)`, whose Jacobian determinant is `(1 - v) / 2`.
pub fn collapsed_gauss(strength: usize) -> Result<Rule2d, Error> {
    // The pulled-back integrand has degree `strength` in u and `strength + 1` in v
    let (weights_u, points_u) = gauss(strength / 2 + 1)?;
    let (weights_v, points_v) = gauss((strength + 3) / 2)?;

    let mut weights = Vec::with_capacity(weights_u.len() * weights_v.len());
    let mut points = Vec::with_capacity(weights.capacity());
    for (&wv, &[v]) in weights_v.iter().zip(&points_v) {
        for (&wu, &[u]) in weights_u.iter().zip(&points_u) {
            weights.push(wu * wv * (1.0 - v) / 2.0);
            points.push([(1.0 + u) * (1.0 - v) / 2.0 - 1.0, v]);
        }
    }
    Ok((weights, points))
}
