use levelset_assembly::quadrature::subdivide::{append_mapped_rule, reference_triangle, triangle_area};
use levelset_assembly::quadrature::{FaceQuadrature, Quadrature, QuadratureError};
use matrixcompare::{assert_scalar_eq, prop_assert_scalar_eq};
use nalgebra::Point2;
use proptest::prelude::*;

fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// The exact integral of `(x + 1)^a (y + 1)^b` over the reference triangle.
fn reference_monomial_integral(a: usize, b: usize) -> f64 {
    4.0 * 2f64.powi((a + b) as i32) * factorial(a) * factorial(b) / factorial(a + b + 2)
}

proptest! {
    #[test]
    fn triangle_rules_integrate_polynomials_exactly(strength in 0usize..=20) {
        let rule = FaceQuadrature::<f64>::triangle(strength).unwrap();
        for a in 0..=strength {
            for b in 0..=(strength - a) {
                let integral = rule.integrate(|p| (p.x + 1.0).powi(a as i32) * (p.y + 1.0).powi(b as i32));
                let exact = reference_monomial_integral(a, b);
                prop_assert_scalar_eq!(integral, exact, comp = abs, tol = 1e-12 * exact.max(1.0));
            }
        }
    }
}

#[test]
fn triangle_rule_unavailable_for_large_strength() {
    let result = FaceQuadrature::<f64>::triangle(31);
    assert_eq!(result.err(), Some(QuadratureError::NoRuleAvailable { strength: 31 }));
}

#[test]
fn quadrature_identity_is_shared_by_clones_and_refreshed_by_rebuild() {
    let mut rule = FaceQuadrature::<f64>::triangle(2).unwrap();
    let other = FaceQuadrature::<f64>::triangle(2).unwrap();
    assert_ne!(rule.id(), other.id());
    assert_eq!(rule.clone().id(), rule.id());

    let id_before = rule.id();
    let base = other.clone();
    rule.rebuild(|weights, points| {
        append_mapped_rule(weights, points, &base, &reference_triangle());
    });
    assert_ne!(rule.id(), id_before);
    assert_eq!(rule.weights(), base.weights());
    assert_eq!(rule.points(), base.points());
}

#[test]
fn mapped_rule_integrates_over_sub_triangle() {
    let base = FaceQuadrature::<f64>::triangle(3).unwrap();
    let triangle = [Point2::new(-0.5, -1.0), Point2::new(0.0, -1.0), Point2::new(-0.5, 0.0)];
    let (mut weights, mut points) = (Vec::new(), Vec::new());
    append_mapped_rule(&mut weights, &mut points, &base, &triangle);

    assert_eq!(weights.len(), base.len());
    let area: f64 = weights.iter().sum();
    assert_scalar_eq!(area, triangle_area(&triangle), comp = abs, tol = 1e-14);
    assert_scalar_eq!(area, 0.25, comp = abs, tol = 1e-14);

    // The centroid of the sub-triangle is (-1/3, -2/3)
    let first_moment = (weights, points).integrate(|p| p.x);
    assert_scalar_eq!(first_moment / area, -1.0 / 3.0, comp = abs, tol = 1e-14);
}

#[test]
fn empty_rule_integrates_to_zero() {
    let rule = FaceQuadrature::<f64>::empty();
    assert!(rule.is_empty());
    assert_eq!(rule.integrate(|_| 1.0), 0.0);
}
