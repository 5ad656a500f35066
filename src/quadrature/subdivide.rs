//! Quadrature rules constructed by subdividing the reference triangle along a level set.
use crate::quadrature::Quadrature;
use crate::Real;
use itertools::izip;
use nalgebra::{Matrix2, Point2};
use numeric_literals::replace_float_literals;

/// Vertices of the reference triangle.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn reference_triangle<T: Real>() -> [Point2<T>; 3] {
    [Point2::new(-1.0, -1.0), Point2::new(1.0, -1.0), Point2::new(-1.0, 1.0)]
}

/// The area of a triangle.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn triangle_area<T: Real>([a, b, c]: &[Point2<T>; 3]) -> T {
    Matrix2::from_columns(&[b - a, c - a]).determinant().abs() * 0.5
}

/// Maps the base rule onto the given triangle and appends the result.
///
/// The weights are scaled by the ratio of the area of the triangle to the area of the
/// reference triangle.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn append_mapped_rule<T: Real>(
    weights: &mut Vec<T>,
    points: &mut Vec<Point2<T>>,
    base: &impl Quadrature<T>,
    triangle: &[Point2<T>; 3],
) {
    let [a, b, c] = triangle;
    // The reference triangle has area 2
    let jacobian_det = triangle_area(triangle) * 0.5;
    for (w_base, xi) in izip!(base.weights(), base.points()) {
        let n0 = -0.5 * (xi.x + xi.y);
        let n1 = 0.5 * (xi.x + 1.0);
        let n2 = 0.5 * (xi.y + 1.0);
        weights.push(*w_base * jacobian_det);
        points.push(Point2::from(a.coords * n0 + b.coords * n1 + c.coords * n2));
    }
}

/// The part of a triangle on one side of a linear function's zero level set.
///
/// Clipping a triangle against a half-plane produces a convex polygon with at most four vertices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClippedPolygon<T: Real> {
    vertices: [Point2<T>; 4],
    len: usize,
}

impl<T: Real> ClippedPolygon<T> {
    pub fn vertices(&self) -> &[Point2<T>] {
        &self.vertices[..self.len]
    }

    fn push(&mut self, vertex: Point2<T>) {
        self.vertices[self.len] = vertex;
        self.len += 1;
    }

    /// Splits the polygon into triangles sharing its first vertex.
    pub fn fan_triangles(&self) -> impl Iterator<Item = [Point2<T>; 3]> + '_ {
        let v = self.vertices();
        (1..v.len().saturating_sub(1)).map(move |i| [v[0], v[i], v[i + 1]])
    }
}

/// Clips a triangle against the region where a linear function is non-positive.
///
/// The function is given by its values at the triangle vertices. To clip against the
/// non-negative region, pass the negated values.
pub fn clip_triangle_nonpositive<T: Real>(triangle: &[Point2<T>; 3], values: &[T; 3]) -> ClippedPolygon<T> {
    let mut polygon = ClippedPolygon {
        vertices: [Point2::origin(); 4],
        len: 0,
    };
    // Sutherland-Hodgman against a single half-plane
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (p, q) = (&triangle[i], &triangle[j]);
        let (phi_p, phi_q) = (values[i], values[j]);
        let p_inside = phi_p <= T::zero();
        let q_inside = phi_q <= T::zero();
        if p_inside {
            polygon.push(*p);
        }
        // A vertex on the zero level set is already pushed as an inside vertex
        if p_inside != q_inside && phi_p != T::zero() && phi_q != T::zero() {
            let t = phi_p / (phi_p - phi_q);
            polygon.push(p + (q - p) * t);
        }
    }
    polygon
}
