use crate::connectivity::TET4_LOCAL_EDGES;
use crate::element::{FiniteElement, ReferenceFiniteElement};
use crate::Real;
use itertools::Itertools;
use nalgebra::{distance, Matrix3, Matrix3x4, Point3, Vector3};
use numeric_literals::replace_float_literals;

/// An affine tetrahedron given by its four vertices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tet4Element<T: Real> {
    vertices: [Point3<T>; 4],
}

impl<T: Real> Tet4Element<T> {
    pub fn from_vertices(vertices: [Point3<T>; 4]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 4] {
        &self.vertices
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn reference() -> Self {
        Self {
            vertices: [
                Point3::new(-1.0, -1.0, -1.0),
                Point3::new(1.0, -1.0, -1.0),
                Point3::new(-1.0, 1.0, -1.0),
                Point3::new(-1.0, -1.0, 1.0),
            ],
        }
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn centroid(&self) -> Point3<T> {
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords);
        Point3::from(sum * 0.25)
    }

    /// The signed volume of the tetrahedron, positive if the vertices are positively oriented.
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn signed_volume(&self) -> T {
        // The reference tetrahedron has volume 4 / 3 and the map is affine
        self.reference_jacobian(&Point3::origin()).determinant() * (4.0 / 3.0)
    }
}

impl<T: Real> FiniteElement<T> for Tet4Element<T> {
    #[allow(non_snake_case)]
    fn reference_jacobian(&self, xi: &Point3<T>) -> Matrix3<T> {
        let X = Matrix3x4::from_fn(|i, j| self.vertices[j][i]);
        let mut G = Matrix3x4::zeros();
        let mut gradients = [Vector3::zeros(); 4];
        Tet4Basis.populate_basis_gradients(&mut gradients, xi);
        for (j, g) in gradients.iter().enumerate() {
            G.set_column(j, g);
        }
        X * G.transpose()
    }

    fn map_reference_coords(&self, xi: &Point3<T>) -> Point3<T> {
        let mut phi = [T::zero(); 4];
        Tet4Basis.populate_basis(&mut phi, xi);
        let x = self
            .vertices
            .iter()
            .zip(&phi)
            .fold(Vector3::zeros(), |acc, (v, &p)| acc + v.coords * p);
        Point3::from(x)
    }

    fn diameter(&self) -> T {
        self.vertices
            .iter()
            .tuple_combinations()
            .map(|(x, y)| distance(x, y))
            .fold(T::zero(), |a, b| a.max(b))
    }
}

/// The linear Lagrange basis on the reference tetrahedron.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tet4Basis;

#[replace_float_literals(T::from_f64(literal).unwrap())]
impl<T: Real> ReferenceFiniteElement<T> for Tet4Basis {
    fn num_nodes(&self) -> usize {
        4
    }

    #[rustfmt::skip]
    fn populate_basis(&self, basis_values: &mut [T], xi: &Point3<T>) {
        assert_eq!(basis_values.len(), 4, "Tet4 basis has exactly 4 nodes");
        basis_values.copy_from_slice(&[
            -0.5 * xi.x - 0.5 * xi.y - 0.5 * xi.z - 0.5,
            0.5 * xi.x + 0.5,
            0.5 * xi.y + 0.5,
            0.5 * xi.z + 0.5,
        ]);
    }

    #[rustfmt::skip]
    fn populate_basis_gradients(&self, gradients: &mut [Vector3<T>], _xi: &Point3<T>) {
        assert_eq!(gradients.len(), 4, "Tet4 basis has exactly 4 nodes");
        gradients.copy_from_slice(&[
            Vector3::new(-0.5, -0.5, -0.5),
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(0.0, 0.5, 0.0),
            Vector3::new(0.0, 0.0, 0.5),
        ]);
    }
}

/// The quadratic Lagrange basis on the reference tetrahedron.
///
/// Nodes 0-3 are the vertices, nodes 4-9 the midpoints of the edges listed in
/// [`TET4_LOCAL_EDGES`](crate::connectivity::TET4_LOCAL_EDGES).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tet10Basis;

#[replace_float_literals(T::from_f64(literal).unwrap())]
impl<T: Real> ReferenceFiniteElement<T> for Tet10Basis {
    fn num_nodes(&self) -> usize {
        10
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point3<T>) {
        assert_eq!(basis_values.len(), 10, "Tet10 basis has exactly 10 nodes");
        // Quadratic basis functions are products of the linear ones
        let mut psi = [T::zero(); 4];
        Tet4Basis.populate_basis(&mut psi, xi);
        for i in 0..4 {
            basis_values[i] = psi[i] * (2.0 * psi[i] - 1.0);
        }
        for (k, [a, b]) in TET4_LOCAL_EDGES.iter().enumerate() {
            basis_values[4 + k] = 4.0 * psi[*a] * psi[*b];
        }
    }

    fn populate_basis_gradients(&self, gradients: &mut [Vector3<T>], xi: &Point3<T>) {
        assert_eq!(gradients.len(), 10, "Tet10 basis has exactly 10 nodes");
        let mut psi = [T::zero(); 4];
        let mut g = [Vector3::zeros(); 4];
        Tet4Basis.populate_basis(&mut psi, xi);
        Tet4Basis.populate_basis_gradients(&mut g, xi);
        for i in 0..4 {
            gradients[i] = g[i] * (4.0 * psi[i] - 1.0);
        }
        for (k, [a, b]) in TET4_LOCAL_EDGES.iter().enumerate() {
            gradients[4 + k] = g[*a] * (4.0 * psi[*b]) + g[*b] * (4.0 * psi[*a]);
        }
    }
}
