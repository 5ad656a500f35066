//! Reference elements, element geometry and the reference faces of the tetrahedron.
use crate::connectivity::TET4_LOCAL_FACES;
use crate::Real;
use nalgebra::{Matrix3, Matrix3x2, Point2, Point3, Vector3};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

mod tetrahedron;

pub use tetrahedron::*;

/// Number of faces of the reference tetrahedron, i.e. the number of local face slots.
pub const NUM_TET_FACES: usize = 4;

/// A finite element defined on the reference tetrahedron.
pub trait ReferenceFiniteElement<T: Real> {
    /// Returns the number of nodes (basis functions) of the element.
    fn num_nodes(&self) -> usize;

    /// Evaluates each basis function at the given reference coordinates.
    ///
    /// # Panics
    ///
    /// Implementations may panic if `basis_values.len() != self.num_nodes()`.
    fn populate_basis(&self, basis_values: &mut [T], reference_coords: &Point3<T>);

    /// Evaluates the reference gradient of each basis function at the given reference coordinates.
    ///
    /// # Panics
    ///
    /// Implementations may panic if `gradients.len() != self.num_nodes()`.
    fn populate_basis_gradients(&self, gradients: &mut [Vector3<T>], reference_coords: &Point3<T>);
}

/// A finite element with a geometric map from the reference tetrahedron into physical space.
pub trait FiniteElement<T: Real> {
    /// The Jacobian of the reference-to-physical map at the given reference coordinates.
    fn reference_jacobian(&self, reference_coords: &Point3<T>) -> Matrix3<T>;

    /// Maps reference coordinates to physical coordinates.
    fn map_reference_coords(&self, reference_coords: &Point3<T>) -> Point3<T>;

    /// The maximum distance between any two points of the element.
    fn diameter(&self) -> T;
}

/// Selects the Lagrange element used on the reference tetrahedron.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TetrahedralLagrange {
    /// Piecewise linear (P1) basis with one node per vertex.
    Linear,
    /// Piecewise quadratic (P2) basis with nodes at vertices and edge midpoints.
    Quadratic,
}

impl TetrahedralLagrange {
    pub fn from_degree(degree: usize) -> Option<Self> {
        match degree {
            1 => Some(Self::Linear),
            2 => Some(Self::Quadratic),
            _ => None,
        }
    }

    pub fn degree(&self) -> usize {
        match self {
            Self::Linear => 1,
            Self::Quadratic => 2,
        }
    }

    /// The number of nodes of the element, independent of the scalar type.
    pub fn node_count(&self) -> usize {
        match self {
            Self::Linear => 4,
            Self::Quadratic => 10,
        }
    }
}

impl<T: Real> ReferenceFiniteElement<T> for TetrahedralLagrange {
    fn num_nodes(&self) -> usize {
        self.node_count()
    }

    fn populate_basis(&self, basis_values: &mut [T], reference_coords: &Point3<T>) {
        match self {
            Self::Linear => Tet4Basis.populate_basis(basis_values, reference_coords),
            Self::Quadratic => Tet10Basis.populate_basis(basis_values, reference_coords),
        }
    }

    fn populate_basis_gradients(&self, gradients: &mut [Vector3<T>], reference_coords: &Point3<T>) {
        match self {
            Self::Linear => Tet4Basis.populate_basis_gradients(gradients, reference_coords),
            Self::Quadratic => Tet10Basis.populate_basis_gradients(gradients, reference_coords),
        }
    }
}

/// One face of the reference tetrahedron, seen as the image of the reference triangle.
///
/// The reference triangle has vertices `(-1, -1)`, `(1, -1)` and `(-1, 1)`, which are mapped
/// to the face vertices in the order given by
/// [`TET4_LOCAL_FACES`](crate::connectivity::TET4_LOCAL_FACES).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReferenceFace<T: Real> {
    local_index: usize,
    vertices: [Point3<T>; 3],
    tangents: [Vector3<T>; 2],
}

impl<T: Real> ReferenceFace<T> {
    /// Returns the face with the given local index, or `None` if the index is not in `0 .. 4`.
    pub fn from_local_index(local_index: usize) -> Option<Self> {
        (local_index < NUM_TET_FACES).then(|| Self::from_valid_index(local_index))
    }

    fn from_valid_index(local_index: usize) -> Self {
        let reference_vertices = *Tet4Element::<T>::reference().vertices();
        let [a, b, c] = TET4_LOCAL_FACES[local_index];
        Self {
            local_index,
            vertices: [reference_vertices[a], reference_vertices[b], reference_vertices[c]],
            tangents: reference_tangents(local_index),
        }
    }

    pub fn local_index(&self) -> usize {
        self.local_index
    }

    pub fn vertices(&self) -> &[Point3<T>; 3] {
        &self.vertices
    }

    /// The fixed pair of reference-space vectors spanning the tangent plane of the face.
    pub fn tangents(&self) -> &[Vector3<T>; 2] {
        &self.tangents
    }

    /// Maps a point on the reference triangle to the face in reference tetrahedron coordinates.
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn map_reference_coords(&self, eta: &Point2<T>) -> Point3<T> {
        let [a, b, c] = &self.vertices;
        let n0 = -0.5 * (eta.x + eta.y);
        let n1 = 0.5 * (eta.x + 1.0);
        let n2 = 0.5 * (eta.y + 1.0);
        Point3::from(a.coords * n0 + b.coords * n1 + c.coords * n2)
    }

    /// The (constant) Jacobian of the map from the reference triangle onto the face.
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn reference_jacobian(&self) -> Matrix3x2<T> {
        let [a, b, c] = &self.vertices;
        Matrix3x2::from_columns(&[(b - a) * 0.5, (c - a) * 0.5])
    }
}

/// All faces of the reference tetrahedron, indexed by local face index.
pub fn reference_faces<T: Real>() -> [ReferenceFace<T>; NUM_TET_FACES] {
    std::array::from_fn(ReferenceFace::from_valid_index)
}

/// The reference tangent pair of each local face slot.
///
/// # Panics
///
/// Panics if `local_index >= 4`.
#[rustfmt::skip]
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn reference_tangents<T: Real>(local_index: usize) -> [Vector3<T>; 2] {
    match local_index {
        0 => [Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)],
        1 => [Vector3::new(0.0, 0.0, 1.0), Vector3::new(1.0, 0.0, 0.0)],
        2 => [Vector3::new(-1.0, 0.0, 1.0), Vector3::new(-1.0, 1.0, 0.0)],
        3 => [Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 0.0, 1.0)],
        _ => panic!("local face index {local_index} out of bounds for tetrahedron"),
    }
}
