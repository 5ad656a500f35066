//! Index-based connectivity of tetrahedral cells and their triangular faces.
use serde::{Deserialize, Serialize};
use std::ops::Deref;

pub trait Connectivity: Clone {
    type FaceConnectivity: Connectivity;

    fn num_faces(&self) -> usize;
    fn get_face_connectivity(&self, index: usize) -> Option<Self::FaceConnectivity>;

    fn vertex_indices(&self) -> &[usize];
}

impl Connectivity for () {
    type FaceConnectivity = ();

    fn num_faces(&self) -> usize {
        0
    }

    fn get_face_connectivity(&self, _index: usize) -> Option<Self::FaceConnectivity> {
        None
    }

    fn vertex_indices(&self) -> &[usize] {
        &[]
    }
}

/// Local vertex indices of each face of a tetrahedron.
///
/// Faces are ordered so that their normals point outwards for a positively oriented
/// tetrahedron. The index into this table is the *local face index* of a face within
/// its tetrahedron.
pub const TET4_LOCAL_FACES: [[usize; 3]; 4] = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]];

/// Local vertex indices of the six edges of a tetrahedron, in the order used by the
/// edge nodes of quadratic (Tet10) elements.
pub const TET4_LOCAL_EDGES: [[usize; 2]; 6] = [[0, 1], [1, 2], [0, 2], [0, 3], [2, 3], [1, 3]];

/// Connectivity of a linear tetrahedron.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Tet4Connectivity(pub [usize; 4]);

impl Connectivity for Tet4Connectivity {
    type FaceConnectivity = Tri3d3Connectivity;

    fn num_faces(&self) -> usize {
        4
    }

    fn get_face_connectivity(&self, index: usize) -> Option<Self::FaceConnectivity> {
        let [a, b, c] = TET4_LOCAL_FACES.get(index)?;
        let v = &self.0;
        Some(Tri3d3Connectivity([v[*a], v[*b], v[*c]]))
    }

    fn vertex_indices(&self) -> &[usize] {
        &self.0
    }
}

impl Deref for Tet4Connectivity {
    type Target = [usize; 4];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Connectivity of a triangle embedded in three dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Tri3d3Connectivity(pub [usize; 3]);

impl Connectivity for Tri3d3Connectivity {
    // Edges of faces are never needed for boundary assembly
    type FaceConnectivity = ();

    fn num_faces(&self) -> usize {
        0
    }

    fn get_face_connectivity(&self, _index: usize) -> Option<Self::FaceConnectivity> {
        None
    }

    fn vertex_indices(&self) -> &[usize] {
        &self.0
    }
}

impl Deref for Tri3d3Connectivity {
    type Target = [usize; 3];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
