//! Tetrahedral meshes with marked boundary faces.
use crate::connectivity::{Connectivity, Tet4Connectivity, Tri3d3Connectivity};
use crate::element::Tet4Element;
use crate::{BoundaryMarker, Real};
use eyre::{eyre, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod procedural;

/// A face that lies on the boundary of a mesh, i.e. a face that belongs to exactly one cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryFace {
    connectivity: Tri3d3Connectivity,
    adjacent_element: usize,
    local_index: usize,
    marker: BoundaryMarker,
}

impl BoundaryFace {
    /// The vertex indices of the face, oriented outwards with respect to the adjacent element.
    pub fn connectivity(&self) -> &Tri3d3Connectivity {
        &self.connectivity
    }

    /// The index of the (only) element adjacent to this face.
    pub fn adjacent_element(&self) -> usize {
        self.adjacent_element
    }

    /// The local index of this face within the adjacent element.
    pub fn local_index(&self) -> usize {
        self.local_index
    }

    pub fn marker(&self) -> BoundaryMarker {
        self.marker
    }
}

/// Mesh queries needed for assembling over boundary faces.
pub trait BoundaryMesh<T: Real> {
    fn num_elements(&self) -> usize;

    fn num_vertices(&self) -> usize;

    fn num_boundary_faces(&self) -> usize;

    fn boundary_face(&self, index: usize) -> Option<&BoundaryFace>;

    /// The vertex indices of the given element.
    fn element_connectivity(&self, element_index: usize) -> Option<&Tet4Connectivity>;

    /// The geometry of the given element.
    fn element(&self, element_index: usize) -> Option<Tet4Element<T>>;
}

/// A conforming tetrahedral mesh together with its marked boundary faces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Tet4Mesh<T: Real> {
    vertices: Vec<Point3<T>>,
    connectivity: Vec<Tet4Connectivity>,
    boundary_faces: Vec<BoundaryFace>,
}

impl<T: Real> Tet4Mesh<T> {
    /// Construct a mesh from vertices and connectivity.
    ///
    /// Boundary faces are detected automatically and all receive the marker `0`. They are stored
    /// ordered by adjacent element and then by local face index.
    ///
    /// The connectivity is expected to only reference valid vertex indices. Users of the mesh
    /// are permitted to panic if they encounter invalid indices.
    pub fn from_vertices_and_connectivity(vertices: Vec<Point3<T>>, connectivity: Vec<Tet4Connectivity>) -> Self {
        let boundary_faces = find_boundary_faces(&connectivity);
        Self {
            vertices,
            connectivity,
            boundary_faces,
        }
    }

    pub fn vertices(&self) -> &[Point3<T>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Tet4Connectivity] {
        &self.connectivity
    }

    pub fn boundary_faces(&self) -> &[BoundaryFace] {
        &self.boundary_faces
    }

    pub fn set_boundary_marker(&mut self, face_index: usize, marker: BoundaryMarker) -> Result<()> {
        let num_faces = self.boundary_faces.len();
        let face = self
            .boundary_faces
            .get_mut(face_index)
            .ok_or_else(|| eyre!("boundary face {face_index} out of bounds ({num_faces} boundary faces)"))?;
        face.marker = marker;
        Ok(())
    }

    /// Assigns markers to boundary faces based on the positions of their vertices.
    ///
    /// Faces for which the closure returns `None` keep their current marker.
    pub fn mark_boundary_faces<F>(&mut self, mut marker_for_face: F)
    where
        F: FnMut(&[Point3<T>; 3]) -> Option<BoundaryMarker>,
    {
        for face in &mut self.boundary_faces {
            let [a, b, c] = face.connectivity.0;
            let face_vertices = [self.vertices[a], self.vertices[b], self.vertices[c]];
            if let Some(marker) = marker_for_face(&face_vertices) {
                face.marker = marker;
            }
        }
    }

    /// Returns the indices of the boundary faces that carry the given marker.
    pub fn find_marked_boundary_faces(&self, marker: BoundaryMarker) -> Vec<usize> {
        self.boundary_faces
            .iter()
            .enumerate()
            .filter(|(_, face)| face.marker == marker)
            .map(|(i, _)| i)
            .collect()
    }
}

impl<T: Real> BoundaryMesh<T> for Tet4Mesh<T> {
    fn num_elements(&self) -> usize {
        self.connectivity.len()
    }

    fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    fn num_boundary_faces(&self) -> usize {
        self.boundary_faces.len()
    }

    fn boundary_face(&self, index: usize) -> Option<&BoundaryFace> {
        self.boundary_faces.get(index)
    }

    fn element_connectivity(&self, element_index: usize) -> Option<&Tet4Connectivity> {
        self.connectivity.get(element_index)
    }

    fn element(&self, element_index: usize) -> Option<Tet4Element<T>> {
        let conn = self.connectivity.get(element_index)?;
        Some(Tet4Element::from_vertices([
            *self.vertices.get(conn[0])?,
            *self.vertices.get(conn[1])?,
            *self.vertices.get(conn[2])?,
            *self.vertices.get(conn[3])?,
        ]))
    }
}

impl<'a, T: Real, M: BoundaryMesh<T>> BoundaryMesh<T> for &'a M {
    fn num_elements(&self) -> usize {
        M::num_elements(self)
    }

    fn num_vertices(&self) -> usize {
        M::num_vertices(self)
    }

    fn num_boundary_faces(&self) -> usize {
        M::num_boundary_faces(self)
    }

    fn boundary_face(&self, index: usize) -> Option<&BoundaryFace> {
        M::boundary_face(self, index)
    }

    fn element_connectivity(&self, element_index: usize) -> Option<&Tet4Connectivity> {
        M::element_connectivity(self, element_index)
    }

    fn element(&self, element_index: usize) -> Option<Tet4Element<T>> {
        M::element(self, element_index)
    }
}

/// Finds faces which are connected to exactly one cell.
fn find_boundary_faces(connectivity: &[Tet4Connectivity]) -> Vec<BoundaryFace> {
    // Faces are keyed by their sorted vertex indices, in deterministic order
    let mut face_counts: BTreeMap<[usize; 3], (BoundaryFace, usize)> = BTreeMap::new();
    for (element_index, cell) in connectivity.iter().enumerate() {
        for local_index in 0..cell.num_faces() {
            let face_conn = cell
                .get_face_connectivity(local_index)
                .expect("local index is in bounds");
            let mut key = face_conn.0;
            key.sort_unstable();
            let face = BoundaryFace {
                connectivity: face_conn,
                adjacent_element: element_index,
                local_index,
                marker: 0,
            };
            face_counts
                .entry(key)
                .and_modify(|(_, count)| *count += 1)
                .or_insert((face, 1));
        }
    }

    let mut faces: Vec<_> = face_counts
        .into_values()
        .filter(|&(_, count)| count == 1)
        .map(|(face, _)| face)
        .collect();
    faces.sort_by_key(|face| (face.adjacent_element, face.local_index));
    faces
}
