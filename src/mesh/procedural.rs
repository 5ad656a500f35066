//! Basic procedural mesh generation routines.
use crate::connectivity::Tet4Connectivity;
use crate::element::Tet4Element;
use crate::mesh::Tet4Mesh;
use crate::{BoundaryMarker, Real};
use nalgebra::Point3;

/// Markers assigned to the sides of generated box meshes.
pub mod markers {
    use crate::BoundaryMarker;

    pub const NEGATIVE_X: BoundaryMarker = 1;
    pub const POSITIVE_X: BoundaryMarker = 2;
    pub const NEGATIVE_Y: BoundaryMarker = 3;
    pub const POSITIVE_Y: BoundaryMarker = 4;
    pub const NEGATIVE_Z: BoundaryMarker = 5;
    pub const POSITIVE_Z: BoundaryMarker = 6;
}

/// Local hex vertex indices of the six tetrahedra of the Kuhn subdivision of a cube.
///
/// All tetrahedra share the diagonal from hex vertex 0 to hex vertex 6, which makes
/// the subdivision conforming across neighboring cubes.
const KUHN_TETS: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
    [0, 5, 1, 6],
];

pub fn create_unit_box_uniform_tet_mesh_3d<T: Real>(cells_per_dim: usize) -> Tet4Mesh<T> {
    create_rectangular_uniform_tet_mesh(T::one(), 1, 1, 1, cells_per_dim)
}

/// Generates an axis-aligned rectangular uniform tetrahedral mesh given a unit length,
/// dimensions as multipliers of the unit length and the number of cells per unit length.
///
/// The resulting box is given by the set `[0, u * ux] x [0, u * uy] x [0, u * uz]`
/// where u denotes the unit length, ux, uy and uz denote the number of units along each
/// coordinate axis. Every cube is split into six positively oriented tetrahedra, and
/// the boundary faces on each side of the box are marked as given by [`markers`].
pub fn create_rectangular_uniform_tet_mesh<T: Real>(
    unit_length: T,
    units_x: usize,
    units_y: usize,
    units_z: usize,
    cells_per_unit: usize,
) -> Tet4Mesh<T> {
    if cells_per_unit == 0 || units_x == 0 || units_y == 0 || units_z == 0 {
        return Tet4Mesh::from_vertices_and_connectivity(Vec::new(), Vec::new());
    }

    let cell_size = unit_length / T::from_usize(cells_per_unit).unwrap();
    let num_cells = [units_x, units_y, units_z].map(|units| units * cells_per_unit);
    let [nvx, nvy, nvz] = num_cells.map(|n| n + 1);
    let to_global_vertex_index = |i: usize, j: usize, k: usize| (nvx * nvy) * k + nvx * j + i;
    let coord = |i: usize| T::from_usize(i).unwrap() * cell_size;

    let mut vertices = Vec::with_capacity(nvx * nvy * nvz);
    for k in 0..nvz {
        for j in 0..nvy {
            for i in 0..nvx {
                vertices.push(Point3::new(coord(i), coord(j), coord(k)));
            }
        }
    }

    let mut cells = Vec::with_capacity(6 * num_cells.iter().product::<usize>());
    for k in 0..num_cells[2] {
        for j in 0..num_cells[1] {
            for i in 0..num_cells[0] {
                let idx = &to_global_vertex_index;
                let hex = [
                    idx(i, j, k),
                    idx(i + 1, j, k),
                    idx(i + 1, j + 1, k),
                    idx(i, j + 1, k),
                    idx(i, j, k + 1),
                    idx(i + 1, j, k + 1),
                    idx(i + 1, j + 1, k + 1),
                    idx(i, j + 1, k + 1),
                ];
                for local in KUHN_TETS {
                    let mut tet = local.map(|v| hex[v]);
                    let element = Tet4Element::from_vertices(tet.map(|v| vertices[v]));
                    if element.signed_volume() < T::zero() {
                        tet.swap(1, 2);
                    }
                    cells.push(Tet4Connectivity(tet));
                }
            }
        }
    }

    let upper = num_cells.map(coord);
    let mut mesh = Tet4Mesh::from_vertices_and_connectivity(vertices, cells);
    mesh.mark_boundary_faces(|face| side_marker(face, &upper));
    mesh
}

fn side_marker<T: Real>(face: &[Point3<T>; 3], upper: &[T; 3]) -> Option<BoundaryMarker> {
    use markers::*;
    let on_plane = |axis: usize, value: T| face.iter().all(|v| v[axis] == value);
    let sides = [
        (0, T::zero(), NEGATIVE_X),
        (0, upper[0], POSITIVE_X),
        (1, T::zero(), NEGATIVE_Y),
        (1, upper[1], POSITIVE_Y),
        (2, T::zero(), NEGATIVE_Z),
        (2, upper[2], POSITIVE_Z),
    ];
    sides
        .into_iter()
        .find(|&(axis, value, _)| on_plane(axis, value))
        .map(|(_, _, marker)| marker)
}
