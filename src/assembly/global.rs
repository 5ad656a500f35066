//! Global vectors and sparsity patterns.
use crate::mesh::BoundaryMesh;
use crate::levelset::LevelSetField;
use crate::quadrature::adapter::LevelSetFaceQuadratureAdapter;
use crate::space::FiniteElementSpace;
use crate::{BoundaryMarker, Real};
use eyre::{bail, eyre, Result, WrapErr};
use log::debug;
use nalgebra::DVector;
use nalgebra_sparse::pattern::SparsityPattern;
use std::collections::BTreeSet;

/// A vector that supports additive scatter of individual entries.
pub trait GlobalVector<T: Real> {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `value` to the entry at `index`.
    ///
    /// # Panics
    ///
    /// May panic if `index` is out of bounds.
    fn add_to_entry(&mut self, index: usize, value: T);
}

impl<T: Real> GlobalVector<T> for DVector<T> {
    fn len(&self) -> usize {
        self.nrows()
    }

    fn add_to_entry(&mut self, index: usize, value: T) {
        self[index] += value;
    }
}

impl<T: Real> GlobalVector<T> for Vec<T> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn add_to_entry(&mut self, index: usize, value: T) {
        self[index] += value;
    }
}

impl<T: Real> GlobalVector<T> for [T] {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn add_to_entry(&mut self, index: usize, value: T) {
        self[index] += value;
    }
}

/// Populates `indices` with the global indices of all local entries of an element, block by block.
pub(crate) fn populate_element_dofs<S: FiniteElementSpace + ?Sized>(
    indices: &mut Vec<usize>,
    space: &S,
    element_index: usize,
) {
    let n = space.element_node_count();
    let num_nodes = space.num_nodes();
    indices.clear();
    for b in 0..space.field_dim() {
        indices.extend((0..n).map(|i| space.local_to_global(element_index, i) + b * num_nodes));
    }
}

/// Computes the sparsity pattern of a boundary matrix coupling the given test and trial spaces.
///
/// An entry `(r, c)` is present if a marked boundary face, whose adapted quadrature rule is
/// not empty, couples test DOF `r` and trial DOF `c`.
pub fn assemble_boundary_pattern<T, M, L, TestSpace, TrialSpace>(
    mesh: &M,
    marker: BoundaryMarker,
    adapter: &mut LevelSetFaceQuadratureAdapter<T, L>,
    test_space: &TestSpace,
    trial_space: &TrialSpace,
) -> Result<SparsityPattern>
where
    T: Real,
    M: BoundaryMesh<T>,
    L: LevelSetField<T>,
    TestSpace: FiniteElementSpace,
    TrialSpace: FiniteElementSpace,
{
    if test_space.num_elements() != mesh.num_elements() || trial_space.num_elements() != mesh.num_elements() {
        bail!("test and trial spaces must be defined on the mesh");
    }

    // A BTreeSet stores each matrix entry exactly once, in row-major order
    let mut matrix_entries = BTreeSet::new();
    let mut test_dofs = Vec::new();
    let mut trial_dofs = Vec::new();
    let mut num_faces = 0;
    for face_index in 0..mesh.num_boundary_faces() {
        let face = mesh
            .boundary_face(face_index)
            .ok_or_else(|| eyre!("boundary face {face_index} out of bounds"))?;
        if face.marker() != marker {
            continue;
        }
        adapter.update(face.adjacent_element())?;
        if adapter.adapted_face_quadrature(face.local_index()).is_empty() {
            continue;
        }
        num_faces += 1;
        populate_element_dofs(&mut test_dofs, test_space, face.adjacent_element());
        populate_element_dofs(&mut trial_dofs, trial_space, face.adjacent_element());
        for &r in &test_dofs {
            for &c in &trial_dofs {
                matrix_entries.insert((r, c));
            }
        }
    }
    debug!(
        "boundary pattern for marker {marker}: {num_faces} faces, {} entries",
        matrix_entries.len()
    );

    let num_rows = test_space.num_total_dofs();
    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(matrix_entries.len());
    offsets.push(0);
    for (i, j) in matrix_entries {
        while i + 1 > offsets.len() {
            // A new row begins. Loop to correctly handle consecutive empty rows
            offsets.push(column_indices.len());
        }
        column_indices.push(j);
    }
    while offsets.len() < num_rows + 1 {
        offsets.push(column_indices.len());
    }

    SparsityPattern::try_from_offsets_and_indices(num_rows, trial_space.num_total_dofs(), offsets, column_indices)
        .wrap_err("failed to construct boundary sparsity pattern")
}
