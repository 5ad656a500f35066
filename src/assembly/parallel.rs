//! Data-parallel boundary assembly over disjoint mesh partitions.
use crate::assembly::boundary::BoundaryVectorAssembler;
use crate::levelset::LevelSetField;
use crate::mesh::BoundaryMesh;
use crate::space::FiniteElementSpace;
use crate::Real;
use eyre::{eyre, Result};
use log::debug;
use nalgebra::DVector;
use rayon::prelude::*;

/// A set of elements together with the boundary faces adjacent to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshPartition {
    elements: Vec<usize>,
    boundary_faces: Vec<usize>,
}

impl MeshPartition {
    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    pub fn boundary_faces(&self) -> &[usize] {
        &self.boundary_faces
    }
}

/// Splits the elements of a mesh into (at most) `num_partitions` contiguous blocks.
///
/// Every boundary face belongs to the partition of its adjacent element, so the boundary
/// faces of the partitions are disjoint and cover all boundary faces of the mesh.
pub fn partition_mesh<T, M>(mesh: &M, num_partitions: usize) -> Result<Vec<MeshPartition>>
where
    T: Real,
    M: BoundaryMesh<T>,
{
    let num_elements = mesh.num_elements();
    let num_partitions = num_partitions.max(1).min(num_elements.max(1));
    let block_size = (num_elements + num_partitions - 1) / num_partitions;
    let block_of = |element: usize| element / block_size.max(1);

    let mut partitions: Vec<_> = (0..num_partitions)
        .map(|p| MeshPartition {
            elements: (p * block_size..((p + 1) * block_size).min(num_elements)).collect(),
            boundary_faces: Vec::new(),
        })
        .collect();
    for face_index in 0..mesh.num_boundary_faces() {
        let face = mesh
            .boundary_face(face_index)
            .ok_or_else(|| eyre!("boundary face {face_index} out of bounds"))?;
        let partition = partitions
            .get_mut(block_of(face.adjacent_element()))
            .ok_or_else(|| eyre!("boundary face {face_index} is adjacent to missing element"))?;
        partition.boundary_faces.push(face_index);
    }
    Ok(partitions)
}

/// Assembles a boundary vector with one assembler per partition, in parallel.
///
/// The factory creates the assembler of a partition, which then only visits the boundary
/// faces of that partition. Partial vectors of length `len` are summed.
pub fn par_assemble_boundary_vector<T, M, L, S, F>(
    partitions: &[MeshPartition],
    factory: F,
    len: usize,
) -> Result<DVector<T>>
where
    T: Real,
    M: BoundaryMesh<T>,
    L: LevelSetField<T>,
    S: FiniteElementSpace,
    F: Fn(&MeshPartition) -> Result<BoundaryVectorAssembler<T, M, L, S>> + Sync,
{
    debug!("assembling boundary vector over {} partitions", partitions.len());
    partitions
        .par_iter()
        .map(|partition| -> Result<DVector<T>> {
            let mut assembler = factory(partition)?;
            let mut partial = DVector::zeros(len);
            assembler.add_to_faces(partition.boundary_faces().iter().copied(), &mut partial)?;
            Ok(partial)
        })
        .try_reduce(|| DVector::zeros(len), |a, b| Ok(a + b))
}

/// Like [`par_assemble_boundary_vector`], but duplicates an existing assembler for every
/// partition instead of building a new one.
pub fn par_assemble_boundary_vector_cloned<T, M, L, S>(
    assembler: &BoundaryVectorAssembler<T, M, L, S>,
    partitions: &[MeshPartition],
) -> Result<DVector<T>>
where
    T: Real,
    M: BoundaryMesh<T>,
    L: LevelSetField<T>,
    S: FiniteElementSpace,
    BoundaryVectorAssembler<T, M, L, S>: Clone + Sync,
{
    let len = assembler.test_space().num_total_dofs();
    par_assemble_boundary_vector(partitions, |_| Ok(assembler.clone()), len)
}
