//! Finite element spaces and their degree-of-freedom maps.
use crate::element::TetrahedralLagrange;
use crate::mesh::BoundaryMesh;
use crate::Real;
use eyre::{bail, eyre, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// The view of a finite element space needed to assemble vectors over it.
///
/// The space has `field_dim()` blocks. Every block shares the same scalar DOF map, and
/// the global index of local entry `i + b * n` of an element is
/// `local_to_global(element, i) + b * num_nodes()`, with `n` the number of nodes of the
/// reference element.
pub trait FiniteElementSpace {
    fn reference_element(&self) -> TetrahedralLagrange;

    /// The number of components of the (vector-valued) field.
    fn field_dim(&self) -> usize;

    /// The total number of scalar nodes in a single block.
    fn num_nodes(&self) -> usize;

    fn num_elements(&self) -> usize;

    /// Maps a local node of an element to its global node index.
    ///
    /// # Panics
    ///
    /// May panic if the element or local index is out of bounds.
    fn local_to_global(&self, element_index: usize, local_index: usize) -> usize;

    /// The number of nodes per element in a single block.
    fn element_node_count(&self) -> usize {
        self.reference_element().node_count()
    }

    /// The total length of a global vector over this space.
    fn num_total_dofs(&self) -> usize {
        self.field_dim() * self.num_nodes()
    }
}

impl<'a, S: FiniteElementSpace> FiniteElementSpace for &'a S {
    fn reference_element(&self) -> TetrahedralLagrange {
        S::reference_element(self)
    }

    fn field_dim(&self) -> usize {
        S::field_dim(self)
    }

    fn num_nodes(&self) -> usize {
        S::num_nodes(self)
    }

    fn num_elements(&self) -> usize {
        S::num_elements(self)
    }

    fn local_to_global(&self, element_index: usize, local_index: usize) -> usize {
        S::local_to_global(self, element_index, local_index)
    }
}

/// A continuous Lagrange space of degree 1 or 2 on a tetrahedral mesh.
///
/// Vertex nodes carry the index of the mesh vertex. For quadratic spaces, edge nodes are
/// numbered after all vertex nodes, in the order in which edges are first encountered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LagrangeSpace {
    element: TetrahedralLagrange,
    field_dim: usize,
    num_nodes: usize,
    // Element nodes stored contiguously, with a stride equal to the element node count
    element_nodes: Vec<usize>,
}

impl LagrangeSpace {
    pub fn new<T, M>(mesh: &M, degree: usize, field_dim: usize) -> Result<Self>
    where
        T: Real,
        M: BoundaryMesh<T>,
    {
        let element = TetrahedralLagrange::from_degree(degree)
            .ok_or_else(|| eyre!("unsupported Lagrange degree {degree}, expected 1 or 2"))?;
        if field_dim == 0 {
            bail!("field dimension must be positive");
        }

        let num_vertices = mesh.num_vertices();
        let mut edge_nodes = FxHashMap::default();
        let mut element_nodes = Vec::new();
        for element_index in 0..mesh.num_elements() {
            let conn = mesh
                .element_connectivity(element_index)
                .ok_or_else(|| eyre!("mesh has no connectivity for element {element_index}"))?;
            if let Some(&v) = conn.iter().find(|&&v| v >= num_vertices) {
                bail!("element {element_index} references vertex {v}, but the mesh only has {num_vertices} vertices");
            }
            element_nodes.extend_from_slice(&conn.0);
            if element == TetrahedralLagrange::Quadratic {
                for [a, b] in crate::connectivity::TET4_LOCAL_EDGES {
                    let (a, b) = (conn[a], conn[b]);
                    let key = (a.min(b), a.max(b));
                    let next_index = num_vertices + edge_nodes.len();
                    let node = *edge_nodes.entry(key).or_insert(next_index);
                    element_nodes.push(node);
                }
            }
        }

        Ok(Self {
            element,
            field_dim,
            num_nodes: num_vertices + edge_nodes.len(),
            element_nodes,
        })
    }

    pub fn degree(&self) -> usize {
        self.element.degree()
    }

    /// The global nodes of the given element, in local node order.
    pub fn element_nodes(&self, element_index: usize) -> &[usize] {
        let n = self.element_node_count();
        &self.element_nodes[n * element_index..n * (element_index + 1)]
    }
}

impl FiniteElementSpace for LagrangeSpace {
    fn reference_element(&self) -> TetrahedralLagrange {
        self.element
    }

    fn field_dim(&self) -> usize {
        self.field_dim
    }

    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn num_elements(&self) -> usize {
        self.element_nodes.len() / self.element_node_count()
    }

    fn local_to_global(&self, element_index: usize, local_index: usize) -> usize {
        let n = self.element_node_count();
        assert!(local_index < n, "local index {local_index} out of bounds for element with {n} nodes");
        self.element_nodes[n * element_index + local_index]
    }
}
