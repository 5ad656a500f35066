//! Piecewise linear nodal fields, in particular level-set functions.
use crate::connectivity::Tet4Connectivity;
use crate::mesh::BoundaryMesh;
use crate::Real;
use eyre::{bail, eyre, Result};
use nalgebra::{Point3, Vector3};
use std::sync::Arc;

/// A scalar field whose zero level set describes an interface.
///
/// The field is only queried through the values at the four vertices of an element, and is
/// assumed to vary linearly in between.
pub trait LevelSetField<T: Real> {
    /// Returns the level-set values at the vertices of the given element, or `None` if the
    /// field has no data for the element.
    fn element_vertex_values(&self, element_index: usize) -> Option<[T; 4]>;
}

impl<'a, T: Real, L: LevelSetField<T> + ?Sized> LevelSetField<T> for &'a L {
    fn element_vertex_values(&self, element_index: usize) -> Option<[T; 4]> {
        L::element_vertex_values(self, element_index)
    }
}

impl<T: Real, L: LevelSetField<T> + ?Sized> LevelSetField<T> for Arc<L> {
    fn element_vertex_values(&self, element_index: usize) -> Option<[T; 4]> {
        L::element_vertex_values(self, element_index)
    }
}

/// A (possibly vector-valued) piecewise linear field stored at the vertices of a tetrahedral mesh.
///
/// A field may be restricted to a subset of the elements of the mesh, for example the elements
/// owned by a single partition. Queries for other elements return `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodalField<T: Real> {
    num_components: usize,
    values: Vec<T>,
    connectivity: Vec<Tet4Connectivity>,
    covered_elements: Option<Vec<bool>>,
}

impl<T: Real> NodalField<T> {
    /// Creates a field from values stored vertex by vertex, with `num_components` entries per vertex.
    pub fn from_vertex_values<M>(mesh: &M, values: Vec<T>, num_components: usize) -> Result<Self>
    where
        M: BoundaryMesh<T>,
    {
        if num_components == 0 {
            bail!("nodal field must have at least one component");
        }
        let expected_len = num_components * mesh.num_vertices();
        if values.len() != expected_len {
            bail!(
                "nodal field has {} values, expected {} ({} components at {} vertices)",
                values.len(),
                expected_len,
                num_components,
                mesh.num_vertices()
            );
        }
        let connectivity = (0..mesh.num_elements())
            .map(|i| {
                mesh.element_connectivity(i)
                    .copied()
                    .ok_or_else(|| eyre!("mesh has no connectivity for element {i}"))
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            num_components,
            values,
            connectivity,
            covered_elements: None,
        })
    }

    /// Creates a vector field by evaluating a function at every vertex of the mesh.
    pub fn interpolate_vector<M>(mesh: &M, f: impl Fn(&Point3<T>) -> Vector3<T>) -> Result<Self>
    where
        M: BoundaryMesh<T>,
    {
        let values = vertex_positions(mesh)?
            .iter()
            .flat_map(|x| {
                let v = f(x);
                [v.x, v.y, v.z]
            })
            .collect();
        Self::from_vertex_values(mesh, values, 3)
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn vertex_values(&self) -> &[T] {
        &self.values
    }

    /// Returns a copy of the field that only covers the given elements.
    pub fn restrict_to_elements(&self, elements: &[usize]) -> Self {
        let mut covered = vec![false; self.connectivity.len()];
        for &e in elements {
            if let Some(flag) = covered.get_mut(e) {
                *flag = true;
            }
        }
        if let Some(current) = &self.covered_elements {
            for (flag, &was_covered) in covered.iter_mut().zip(current) {
                *flag &= was_covered;
            }
        }
        Self {
            covered_elements: Some(covered),
            ..self.clone()
        }
    }

    pub fn covers_element(&self, element_index: usize) -> bool {
        element_index < self.connectivity.len()
            && self
                .covered_elements
                .as_ref()
                .map(|covered| covered[element_index])
                .unwrap_or(true)
    }

    /// The values of the given component at the four vertices of an element.
    pub fn element_component_values(&self, element_index: usize, component: usize) -> Option<[T; 4]> {
        if component >= self.num_components || !self.covers_element(element_index) {
            return None;
        }
        let conn = &self.connectivity[element_index];
        Some(conn.0.map(|v| self.values[self.num_components * v + component]))
    }
}

/// A scalar nodal field used as a level-set function.
#[derive(Debug, Clone, PartialEq)]
pub struct NodalLevelSet<T: Real> {
    field: Arc<NodalField<T>>,
}

impl<T: Real> NodalLevelSet<T> {
    pub fn from_vertex_values<M>(mesh: &M, values: Vec<T>) -> Result<Self>
    where
        M: BoundaryMesh<T>,
    {
        let field = NodalField::from_vertex_values(mesh, values, 1)?;
        Ok(Self { field: Arc::new(field) })
    }

    /// Creates a level set by evaluating a function at every vertex of the mesh.
    pub fn interpolate<M>(mesh: &M, f: impl Fn(&Point3<T>) -> T) -> Result<Self>
    where
        M: BoundaryMesh<T>,
    {
        let values = vertex_positions(mesh)?.iter().map(f).collect();
        Self::from_vertex_values(mesh, values)
    }

    pub fn restrict_to_elements(&self, elements: &[usize]) -> Self {
        Self {
            field: Arc::new(self.field.restrict_to_elements(elements)),
        }
    }

    /// The level set as a field that can be used in expressions.
    pub fn as_field(&self) -> Arc<NodalField<T>> {
        Arc::clone(&self.field)
    }
}

impl<T: Real> LevelSetField<T> for NodalLevelSet<T> {
    fn element_vertex_values(&self, element_index: usize) -> Option<[T; 4]> {
        self.field.element_component_values(element_index, 0)
    }
}

fn vertex_positions<T: Real, M: BoundaryMesh<T>>(mesh: &M) -> Result<Vec<Point3<T>>> {
    // The mesh trait only exposes vertices through elements
    let mut positions = vec![None; mesh.num_vertices()];
    for i in 0..mesh.num_elements() {
        let conn = mesh
            .element_connectivity(i)
            .ok_or_else(|| eyre!("mesh has no connectivity for element {i}"))?;
        let element = mesh
            .element(i)
            .ok_or_else(|| eyre!("mesh has no geometry for element {i}"))?;
        for (&v, x) in conn.iter().zip(element.vertices()) {
            positions[v] = Some(*x);
        }
    }
    Ok(positions
        .into_iter()
        .map(|x| x.unwrap_or_else(Point3::origin))
        .collect())
}
