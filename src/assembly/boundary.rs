//! Assembly of vectors over marked boundary faces.
use crate::assembly::elemental::ElementalVector;
use crate::assembly::face::{FaceBasisEvaluator, FaceGeometryEvaluator};
use crate::assembly::global::GlobalVector;
use crate::element::{reference_faces, TetrahedralLagrange, NUM_TET_FACES};
use crate::expression::{Evaluation, Expression};
use crate::levelset::LevelSetField;
use crate::mesh::BoundaryMesh;
use crate::quadrature::adapter::LevelSetFaceQuadratureAdapter;
use crate::quadrature::FaceQuadrature;
use crate::space::FiniteElementSpace;
use crate::{BoundaryMarker, Real};
use eyre::{bail, eyre, Result, WrapErr};
use log::{debug, trace};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::io;

/// The life cycle of a [`BoundaryVectorAssembler`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssemblerState {
    /// No assembly pass has been started yet.
    Constructed,
    /// An assembly pass is in progress.
    Assembling,
    /// The last assembly pass has ended.
    Idle,
}

impl Display for AssemblerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constructed => "constructed",
            Self::Assembling => "assembling",
            Self::Idle => "idle",
        };
        write!(f, "{name}")
    }
}

/// Counts collected during an assembly pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PassStatistics {
    /// Number of boundary faces inspected.
    pub faces_visited: usize,
    /// Number of faces that carry the configured marker.
    pub faces_assembled: usize,
    /// Total number of quadrature points over all assembled faces.
    pub quadrature_points: usize,
}

pub struct BoundaryVectorAssemblerBuilder<MeshT, AdapterT, SpaceT, ExpressionT> {
    mesh: MeshT,
    marker: Option<BoundaryMarker>,
    adapter: AdapterT,
    space: SpaceT,
    expression: ExpressionT,
}

impl BoundaryVectorAssemblerBuilder<(), (), (), ()> {
    pub fn new() -> Self {
        Self {
            mesh: (),
            marker: None,
            adapter: (),
            space: (),
            expression: (),
        }
    }
}

impl Default for BoundaryVectorAssemblerBuilder<(), (), (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<MeshT, AdapterT, SpaceT, ExpressionT> BoundaryVectorAssemblerBuilder<MeshT, AdapterT, SpaceT, ExpressionT> {
    pub fn with_mesh<M>(self, mesh: M) -> BoundaryVectorAssemblerBuilder<M, AdapterT, SpaceT, ExpressionT> {
        BoundaryVectorAssemblerBuilder {
            mesh,
            marker: self.marker,
            adapter: self.adapter,
            space: self.space,
            expression: self.expression,
        }
    }

    /// Only boundary faces carrying this marker are assembled.
    pub fn with_boundary_marker(self, marker: BoundaryMarker) -> Self {
        Self {
            marker: Some(marker),
            ..self
        }
    }

    pub fn with_quadrature_adapter<T: Real, L>(
        self,
        adapter: LevelSetFaceQuadratureAdapter<T, L>,
    ) -> BoundaryVectorAssemblerBuilder<MeshT, LevelSetFaceQuadratureAdapter<T, L>, SpaceT, ExpressionT> {
        BoundaryVectorAssemblerBuilder {
            mesh: self.mesh,
            marker: self.marker,
            adapter,
            space: self.space,
            expression: self.expression,
        }
    }

    pub fn with_test_space<S>(self, space: S) -> BoundaryVectorAssemblerBuilder<MeshT, AdapterT, S, ExpressionT> {
        BoundaryVectorAssemblerBuilder {
            mesh: self.mesh,
            marker: self.marker,
            adapter: self.adapter,
            space,
            expression: self.expression,
        }
    }

    pub fn with_expression<T: Real>(
        self,
        expression: Expression<T>,
    ) -> BoundaryVectorAssemblerBuilder<MeshT, AdapterT, SpaceT, Expression<T>> {
        BoundaryVectorAssemblerBuilder {
            mesh: self.mesh,
            marker: self.marker,
            adapter: self.adapter,
            space: self.space,
            expression,
        }
    }
}

impl<T, M, L, S> BoundaryVectorAssemblerBuilder<M, LevelSetFaceQuadratureAdapter<T, L>, S, Expression<T>>
where
    T: Real,
    M: BoundaryMesh<T>,
    L: LevelSetField<T>,
    S: FiniteElementSpace,
{
    /// Builds the assembler, compiling the expression for the test space.
    pub fn build(self) -> Result<BoundaryVectorAssembler<T, M, L, S>> {
        let marker = self
            .marker
            .ok_or_else(|| eyre!("no boundary marker given to boundary vector assembler"))?;
        if self.space.num_elements() != self.mesh.num_elements() {
            bail!(
                "test space has {} elements, but the mesh has {}",
                self.space.num_elements(),
                self.mesh.num_elements()
            );
        }
        let evaluation = Evaluation::compile(&self.expression, self.space.field_dim())
            .wrap_err("failed to compile boundary integrand")?;

        let (geometry, basis) = slot_evaluators(self.space.reference_element(), self.adapter.base_quadrature());
        let elemental = ElementalVector::new(self.space.field_dim(), self.space.element_node_count());

        Ok(BoundaryVectorAssembler {
            mesh: self.mesh,
            marker,
            adapter: self.adapter,
            space: self.space,
            evaluation,
            geometry,
            basis,
            elemental,
            state: AssemblerState::Constructed,
            last_slot: 0,
            statistics: PassStatistics::default(),
        })
    }
}

type SlotEvaluators<T> = (
    [FaceGeometryEvaluator<T>; NUM_TET_FACES],
    [FaceBasisEvaluator<T>; NUM_TET_FACES],
);

/// Creates one geometry and one basis evaluator per local face slot, bound to the base rule.
fn slot_evaluators<T: Real>(reference_element: TetrahedralLagrange, base: &FaceQuadrature<T>) -> SlotEvaluators<T> {
    let faces = reference_faces::<T>();
    let geometry = faces.map(|face| {
        let mut evaluator = FaceGeometryEvaluator::new(face);
        evaluator.set_quadrature(base);
        evaluator
    });
    let basis = faces.map(|face| {
        let mut evaluator = FaceBasisEvaluator::new(face, reference_element);
        evaluator.set_quadrature(base);
        evaluator
    });
    (geometry, basis)
}

/// Assembles `∫ f(phi_i)` over the boundary faces with a given marker into a global vector.
///
/// Each of the four local face slots of the tetrahedron owns a geometry and a basis evaluator,
/// which are reused for every face with that slot. For each assembled face, the quadrature
/// adapter provides the rule for the face, adapted to the level set on the adjacent element.
///
/// The global index of local entry `i + b * n` is `local_to_global(element, i) + b * N`, where
/// `N` is the number of nodes per block in the test space.
pub struct BoundaryVectorAssembler<T: Real, M, L, S> {
    mesh: M,
    marker: BoundaryMarker,
    adapter: LevelSetFaceQuadratureAdapter<T, L>,
    space: S,
    evaluation: Evaluation<T>,
    geometry: [FaceGeometryEvaluator<T>; NUM_TET_FACES],
    basis: [FaceBasisEvaluator<T>; NUM_TET_FACES],
    elemental: ElementalVector<T>,
    state: AssemblerState,
    last_slot: usize,
    statistics: PassStatistics,
}

/// The clone shares the mesh, the test space, the base rule and the expression, but receives
/// its own evaluators for every face slot and starts out in the
/// [`Constructed`](AssemblerState::Constructed) state.
impl<T, M, L, S> Clone for BoundaryVectorAssembler<T, M, L, S>
where
    T: Real,
    M: Clone,
    L: LevelSetField<T> + Clone,
    S: FiniteElementSpace + Clone,
{
    fn clone(&self) -> Self {
        let adapter = self.adapter.clone();
        let (geometry, basis) = slot_evaluators(self.space.reference_element(), adapter.base_quadrature());
        Self {
            mesh: self.mesh.clone(),
            marker: self.marker,
            adapter,
            space: self.space.clone(),
            evaluation: self.evaluation.clone(),
            geometry,
            basis,
            elemental: ElementalVector::new(self.space.field_dim(), self.space.element_node_count()),
            state: AssemblerState::Constructed,
            last_slot: 0,
            statistics: PassStatistics::default(),
        }
    }
}

impl<T, M, L, S> BoundaryVectorAssembler<T, M, L, S>
where
    T: Real,
    M: BoundaryMesh<T>,
    L: LevelSetField<T>,
    S: FiniteElementSpace,
{
    pub fn marker(&self) -> BoundaryMarker {
        self.marker
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    pub fn test_space(&self) -> &S {
        &self.space
    }

    pub fn quadrature_adapter(&self) -> &LevelSetFaceQuadratureAdapter<T, L> {
        &self.adapter
    }

    pub fn evaluation(&self) -> &Evaluation<T> {
        &self.evaluation
    }

    /// The elemental vector of the last assembled face.
    pub fn elemental_vector(&self) -> &ElementalVector<T> {
        &self.elemental
    }

    /// Statistics of the last assembly pass.
    pub fn last_pass_statistics(&self) -> PassStatistics {
        self.statistics
    }

    /// Adds the contributions of all marked boundary faces to the global vector.
    ///
    /// The vector must have length `field_dim * num_nodes` of the test space. If the pass
    /// fails, the vector is left partially assembled.
    pub fn add_to<V>(&mut self, global: &mut V) -> Result<()>
    where
        V: GlobalVector<T> + ?Sized,
    {
        self.add_to_faces(0..self.mesh.num_boundary_faces(), global)
    }

    /// Like [`add_to`](Self::add_to), but only visits the given boundary faces.
    pub fn add_to_faces<V, I>(&mut self, faces: I, global: &mut V) -> Result<()>
    where
        V: GlobalVector<T> + ?Sized,
        I: IntoIterator<Item = usize>,
    {
        let expected_len = self.space.num_total_dofs();
        if global.len() != expected_len {
            bail!(
                "global vector has length {}, but the test space has {} degrees of freedom",
                global.len(),
                expected_len
            );
        }

        self.state = AssemblerState::Assembling;
        self.statistics = PassStatistics::default();
        let result = faces
            .into_iter()
            .try_for_each(|face_index| self.assemble_face(face_index, global));
        self.state = AssemblerState::Idle;
        debug!(
            "boundary assembly for marker {}: {} faces visited, {} assembled, {} quadrature points",
            self.marker,
            self.statistics.faces_visited,
            self.statistics.faces_assembled,
            self.statistics.quadrature_points
        );
        result
    }

    fn assemble_face<V>(&mut self, face_index: usize, global: &mut V) -> Result<()>
    where
        V: GlobalVector<T> + ?Sized,
    {
        let face = *self
            .mesh
            .boundary_face(face_index)
            .ok_or_else(|| eyre!("boundary face {face_index} out of bounds"))?;
        self.statistics.faces_visited += 1;
        if face.marker() != self.marker {
            return Ok(());
        }

        self.elemental.zero();
        let slot = face.local_index();
        let element_index = face.adjacent_element();
        if slot >= NUM_TET_FACES {
            bail!("boundary face {face_index} has invalid local face index {slot}");
        }
        let element = self
            .mesh
            .element(element_index)
            .ok_or_else(|| eyre!("boundary face {face_index} is adjacent to missing element {element_index}"))?;

        self.adapter
            .update(element_index)
            .wrap_err_with(|| format!("failed to adapt quadrature for boundary face {face_index}"))?;
        let rule = self.adapter.adapted_face_quadrature(slot);
        let geometry = &mut self.geometry[slot];
        let basis = &mut self.basis[slot];
        geometry.set_quadrature(rule);
        basis.set_quadrature(rule);
        geometry
            .update(&element)
            .wrap_err_with(|| format!("failed to evaluate geometry of boundary face {face_index}"))?;
        basis.update(&element, self.evaluation.required_flags())?;
        self.last_slot = slot;

        let geometry = &self.geometry[slot];
        let mut bound = self.evaluation.bind(rule, geometry, &self.basis[slot]);
        bound.update(element_index)?;

        let n = self.space.element_node_count();
        let num_nodes = self.space.num_nodes();
        let num_points = geometry.num_points();
        for b in 0..self.space.field_dim() {
            for i in 0..n {
                let global_index = self.space.local_to_global(element_index, i) + b * num_nodes;
                self.elemental.set_row_index(i + b * n, global_index);
            }
            for q in 0..num_points {
                let w = geometry.weight(q);
                for i in 0..n {
                    *self.elemental.element_mut(i + b * n) += bound.value_qi(q, i + b * n) * w;
                }
            }
        }
        self.elemental.add_to(global);

        self.statistics.faces_assembled += 1;
        self.statistics.quadrature_points += num_points;
        trace!(
            "assembled boundary face {face_index} (element {element_index}, slot {slot}, {} face, {num_points} quadrature points)",
            self.adapter.face_cut(slot)
        );
        Ok(())
    }

    /// Writes the evaluation, the state of the evaluators of every face slot and the elemental
    /// vector of the last assembled face.
    pub fn check<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "BoundaryVectorAssembler (marker {}, state {}, last face slot {})",
            self.marker, self.state, self.last_slot
        )?;
        write!(out, "{}", self.evaluation)?;
        for (slot, (geometry, basis)) in self.geometry.iter().zip(&self.basis).enumerate() {
            let rule = match geometry.rule_id() {
                Some(id) => format!("{id:?}"),
                None => "no rule".to_string(),
            };
            writeln!(
                out,
                "face slot {slot}: {rule} with {} quadrature points, {} basis functions, computed {}",
                geometry.num_points(),
                basis.num_nodes(),
                basis.computed_flags()
            )?;
        }
        write!(out, "{}", self.elemental)
    }
}
