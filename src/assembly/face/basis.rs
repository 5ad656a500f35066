use crate::assembly::face::UpdateFlags;
use crate::element::{FiniteElement, ReferenceFace, ReferenceFiniteElement, Tet4Element, TetrahedralLagrange};
use crate::quadrature::{FaceQuadrature, Quadrature, QuadratureId};
use crate::Real;
use eyre::{eyre, Result};
use nalgebra::{Point3, Vector3};

/// Basis function values and gradients at the quadrature points of one local face of an element.
///
/// Reference data is tabulated when a rule with a new identity is bound. Gradients are mapped
/// to physical space in [`update`](Self::update), and only when requested by the update flags.
/// Data is stored point-major, i.e. entry `q * n + i` belongs to quadrature point `q` and
/// local basis function `i`.
#[derive(Debug, Clone)]
pub struct FaceBasisEvaluator<T: Real> {
    face: ReferenceFace<T>,
    element: TetrahedralLagrange,
    rule_id: Option<QuadratureId>,
    num_points: usize,
    values: Vec<T>,
    reference_gradients: Vec<Vector3<T>>,
    gradients: Vec<Vector3<T>>,
    computed: UpdateFlags,
}

impl<T: Real> FaceBasisEvaluator<T> {
    pub fn new(face: ReferenceFace<T>, element: TetrahedralLagrange) -> Self {
        Self {
            face,
            element,
            rule_id: None,
            num_points: 0,
            values: Vec::new(),
            reference_gradients: Vec::new(),
            gradients: Vec::new(),
            computed: UpdateFlags::NONE,
        }
    }

    pub fn local_face_index(&self) -> usize {
        self.face.local_index()
    }

    pub fn reference_element(&self) -> TetrahedralLagrange {
        self.element
    }

    pub fn rule_id(&self) -> Option<QuadratureId> {
        self.rule_id
    }

    /// Binds a quadrature rule and tabulates the reference basis at its points.
    ///
    /// Does nothing if a rule with the same identity is already bound.
    pub fn set_quadrature(&mut self, rule: &FaceQuadrature<T>) {
        if self.rule_id == Some(rule.id()) {
            return;
        }
        let n = self.num_nodes();
        self.rule_id = Some(rule.id());
        self.num_points = rule.len();
        self.values.resize(n * self.num_points, T::zero());
        self.reference_gradients
            .resize(n * self.num_points, Vector3::zeros());
        for (q, eta) in rule.points().iter().enumerate() {
            let xi = self.face.map_reference_coords(eta);
            self.element
                .populate_basis(&mut self.values[q * n..(q + 1) * n], &xi);
            self.element
                .populate_basis_gradients(&mut self.reference_gradients[q * n..(q + 1) * n], &xi);
        }
        self.computed = UpdateFlags::VALUES;
    }

    /// Prepares the data requested by `flags` for the given element.
    pub fn update(&mut self, element: &Tet4Element<T>, flags: UpdateFlags) -> Result<()> {
        if self.rule_id.is_none() {
            return Err(eyre!("no quadrature rule bound to face slot {}", self.local_face_index()));
        }
        // Lagrange basis values do not depend on the (affine) element geometry
        self.computed = UpdateFlags::VALUES;
        if flags.contains(UpdateFlags::GRADIENTS) {
            let jacobian_inverse_transpose = element
                .reference_jacobian(&Point3::origin())
                .try_inverse()
                .ok_or_else(|| eyre!("degenerate element geometry (singular Jacobian)"))?
                .transpose();
            self.gradients.clear();
            self.gradients.extend(
                self.reference_gradients
                    .iter()
                    .map(|g| jacobian_inverse_transpose * g),
            );
            self.computed |= UpdateFlags::GRADIENTS;
        }
        Ok(())
    }

    /// The number of basis functions of the reference element.
    pub fn num_nodes(&self) -> usize {
        self.element.node_count()
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn computed_flags(&self) -> UpdateFlags {
        self.computed
    }

    /// The value of basis function `i` at quadrature point `q`.
    pub fn value(&self, q: usize, i: usize) -> T {
        self.values[q * self.num_nodes() + i]
    }

    /// The physical gradient of basis function `i` at quadrature point `q`.
    ///
    /// # Panics
    ///
    /// Panics if gradients were not requested in the last update.
    pub fn gradient(&self, q: usize, i: usize) -> &Vector3<T> {
        assert!(
            self.computed.contains(UpdateFlags::GRADIENTS),
            "basis gradients were not requested in the last update"
        );
        &self.gradients[q * self.num_nodes() + i]
    }
}
