use crate::element::{FiniteElement, ReferenceFace, Tet4Element};
use crate::quadrature::{FaceQuadrature, Quadrature, QuadratureId};
use crate::Real;
use eyre::{bail, eyre, Result};
use nalgebra::{Matrix3, Point3, Vector3};

/// Geometric quantities at the quadrature points of one local face of an element.
///
/// An evaluator belongs to a single local face slot. Binding a rule with
/// [`set_quadrature`](Self::set_quadrature) maps its points onto the reference face, and
/// [`update`](Self::update) recomputes every physical quantity for a new element.
#[derive(Debug, Clone)]
pub struct FaceGeometryEvaluator<T: Real> {
    face: ReferenceFace<T>,
    rule_id: Option<QuadratureId>,
    rule_weights: Vec<T>,
    reference_points: Vec<Point3<T>>,
    positions: Vec<Point3<T>>,
    weights: Vec<T>,
    normal: Vector3<T>,
    tangents: [Vector3<T>; 2],
    jacobian_inverse_transpose: Matrix3<T>,
    up_to_date: bool,
}

impl<T: Real> FaceGeometryEvaluator<T> {
    pub fn new(face: ReferenceFace<T>) -> Self {
        Self {
            face,
            rule_id: None,
            rule_weights: Vec::new(),
            reference_points: Vec::new(),
            positions: Vec::new(),
            weights: Vec::new(),
            normal: Vector3::zeros(),
            tangents: [Vector3::zeros(); 2],
            jacobian_inverse_transpose: Matrix3::identity(),
            up_to_date: false,
        }
    }

    pub fn local_face_index(&self) -> usize {
        self.face.local_index()
    }

    pub fn reference_face(&self) -> &ReferenceFace<T> {
        &self.face
    }

    /// The identity of the bound rule, if any.
    pub fn rule_id(&self) -> Option<QuadratureId> {
        self.rule_id
    }

    /// Binds a quadrature rule. Does nothing if a rule with the same identity is already bound.
    ///
    /// Physical quantities must be recomputed with [`update`](Self::update) after binding a new rule.
    pub fn set_quadrature(&mut self, rule: &FaceQuadrature<T>) {
        if self.rule_id == Some(rule.id()) {
            return;
        }
        self.rule_id = Some(rule.id());
        self.rule_weights.clear();
        self.rule_weights.extend_from_slice(rule.weights());
        self.reference_points.clear();
        self.reference_points
            .extend(rule.points().iter().map(|eta| self.face.map_reference_coords(eta)));
        self.up_to_date = false;
    }

    /// Recomputes all geometric quantities for the given element.
    ///
    /// Fails if no rule is bound or if the element or its face is degenerate.
    #[allow(non_snake_case)]
    pub fn update(&mut self, element: &Tet4Element<T>) -> Result<()> {
        if self.rule_id.is_none() {
            bail!("no quadrature rule bound to face slot {}", self.local_face_index());
        }

        // Affine geometry, so the Jacobian is constant
        let J = element.reference_jacobian(&Point3::origin());
        let J_inv = J
            .try_inverse()
            .ok_or_else(|| eyre!("degenerate element geometry (singular Jacobian)"))?;
        let JF = J * self.face.reference_jacobian();
        let area_normal = JF.column(0).cross(&JF.column(1));
        let area_density = area_normal.norm();
        if area_density == T::zero() {
            bail!("degenerate face geometry (zero area) on face slot {}", self.local_face_index());
        }

        let mut normal = area_normal / area_density;
        let face_point = element.map_reference_coords(&self.face.vertices()[0]);
        if normal.dot(&(face_point - element.centroid())) < T::zero() {
            normal = -normal;
        }

        self.normal = normal;
        let reference_tangents = *self.face.tangents();
        self.tangents = reference_tangents.map(|t| J * t);
        self.jacobian_inverse_transpose = J_inv.transpose();

        self.weights.clear();
        self.weights
            .extend(self.rule_weights.iter().map(|&w| w * area_density));
        self.positions.clear();
        self.positions
            .extend(self.reference_points.iter().map(|xi| element.map_reference_coords(xi)));
        self.up_to_date = true;
        Ok(())
    }

    pub fn num_points(&self) -> usize {
        self.reference_points.len()
    }

    /// Measure-weighted integration weights, one per quadrature point.
    ///
    /// The sum of the weights equals the area of the physical face (or the part of it that
    /// the bound rule covers).
    pub fn weights(&self) -> &[T] {
        debug_assert!(self.up_to_date, "face geometry evaluator used before update");
        &self.weights
    }

    pub fn weight(&self, q: usize) -> T {
        self.weights()[q]
    }

    /// Quadrature points in reference tetrahedron coordinates.
    pub fn reference_points(&self) -> &[Point3<T>] {
        &self.reference_points
    }

    pub fn positions(&self) -> &[Point3<T>] {
        &self.positions
    }

    /// The outward unit normal of the face.
    pub fn normal(&self) -> &Vector3<T> {
        &self.normal
    }

    /// Reference tangents of the slot mapped to physical space.
    pub fn tangents(&self) -> &[Vector3<T>; 2] {
        &self.tangents
    }

    pub fn jacobian_inverse_transpose(&self) -> &Matrix3<T> {
        &self.jacobian_inverse_transpose
    }

    /// The area of the face part covered by the bound rule.
    pub fn measure(&self) -> T {
        self.weights().iter().fold(T::zero(), |acc, &w| acc + w)
    }
}
