use crate::assembly::face::{FaceBasisEvaluator, FaceGeometryEvaluator, UpdateFlags};
use crate::element::{ReferenceFiniteElement, Tet4Basis};
use crate::expression::{BinaryOp, Expression, ScalarFunction, UnaryOp};
use crate::levelset::NodalField;
use crate::quadrature::FaceQuadrature;
use crate::Real;
use eyre::{bail, eyre, Result};
use nalgebra::{Matrix3, Vector3};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// The shape of the value of an expression node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Vector,
    Matrix,
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Vector => write!(f, "vector"),
            Self::Matrix => write!(f, "matrix"),
        }
    }
}

/// The value of an expression node at a quadrature point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value<T: Real> {
    Scalar(T),
    Vector(Vector3<T>),
    Matrix(Matrix3<T>),
}

impl<T: Real> Value<T> {
    pub fn shape(&self) -> Shape {
        match self {
            Self::Scalar(_) => Shape::Scalar,
            Self::Vector(_) => Shape::Vector,
            Self::Matrix(_) => Shape::Matrix,
        }
    }

    // Operand shapes are checked when compiling, so mismatches below are internal errors

    fn unary(op: UnaryOp, a: Self) -> Self {
        use Value::*;
        match (op, a) {
            (UnaryOp::Neg, Scalar(a)) => Scalar(-a),
            (UnaryOp::Neg, Vector(a)) => Vector(-a),
            (UnaryOp::Neg, Matrix(a)) => Matrix(-a),
            (UnaryOp::Norm, Vector(a)) => Scalar(a.norm()),
            (UnaryOp::Norm, Matrix(a)) => Scalar(a.norm()),
            (UnaryOp::Transpose, Matrix(a)) => Matrix(a.transpose()),
            (op, a) => unreachable!("invalid operand {} for {op:?}", a.shape()),
        }
    }

    fn binary(op: BinaryOp, a: Self, b: Self) -> Self {
        use Value::*;
        match (op, a, b) {
            (BinaryOp::Add, Scalar(a), Scalar(b)) => Scalar(a + b),
            (BinaryOp::Add, Vector(a), Vector(b)) => Vector(a + b),
            (BinaryOp::Add, Matrix(a), Matrix(b)) => Matrix(a + b),
            (BinaryOp::Sub, Scalar(a), Scalar(b)) => Scalar(a - b),
            (BinaryOp::Sub, Vector(a), Vector(b)) => Vector(a - b),
            (BinaryOp::Sub, Matrix(a), Matrix(b)) => Matrix(a - b),
            (BinaryOp::Mul, Scalar(a), Scalar(b)) => Scalar(a * b),
            (BinaryOp::Mul, Scalar(a), Vector(b)) | (BinaryOp::Mul, Vector(b), Scalar(a)) => Vector(b * a),
            (BinaryOp::Mul, Scalar(a), Matrix(b)) | (BinaryOp::Mul, Matrix(b), Scalar(a)) => Matrix(b * a),
            (BinaryOp::Mul, Matrix(a), Vector(b)) => Vector(a * b),
            (BinaryOp::Mul, Matrix(a), Matrix(b)) => Matrix(a * b),
            (BinaryOp::Div, Scalar(a), Scalar(b)) => Scalar(a / b),
            (BinaryOp::Div, Vector(a), Scalar(b)) => Vector(a / b),
            (BinaryOp::Div, Matrix(a), Scalar(b)) => Matrix(a / b),
            (BinaryOp::Dot, Vector(a), Vector(b)) => Scalar(a.dot(&b)),
            (BinaryOp::Dot, Matrix(a), Matrix(b)) => Scalar(a.dot(&b)),
            (op, a, b) => unreachable!("invalid operands {} and {} for {op:?}", a.shape(), b.shape()),
        }
    }
}

fn unary_shape(op: UnaryOp, a: Shape) -> Option<Shape> {
    use Shape::*;
    match (op, a) {
        (UnaryOp::Neg, a) => Some(a),
        (UnaryOp::Norm, Vector | Matrix) => Some(Scalar),
        (UnaryOp::Transpose, Matrix) => Some(Matrix),
        _ => None,
    }
}

fn binary_shape(op: BinaryOp, a: Shape, b: Shape) -> Option<Shape> {
    use Shape::*;
    match (op, a, b) {
        (BinaryOp::Add | BinaryOp::Sub, a, b) if a == b => Some(a),
        (BinaryOp::Mul, Scalar, b) => Some(b),
        (BinaryOp::Mul, a, Scalar) => Some(a),
        (BinaryOp::Mul, Matrix, Vector) => Some(Vector),
        (BinaryOp::Mul, Matrix, Matrix) => Some(Matrix),
        (BinaryOp::Div, a, Scalar) => Some(a),
        (BinaryOp::Dot, Vector, Vector) | (BinaryOp::Dot, Matrix, Matrix) => Some(Scalar),
        _ => None,
    }
}

#[derive(Clone)]
enum NodeKind<T: Real> {
    Constant(Value<T>),
    Phi,
    GradPhi,
    Normal,
    Position,
    Tangent(usize),
    FieldValue(usize),
    FieldGrad(usize),
    Function(ScalarFunction<T>),
    Unary(UnaryOp, usize),
    Binary(BinaryOp, usize, usize),
}

#[derive(Clone)]
struct Node<T: Real> {
    kind: NodeKind<T>,
    shape: Shape,
    test_dependent: bool,
}

/// A compiled expression, ready to be evaluated at the quadrature points of a face.
///
/// Nodes are stored in an arena with children before their parents, so the root is the
/// last node. Nodes that do not depend on the test function are evaluated once per quadrature
/// point in [`BoundEvaluation::update`] and cached.
pub struct Evaluation<T: Real> {
    expression: Expression<T>,
    nodes: Vec<Node<T>>,
    fields: Vec<Arc<NodalField<T>>>,
    field_dim: usize,
    required_flags: UpdateFlags,
    // Per-point values of test-independent nodes, indexed by q * nodes.len() + node
    cache: Vec<Value<T>>,
    // Per field, the vertex values of each component on the current element
    field_vertex_values: Vec<Vec<[T; 4]>>,
    num_points: usize,
    nodes_per_block: usize,
    current_element: Option<usize>,
}

impl<T: Real> Evaluation<T> {
    /// Compiles an expression for a test space with the given number of field components.
    ///
    /// Fails if the shapes of the operands are incompatible, if the expression does not
    /// evaluate to a scalar, or if test functions are used with a field dimension other than
    /// 1 or 3.
    pub fn compile(expression: &Expression<T>, field_dim: usize) -> Result<Self> {
        let mut compiler = Compiler {
            nodes: Vec::new(),
            fields: Vec::new(),
            field_dim,
        };
        let root = compiler.compile(expression)?;
        let root_shape = compiler.nodes[root].shape;
        if root_shape != Shape::Scalar {
            bail!("expression `{expression}` evaluates to a {root_shape}, but a scalar integrand is required");
        }

        let mut required_flags = UpdateFlags::NONE;
        for node in &compiler.nodes {
            match node.kind {
                NodeKind::Phi => required_flags |= UpdateFlags::VALUES,
                NodeKind::GradPhi => required_flags |= UpdateFlags::GRADIENTS,
                _ => {}
            }
        }

        Ok(Self {
            expression: expression.clone(),
            nodes: compiler.nodes,
            fields: compiler.fields,
            field_dim,
            required_flags,
            cache: Vec::new(),
            field_vertex_values: Vec::new(),
            num_points: 0,
            nodes_per_block: 0,
            current_element: None,
        })
    }

    pub fn expression(&self) -> &Expression<T> {
        &self.expression
    }

    pub fn field_dim(&self) -> usize {
        self.field_dim
    }

    /// The basis data needed to evaluate the expression.
    pub fn required_flags(&self) -> UpdateFlags {
        self.required_flags
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Binds the evaluation to the rule and evaluators of a face slot.
    pub fn bind<'a>(
        &'a mut self,
        rule: &'a FaceQuadrature<T>,
        geometry: &'a FaceGeometryEvaluator<T>,
        basis: &'a FaceBasisEvaluator<T>,
    ) -> BoundEvaluation<'a, T> {
        BoundEvaluation {
            evaluation: self,
            rule,
            geometry,
            basis,
        }
    }

    fn fmt_node(&self, f: &mut Formatter<'_>, index: usize, depth: usize) -> fmt::Result {
        let node = &self.nodes[index];
        let label = match &node.kind {
            NodeKind::Constant(Value::Scalar(c)) => format!("constant {c}"),
            NodeKind::Constant(_) => "constant".to_string(),
            NodeKind::Phi => "phi_i".to_string(),
            NodeKind::GradPhi => "grad(phi_i)".to_string(),
            NodeKind::Normal => "normal".to_string(),
            NodeKind::Position => "position".to_string(),
            NodeKind::Tangent(k) => format!("tangent {k}"),
            NodeKind::FieldValue(k) => format!("value(field {k})"),
            NodeKind::FieldGrad(k) => format!("grad(field {k})"),
            NodeKind::Function(_) => "function".to_string(),
            NodeKind::Unary(op, _) => format!("{op:?}").to_lowercase(),
            NodeKind::Binary(op, _, _) => format!("{op:?}").to_lowercase(),
        };
        let test = if node.test_dependent { ", test" } else { "" };
        writeln!(f, "{:indent$}{label} [{}{test}]", "", node.shape, indent = 2 * depth)?;
        match node.kind {
            NodeKind::Unary(_, a) => self.fmt_node(f, a, depth + 1),
            NodeKind::Binary(_, a, b) => {
                self.fmt_node(f, a, depth + 1)?;
                self.fmt_node(f, b, depth + 1)
            }
            _ => Ok(()),
        }
    }
}

impl<T: Real> Display for Evaluation<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Evaluation of `{}` (field dimension {}, flags {})",
            self.expression, self.field_dim, self.required_flags
        )?;
        match self.current_element {
            Some(element) => writeln!(f, "bound to element {element} with {} quadrature points", self.num_points)?,
            None => writeln!(f, "not bound")?,
        }
        self.fmt_node(f, self.nodes.len() - 1, 1)
    }
}

/// The clone shares the compiled nodes and fields, but is not bound to any element.
impl<T: Real> Clone for Evaluation<T> {
    fn clone(&self) -> Self {
        Self {
            expression: self.expression.clone(),
            nodes: self.nodes.clone(),
            fields: self.fields.clone(),
            field_dim: self.field_dim,
            required_flags: self.required_flags,
            cache: Vec::new(),
            field_vertex_values: Vec::new(),
            num_points: 0,
            nodes_per_block: 0,
            current_element: None,
        }
    }
}

impl<T: Real> fmt::Debug for Evaluation<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluation")
            .field("expression", &self.expression)
            .field("field_dim", &self.field_dim)
            .field("required_flags", &self.required_flags)
            .field("num_nodes", &self.nodes.len())
            .finish()
    }
}

struct Compiler<T: Real> {
    nodes: Vec<Node<T>>,
    fields: Vec<Arc<NodalField<T>>>,
    field_dim: usize,
}

impl<T: Real> Compiler<T> {
    fn push(&mut self, kind: NodeKind<T>, shape: Shape, test_dependent: bool) -> usize {
        self.nodes.push(Node {
            kind,
            shape,
            test_dependent,
        });
        self.nodes.len() - 1
    }

    fn field_index(&mut self, field: &Arc<NodalField<T>>) -> usize {
        match self.fields.iter().position(|f| Arc::ptr_eq(f, field)) {
            Some(index) => index,
            None => {
                self.fields.push(Arc::clone(field));
                self.fields.len() - 1
            }
        }
    }

    fn test_shapes(&self) -> Result<(Shape, Shape)> {
        match self.field_dim {
            1 => Ok((Shape::Scalar, Shape::Vector)),
            3 => Ok((Shape::Vector, Shape::Matrix)),
            d => Err(eyre!("test functions are only supported for field dimension 1 or 3, not {d}")),
        }
    }

    fn compile(&mut self, expression: &Expression<T>) -> Result<usize> {
        use Expression as E;
        let index = match expression {
            E::Constant(c) => self.push(NodeKind::Constant(Value::Scalar(*c)), Shape::Scalar, false),
            E::Vector(v) => self.push(NodeKind::Constant(Value::Vector(*v)), Shape::Vector, false),
            E::Phi => {
                let (shape, _) = self.test_shapes()?;
                self.push(NodeKind::Phi, shape, true)
            }
            E::GradPhi => {
                let (_, shape) = self.test_shapes()?;
                self.push(NodeKind::GradPhi, shape, true)
            }
            E::Normal => self.push(NodeKind::Normal, Shape::Vector, false),
            E::Position => self.push(NodeKind::Position, Shape::Vector, false),
            E::Tangent(k) => {
                if *k > 1 {
                    bail!("tangent index {k} out of bounds, faces have two tangents");
                }
                self.push(NodeKind::Tangent(*k), Shape::Vector, false)
            }
            E::Value(field) | E::Grad(field) => {
                let (value_shape, grad_shape) = match field.num_components() {
                    1 => (Shape::Scalar, Shape::Vector),
                    3 => (Shape::Vector, Shape::Matrix),
                    c => bail!("fields in expressions must have 1 or 3 components, not {c}"),
                };
                let k = self.field_index(field);
                match expression {
                    E::Value(_) => self.push(NodeKind::FieldValue(k), value_shape, false),
                    _ => self.push(NodeKind::FieldGrad(k), grad_shape, false),
                }
            }
            E::Function(f) => self.push(NodeKind::Function(Arc::clone(f)), Shape::Scalar, false),
            E::Unary(op, a) => {
                let a_index = self.compile(a)?;
                let a_node = &self.nodes[a_index];
                let (a_shape, test) = (a_node.shape, a_node.test_dependent);
                let shape = unary_shape(*op, a_shape)
                    .ok_or_else(|| eyre!("cannot apply {op:?} to a {a_shape} in `{expression}`"))?;
                self.push(NodeKind::Unary(*op, a_index), shape, test)
            }
            E::Binary(op, a, b) => {
                let a_index = self.compile(a)?;
                let b_index = self.compile(b)?;
                let (a_shape, b_shape) = (self.nodes[a_index].shape, self.nodes[b_index].shape);
                let test = self.nodes[a_index].test_dependent || self.nodes[b_index].test_dependent;
                let shape = binary_shape(*op, a_shape, b_shape)
                    .ok_or_else(|| eyre!("cannot apply {op:?} to a {a_shape} and a {b_shape} in `{expression}`"))?;
                self.push(NodeKind::Binary(*op, a_index, b_index), shape, test)
            }
        };
        Ok(index)
    }
}

/// An [`Evaluation`] bound to the quadrature rule and evaluators of a face slot.
pub struct BoundEvaluation<'a, T: Real> {
    evaluation: &'a mut Evaluation<T>,
    rule: &'a FaceQuadrature<T>,
    geometry: &'a FaceGeometryEvaluator<T>,
    basis: &'a FaceBasisEvaluator<T>,
}

impl<'a, T: Real> BoundEvaluation<'a, T> {
    /// Evaluates all parts of the expression that do not depend on the test function at every
    /// quadrature point of the given element.
    ///
    /// The evaluators must have been updated for the element with the bound rule.
    pub fn update(&mut self, element_index: usize) -> Result<()> {
        let rule_id = Some(self.rule.id());
        if self.geometry.rule_id() != rule_id || self.basis.rule_id() != rule_id {
            bail!("face evaluators are not bound to the same quadrature rule as the evaluation");
        }
        if !self
            .basis
            .computed_flags()
            .contains(self.evaluation.required_flags)
        {
            bail!(
                "basis evaluator provides {}, but the expression requires {}",
                self.basis.computed_flags(),
                self.evaluation.required_flags
            );
        }

        let eval = &mut *self.evaluation;
        eval.current_element = None;
        eval.field_vertex_values.resize(eval.fields.len(), Vec::new());
        for (field, values) in eval.fields.iter().zip(&mut eval.field_vertex_values) {
            values.clear();
            for c in 0..field.num_components() {
                let component_values = field
                    .element_component_values(element_index, c)
                    .ok_or_else(|| eyre!("nodal field has no data for element {element_index}"))?;
                values.push(component_values);
            }
        }

        let num_points = self.geometry.num_points();
        let num_nodes = eval.nodes.len();
        eval.num_points = num_points;
        eval.nodes_per_block = self.basis.num_nodes();
        eval.cache.clear();
        eval.cache.resize(num_points * num_nodes, Value::Scalar(T::zero()));

        let mut psi = [T::zero(); 4];
        let mut psi_gradients = [Vector3::zeros(); 4];
        for q in 0..num_points {
            let xi = &self.geometry.reference_points()[q];
            Tet4Basis.populate_basis(&mut psi, xi);
            Tet4Basis.populate_basis_gradients(&mut psi_gradients, xi);
            let jit = self.geometry.jacobian_inverse_transpose();
            let physical_gradients = psi_gradients.map(|g| jit * g);

            for n in 0..num_nodes {
                let node = &eval.nodes[n];
                if node.test_dependent {
                    continue;
                }
                let cached = |m: usize| eval.cache[q * num_nodes + m];
                let value = match &node.kind {
                    NodeKind::Constant(c) => *c,
                    NodeKind::Normal => Value::Vector(*self.geometry.normal()),
                    NodeKind::Position => Value::Vector(self.geometry.positions()[q].coords),
                    NodeKind::Tangent(k) => Value::Vector(self.geometry.tangents()[*k]),
                    NodeKind::FieldValue(k) => {
                        let component_value =
                            |c: &[T; 4]| c.iter().zip(&psi).fold(T::zero(), |acc, (&u, &p)| acc + u * p);
                        match eval.field_vertex_values[*k].as_slice() {
                            [u] => Value::Scalar(component_value(u)),
                            [u, v, w] => Value::Vector(Vector3::new(
                                component_value(u),
                                component_value(v),
                                component_value(w),
                            )),
                            _ => unreachable!("field component count is checked when compiling"),
                        }
                    }
                    NodeKind::FieldGrad(k) => {
                        let component_gradient = |c: &[T; 4]| {
                            c.iter()
                                .zip(&physical_gradients)
                                .fold(Vector3::zeros(), |acc, (&u, g)| acc + g * u)
                        };
                        match eval.field_vertex_values[*k].as_slice() {
                            [u] => Value::Vector(component_gradient(u)),
                            [u, v, w] => Value::Matrix(Matrix3::from_rows(&[
                                component_gradient(u).transpose(),
                                component_gradient(v).transpose(),
                                component_gradient(w).transpose(),
                            ])),
                            _ => unreachable!("field component count is checked when compiling"),
                        }
                    }
                    NodeKind::Function(f) => Value::Scalar((f.as_ref())(&self.geometry.positions()[q])),
                    NodeKind::Unary(op, a) => Value::unary(*op, cached(*a)),
                    NodeKind::Binary(op, a, b) => Value::binary(*op, cached(*a), cached(*b)),
                    NodeKind::Phi | NodeKind::GradPhi => unreachable!("test-dependent nodes are not cached"),
                };
                eval.cache[q * num_nodes + n] = value;
            }
        }
        eval.current_element = Some(element_index);
        Ok(())
    }

    pub fn num_points(&self) -> usize {
        self.evaluation.num_points
    }

    /// The value of the integrand at quadrature point `q` for local test function `j = i + b * n`,
    /// where `n` is the number of nodes per block, `i` the local node and `b` the block.
    pub fn value_qi(&self, q: usize, j: usize) -> T {
        let eval = &*self.evaluation;
        let n = eval.nodes_per_block;
        let (i, b) = (j % n, j / n);
        match self.evaluate(eval.nodes.len() - 1, q, i, b) {
            Value::Scalar(value) => value,
            _ => unreachable!("root shape is checked when compiling"),
        }
    }

    fn evaluate(&self, node_index: usize, q: usize, i: usize, b: usize) -> Value<T> {
        let eval = &*self.evaluation;
        let node = &eval.nodes[node_index];
        if !node.test_dependent {
            return eval.cache[q * eval.nodes.len() + node_index];
        }
        match node.kind {
            NodeKind::Phi => {
                let phi = self.basis.value(q, i);
                if eval.field_dim == 1 {
                    Value::Scalar(phi)
                } else {
                    let mut v = Vector3::zeros();
                    v[b] = phi;
                    Value::Vector(v)
                }
            }
            NodeKind::GradPhi => {
                let g = self.basis.gradient(q, i);
                if eval.field_dim == 1 {
                    Value::Vector(*g)
                } else {
                    let mut m = Matrix3::zeros();
                    m.set_row(b, &g.transpose());
                    Value::Matrix(m)
                }
            }
            NodeKind::Unary(op, a) => Value::unary(op, self.evaluate(a, q, i, b)),
            NodeKind::Binary(op, a, c) => Value::binary(op, self.evaluate(a, q, i, b), self.evaluate(c, q, i, b)),
            _ => unreachable!("leaf nodes other than test functions are never test dependent"),
        }
    }
}
