//! Assembly of global vectors and sparsity patterns from boundary face integrals.
//!
//! The main entry point is [`BoundaryVectorAssembler`](boundary::BoundaryVectorAssembler),
//! created through [`BoundaryVectorAssemblerBuilder`](boundary::BoundaryVectorAssemblerBuilder):
//!
//! ```
//! use levelset_assembly::assembly::boundary::BoundaryVectorAssemblerBuilder;
//! use levelset_assembly::expression::Expression;
//! use levelset_assembly::levelset::NodalLevelSet;
//! use levelset_assembly::mesh::procedural::{create_unit_box_uniform_tet_mesh_3d, markers};
//! use levelset_assembly::nalgebra::DVector;
//! use levelset_assembly::quadrature::adapter::LevelSetFaceQuadratureAdapter;
//! use levelset_assembly::quadrature::FaceQuadrature;
//! use levelset_assembly::space::{FiniteElementSpace, LagrangeSpace};
//!
//! # fn main() -> eyre::Result<()> {
//! let mesh = create_unit_box_uniform_tet_mesh_3d::<f64>(2);
//! let space = LagrangeSpace::new(&mesh, 1, 1)?;
//! let level_set = NodalLevelSet::interpolate(&mesh, |x| x.y - 0.3)?;
//! let adapter = LevelSetFaceQuadratureAdapter::new(level_set, FaceQuadrature::triangle(2)?);
//!
//! let mut assembler = BoundaryVectorAssemblerBuilder::new()
//!     .with_mesh(&mesh)
//!     .with_boundary_marker(markers::NEGATIVE_X)
//!     .with_quadrature_adapter(adapter)
//!     .with_test_space(&space)
//!     .with_expression(Expression::phi_i())
//!     .build()?;
//!
//! let mut rhs = DVector::zeros(space.num_total_dofs());
//! assembler.add_to(&mut rhs)?;
//! // The basis functions sum to one, so the entries sum to the area of the side
//! assert!((rhs.sum() - 1.0).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```
pub mod boundary;
pub mod elemental;
pub mod face;
pub mod global;
pub mod parallel;
