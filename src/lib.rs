//! Boundary assembly of finite element vectors with level-set adapted face quadrature.
//!
//! The central type is [`BoundaryVectorAssembler`](assembly::boundary::BoundaryVectorAssembler),
//! which loops over the boundary faces of a tetrahedral mesh that carry a given marker,
//! adapts the face quadrature rule to a level-set field on each adjacent element and
//! scatter-adds the integral of an [`Expression`](expression::Expression) tested against the
//! basis functions of a finite element space into a global vector.
use nalgebra::RealField;

pub mod assembly;
pub mod connectivity;
pub mod element;
pub mod expression;
pub mod levelset;
pub mod mesh;
pub mod quadrature;
pub mod space;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

/// Scalar types supported by the library.
///
/// A trait alias for `RealField + Copy`, which makes generic numerical code considerably less
/// noisy than with `RealField` alone.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

/// Identifier of a boundary region, as stored on each boundary face of a mesh.
pub type BoundaryMarker = u32;
