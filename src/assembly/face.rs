//! Per-slot evaluators of geometry and basis functions at the quadrature points of a face.
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::{BitOr, BitOrAssign};

mod basis;
mod geometry;

pub use basis::*;
pub use geometry::*;

/// The basis function data that must be computed when updating a [`FaceBasisEvaluator`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct UpdateFlags(u8);

impl UpdateFlags {
    pub const NONE: Self = Self(0);
    pub const VALUES: Self = Self(1);
    pub const GRADIENTS: Self = Self(1 << 1);

    /// Whether all flags in `other` are also set in `self`.
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for UpdateFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for UpdateFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Display for UpdateFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = [(Self::VALUES, "VALUES"), (Self::GRADIENTS, "GRADIENTS")]
            .into_iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
            .collect();
        if names.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", names.join(" | "))
        }
    }
}
