//! Adaptation of face quadrature rules to a level-set function.
//!
//! For every element, the adapter classifies each of the four faces of the element with
//! respect to the zero level set of a piecewise linear level-set function. Faces that are
//! not cut by the interface use the base rule unchanged, while cut faces are split along the
//! interface into sub-triangles that each receive a mapped copy of the base rule.
use crate::connectivity::TET4_LOCAL_FACES;
use crate::element::NUM_TET_FACES;
use crate::levelset::LevelSetField;
use crate::quadrature::subdivide::{append_mapped_rule, clip_triangle_nonpositive, reference_triangle, triangle_area};
use crate::quadrature::FaceQuadrature;
use crate::Real;
use eyre::{bail, Result};
use log::warn;
use nalgebra::convert;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// The part of a face, relative to the interface, that is integrated over.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegrationRegion {
    /// Integrate over the whole face, with quadrature points placed separately on each side
    /// of the interface.
    #[default]
    Both,
    /// Only integrate over the part of the face where the level set is negative.
    Negative,
    /// Only integrate over the part of the face where the level set is positive.
    Positive,
}

/// What to do when the level-set field has no data for an element.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissingLevelSetPolicy {
    /// Report an error.
    #[default]
    Fail,
    /// Treat every face of the element as uncut and lying in the integration region.
    TreatAsUncut,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterSettings {
    pub region: IntegrationRegion,
    pub missing_level_set: MissingLevelSetPolicy,
    /// Sub-triangles whose area relative to the reference triangle is at most this
    /// tolerance are considered degenerate and receive no quadrature points.
    pub degenerate_tolerance: f64,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            region: IntegrationRegion::Both,
            missing_level_set: MissingLevelSetPolicy::Fail,
            degenerate_tolerance: 1e-12,
        }
    }
}

/// Classification of a face with respect to the interface.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FaceCut {
    /// The level set is non-positive on the face, and negative somewhere.
    Negative,
    /// The level set is non-negative on the face, and positive somewhere.
    Positive,
    /// The level set vanishes on the entire face.
    OnInterface,
    /// The level set changes sign strictly within the face.
    Cut,
}

impl FaceCut {
    pub fn classify<T: Real>(values: &[T; 3]) -> Self {
        let has_negative = values.iter().any(|&v| v < T::zero());
        let has_positive = values.iter().any(|&v| v > T::zero());
        match (has_negative, has_positive) {
            (true, true) => Self::Cut,
            (true, false) => Self::Negative,
            (false, true) => Self::Positive,
            (false, false) => Self::OnInterface,
        }
    }

    fn lies_in(&self, region: IntegrationRegion) -> bool {
        use IntegrationRegion::*;
        match (self, region) {
            (_, Both) | (Self::OnInterface, _) => true,
            (Self::Negative, Negative) | (Self::Positive, Positive) => true,
            _ => false,
        }
    }
}

impl Display for FaceCut {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Negative => "negative",
            Self::Positive => "positive",
            Self::OnInterface => "on interface",
            Self::Cut => "cut",
        };
        write!(f, "{name}")
    }
}

/// Which cached rule a face slot currently refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SlotRule {
    Base,
    Empty,
    Adapted,
}

/// Provides, for each local face slot of an element, a quadrature rule adapted to a level set.
///
/// Call [`update`](Self::update) with an element before querying the rules of its faces.
#[derive(Debug)]
pub struct LevelSetFaceQuadratureAdapter<T: Real, L> {
    level_set: L,
    base: FaceQuadrature<T>,
    empty: FaceQuadrature<T>,
    settings: AdapterSettings,
    adapted: [FaceQuadrature<T>; NUM_TET_FACES],
    slot_rules: [SlotRule; NUM_TET_FACES],
    classification: [FaceCut; NUM_TET_FACES],
    current_element: Option<usize>,
}

/// The clone shares the level set, the base rule and the settings. Adapted rules are not
/// copied: every slot starts out fresh, as if [`update`](Self::update) had not been called.
impl<T: Real, L: Clone> Clone for LevelSetFaceQuadratureAdapter<T, L> {
    fn clone(&self) -> Self {
        Self {
            level_set: self.level_set.clone(),
            base: self.base.clone(),
            empty: self.empty.clone(),
            settings: self.settings,
            adapted: fresh_adapted_rules(),
            slot_rules: [SlotRule::Base; NUM_TET_FACES],
            classification: [FaceCut::OnInterface; NUM_TET_FACES],
            current_element: None,
        }
    }
}

fn fresh_adapted_rules<T: Real>() -> [FaceQuadrature<T>; NUM_TET_FACES] {
    [(); NUM_TET_FACES].map(|_| FaceQuadrature::empty())
}

impl<T, L> LevelSetFaceQuadratureAdapter<T, L>
where
    T: Real,
    L: LevelSetField<T>,
{
    pub fn new(level_set: L, base: FaceQuadrature<T>) -> Self {
        Self::with_settings(level_set, base, AdapterSettings::default())
    }

    pub fn with_settings(level_set: L, base: FaceQuadrature<T>, settings: AdapterSettings) -> Self {
        Self {
            level_set,
            base,
            empty: FaceQuadrature::empty(),
            settings,
            adapted: fresh_adapted_rules(),
            slot_rules: [SlotRule::Base; NUM_TET_FACES],
            classification: [FaceCut::OnInterface; NUM_TET_FACES],
            current_element: None,
        }
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    pub fn level_set(&self) -> &L {
        &self.level_set
    }

    /// The rule used for faces that are not cut by the interface.
    pub fn base_quadrature(&self) -> &FaceQuadrature<T> {
        &self.base
    }

    /// The element of the last successful call to [`update`](Self::update), if any.
    pub fn current_element(&self) -> Option<usize> {
        self.current_element
    }

    /// Recomputes the rules of all face slots for the given element.
    ///
    /// Returns an error if the level-set field has no data for the element and the settings
    /// do not permit a fallback.
    pub fn update(&mut self, element_index: usize) -> Result<()> {
        let vertex_values = match self.level_set.element_vertex_values(element_index) {
            Some(values) => values,
            None => match self.settings.missing_level_set {
                MissingLevelSetPolicy::Fail => {
                    self.current_element = None;
                    bail!("level-set field has no data for element {element_index}")
                }
                MissingLevelSetPolicy::TreatAsUncut => {
                    warn!("level-set field has no data for element {element_index}, treating it as uncut");
                    self.slot_rules = [SlotRule::Base; NUM_TET_FACES];
                    self.classification = [FaceCut::OnInterface; NUM_TET_FACES];
                    self.current_element = Some(element_index);
                    return Ok(());
                }
            },
        };

        for (slot, face) in TET4_LOCAL_FACES.iter().enumerate() {
            let face_values = face.map(|v| vertex_values[v]);
            let cut = FaceCut::classify(&face_values);
            self.classification[slot] = cut;
            self.slot_rules[slot] = match cut {
                FaceCut::Cut => {
                    self.build_cut_rule(slot, &face_values);
                    SlotRule::Adapted
                }
                _ if cut.lies_in(self.settings.region) => SlotRule::Base,
                _ => SlotRule::Empty,
            };
        }
        self.current_element = Some(element_index);
        Ok(())
    }

    fn build_cut_rule(&mut self, slot: usize, face_values: &[T; 3]) {
        let region = self.settings.region;
        let min_area: T = convert(2.0 * self.settings.degenerate_tolerance);
        let triangle = reference_triangle();
        let base = &self.base;
        self.adapted[slot].rebuild(|weights, points| {
            // Negative side first, so that quadrature points are grouped by side
            let negative_values = *face_values;
            let positive_values = face_values.map(|v| -v);
            let sides = [
                (IntegrationRegion::Negative, negative_values),
                (IntegrationRegion::Positive, positive_values),
            ];
            for (side, values) in sides {
                if region != IntegrationRegion::Both && region != side {
                    continue;
                }
                let polygon = clip_triangle_nonpositive(&triangle, &values);
                for sub_triangle in polygon.fan_triangles() {
                    if triangle_area(&sub_triangle) > min_area {
                        append_mapped_rule(weights, points, base, &sub_triangle);
                    }
                }
            }
        });
    }

    /// The adapted rule for the given local face slot of the current element.
    ///
    /// For faces that are not cut, this is the base rule itself (with the same identity) if the
    /// face lies in the integration region, and an empty rule otherwise.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= 4`.
    pub fn adapted_face_quadrature(&self, slot: usize) -> &FaceQuadrature<T> {
        match self.slot_rules[slot] {
            SlotRule::Base => &self.base,
            SlotRule::Empty => &self.empty,
            SlotRule::Adapted => &self.adapted[slot],
        }
    }

    /// Whether the interface strictly cuts the given face slot of the current element.
    pub fn is_cut(&self, slot: usize) -> bool {
        self.classification[slot] == FaceCut::Cut
    }

    pub fn face_cut(&self, slot: usize) -> FaceCut {
        self.classification[slot]
    }
}
