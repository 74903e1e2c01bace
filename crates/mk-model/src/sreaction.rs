//! Surface reactions: kinetics on patch triangles.

use mk_core::{SReacId, SpecId};
use serde::{Deserialize, Serialize};

/// Raw input for a surface reaction registration.
///
/// Each side is a stoichiometry list over species; `s*` lives on the patch
/// surface, `i*` in the inner compartment volume, `o*` in the outer one.
/// Unused sides can be left at their empty default.
#[derive(Debug, Clone, Copy, Default)]
pub struct SReacSpec<'a> {
    pub slhs: &'a [(SpecId, i32)],
    pub ilhs: &'a [(SpecId, i32)],
    pub olhs: &'a [(SpecId, i32)],
    pub srhs: &'a [(SpecId, i32)],
    pub irhs: &'a [(SpecId, i32)],
    pub orhs: &'a [(SpecId, i32)],
    pub kcst: f64,
}

/// A registered surface reaction.
///
/// Reactants must not straddle the inner and outer volumes at the same
/// time; that is rejected at registration. A reaction whose reactants all
/// live on the surface is *surface-surface* and is rate-scaled by triangle
/// area; otherwise it is *surface-volume* and is scaled by the adjacent
/// tetrahedron volume on the reactant side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfReaction {
    pub name: String,
    /// Global surface-reaction index, stable across the whole model.
    pub gidx: SReacId,
    pub slhs: Vec<(SpecId, u32)>,
    pub ilhs: Vec<(SpecId, u32)>,
    pub olhs: Vec<(SpecId, u32)>,
    pub srhs: Vec<(SpecId, u32)>,
    pub irhs: Vec<(SpecId, u32)>,
    pub orhs: Vec<(SpecId, u32)>,
    pub kcst: f64,
    pub order: u32,
}

impl SurfReaction {
    /// True when every reactant lives on the surface (2D scaling applies).
    pub fn surf_surf(&self) -> bool {
        self.ilhs.is_empty() && self.olhs.is_empty()
    }

    /// True when the volume reactants live in the inner compartment.
    /// Only meaningful when `!surf_surf()`.
    pub fn inside(&self) -> bool {
        !self.ilhs.is_empty()
    }

    /// True when the reaction reads or writes inner-compartment species.
    pub fn req_inner(&self) -> bool {
        !self.ilhs.is_empty() || !self.irhs.is_empty()
    }

    /// True when the reaction reads or writes outer-compartment species.
    pub fn req_outer(&self) -> bool {
        !self.olhs.is_empty() || !self.orhs.is_empty()
    }
}
