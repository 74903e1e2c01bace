//! Per-patch resolved definitions.

use mk_core::{CompId, PatchId, SDiffId, SpecId, SReacId};

/// A surface reaction resolved into local coordinates.
///
/// The surface vectors (`lhs_s`, `upd_s`) are indexed by the patch's local
/// species space; the inner/outer vectors by the respective compartment's
/// local species space (empty when that side is unused).
#[derive(Debug, Clone)]
pub struct SReacDef {
    pub gidx: SReacId,
    pub name: String,
    pub order: u32,
    pub kcst: f64,
    pub surf_surf: bool,
    pub inside: bool,
    pub req_inner: bool,
    pub req_outer: bool,
    pub lhs_s: Vec<u32>,
    pub upd_s: Vec<i32>,
    pub lhs_i: Vec<u32>,
    pub upd_i: Vec<i32>,
    pub lhs_o: Vec<u32>,
    pub upd_o: Vec<i32>,
}

/// A surface diffusion rule resolved into a patch.
#[derive(Debug, Clone)]
pub struct SDiffDef {
    pub gidx: SDiffId,
    pub name: String,
    pub dcst: f64,
    /// Local index of the diffusing surface species.
    pub lig: u32,
}

/// Resolved per-patch state definition.
#[derive(Debug, Clone)]
pub struct PatchDef {
    pub id: PatchId,
    pub name: String,
    pub n_tris: usize,
    pub icomp: CompId,
    pub ocomp: Option<CompId>,
    pub spec_g2l: Vec<Option<u32>>,
    pub spec_l2g: Vec<SpecId>,
    pub sreac_g2l: Vec<Option<u32>>,
    pub sdiff_g2l: Vec<Option<u32>>,
    pub sreacs: Vec<SReacDef>,
    pub sdiffs: Vec<SDiffDef>,
    /// First state-vector slot of this patch's block.
    pub slot_base: usize,
    /// First process id of this patch's block.
    pub pid_base: usize,
}

impl PatchDef {
    pub fn n_specs(&self) -> usize {
        self.spec_l2g.len()
    }

    pub fn n_sreacs(&self) -> usize {
        self.sreacs.len()
    }

    pub fn n_sdiffs(&self) -> usize {
        self.sdiffs.len()
    }

    /// Number of state slots this patch contributes.
    pub fn n_slots(&self) -> usize {
        self.n_specs() * self.n_tris
    }

    /// Local species index for a global species id.
    pub fn spec_g2l(&self, spec: SpecId) -> Option<u32> {
        self.spec_g2l.get(spec.idx()).copied().flatten()
    }

    /// State-vector slot of (tri local index, species local index).
    pub fn slot(&self, tri_l: u32, spec_l: u32) -> usize {
        self.slot_base + tri_l as usize * self.n_specs() + spec_l as usize
    }

    /// Process id of a surface reaction instance at a tri.
    pub fn sreac_pid(&self, tri_l: u32, sreac_l: u32) -> usize {
        self.pid_base + tri_l as usize * self.n_sreacs() + sreac_l as usize
    }

    /// Process id of a surface diffusion rule at a tri; one id covers
    /// every edge direction of the rule at that tri.
    pub fn sdiff_pid(&self, tri_l: u32, sdiff_l: u32) -> usize {
        self.pid_base
            + self.n_tris * self.n_sreacs()
            + tri_l as usize * self.n_sdiffs()
            + sdiff_l as usize
    }

    /// Number of process ids this patch contributes.
    pub fn n_pids(&self) -> usize {
        self.n_tris * (self.n_sreacs() + self.n_sdiffs())
    }
}
