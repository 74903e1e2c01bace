//! Per-compartment resolved definitions.

use mk_core::{CompId, DiffId, ReacId, SpecId};

/// A reaction resolved into a compartment's local species coordinates.
#[derive(Debug, Clone)]
pub struct ReacDef {
    pub gidx: ReacId,
    pub name: String,
    pub order: u32,
    pub kcst: f64,
    /// Left-hand multiplicities, one entry per local species.
    pub lhs: Vec<u32>,
    /// Update vector (rhs - lhs), one entry per local species.
    pub upd: Vec<i32>,
}

/// A diffusion rule resolved into a compartment.
#[derive(Debug, Clone)]
pub struct DiffDef {
    pub gidx: DiffId,
    pub name: String,
    pub dcst: f64,
    /// Local index of the diffusing species (the rule's only dependency).
    pub lig: u32,
}

/// Resolved per-compartment state definition.
///
/// Species, reactions and diffusion rules carry contiguous local indices;
/// `spec_g2l` translates global species ids (`None` = undefined here).
#[derive(Debug, Clone)]
pub struct CompDef {
    pub id: CompId,
    pub name: String,
    pub n_tets: usize,
    pub spec_g2l: Vec<Option<u32>>,
    pub spec_l2g: Vec<SpecId>,
    pub reac_g2l: Vec<Option<u32>>,
    pub diff_g2l: Vec<Option<u32>>,
    pub reacs: Vec<ReacDef>,
    pub diffs: Vec<DiffDef>,
    /// First state-vector slot of this compartment's block.
    pub slot_base: usize,
    /// First process id of this compartment's block.
    pub pid_base: usize,
}

impl CompDef {
    pub fn n_specs(&self) -> usize {
        self.spec_l2g.len()
    }

    pub fn n_reacs(&self) -> usize {
        self.reacs.len()
    }

    pub fn n_diffs(&self) -> usize {
        self.diffs.len()
    }

    /// Number of state slots this compartment contributes.
    pub fn n_slots(&self) -> usize {
        self.n_specs() * self.n_tets
    }

    /// Local species index for a global species id.
    pub fn spec_g2l(&self, spec: SpecId) -> Option<u32> {
        self.spec_g2l.get(spec.idx()).copied().flatten()
    }

    /// State-vector slot of (tet local index, species local index).
    pub fn slot(&self, tet_l: u32, spec_l: u32) -> usize {
        self.slot_base + tet_l as usize * self.n_specs() + spec_l as usize
    }

    /// Process id of a reaction instance at a tet.
    ///
    /// Reaction ids for all tets precede diffusion ids (see `diff_pid`).
    pub fn reac_pid(&self, tet_l: u32, reac_l: u32) -> usize {
        self.pid_base + tet_l as usize * self.n_reacs() + reac_l as usize
    }

    /// Process id of a diffusion rule at a tet. One id covers every
    /// face direction of the rule at that tet.
    pub fn diff_pid(&self, tet_l: u32, diff_l: u32) -> usize {
        self.pid_base
            + self.n_tets * self.n_reacs()
            + tet_l as usize * self.n_diffs()
            + diff_l as usize
    }

    /// Number of process ids this compartment contributes.
    pub fn n_pids(&self) -> usize {
        self.n_tets * (self.n_reacs() + self.n_diffs())
    }
}
