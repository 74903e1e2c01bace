//! The model registry.

use mk_core::{DiffId, Id, ReacId, SDiffId, SpecId, SReacId};
use serde::{Deserialize, Serialize};

use crate::diffusion::{Diffusion, SurfDiffusion};
use crate::error::{ModelError, ModelResult};
use crate::reaction::{merge_stoich, total_mult, Reaction};
use crate::sreaction::{SReacSpec, SurfReaction};
use crate::MAX_ORDER;

pub type VolSysId = Id;
pub type SurfSysId = Id;

/// A chemical species. Immutable after registration; its position in the
/// model's species table is its stable global index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
}

/// A named grouping of reactions and diffusion rules, applicable to every
/// compartment the system is attached to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolSys {
    pub name: String,
    pub reacs: Vec<Reaction>,
    pub diffs: Vec<Diffusion>,
}

/// A named grouping of surface reactions and surface diffusion rules,
/// applicable to every patch the system is attached to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfSys {
    pub name: String,
    pub sreacs: Vec<SurfReaction>,
    pub sdiffs: Vec<SurfDiffusion>,
}

/// The complete biochemical model: species plus volume and surface systems.
///
/// All registration happens through this type so that global indices for
/// species, reactions, surface reactions and diffusion rules stay
/// consistent. After registration the model is treated as immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    species: Vec<Species>,
    volsys: Vec<VolSys>,
    surfsys: Vec<SurfSys>,
    n_reacs: u32,
    n_sreacs: u32,
    n_diffs: u32,
    n_sdiffs: u32,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a species. Fails if the name is already taken.
    pub fn add_species(&mut self, name: impl Into<String>) -> ModelResult<SpecId> {
        let name = name.into();
        if self.species.iter().any(|s| s.name == name) {
            return Err(ModelError::NameConflict {
                kind: "species",
                name,
            });
        }
        let id = SpecId::from_index(self.species.len() as u32);
        self.species.push(Species { name });
        Ok(id)
    }

    /// Register an empty volume system.
    pub fn add_volsys(&mut self, name: impl Into<String>) -> ModelResult<VolSysId> {
        let name = name.into();
        if self.volsys.iter().any(|v| v.name == name) {
            return Err(ModelError::NameConflict {
                kind: "volume system",
                name,
            });
        }
        let id = VolSysId::from_index(self.volsys.len() as u32);
        self.volsys.push(VolSys {
            name,
            reacs: Vec::new(),
            diffs: Vec::new(),
        });
        Ok(id)
    }

    /// Register an empty surface system.
    pub fn add_surfsys(&mut self, name: impl Into<String>) -> ModelResult<SurfSysId> {
        let name = name.into();
        if self.surfsys.iter().any(|s| s.name == name) {
            return Err(ModelError::NameConflict {
                kind: "surface system",
                name,
            });
        }
        let id = SurfSysId::from_index(self.surfsys.len() as u32);
        self.surfsys.push(SurfSys {
            name,
            sreacs: Vec::new(),
            sdiffs: Vec::new(),
        });
        Ok(id)
    }

    /// Register a volumetric reaction in a volume system.
    ///
    /// Multiplicities must be non-negative; the order (sum of left-hand
    /// multiplicities) must not exceed 4; `kcst` must be non-negative.
    pub fn add_reaction(
        &mut self,
        vsys: VolSysId,
        name: impl Into<String>,
        lhs: &[(SpecId, i32)],
        rhs: &[(SpecId, i32)],
        kcst: f64,
    ) -> ModelResult<ReacId> {
        let name = name.into();
        self.check_volsys(vsys)?;
        let lhs = self.checked_stoich(&name, lhs)?;
        let rhs = self.checked_stoich(&name, rhs)?;
        check_kcst(&name, kcst)?;

        let order = total_mult(&lhs);
        if order > MAX_ORDER {
            return Err(ModelError::UnsupportedOrder { name, order });
        }

        let vsys = &mut self.volsys[vsys.idx()];
        if vsys.reacs.iter().any(|r| r.name == name) {
            return Err(ModelError::NameConflict {
                kind: "reaction",
                name,
            });
        }

        let gidx = ReacId::from_index(self.n_reacs);
        self.n_reacs += 1;
        vsys.reacs.push(Reaction {
            name,
            gidx,
            lhs,
            rhs,
            kcst,
            order,
        });
        Ok(gidx)
    }

    /// Register a surface reaction in a surface system.
    ///
    /// Fails when reactants appear in both the inner and the outer volume:
    /// a single surface reaction cannot read both sides of the membrane.
    pub fn add_surf_reaction(
        &mut self,
        ssys: SurfSysId,
        name: impl Into<String>,
        spec: SReacSpec<'_>,
    ) -> ModelResult<SReacId> {
        let name = name.into();
        self.check_surfsys(ssys)?;
        let slhs = self.checked_stoich(&name, spec.slhs)?;
        let ilhs = self.checked_stoich(&name, spec.ilhs)?;
        let olhs = self.checked_stoich(&name, spec.olhs)?;
        let srhs = self.checked_stoich(&name, spec.srhs)?;
        let irhs = self.checked_stoich(&name, spec.irhs)?;
        let orhs = self.checked_stoich(&name, spec.orhs)?;
        check_kcst(&name, spec.kcst)?;

        if !ilhs.is_empty() && !olhs.is_empty() {
            return Err(ModelError::InvalidReaction {
                name,
                what: "reactants straddle inner and outer volumes".into(),
            });
        }
        if slhs.is_empty()
            && ilhs.is_empty()
            && olhs.is_empty()
            && srhs.is_empty()
            && irhs.is_empty()
            && orhs.is_empty()
        {
            return Err(ModelError::InvalidReaction {
                name,
                what: "reaction has no participants".into(),
            });
        }

        let order = total_mult(&slhs) + total_mult(&ilhs) + total_mult(&olhs);
        if order > MAX_ORDER {
            return Err(ModelError::UnsupportedOrder { name, order });
        }

        let ssys = &mut self.surfsys[ssys.idx()];
        if ssys.sreacs.iter().any(|r| r.name == name) {
            return Err(ModelError::NameConflict {
                kind: "surface reaction",
                name,
            });
        }

        let gidx = SReacId::from_index(self.n_sreacs);
        self.n_sreacs += 1;
        ssys.sreacs.push(SurfReaction {
            name,
            gidx,
            slhs,
            ilhs,
            olhs,
            srhs,
            irhs,
            orhs,
            kcst: spec.kcst,
            order,
        });
        Ok(gidx)
    }

    /// Register a volumetric diffusion rule.
    pub fn add_diffusion(
        &mut self,
        vsys: VolSysId,
        name: impl Into<String>,
        lig: SpecId,
        dcst: f64,
    ) -> ModelResult<DiffId> {
        let name = name.into();
        self.check_volsys(vsys)?;
        self.check_species(lig)?;
        if dcst < 0.0 {
            return Err(ModelError::OutOfRange {
                what: format!("diffusion constant of '{name}' is negative"),
            });
        }
        let vsys = &mut self.volsys[vsys.idx()];
        if vsys.diffs.iter().any(|d| d.name == name) {
            return Err(ModelError::NameConflict {
                kind: "diffusion rule",
                name,
            });
        }
        let gidx = DiffId::from_index(self.n_diffs);
        self.n_diffs += 1;
        vsys.diffs.push(Diffusion {
            name,
            gidx,
            lig,
            dcst,
        });
        Ok(gidx)
    }

    /// Register a surface diffusion rule.
    pub fn add_surf_diffusion(
        &mut self,
        ssys: SurfSysId,
        name: impl Into<String>,
        lig: SpecId,
        dcst: f64,
    ) -> ModelResult<SDiffId> {
        let name = name.into();
        self.check_surfsys(ssys)?;
        self.check_species(lig)?;
        if dcst < 0.0 {
            return Err(ModelError::OutOfRange {
                what: format!("surface diffusion constant of '{name}' is negative"),
            });
        }
        let ssys = &mut self.surfsys[ssys.idx()];
        if ssys.sdiffs.iter().any(|d| d.name == name) {
            return Err(ModelError::NameConflict {
                kind: "surface diffusion rule",
                name,
            });
        }
        let gidx = SDiffId::from_index(self.n_sdiffs);
        self.n_sdiffs += 1;
        ssys.sdiffs.push(SurfDiffusion {
            name,
            gidx,
            lig,
            dcst,
        });
        Ok(gidx)
    }

    // ---- queries ------------------------------------------------------

    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    pub fn n_reacs(&self) -> usize {
        self.n_reacs as usize
    }

    pub fn n_sreacs(&self) -> usize {
        self.n_sreacs as usize
    }

    pub fn n_diffs(&self) -> usize {
        self.n_diffs as usize
    }

    pub fn n_sdiffs(&self) -> usize {
        self.n_sdiffs as usize
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn species_name(&self, id: SpecId) -> Option<&str> {
        self.species.get(id.idx()).map(|s| s.name.as_str())
    }

    pub fn species_by_name(&self, name: &str) -> Option<SpecId> {
        self.species
            .iter()
            .position(|s| s.name == name)
            .map(|i| SpecId::from_index(i as u32))
    }

    pub fn volsys_by_name(&self, name: &str) -> Option<&VolSys> {
        self.volsys.iter().find(|v| v.name == name)
    }

    pub fn surfsys_by_name(&self, name: &str) -> Option<&SurfSys> {
        self.surfsys.iter().find(|s| s.name == name)
    }

    // ---- validation helpers ------------------------------------------

    fn check_species(&self, id: SpecId) -> ModelResult<()> {
        if id.idx() >= self.species.len() {
            return Err(ModelError::OutOfRange {
                what: format!("species index {id} is not registered"),
            });
        }
        Ok(())
    }

    fn check_volsys(&self, id: VolSysId) -> ModelResult<()> {
        if id.idx() >= self.volsys.len() {
            return Err(ModelError::OutOfRange {
                what: format!("volume system index {id} is not registered"),
            });
        }
        Ok(())
    }

    fn check_surfsys(&self, id: SurfSysId) -> ModelResult<()> {
        if id.idx() >= self.surfsys.len() {
            return Err(ModelError::OutOfRange {
                what: format!("surface system index {id} is not registered"),
            });
        }
        Ok(())
    }

    fn checked_stoich(
        &self,
        name: &str,
        raw: &[(SpecId, i32)],
    ) -> ModelResult<Vec<(SpecId, u32)>> {
        for &(spec, _) in raw {
            self.check_species(spec)?;
        }
        merge_stoich(raw).map_err(|(spec, mult)| ModelError::InvalidStoichiometry {
            name: name.to_string(),
            what: format!("multiplicity {mult} for species {spec} is negative"),
        })
    }
}

fn check_kcst(name: &str, kcst: f64) -> ModelResult<()> {
    if !kcst.is_finite() || kcst < 0.0 {
        return Err(ModelError::OutOfRange {
            what: format!("rate constant of '{name}' must be finite and non-negative"),
        });
    }
    Ok(())
}
