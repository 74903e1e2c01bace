//! Resolution of a model against a mesh into the flat state definition.

use mk_core::{CompId, PatchId, SpecId};
use mk_mesh::TetMesh;
use mk_model::{Model, SurfSys, VolSys};
use serde::Serialize;

use crate::comp::{CompDef, DiffDef, ReacDef};
use crate::error::{StateError, StateResult};
use crate::patch::{PatchDef, SDiffDef, SReacDef};

/// The resolved state definition: one `CompDef` per mesh compartment and
/// one `PatchDef` per mesh patch, plus the global layout totals.
///
/// State-vector layout: compartment blocks in registration order, then
/// patch blocks in registration order. Within a block, elements in local
/// order with the region's local species innermost. Process ids follow the
/// same region order; within a region, reaction ids for all elements come
/// first, then diffusion ids.
#[derive(Debug, Clone)]
pub struct StateDef {
    n_species: usize,
    comps: Vec<CompDef>,
    patches: Vec<PatchDef>,
    n_slots: usize,
    n_pids: usize,
}

/// Serialisable layout summary; part of the checkpoint identity.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutDims {
    pub n_species: usize,
    pub comps: Vec<[usize; 4]>,
    pub patches: Vec<[usize; 4]>,
    pub n_slots: usize,
    pub n_pids: usize,
}

impl StateDef {
    /// Resolve `model` against `mesh`.
    ///
    /// Fails when a compartment or patch references a system name the
    /// model does not know, or when a surface reaction needs an outer
    /// volume on a patch that has none.
    pub fn new(model: &Model, mesh: &TetMesh) -> StateResult<Self> {
        let n_species = model.n_species();
        let n_comps = mesh.comps().len();
        let n_patches = mesh.patches().len();

        // Which species are present in each region. Volume systems seed
        // their compartments; surface reactions push the species they read
        // or write in adjacent volumes into those compartments too.
        let mut comp_present: Vec<Vec<bool>> = vec![vec![false; n_species]; n_comps];
        let mut patch_present: Vec<Vec<bool>> = vec![vec![false; n_species]; n_patches];
        let mut comp_systems: Vec<Vec<&VolSys>> = vec![Vec::new(); n_comps];
        let mut patch_systems: Vec<Vec<&SurfSys>> = vec![Vec::new(); n_patches];

        for (ci, comp) in mesh.comps().iter().enumerate() {
            for name in &comp.vsys {
                let vsys = model.volsys_by_name(name).ok_or_else(|| {
                    StateError::UnresolvedSystem {
                        name: name.clone(),
                        region: format!("compartment '{}'", comp.name),
                    }
                })?;
                comp_systems[ci].push(vsys);
                for reac in &vsys.reacs {
                    mark(&mut comp_present[ci], &reac.lhs);
                    mark(&mut comp_present[ci], &reac.rhs);
                }
                for diff in &vsys.diffs {
                    comp_present[ci][diff.lig.idx()] = true;
                }
            }
        }

        for (pi, patch) in mesh.patches().iter().enumerate() {
            let icomp = patch.icomp.idx();
            for name in &patch.ssys {
                let ssys = model.surfsys_by_name(name).ok_or_else(|| {
                    StateError::UnresolvedSystem {
                        name: name.clone(),
                        region: format!("patch '{}'", patch.name),
                    }
                })?;
                patch_systems[pi].push(ssys);
                for sreac in &ssys.sreacs {
                    mark(&mut patch_present[pi], &sreac.slhs);
                    mark(&mut patch_present[pi], &sreac.srhs);
                    mark(&mut comp_present[icomp], &sreac.ilhs);
                    mark(&mut comp_present[icomp], &sreac.irhs);
                    if sreac.req_outer() {
                        let ocomp = patch.ocomp.ok_or_else(|| {
                            StateError::NoOuterCompartment {
                                patch: patch.name.clone(),
                                sreac: sreac.name.clone(),
                            }
                        })?;
                        mark(&mut comp_present[ocomp.idx()], &sreac.olhs);
                        mark(&mut comp_present[ocomp.idx()], &sreac.orhs);
                    }
                }
                for sdiff in &ssys.sdiffs {
                    patch_present[pi][sdiff.lig.idx()] = true;
                }
            }
        }

        // Local species maps, ordered by ascending global index.
        let comp_maps: Vec<(Vec<Option<u32>>, Vec<SpecId>)> =
            comp_present.iter().map(|p| local_map(p)).collect();
        let patch_maps: Vec<(Vec<Option<u32>>, Vec<SpecId>)> =
            patch_present.iter().map(|p| local_map(p)).collect();

        // Compartment definitions.
        let mut comps = Vec::with_capacity(n_comps);
        for (ci, comp) in mesh.comps().iter().enumerate() {
            let (g2l, l2g) = comp_maps[ci].clone();
            let n_local = l2g.len();
            let mut reacs = Vec::new();
            let mut diffs = Vec::new();
            let mut reac_g2l = vec![None; model.n_reacs()];
            let mut diff_g2l = vec![None; model.n_diffs()];
            for vsys in &comp_systems[ci] {
                for reac in &vsys.reacs {
                    let lhs = stoich_vec(&reac.lhs, &g2l, n_local);
                    let rhs = stoich_vec(&reac.rhs, &g2l, n_local);
                    let upd = upd_vec(&lhs, &rhs);
                    reac_g2l[reac.gidx.idx()] = Some(reacs.len() as u32);
                    reacs.push(ReacDef {
                        gidx: reac.gidx,
                        name: reac.name.clone(),
                        order: reac.order,
                        kcst: reac.kcst,
                        lhs,
                        upd,
                    });
                }
                for diff in &vsys.diffs {
                    diff_g2l[diff.gidx.idx()] = Some(diffs.len() as u32);
                    diffs.push(DiffDef {
                        gidx: diff.gidx,
                        name: diff.name.clone(),
                        dcst: diff.dcst,
                        lig: g2l[diff.lig.idx()].expect("diffusing species is resolved"),
                    });
                }
            }
            comps.push(CompDef {
                id: CompId::from_index(ci as u32),
                name: comp.name.clone(),
                n_tets: comp.n_tets(),
                spec_g2l: g2l,
                spec_l2g: l2g,
                reac_g2l,
                diff_g2l,
                reacs,
                diffs,
                slot_base: 0,
                pid_base: 0,
            });
        }

        // Patch definitions; inner/outer vectors use the (now final)
        // compartment-local species spaces.
        let mut patches = Vec::with_capacity(n_patches);
        for (pi, patch) in mesh.patches().iter().enumerate() {
            let (g2l, l2g) = patch_maps[pi].clone();
            let n_local = l2g.len();
            let icomp_map = &comp_maps[patch.icomp.idx()];
            let n_inner = icomp_map.1.len();
            let ocomp_map = patch.ocomp.map(|oc| &comp_maps[oc.idx()]);
            let n_outer = ocomp_map.map_or(0, |m| m.1.len());

            let mut sreacs = Vec::new();
            let mut sdiffs = Vec::new();
            let mut sreac_g2l = vec![None; model.n_sreacs()];
            let mut sdiff_g2l = vec![None; model.n_sdiffs()];
            for ssys in &patch_systems[pi] {
                for sreac in &ssys.sreacs {
                    let lhs_s = stoich_vec(&sreac.slhs, &g2l, n_local);
                    let rhs_s = stoich_vec(&sreac.srhs, &g2l, n_local);
                    let lhs_i = stoich_vec(&sreac.ilhs, &icomp_map.0, n_inner);
                    let rhs_i = stoich_vec(&sreac.irhs, &icomp_map.0, n_inner);
                    let (lhs_o, rhs_o) = match ocomp_map {
                        Some(m) => (
                            stoich_vec(&sreac.olhs, &m.0, n_outer),
                            stoich_vec(&sreac.orhs, &m.0, n_outer),
                        ),
                        None => (vec![0; 0], vec![0; 0]),
                    };
                    sreac_g2l[sreac.gidx.idx()] = Some(sreacs.len() as u32);
                    sreacs.push(SReacDef {
                        gidx: sreac.gidx,
                        name: sreac.name.clone(),
                        order: sreac.order,
                        kcst: sreac.kcst,
                        surf_surf: sreac.surf_surf(),
                        inside: sreac.inside(),
                        req_inner: sreac.req_inner(),
                        req_outer: sreac.req_outer(),
                        upd_s: upd_vec(&lhs_s, &rhs_s),
                        lhs_s,
                        upd_i: upd_vec(&lhs_i, &rhs_i),
                        lhs_i,
                        upd_o: upd_vec(&lhs_o, &rhs_o),
                        lhs_o,
                    });
                }
                for sdiff in &ssys.sdiffs {
                    sdiff_g2l[sdiff.gidx.idx()] = Some(sdiffs.len() as u32);
                    sdiffs.push(SDiffDef {
                        gidx: sdiff.gidx,
                        name: sdiff.name.clone(),
                        dcst: sdiff.dcst,
                        lig: g2l[sdiff.lig.idx()].expect("diffusing species is resolved"),
                    });
                }
            }
            patches.push(PatchDef {
                id: PatchId::from_index(pi as u32),
                name: patch.name.clone(),
                n_tris: patch.n_tris(),
                icomp: patch.icomp,
                ocomp: patch.ocomp,
                spec_g2l: g2l,
                spec_l2g: l2g,
                sreac_g2l,
                sdiff_g2l,
                sreacs,
                sdiffs,
                slot_base: 0,
                pid_base: 0,
            });
        }

        // Layout: compartment blocks first, then patch blocks.
        let mut slot = 0;
        let mut pid = 0;
        for comp in &mut comps {
            comp.slot_base = slot;
            comp.pid_base = pid;
            slot += comp.n_slots();
            pid += comp.n_pids();
        }
        for patch in &mut patches {
            patch.slot_base = slot;
            patch.pid_base = pid;
            slot += patch.n_slots();
            pid += patch.n_pids();
        }

        Ok(Self {
            n_species,
            comps,
            patches,
            n_slots: slot,
            n_pids: pid,
        })
    }

    pub fn n_species(&self) -> usize {
        self.n_species
    }

    /// Total state-vector length.
    pub fn n_slots(&self) -> usize {
        self.n_slots
    }

    /// Total number of process ids.
    pub fn n_pids(&self) -> usize {
        self.n_pids
    }

    pub fn comps(&self) -> &[CompDef] {
        &self.comps
    }

    pub fn patches(&self) -> &[PatchDef] {
        &self.patches
    }

    pub fn comp(&self, id: CompId) -> Option<&CompDef> {
        self.comps.get(id.idx())
    }

    pub fn patch(&self, id: PatchId) -> Option<&PatchDef> {
        self.patches.get(id.idx())
    }

    /// Layout summary used for checkpoint identity matching.
    pub fn layout_dims(&self) -> LayoutDims {
        LayoutDims {
            n_species: self.n_species,
            comps: self
                .comps
                .iter()
                .map(|c| [c.n_tets, c.n_specs(), c.n_reacs(), c.n_diffs()])
                .collect(),
            patches: self
                .patches
                .iter()
                .map(|p| [p.n_tris, p.n_specs(), p.n_sreacs(), p.n_sdiffs()])
                .collect(),
            n_slots: self.n_slots,
            n_pids: self.n_pids,
        }
    }
}

fn mark(present: &mut [bool], stoich: &[(SpecId, u32)]) {
    for &(spec, _) in stoich {
        present[spec.idx()] = true;
    }
}

fn local_map(present: &[bool]) -> (Vec<Option<u32>>, Vec<SpecId>) {
    let mut g2l = vec![None; present.len()];
    let mut l2g = Vec::new();
    for (g, &p) in present.iter().enumerate() {
        if p {
            g2l[g] = Some(l2g.len() as u32);
            l2g.push(SpecId::from_index(g as u32));
        }
    }
    (g2l, l2g)
}

fn stoich_vec(pairs: &[(SpecId, u32)], g2l: &[Option<u32>], n_local: usize) -> Vec<u32> {
    let mut v = vec![0u32; n_local];
    for &(spec, mult) in pairs {
        let l = g2l[spec.idx()].expect("reactant species is resolved");
        v[l as usize] += mult;
    }
    v
}

fn upd_vec(lhs: &[u32], rhs: &[u32]) -> Vec<i32> {
    lhs.iter()
        .zip(rhs)
        .map(|(&l, &r)| r as i32 - l as i32)
        .collect()
}
