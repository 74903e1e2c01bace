//! The process graph: for every state slot, the processes contributing
//! to its time derivative.
//!
//! The graph is stored flat for the evaluator's benefit: one arena of
//! reactant descriptors, one arena of processes referencing descriptor
//! ranges, and per-slot offset/length ranges into the process arena.
//! Processes of one reaction instance (and the two half-processes of one
//! diffusion flux) share a single descriptor range.
//!
//! Construction walks regions, elements and rules in the canonical order
//! defined by mk-state, so slot contents and process ids are stable for a
//! given configuration. After construction only per-process coefficients
//! mutate (rate-constant rebinds via the id side-table).

use mk_core::AVOGADRO;
use mk_mesh::TetMesh;
use mk_state::StateDef;

/// One `(order, state index)` factor of a process rate.
#[derive(Debug, Clone, Copy)]
pub struct Reactant {
    pub order: u32,
    pub slot: u32,
}

/// One process: rate = `upd * ccst * prod(y[slot]^order)`.
#[derive(Debug, Clone, Copy)]
pub struct Process {
    /// Count-basis coefficient (scaled rate constant or conductance).
    pub ccst: f64,
    /// Net stoichiometric change of the owning slot per firing.
    pub upd: i32,
    /// Stable process id; shared by every process this rule instance
    /// produced (all directions of a diffusion flux included).
    pub pid: u32,
    dep_off: u32,
    dep_len: u32,
}

/// Flattened slot -> processes -> reactant descriptors structure.
#[derive(Debug, Clone)]
pub struct ProcessGraph {
    slot_offsets: Vec<u32>,
    procs: Vec<Process>,
    deps: Vec<Reactant>,
    /// Process-id side table: arena positions of every process carrying a
    /// given id, so rate rebinds avoid scanning the whole graph.
    pid_procs: Vec<Vec<u32>>,
}

impl ProcessGraph {
    /// Materialise the process graph for a resolved configuration.
    pub fn build(statedef: &StateDef, mesh: &TetMesh) -> Self {
        let n_slots = statedef.n_slots();
        let mut slots: Vec<Vec<Process>> = vec![Vec::new(); n_slots];
        let mut deps: Vec<Reactant> = Vec::new();

        for comp in statedef.comps() {
            let region = &mesh.comps()[comp.id.idx()];

            // Volume reactions: one shared descriptor range per
            // (tet, reaction), one process per affected species.
            for (tet_l, &tet_id) in region.tets.iter().enumerate() {
                let tet = mesh.tet(tet_id).expect("compartment tet is assigned");
                for (reac_l, reac) in comp.reacs.iter().enumerate() {
                    let c = ccst(reac.kcst, tet.vol, reac.order);
                    let pid = comp.reac_pid(tet_l as u32, reac_l as u32) as u32;

                    let dep_off = deps.len() as u32;
                    for (spec_l, &mult) in reac.lhs.iter().enumerate() {
                        if mult > 0 {
                            deps.push(Reactant {
                                order: mult,
                                slot: comp.slot(tet_l as u32, spec_l as u32) as u32,
                            });
                        }
                    }
                    let dep_len = deps.len() as u32 - dep_off;

                    for (spec_l, &upd) in reac.upd.iter().enumerate() {
                        if upd != 0 {
                            slots[comp.slot(tet_l as u32, spec_l as u32)].push(Process {
                                ccst: c,
                                upd,
                                pid,
                                dep_off,
                                dep_len,
                            });
                        }
                    }
                }
            }

            // Volume diffusion: a donor/acceptor process pair per linked
            // face, both first-order in the donor slot.
            for (tet_l, &tet_id) in region.tets.iter().enumerate() {
                let tet = mesh.tet(tet_id).expect("compartment tet is assigned");
                for (diff_l, diff) in comp.diffs.iter().enumerate() {
                    let pid = comp.diff_pid(tet_l as u32, diff_l as u32) as u32;
                    let donor = comp.slot(tet_l as u32, diff.lig);
                    for face in 0..4 {
                        let Some(nbr) = tet.next_tet[face] else {
                            continue;
                        };
                        let nbr_l = region.tet_g2l(nbr).expect("neighbour is in compartment");
                        let cond = tet.areas[face] * diff.dcst / (tet.vol * tet.dists[face]);
                        let acceptor = comp.slot(nbr_l, diff.lig);

                        let dep_off = deps.len() as u32;
                        deps.push(Reactant {
                            order: 1,
                            slot: donor as u32,
                        });

                        slots[donor].push(Process {
                            ccst: cond,
                            upd: -1,
                            pid,
                            dep_off,
                            dep_len: 1,
                        });
                        slots[acceptor].push(Process {
                            ccst: cond,
                            upd: 1,
                            pid,
                            dep_off,
                            dep_len: 1,
                        });
                    }
                }
            }
        }

        for patch in statedef.patches() {
            let region = &mesh.patches()[patch.id.idx()];
            let icomp = &statedef.comps()[patch.icomp.idx()];
            let icomp_region = &mesh.comps()[patch.icomp.idx()];

            // Surface reactions: one shared descriptor range combining
            // the S, I and O reactant sides; one process per affected
            // slot on any side.
            for (tri_l, &tri_id) in region.tris.iter().enumerate() {
                let tri = mesh.tri(tri_id).expect("patch tri exists");
                let itet = mesh.tet(tri.inner_tet).expect("inner tet is assigned");
                let itet_l = icomp_region
                    .tet_g2l(tri.inner_tet)
                    .expect("inner tet is in inner compartment");

                for (sreac_l, sr) in patch.sreacs.iter().enumerate() {
                    let c = sreac_ccst(sr, sr.kcst, tri.area, || itet.vol, || {
                        let ot = tri.outer_tet.expect("outer tet is assigned");
                        mesh.tet(ot).expect("outer tet is assigned").vol
                    });
                    let pid = patch.sreac_pid(tri_l as u32, sreac_l as u32) as u32;

                    let dep_off = deps.len() as u32;
                    for (spec_l, &mult) in sr.lhs_s.iter().enumerate() {
                        if mult > 0 {
                            deps.push(Reactant {
                                order: mult,
                                slot: patch.slot(tri_l as u32, spec_l as u32) as u32,
                            });
                        }
                    }
                    for (spec_l, &mult) in sr.lhs_i.iter().enumerate() {
                        if mult > 0 {
                            deps.push(Reactant {
                                order: mult,
                                slot: icomp.slot(itet_l, spec_l as u32) as u32,
                            });
                        }
                    }
                    if sr.lhs_o.iter().any(|&m| m > 0) {
                        let (ocomp, otet_l) = outer_indices(statedef, mesh, patch, tri);
                        for (spec_l, &mult) in sr.lhs_o.iter().enumerate() {
                            if mult > 0 {
                                deps.push(Reactant {
                                    order: mult,
                                    slot: ocomp.slot(otet_l, spec_l as u32) as u32,
                                });
                            }
                        }
                    }
                    let dep_len = deps.len() as u32 - dep_off;

                    for (spec_l, &upd) in sr.upd_s.iter().enumerate() {
                        if upd != 0 {
                            slots[patch.slot(tri_l as u32, spec_l as u32)].push(Process {
                                ccst: c,
                                upd,
                                pid,
                                dep_off,
                                dep_len,
                            });
                        }
                    }
                    for (spec_l, &upd) in sr.upd_i.iter().enumerate() {
                        if upd != 0 {
                            slots[icomp.slot(itet_l, spec_l as u32)].push(Process {
                                ccst: c,
                                upd,
                                pid,
                                dep_off,
                                dep_len,
                            });
                        }
                    }
                    if sr.upd_o.iter().any(|&u| u != 0) {
                        let (ocomp, otet_l) = outer_indices(statedef, mesh, patch, tri);
                        for (spec_l, &upd) in sr.upd_o.iter().enumerate() {
                            if upd != 0 {
                                slots[ocomp.slot(otet_l, spec_l as u32)].push(Process {
                                    ccst: c,
                                    upd,
                                    pid,
                                    dep_off,
                                    dep_len,
                                });
                            }
                        }
                    }
                }
            }

            // Surface diffusion across the three edges.
            for (tri_l, &tri_id) in region.tris.iter().enumerate() {
                let tri = mesh.tri(tri_id).expect("patch tri exists");
                for (sdiff_l, sdiff) in patch.sdiffs.iter().enumerate() {
                    let pid = patch.sdiff_pid(tri_l as u32, sdiff_l as u32) as u32;
                    let donor = patch.slot(tri_l as u32, sdiff.lig);
                    for edge in 0..3 {
                        let Some(nbr) = tri.next_tri[edge] else {
                            continue;
                        };
                        let nbr_l = region.tri_g2l(nbr).expect("neighbour is in patch");
                        let cond =
                            tri.lengths[edge] * sdiff.dcst / (tri.area * tri.dists[edge]);
                        let acceptor = patch.slot(nbr_l, sdiff.lig);

                        let dep_off = deps.len() as u32;
                        deps.push(Reactant {
                            order: 1,
                            slot: donor as u32,
                        });

                        slots[donor].push(Process {
                            ccst: cond,
                            upd: -1,
                            pid,
                            dep_off,
                            dep_len: 1,
                        });
                        slots[acceptor].push(Process {
                            ccst: cond,
                            upd: 1,
                            pid,
                            dep_off,
                            dep_len: 1,
                        });
                    }
                }
            }
        }

        // Flatten per-slot lists and index processes by id.
        let mut slot_offsets = Vec::with_capacity(n_slots + 1);
        let mut procs = Vec::with_capacity(slots.iter().map(Vec::len).sum());
        let mut pid_procs: Vec<Vec<u32>> = vec![Vec::new(); statedef.n_pids()];
        slot_offsets.push(0);
        for slot in slots {
            for p in slot {
                pid_procs[p.pid as usize].push(procs.len() as u32);
                procs.push(p);
            }
            slot_offsets.push(procs.len() as u32);
        }

        Self {
            slot_offsets,
            procs,
            deps,
            pid_procs,
        }
    }

    pub fn n_slots(&self) -> usize {
        self.slot_offsets.len() - 1
    }

    pub fn n_procs(&self) -> usize {
        self.procs.len()
    }

    /// Processes contributing to a slot's derivative.
    #[inline]
    pub fn procs_of(&self, slot: usize) -> &[Process] {
        let start = self.slot_offsets[slot] as usize;
        let end = self.slot_offsets[slot + 1] as usize;
        &self.procs[start..end]
    }

    /// Reactant descriptors of a process.
    #[inline]
    pub fn deps_of(&self, p: &Process) -> &[Reactant] {
        let start = p.dep_off as usize;
        &self.deps[start..start + p.dep_len as usize]
    }

    /// Rebind the coefficient of every process carrying `pid`.
    pub fn rebind(&mut self, pid: usize, ccst: f64) {
        for &i in &self.pid_procs[pid] {
            self.procs[i as usize].ccst = ccst;
        }
    }

    /// Coefficients in arena order (checkpoint substate).
    pub fn coefficients(&self) -> impl Iterator<Item = f64> + '_ {
        self.procs.iter().map(|p| p.ccst)
    }

    /// Restore coefficients in arena order (checkpoint substate).
    pub fn set_coefficients(&mut self, ccsts: &[f64]) {
        debug_assert_eq!(ccsts.len(), self.procs.len());
        for (p, &c) in self.procs.iter_mut().zip(ccsts) {
            p.ccst = c;
        }
    }
}

fn outer_indices<'a>(
    statedef: &'a StateDef,
    mesh: &TetMesh,
    patch: &mk_state::PatchDef,
    tri: &mk_mesh::Tri,
) -> (&'a mk_state::CompDef, u32) {
    let ocomp_id = patch.ocomp.expect("outer side implies outer compartment");
    let ocomp = &statedef.comps()[ocomp_id.idx()];
    let otet = tri.outer_tet.expect("outer tet is assigned");
    let otet_l = mesh.comps()[ocomp_id.idx()]
        .tet_g2l(otet)
        .expect("outer tet is in outer compartment");
    (ocomp, otet_l)
}

/// Count-basis coefficient of a mass-action reaction of the given order
/// in a volume `vol` (m^3). Rate constants use the litres basis, so a
/// zero-order constant is an intensive source rate in mol/L/s.
pub(crate) fn ccst(kcst: f64, vol: f64, order: u32) -> f64 {
    let vscale = 1.0e3 * vol * AVOGADRO;
    kcst * vscale.powi(1 - order as i32)
}

/// 2D analogue for surface-surface reactions (mol/m^2 basis).
pub(crate) fn ccst_2d(kcst: f64, area: f64, order: u32) -> f64 {
    let ascale = area * AVOGADRO;
    kcst * ascale.powi(1 - order as i32)
}

/// Coefficient of a surface reaction instance: 2D-scaled when all
/// reactants sit on the surface, otherwise scaled by the adjacent volume
/// on the reactant side.
pub(crate) fn sreac_ccst(
    sr: &mk_state::SReacDef,
    kcst: f64,
    tri_area: f64,
    inner_vol: impl FnOnce() -> f64,
    outer_vol: impl FnOnce() -> f64,
) -> f64 {
    if sr.surf_surf {
        ccst_2d(kcst, tri_area, sr.order)
    } else if sr.inside {
        ccst(kcst, inner_vol(), sr.order)
    } else {
        ccst(kcst, outer_vol(), sr.order)
    }
}
