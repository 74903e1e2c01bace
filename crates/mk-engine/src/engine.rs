//! The integration driver and the user-facing query/mutation API.

use mk_core::{conc_to_count, CompId, PatchId, ReacId, SpecId, SReacId, TetId, TriId, AVOGADRO};
use mk_mesh::{Tet, TetMesh, Tri};
use mk_model::Model;
use mk_ode::Dopri5;
use mk_state::{CompDef, PatchDef, StateDef};

use crate::error::{EngineError, EngineResult};
use crate::graph::{ccst, sreac_ccst, ProcessGraph};
use crate::rates::RateEvaluator;

const DEFAULT_TOL: f64 = 1.0e-3;
const DEFAULT_MAX_STEPS: u32 = 10_000;

/// The reaction-diffusion engine.
///
/// Construction compiles the model and mesh into the state layout and the
/// process graph; afterwards only the state vector, per-process
/// coefficients and the integrator's internal memory change. Mutations
/// that touch the state or the coefficients mark the integrator for
/// reinitialisation, which discards its accumulated step history on the
/// next `run`.
pub struct Engine {
    model: Model,
    mesh: TetMesh,
    statedef: StateDef,
    graph: ProcessGraph,
    integ: Dopri5,
    y: Vec<f64>,
    abstol: Vec<f64>,
    rtol: f64,
    max_steps: u32,
    t_now: f64,
    pending_reinit: bool,
}

impl Engine {
    /// Compile `model` and `mesh` into a ready-to-run engine.
    ///
    /// Fails when a compartment or patch references an unknown system
    /// name, or when the geometry cannot support a registered surface
    /// reaction.
    pub fn new(model: Model, mesh: TetMesh) -> EngineResult<Self> {
        let statedef = StateDef::new(&model, &mesh)?;
        let graph = ProcessGraph::build(&statedef, &mesh);
        let n = statedef.n_slots();
        let mut integ = Dopri5::new(n);
        let y = vec![0.0; n];
        integ
            .init(0.0, &y)
            .expect("freshly sized integrator accepts its own state");
        Ok(Self {
            model,
            mesh,
            statedef,
            graph,
            integ,
            y,
            abstol: vec![DEFAULT_TOL; n],
            rtol: DEFAULT_TOL,
            max_steps: DEFAULT_MAX_STEPS,
            t_now: 0.0,
            pending_reinit: true,
        })
    }

    pub fn solver_name(&self) -> &'static str {
        "mesokin"
    }

    pub fn solver_desc(&self) -> &'static str {
        "deterministic reaction-diffusion ODE engine on tetrahedral meshes"
    }

    // ---- time control -------------------------------------------------

    /// Current simulation time, s.
    pub fn time(&self) -> f64 {
        self.t_now
    }

    /// Advance the simulation to `t_end`.
    ///
    /// Reinitialises the integrator first when any mutation is pending.
    /// On failure (step budget exhausted or error control collapse) the
    /// committed state is the last successfully integrated intermediate
    /// time.
    pub fn run(&mut self, t_end: f64) -> EngineResult<()> {
        if t_end < self.t_now {
            return Err(EngineError::TimeRegression {
                t_end,
                t_now: self.t_now,
            });
        }
        if t_end == self.t_now {
            return Ok(());
        }

        self.integ.set_max_steps(self.max_steps as usize);
        self.integ
            .set_tolerances(self.rtol, &self.abstol)
            .expect("tolerance vector length is fixed at setup");

        if self.pending_reinit {
            self.integ
                .reinit(self.t_now, &self.y)
                .expect("state vector length is fixed at setup");
            self.pending_reinit = false;
        }

        let sys = RateEvaluator::new(&self.graph);
        let result = self.integ.advance(&sys, t_end);
        self.y.copy_from_slice(self.integ.state());
        match result {
            Ok(()) => {
                self.t_now = t_end;
                Ok(())
            }
            Err(e) => {
                self.t_now = self.integ.time();
                Err(EngineError::IntegrationFailure {
                    what: e.to_string(),
                })
            }
        }
    }

    /// Advance the simulation by `dt >= 0`.
    pub fn advance(&mut self, dt: f64) -> EngineResult<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(EngineError::ArgumentOutOfRange {
                what: format!("advance time {dt} must be finite and non-negative"),
            });
        }
        self.run(self.t_now + dt)
    }

    /// Rewinding the engine is not supported.
    pub fn reset(&mut self) -> EngineResult<()> {
        Err(EngineError::NotImplemented { what: "reset" })
    }

    /// Set the scalar absolute and relative tolerances. The absolute
    /// tolerance applies uniformly to every state slot.
    pub fn set_tolerances(&mut self, atol: f64, rtol: f64) -> EngineResult<()> {
        if !atol.is_finite() || !rtol.is_finite() || atol < 0.0 || rtol < 0.0 {
            return Err(EngineError::InvalidTolerance {
                what: format!("atol {atol} and rtol {rtol} must be finite and non-negative"),
            });
        }
        self.abstol.fill(atol);
        self.rtol = rtol;
        Ok(())
    }

    /// Integrator step budget per `run` call.
    pub fn set_max_steps(&mut self, n: u32) {
        self.max_steps = n;
    }

    // ---- compartment queries ------------------------------------------

    /// Compartment volume, m^3.
    pub fn comp_vol(&self, comp: CompId) -> EngineResult<f64> {
        Ok(self.mesh_comp(comp)?.vol)
    }

    /// Total molecule count of a species across a compartment.
    pub fn get_comp_count(&self, comp: CompId, spec: SpecId) -> EngineResult<f64> {
        let cdef = self.comp_def(comp)?;
        let spec_l = self.comp_spec(cdef, spec)?;
        let n_specs = cdef.n_specs();
        let mut count = 0.0;
        for tet_l in 0..cdef.n_tets {
            count += self.y[cdef.slot_base + tet_l * n_specs + spec_l as usize];
        }
        Ok(count)
    }

    /// Distribute `n` molecules across a compartment's tets by volume
    /// fraction.
    pub fn set_comp_count(&mut self, comp: CompId, spec: SpecId, n: f64) -> EngineResult<()> {
        check_count(n)?;
        let (slot_base, n_specs, spec_l) = {
            let cdef = self.comp_def(comp)?;
            (cdef.slot_base, cdef.n_specs(), self.comp_spec(cdef, spec)?)
        };
        let (tets, comp_vol) = {
            let region = self.mesh_comp(comp)?;
            (region.tets.clone(), region.vol)
        };
        for (tet_l, &tet_id) in tets.iter().enumerate() {
            let tet_vol = self.mesh.tet(tet_id).expect("compartment tet").vol;
            self.y[slot_base + tet_l * n_specs + spec_l as usize] = n * (tet_vol / comp_vol);
        }
        self.pending_reinit = true;
        Ok(())
    }

    /// Species amount in a compartment, mol.
    pub fn get_comp_amount(&self, comp: CompId, spec: SpecId) -> EngineResult<f64> {
        Ok(self.get_comp_count(comp, spec)? / AVOGADRO)
    }

    pub fn set_comp_amount(&mut self, comp: CompId, spec: SpecId, a: f64) -> EngineResult<()> {
        check_count(a)?;
        self.set_comp_count(comp, spec, a * AVOGADRO)
    }

    /// Species concentration in a compartment, mol/L.
    pub fn get_comp_conc(&self, comp: CompId, spec: SpecId) -> EngineResult<f64> {
        let count = self.get_comp_count(comp, spec)?;
        let vol = self.mesh_comp(comp)?.vol;
        Ok(count / conc_to_count(vol))
    }

    pub fn set_comp_conc(&mut self, comp: CompId, spec: SpecId, c: f64) -> EngineResult<()> {
        check_count(c)?;
        let vol = self.mesh_comp(comp)?.vol;
        self.set_comp_count(comp, spec, c * conc_to_count(vol))
    }

    /// Rebind a reaction's rate constant in every tet of a compartment.
    pub fn set_comp_reac_k(&mut self, comp: CompId, reac: ReacId, k: f64) -> EngineResult<()> {
        let tets = self.mesh_comp(comp)?.tets.clone();
        for tet in tets {
            self.set_tet_reac_k(tet, reac, k)?;
        }
        Ok(())
    }

    pub fn get_comp_reac_k(&self, _comp: CompId, _reac: ReacId) -> EngineResult<f64> {
        Err(EngineError::NotImplemented {
            what: "get_comp_reac_k",
        })
    }

    /// Processes cannot be deactivated; every defined reaction is active.
    pub fn get_comp_reac_active(&self, comp: CompId, reac: ReacId) -> EngineResult<bool> {
        let cdef = self.comp_def(comp)?;
        self.comp_reac(cdef, reac)?;
        Ok(true)
    }

    pub fn set_comp_reac_active(
        &mut self,
        _comp: CompId,
        _reac: ReacId,
        _active: bool,
    ) -> EngineResult<()> {
        Err(EngineError::NotImplemented {
            what: "set_comp_reac_active",
        })
    }

    pub fn get_comp_clamped(&self, _comp: CompId, _spec: SpecId) -> EngineResult<bool> {
        Err(EngineError::NotImplemented {
            what: "get_comp_clamped",
        })
    }

    pub fn set_comp_clamped(
        &mut self,
        _comp: CompId,
        _spec: SpecId,
        _clamped: bool,
    ) -> EngineResult<()> {
        Err(EngineError::NotImplemented {
            what: "set_comp_clamped",
        })
    }

    // ---- patch queries ------------------------------------------------

    /// Patch area, m^2.
    pub fn patch_area(&self, patch: PatchId) -> EngineResult<f64> {
        Ok(self.mesh_patch(patch)?.area)
    }

    /// Total molecule count of a species across a patch.
    pub fn get_patch_count(&self, patch: PatchId, spec: SpecId) -> EngineResult<f64> {
        let pdef = self.patch_def(patch)?;
        let spec_l = self.patch_spec(pdef, spec)?;
        let n_specs = pdef.n_specs();
        let mut count = 0.0;
        for tri_l in 0..pdef.n_tris {
            count += self.y[pdef.slot_base + tri_l * n_specs + spec_l as usize];
        }
        Ok(count)
    }

    /// Distribute `n` molecules across a patch's tris by area fraction.
    pub fn set_patch_count(&mut self, patch: PatchId, spec: SpecId, n: f64) -> EngineResult<()> {
        check_count(n)?;
        let (slot_base, n_specs, spec_l) = {
            let pdef = self.patch_def(patch)?;
            (pdef.slot_base, pdef.n_specs(), self.patch_spec(pdef, spec)?)
        };
        let (tris, patch_area) = {
            let region = self.mesh_patch(patch)?;
            (region.tris.clone(), region.area)
        };
        for (tri_l, &tri_id) in tris.iter().enumerate() {
            let tri_area = self.mesh.tri(tri_id).expect("patch tri").area;
            self.y[slot_base + tri_l * n_specs + spec_l as usize] = n * (tri_area / patch_area);
        }
        self.pending_reinit = true;
        Ok(())
    }

    /// Species amount on a patch, mol.
    pub fn get_patch_amount(&self, patch: PatchId, spec: SpecId) -> EngineResult<f64> {
        Ok(self.get_patch_count(patch, spec)? / AVOGADRO)
    }

    pub fn set_patch_amount(&mut self, patch: PatchId, spec: SpecId, a: f64) -> EngineResult<()> {
        check_count(a)?;
        self.set_patch_count(patch, spec, a * AVOGADRO)
    }

    /// Rebind a surface reaction's rate constant on every tri of a patch.
    pub fn set_patch_sreac_k(
        &mut self,
        patch: PatchId,
        sreac: SReacId,
        k: f64,
    ) -> EngineResult<()> {
        let tris = self.mesh_patch(patch)?.tris.clone();
        for tri in tris {
            self.set_tri_sreac_k(tri, sreac, k)?;
        }
        Ok(())
    }

    pub fn get_patch_sreac_k(&self, _patch: PatchId, _sreac: SReacId) -> EngineResult<f64> {
        Err(EngineError::NotImplemented {
            what: "get_patch_sreac_k",
        })
    }

    pub fn get_patch_sreac_active(&self, _patch: PatchId, _sreac: SReacId) -> EngineResult<bool> {
        Err(EngineError::NotImplemented {
            what: "get_patch_sreac_active",
        })
    }

    pub fn set_patch_sreac_active(
        &mut self,
        _patch: PatchId,
        _sreac: SReacId,
        _active: bool,
    ) -> EngineResult<()> {
        Err(EngineError::NotImplemented {
            what: "set_patch_sreac_active",
        })
    }

    pub fn get_patch_clamped(&self, _patch: PatchId, _spec: SpecId) -> EngineResult<bool> {
        Err(EngineError::NotImplemented {
            what: "get_patch_clamped",
        })
    }

    pub fn set_patch_clamped(
        &mut self,
        _patch: PatchId,
        _spec: SpecId,
        _clamped: bool,
    ) -> EngineResult<()> {
        Err(EngineError::NotImplemented {
            what: "set_patch_clamped",
        })
    }

    // ---- per-tet queries ----------------------------------------------

    /// Tetrahedron volume, m^3.
    pub fn tet_vol(&self, tet: TetId) -> EngineResult<f64> {
        Ok(self.mesh_tet(tet)?.vol)
    }

    /// Molecule count of a species in one tet.
    pub fn get_tet_count(&self, tet: TetId, spec: SpecId) -> EngineResult<f64> {
        Ok(self.y[self.tet_slot(tet, spec)?])
    }

    pub fn set_tet_count(&mut self, tet: TetId, spec: SpecId, n: f64) -> EngineResult<()> {
        check_count(n)?;
        let slot = self.tet_slot(tet, spec)?;
        self.y[slot] = n;
        self.pending_reinit = true;
        Ok(())
    }

    /// Species amount in one tet, mol.
    pub fn get_tet_amount(&self, tet: TetId, spec: SpecId) -> EngineResult<f64> {
        Ok(self.get_tet_count(tet, spec)? / AVOGADRO)
    }

    pub fn set_tet_amount(&mut self, tet: TetId, spec: SpecId, a: f64) -> EngineResult<()> {
        check_count(a)?;
        self.set_tet_count(tet, spec, a * AVOGADRO)
    }

    /// Species concentration in one tet, mol/L.
    pub fn get_tet_conc(&self, tet: TetId, spec: SpecId) -> EngineResult<f64> {
        let count = self.get_tet_count(tet, spec)?;
        let vol = self.mesh_tet(tet)?.vol;
        Ok(count / conc_to_count(vol))
    }

    pub fn set_tet_conc(&mut self, tet: TetId, spec: SpecId, c: f64) -> EngineResult<()> {
        check_count(c)?;
        let vol = self.mesh_tet(tet)?.vol;
        self.set_tet_count(tet, spec, c * conc_to_count(vol))
    }

    /// Rebind a reaction's rate constant at one tet.
    ///
    /// Updates every process in the graph carrying the (reaction, tet)
    /// process id, wherever its slot lives.
    pub fn set_tet_reac_k(&mut self, tet: TetId, reac: ReacId, k: f64) -> EngineResult<()> {
        check_rate(k)?;
        let elem = self.mesh_tet(tet)?;
        let vol = elem.vol;
        let comp_id = elem.comp;
        let cdef = self.comp_def(comp_id)?;
        let reac_l = self.comp_reac(cdef, reac)?;
        let tet_l = self
            .mesh_comp(comp_id)?
            .tet_g2l(tet)
            .expect("tet is in its compartment");
        let rdef = &cdef.reacs[reac_l as usize];
        let c = ccst(k, vol, rdef.order);
        let pid = cdef.reac_pid(tet_l, reac_l);
        self.graph.rebind(pid, c);
        self.pending_reinit = true;
        Ok(())
    }

    pub fn get_tet_reac_k(&self, _tet: TetId, _reac: ReacId) -> EngineResult<f64> {
        Err(EngineError::NotImplemented {
            what: "get_tet_reac_k",
        })
    }

    // ---- per-tri queries ----------------------------------------------

    /// Triangle area, m^2.
    pub fn tri_area(&self, tri: TriId) -> EngineResult<f64> {
        Ok(self.mesh_tri(tri)?.area)
    }

    /// Molecule count of a species on one tri.
    pub fn get_tri_count(&self, tri: TriId, spec: SpecId) -> EngineResult<f64> {
        Ok(self.y[self.tri_slot(tri, spec)?])
    }

    pub fn set_tri_count(&mut self, tri: TriId, spec: SpecId, n: f64) -> EngineResult<()> {
        check_count(n)?;
        let slot = self.tri_slot(tri, spec)?;
        self.y[slot] = n;
        self.pending_reinit = true;
        Ok(())
    }

    /// Species amount on one tri, mol.
    pub fn get_tri_amount(&self, tri: TriId, spec: SpecId) -> EngineResult<f64> {
        Ok(self.get_tri_count(tri, spec)? / AVOGADRO)
    }

    pub fn set_tri_amount(&mut self, tri: TriId, spec: SpecId, a: f64) -> EngineResult<()> {
        check_count(a)?;
        self.set_tri_count(tri, spec, a * AVOGADRO)
    }

    /// Rebind a surface reaction's rate constant at one tri.
    ///
    /// The shared process id also rebinds the reaction's processes on the
    /// adjacent inner/outer tet slots.
    pub fn set_tri_sreac_k(&mut self, tri: TriId, sreac: SReacId, k: f64) -> EngineResult<()> {
        check_rate(k)?;
        let elem = self.mesh_tri(tri)?;
        let patch_id = elem.patch;
        let tri_area = elem.area;
        let inner_tet = elem.inner_tet;
        let outer_tet = elem.outer_tet;
        let pdef = self.patch_def(patch_id)?;
        let sreac_l = self.patch_sreac(pdef, sreac)?;
        let tri_l = self
            .mesh_patch(patch_id)?
            .tri_g2l(tri)
            .expect("tri is in its patch");
        let srdef = &pdef.sreacs[sreac_l as usize];
        let c = sreac_ccst(
            srdef,
            k,
            tri_area,
            || self.mesh.tet(inner_tet).expect("inner tet").vol,
            || {
                let ot = outer_tet.expect("outer tet is assigned");
                self.mesh.tet(ot).expect("outer tet").vol
            },
        );
        let pid = pdef.sreac_pid(tri_l, sreac_l);
        self.graph.rebind(pid, c);
        self.pending_reinit = true;
        Ok(())
    }

    pub fn get_tri_sreac_k(&self, _tri: TriId, _sreac: SReacId) -> EngineResult<f64> {
        Err(EngineError::NotImplemented {
            what: "get_tri_sreac_k",
        })
    }

    pub fn get_tet_clamped(&self, _tet: TetId, _spec: SpecId) -> EngineResult<bool> {
        Err(EngineError::NotImplemented {
            what: "get_tet_clamped",
        })
    }

    pub fn set_tet_clamped(
        &mut self,
        _tet: TetId,
        _spec: SpecId,
        _clamped: bool,
    ) -> EngineResult<()> {
        Err(EngineError::NotImplemented {
            what: "set_tet_clamped",
        })
    }

    // ---- internal lookups ---------------------------------------------

    pub(crate) fn model(&self) -> &Model {
        &self.model
    }

    pub(crate) fn statedef(&self) -> &StateDef {
        &self.statedef
    }

    pub(crate) fn graph(&self) -> &ProcessGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut ProcessGraph {
        &mut self.graph
    }

    pub(crate) fn checkpoint_scalars(&self) -> (f64, f64, u32) {
        (self.t_now, self.rtol, self.max_steps)
    }

    pub(crate) fn restore_state(
        &mut self,
        t_now: f64,
        rtol: f64,
        max_steps: u32,
        abstol: Vec<f64>,
        y: Vec<f64>,
    ) {
        self.t_now = t_now;
        self.rtol = rtol;
        self.max_steps = max_steps;
        self.abstol = abstol;
        self.y = y;
        self.pending_reinit = true;
    }

    pub(crate) fn abstol(&self) -> &[f64] {
        &self.abstol
    }

    pub(crate) fn state(&self) -> &[f64] {
        &self.y
    }

    /// Total state-vector length (one slot per element-species pair).
    pub fn n_slots(&self) -> usize {
        self.statedef.n_slots()
    }

    fn comp_def(&self, comp: CompId) -> EngineResult<&CompDef> {
        self.statedef
            .comp(comp)
            .ok_or_else(|| EngineError::ArgumentOutOfRange {
                what: format!("compartment index {comp} does not exist"),
            })
    }

    fn patch_def(&self, patch: PatchId) -> EngineResult<&PatchDef> {
        self.statedef
            .patch(patch)
            .ok_or_else(|| EngineError::ArgumentOutOfRange {
                what: format!("patch index {patch} does not exist"),
            })
    }

    fn mesh_comp(&self, comp: CompId) -> EngineResult<&mk_mesh::Compartment> {
        self.mesh
            .comp(comp)
            .ok_or_else(|| EngineError::ArgumentOutOfRange {
                what: format!("compartment index {comp} does not exist"),
            })
    }

    fn mesh_patch(&self, patch: PatchId) -> EngineResult<&mk_mesh::Patch> {
        self.mesh
            .patch(patch)
            .ok_or_else(|| EngineError::ArgumentOutOfRange {
                what: format!("patch index {patch} does not exist"),
            })
    }

    fn mesh_tet(&self, tet: TetId) -> EngineResult<&Tet> {
        self.mesh
            .tet(tet)
            .ok_or_else(|| EngineError::ArgumentOutOfRange {
                what: format!("tetrahedron {tet} is not assigned to a compartment"),
            })
    }

    fn mesh_tri(&self, tri: TriId) -> EngineResult<&Tri> {
        self.mesh
            .tri(tri)
            .ok_or_else(|| EngineError::ArgumentOutOfRange {
                what: format!("triangle {tri} is not assigned to a patch"),
            })
    }

    fn check_spec(&self, spec: SpecId) -> EngineResult<()> {
        if spec.idx() >= self.model.n_species() {
            return Err(EngineError::ArgumentOutOfRange {
                what: format!("species index {spec} does not exist"),
            });
        }
        Ok(())
    }

    fn comp_spec(&self, cdef: &CompDef, spec: SpecId) -> EngineResult<u32> {
        self.check_spec(spec)?;
        cdef.spec_g2l(spec).ok_or_else(|| EngineError::NotDefined {
            what: format!("species {spec} is undefined in compartment '{}'", cdef.name),
        })
    }

    fn patch_spec(&self, pdef: &PatchDef, spec: SpecId) -> EngineResult<u32> {
        self.check_spec(spec)?;
        pdef.spec_g2l(spec).ok_or_else(|| EngineError::NotDefined {
            what: format!("species {spec} is undefined in patch '{}'", pdef.name),
        })
    }

    fn comp_reac(&self, cdef: &CompDef, reac: ReacId) -> EngineResult<u32> {
        if reac.idx() >= self.model.n_reacs() {
            return Err(EngineError::ArgumentOutOfRange {
                what: format!("reaction index {reac} does not exist"),
            });
        }
        cdef.reac_g2l[reac.idx()]
            .ok_or_else(|| EngineError::NotDefined {
                what: format!("reaction {reac} is undefined in compartment '{}'", cdef.name),
            })
    }

    fn patch_sreac(&self, pdef: &PatchDef, sreac: SReacId) -> EngineResult<u32> {
        if sreac.idx() >= self.model.n_sreacs() {
            return Err(EngineError::ArgumentOutOfRange {
                what: format!("surface reaction index {sreac} does not exist"),
            });
        }
        pdef.sreac_g2l[sreac.idx()]
            .ok_or_else(|| EngineError::NotDefined {
                what: format!(
                    "surface reaction {sreac} is undefined in patch '{}'",
                    pdef.name
                ),
            })
    }

    fn tet_slot(&self, tet: TetId, spec: SpecId) -> EngineResult<usize> {
        let elem = self.mesh_tet(tet)?;
        let cdef = self.comp_def(elem.comp)?;
        let spec_l = self.comp_spec(cdef, spec)?;
        let tet_l = self
            .mesh_comp(elem.comp)?
            .tet_g2l(tet)
            .expect("tet is in its compartment");
        Ok(cdef.slot(tet_l, spec_l))
    }

    fn tri_slot(&self, tri: TriId, spec: SpecId) -> EngineResult<usize> {
        let elem = self.mesh_tri(tri)?;
        let pdef = self.patch_def(elem.patch)?;
        let spec_l = self.patch_spec(pdef, spec)?;
        let tri_l = self
            .mesh_patch(elem.patch)?
            .tri_g2l(tri)
            .expect("tri is in its patch");
        Ok(pdef.slot(tri_l, spec_l))
    }
}

fn check_count(n: f64) -> EngineResult<()> {
    if !n.is_finite() || n < 0.0 {
        return Err(EngineError::ArgumentOutOfRange {
            what: format!("count/concentration {n} must be finite and non-negative"),
        });
    }
    Ok(())
}

fn check_rate(k: f64) -> EngineResult<()> {
    if !k.is_finite() || k < 0.0 {
        return Err(EngineError::ArgumentOutOfRange {
            what: format!("rate constant {k} must be finite and non-negative"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mk_mesh::TetMeshBuilder;

    /// Two mirror-image tets in one compartment, one diffusing species,
    /// plus a species `Y` registered in the model but used by no rule.
    fn diffusion_pair() -> (Engine, SpecId, TetId, TetId, CompId) {
        let mut model = Model::new();
        let x = model.add_species("X").unwrap();
        model.add_species("Y").unwrap();
        let vsys = model.add_volsys("cyto").unwrap();
        model.add_diffusion(vsys, "dX", x, 1.0e-12).unwrap();

        let mut b = TetMeshBuilder::new();
        let s = 1.0e-6;
        b.add_vertex([0.0, 0.0, 0.0]);
        b.add_vertex([s, 0.0, 0.0]);
        b.add_vertex([0.0, s, 0.0]);
        b.add_vertex([0.0, 0.0, s]);
        b.add_vertex([2.0 * s / 3.0, 2.0 * s / 3.0, 2.0 * s / 3.0]);
        let t0 = b.add_tet([0, 1, 2, 3]);
        let t1 = b.add_tet([4, 1, 2, 3]);
        let comp = b.add_compartment("pair", &["cyto"], &[t0, t1]);
        let eng = Engine::new(model, b.build().unwrap()).unwrap();
        (eng, x, t0, t1, comp)
    }

    #[test]
    fn fresh_engine_reports_time_zero() {
        let (eng, ..) = diffusion_pair();
        assert_eq!(eng.time(), 0.0);
        assert_eq!(eng.n_slots(), 2);
    }

    #[test]
    fn run_to_current_time_is_a_no_op() {
        let (mut eng, ..) = diffusion_pair();
        eng.run(0.0).unwrap();
        assert_eq!(eng.time(), 0.0);
    }

    #[test]
    fn run_backwards_is_a_time_regression() {
        let (mut eng, ..) = diffusion_pair();
        eng.run(0.5).unwrap();
        let err = eng.run(0.1).unwrap_err();
        assert!(matches!(err, EngineError::TimeRegression { .. }));
        assert_eq!(eng.time(), 0.5);
    }

    #[test]
    fn advance_rejects_negative_dt() {
        let (mut eng, ..) = diffusion_pair();
        let err = eng.advance(-0.1).unwrap_err();
        assert!(matches!(err, EngineError::ArgumentOutOfRange { .. }));
    }

    #[test]
    fn negative_tolerances_are_rejected() {
        let (mut eng, ..) = diffusion_pair();
        assert!(matches!(
            eng.set_tolerances(-1.0e-3, 1.0e-3),
            Err(EngineError::InvalidTolerance { .. })
        ));
        assert!(matches!(
            eng.set_tolerances(1.0e-3, -1.0e-3),
            Err(EngineError::InvalidTolerance { .. })
        ));
    }

    #[test]
    fn comp_count_distributes_by_volume_fraction() {
        let (mut eng, x, t0, t1, comp) = diffusion_pair();
        eng.set_comp_count(comp, x, 600.0).unwrap();
        // congruent tets: half the molecules each
        assert!((eng.get_tet_count(t0, x).unwrap() - 300.0).abs() < 1.0e-9);
        assert!((eng.get_tet_count(t1, x).unwrap() - 300.0).abs() < 1.0e-9);
        assert!((eng.get_comp_count(comp, x).unwrap() - 600.0).abs() < 1.0e-9);
    }

    #[test]
    fn negative_count_is_rejected() {
        let (mut eng, x, t0, _, comp) = diffusion_pair();
        assert!(matches!(
            eng.set_tet_count(t0, x, -1.0),
            Err(EngineError::ArgumentOutOfRange { .. })
        ));
        assert!(matches!(
            eng.set_comp_count(comp, x, f64::NAN),
            Err(EngineError::ArgumentOutOfRange { .. })
        ));
    }

    #[test]
    fn unused_model_species_is_not_defined_in_region() {
        let (eng, _, t0, _, comp) = diffusion_pair();
        let y = SpecId::from_index(1); // registered, but in no rule
        assert!(matches!(
            eng.get_tet_count(t0, y),
            Err(EngineError::NotDefined { .. })
        ));
        assert!(matches!(
            eng.get_comp_count(comp, y),
            Err(EngineError::NotDefined { .. })
        ));
        // an index past the species table is an argument error instead
        let ghost = SpecId::from_index(7);
        assert!(matches!(
            eng.get_tet_count(t0, ghost),
            Err(EngineError::ArgumentOutOfRange { .. })
        ));
    }

    #[test]
    fn clamping_and_activation_are_not_implemented() {
        let (mut eng, x, t0, _, comp) = diffusion_pair();
        assert!(matches!(
            eng.get_comp_clamped(comp, x),
            Err(EngineError::NotImplemented { .. })
        ));
        assert!(matches!(
            eng.set_tet_clamped(t0, x, true),
            Err(EngineError::NotImplemented { .. })
        ));
        assert!(matches!(eng.reset(), Err(EngineError::NotImplemented { .. })));
    }

    #[test]
    fn step_budget_exhaustion_reports_failure_and_commits_progress() {
        let (mut eng, x, t0, _, _) = diffusion_pair();
        eng.set_tet_count(t0, x, 1000.0).unwrap();
        eng.set_tolerances(1.0e-12, 1.0e-12).unwrap();
        eng.set_max_steps(3);
        let err = eng.run(10.0).unwrap_err();
        assert!(matches!(err, EngineError::IntegrationFailure { .. }));
        assert!(eng.time() < 10.0);
    }

    #[test]
    fn rebinding_unknown_reaction_is_rejected() {
        let (mut eng, _, t0, _, _) = diffusion_pair();
        let ghost = ReacId::from_index(0);
        assert!(matches!(
            eng.set_tet_reac_k(t0, ghost, 1.0),
            Err(EngineError::ArgumentOutOfRange { .. })
        ));
    }
}
