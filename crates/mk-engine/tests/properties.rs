//! Structural and numerical properties that must hold for every valid
//! configuration.

mod common;

use mk_engine::{Engine, EngineError};
use mk_model::{Model, SReacSpec};
use proptest::prelude::*;

/// |y| equals the sum of per-region species-times-elements products.
#[test]
fn state_vector_length_includes_patch_blocks() {
    let mut model = Model::new();
    let a = model.add_species("A").unwrap();
    let r = model.add_species("R").unwrap();
    let rca = model.add_species("RCa").unwrap();
    let vsys = model.add_volsys("cyto").unwrap();
    model.add_diffusion(vsys, "dA", a, 1.0e-12).unwrap();
    let ssys = model.add_surfsys("memb_sys").unwrap();
    model
        .add_surf_reaction(
            ssys,
            "bind",
            SReacSpec {
                slhs: &[(r, 1)],
                ilhs: &[(a, 1)],
                srhs: &[(rca, 1)],
                kcst: 1.0e6,
                ..Default::default()
            },
        )
        .unwrap();

    let (mut mb, t0, t1) = common::mirror_pair(1.0e-6);
    let left = mb.add_compartment("left", &["cyto"], &[t0]);
    let right = mb.add_compartment("right", &["cyto"], &[t1]);
    mb.add_patch("memb", &["memb_sys"], &[[1, 2, 3]], left, Some(right));
    let mesh = mb.build().unwrap();
    let eng = Engine::new(model, mesh).unwrap();

    // 1 tet x 1 species per compartment, 1 tri x 2 surface species
    assert_eq!(eng.n_slots(), 1 + 1 + 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// |y| = n_tets * n_species for a single compartment in which every
    /// species diffuses, across mesh and model sizes.
    #[test]
    fn state_vector_length_matches_layout(n_cubes in 1usize..4, n_specs in 1usize..5) {
        let mut model = Model::new();
        let vsys = model.add_volsys("cyto").unwrap();
        for i in 0..n_specs {
            let s = model.add_species(format!("S{i}")).unwrap();
            model.add_diffusion(vsys, format!("d{i}"), s, 1.0e-12).unwrap();
        }

        let (mut mb, cubes) = common::bar(n_cubes, 1.0e-6);
        let all: Vec<_> = cubes.iter().flatten().copied().collect();
        mb.add_compartment("bar", &["cyto"], &all);
        let eng = Engine::new(model, mb.build().unwrap()).unwrap();

        prop_assert_eq!(eng.n_slots(), 6 * n_cubes * n_specs);
    }
}

/// A closed reaction-diffusion system conserves its chemical totals.
#[test]
fn closed_system_conserves_mass() {
    let mut model = Model::new();
    let a = model.add_species("A").unwrap();
    let b = model.add_species("B").unwrap();
    let c = model.add_species("C").unwrap();
    let vsys = model.add_volsys("cyto").unwrap();
    model
        .add_reaction(vsys, "fwd", &[(a, 1), (b, 1)], &[(c, 1)], 1.0e5)
        .unwrap();
    model
        .add_reaction(vsys, "bwd", &[(c, 1)], &[(a, 1), (b, 1)], 2.0)
        .unwrap();
    for (name, s) in [("dA", a), ("dB", b), ("dC", c)] {
        model.add_diffusion(vsys, name, s, 1.0e-12).unwrap();
    }

    let (mut mb, cubes) = common::bar(2, 1.0e-6);
    let all: Vec<_> = cubes.iter().flatten().copied().collect();
    let comp = mb.add_compartment("bar", &["cyto"], &all);
    let mesh = mb.build().unwrap();

    let mut eng = Engine::new(model, mesh).unwrap();
    eng.set_max_steps(50_000);
    eng.set_comp_count(comp, a, 8000.0).unwrap();
    eng.set_tet_count(cubes[1][3], b, 5000.0).unwrap();

    let total_a0 = eng.get_comp_count(comp, a).unwrap() + eng.get_comp_count(comp, c).unwrap();
    let total_b0 = eng.get_comp_count(comp, b).unwrap() + eng.get_comp_count(comp, c).unwrap();

    eng.run(1.0).unwrap();

    let total_a = eng.get_comp_count(comp, a).unwrap() + eng.get_comp_count(comp, c).unwrap();
    let total_b = eng.get_comp_count(comp, b).unwrap() + eng.get_comp_count(comp, c).unwrap();
    let rtol = 1.0e-3;
    assert!(((total_a - total_a0) / total_a0).abs() <= 10.0 * rtol);
    assert!(((total_b - total_b0) / total_b0).abs() <= 10.0 * rtol);
}

/// Swapping the initial populations of two congruent neighbouring tets
/// mirrors the whole trajectory.
#[test]
fn diffusion_is_symmetric_under_population_swap() {
    let make = || {
        let mut model = Model::new();
        let x = model.add_species("X").unwrap();
        let vsys = model.add_volsys("cyto").unwrap();
        model.add_diffusion(vsys, "dX", x, 1.0e-12).unwrap();
        let (mut mb, t0, t1) = common::mirror_pair(1.0e-6);
        mb.add_compartment("pair", &["cyto"], &[t0, t1]);
        (Engine::new(model, mb.build().unwrap()).unwrap(), x, t0, t1)
    };

    let (mut fwd, x, t0, t1) = make();
    fwd.set_tet_count(t0, x, 1000.0).unwrap();
    fwd.set_tet_count(t1, x, 200.0).unwrap();
    fwd.run(0.05).unwrap();

    let (mut rev, x2, u0, u1) = make();
    rev.set_tet_count(u0, x2, 200.0).unwrap();
    rev.set_tet_count(u1, x2, 1000.0).unwrap();
    rev.run(0.05).unwrap();

    let d0 = (fwd.get_tet_count(t0, x).unwrap() - rev.get_tet_count(u1, x2).unwrap()).abs();
    let d1 = (fwd.get_tet_count(t1, x).unwrap() - rev.get_tet_count(u0, x2).unwrap()).abs();
    assert!(d0 < 1.0e-9 * 1000.0 && d1 < 1.0e-9 * 1000.0);
}

/// With no active process (zero diffusivity, no reactions) the state is
/// exactly stationary.
#[test]
fn inert_system_is_stationary() {
    let mut model = Model::new();
    let x = model.add_species("X").unwrap();
    let vsys = model.add_volsys("cyto").unwrap();
    model.add_diffusion(vsys, "frozen", x, 0.0).unwrap();

    let (mut mb, t0, t1) = common::mirror_pair(1.0e-6);
    mb.add_compartment("pair", &["cyto"], &[t0, t1]);
    let mut eng = Engine::new(model, mb.build().unwrap()).unwrap();

    eng.set_tet_count(t0, x, 123.0).unwrap();
    eng.set_tet_count(t1, x, 45.0).unwrap();
    eng.run(1.0).unwrap();

    assert_eq!(eng.get_tet_count(t0, x).unwrap(), 123.0);
    assert_eq!(eng.get_tet_count(t1, x).unwrap(), 45.0);
}

/// Rebinding a rate constant to its current value must not change the
/// physics; rebinding and reverting before a run is exactly invisible.
#[test]
fn rate_rebind_is_idempotent() {
    let k = 2.0;
    let make = || {
        let mut model = Model::new();
        let a = model.add_species("A").unwrap();
        let b = model.add_species("B").unwrap();
        let vsys = model.add_volsys("cyto").unwrap();
        let reac = model.add_reaction(vsys, "decay", &[(a, 1)], &[(b, 1)], k).unwrap();
        let (mut mb, tet) = common::single_tet(1.0e-18);
        mb.add_compartment("cyto_region", &["cyto"], &[tet]);
        let mut eng = Engine::new(model, mb.build().unwrap()).unwrap();
        eng.set_tolerances(1.0e-9, 1.0e-9).unwrap();
        eng.set_tet_count(tet, a, 1000.0).unwrap();
        (eng, a, tet, reac)
    };

    // set-then-revert before any run: bitwise invisible
    let (mut plain, a, tet, _) = make();
    plain.run(1.0).unwrap();
    let (mut reverted, a2, tet2, reac2) = make();
    reverted.set_tet_reac_k(tet2, reac2, 5.0).unwrap();
    reverted.set_tet_reac_k(tet2, reac2, k).unwrap();
    reverted.run(1.0).unwrap();
    assert_eq!(
        plain.get_tet_count(tet, a).unwrap(),
        reverted.get_tet_count(tet2, a2).unwrap()
    );

    // mid-run rebind to the current value: same physics (the rebind
    // forces a reinitialisation, so equality is numerical, not bitwise)
    let (mut cont, a3, tet3, _) = make();
    cont.run(0.5).unwrap();
    cont.run(1.0).unwrap();
    let (mut rebound, a4, tet4, reac4) = make();
    rebound.run(0.5).unwrap();
    rebound.set_tet_reac_k(tet4, reac4, k).unwrap();
    rebound.run(1.0).unwrap();
    let ca = cont.get_tet_count(tet3, a3).unwrap();
    let cb = rebound.get_tet_count(tet4, a4).unwrap();
    assert!(((ca - cb) / ca).abs() < 1.0e-6, "rebind changed result: {ca} vs {cb}");
}

/// Checkpoint, restore and re-run reproduces the exact trajectory,
/// including rebound rate coefficients.
#[test]
fn checkpoint_round_trip_is_exact() {
    let mut model = Model::new();
    let a = model.add_species("A").unwrap();
    let b = model.add_species("B").unwrap();
    let vsys = model.add_volsys("cyto").unwrap();
    let reac = model.add_reaction(vsys, "decay", &[(a, 1)], &[(b, 1)], 3.0).unwrap();
    model.add_diffusion(vsys, "dA", a, 1.0e-12).unwrap();

    let (mut mb, t0, t1) = common::mirror_pair(1.0e-6);
    mb.add_compartment("pair", &["cyto"], &[t0, t1]);
    let mut eng = Engine::new(model, mb.build().unwrap()).unwrap();

    eng.set_tet_count(t0, a, 900.0).unwrap();
    eng.set_tet_count(t1, a, 100.0).unwrap();
    eng.set_tet_reac_k(t1, reac, 1.5).unwrap();

    let path = std::env::temp_dir().join("mk_engine_checkpoint_test.bin");
    eng.checkpoint(&path).unwrap();

    eng.run(0.1).unwrap();
    let after_a = [
        eng.get_tet_count(t0, a).unwrap(),
        eng.get_tet_count(t1, a).unwrap(),
        eng.get_tet_count(t0, b).unwrap(),
        eng.get_tet_count(t1, b).unwrap(),
    ];

    eng.restore(&path).unwrap();
    assert_eq!(eng.time(), 0.0);
    eng.run(0.1).unwrap();
    let replay = [
        eng.get_tet_count(t0, a).unwrap(),
        eng.get_tet_count(t1, a).unwrap(),
        eng.get_tet_count(t0, b).unwrap(),
        eng.get_tet_count(t1, b).unwrap(),
    ];

    assert_eq!(after_a, replay);
    let _ = std::fs::remove_file(&path);
}

/// Restoring against a differently configured engine is refused.
#[test]
fn checkpoint_mismatch_is_detected() {
    let build_engine = |extra_species: bool| {
        let mut model = Model::new();
        let a = model.add_species("A").unwrap();
        let vsys = model.add_volsys("cyto").unwrap();
        model.add_diffusion(vsys, "dA", a, 1.0e-12).unwrap();
        if extra_species {
            let z = model.add_species("Z").unwrap();
            model.add_diffusion(vsys, "dZ", z, 1.0e-12).unwrap();
        }
        let (mut mb, t0, t1) = common::mirror_pair(1.0e-6);
        mb.add_compartment("pair", &["cyto"], &[t0, t1]);
        Engine::new(model, mb.build().unwrap()).unwrap()
    };

    let eng = build_engine(false);
    let path = std::env::temp_dir().join("mk_engine_checkpoint_mismatch_test.bin");
    eng.checkpoint(&path).unwrap();

    let mut other = build_engine(true);
    let err = other.restore(&path).unwrap_err();
    assert!(matches!(err, EngineError::CheckpointMismatch { .. }));
    let _ = std::fs::remove_file(&path);
}
