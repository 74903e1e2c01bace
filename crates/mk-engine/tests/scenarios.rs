//! End-to-end kinetics scenarios on small meshes.

mod common;

use mk_core::{nearly_equal, Tolerances};
use mk_engine::Engine;
use mk_mesh::TetMesh;
use mk_model::{Model, SReacSpec};

fn build(model: Model, mesh: TetMesh) -> Engine {
    Engine::new(model, mesh).expect("engine setup")
}

/// Two compartments sharing a mesh but no diffusion pathway: molecules
/// placed in one side never appear in the other.
#[test]
fn blocked_compartments_stay_isolated() {
    let mut model = Model::new();
    let x = model.add_species("X").unwrap();
    let vsys = model.add_volsys("cyto").unwrap();
    model.add_diffusion(vsys, "dX", x, 1.0e-10).unwrap();

    let (mut mb, cubes) = common::bar(6, 0.25e-6);
    let left: Vec<_> = cubes[..3].iter().flatten().copied().collect();
    let right: Vec<_> = cubes[3..].iter().flatten().copied().collect();
    let comp_a = mb.add_compartment("a", &["cyto"], &left);
    let comp_b = mb.add_compartment("b", &["cyto"], &right);
    let mesh = mb.build().unwrap();

    let mut eng = build(model, mesh);
    eng.set_tet_count(cubes[0][0], x, 1000.0).unwrap();

    for t_end in [1.0e-3, 5.0e-3] {
        eng.run(t_end).unwrap();
        assert_eq!(eng.get_comp_count(comp_b, x).unwrap(), 0.0);
    }
    let total = eng.get_comp_count(comp_a, x).unwrap();
    assert!((total - 1000.0).abs() < 1.0e-6 * 1000.0);
}

/// One compartment spanning the bar (the open configuration): an
/// end-loaded species equilibrates between the two halves.
#[test]
fn open_bar_equilibrates_between_halves() {
    let mut model = Model::new();
    let y = model.add_species("Y").unwrap();
    let vsys = model.add_volsys("cyto").unwrap();
    model.add_diffusion(vsys, "dY", y, 1.0e-10).unwrap();

    let (mut mb, cubes) = common::bar(6, 0.25e-6);
    let all: Vec<_> = cubes.iter().flatten().copied().collect();
    mb.add_compartment("bar", &["cyto"], &all);
    let mesh = mb.build().unwrap();

    let mut eng = build(model, mesh);
    eng.set_tolerances(1.0e-3, 1.0e-3).unwrap();
    eng.set_max_steps(50_000);
    let end_tet = *cubes[5].last().unwrap();
    eng.set_tet_count(end_tet, y, 500.0).unwrap();
    eng.run(0.1).unwrap();

    let half_sum = |eng: &Engine, range: &[Vec<mk_core::TetId>]| {
        range
            .iter()
            .flatten()
            .map(|&t| eng.get_tet_count(t, y).unwrap())
            .sum::<f64>()
    };
    let near = half_sum(&eng, &cubes[3..]);
    let far = half_sum(&eng, &cubes[..3]);
    assert!(
        (near - far).abs() < 0.15 * 500.0,
        "halves not equilibrated: near={near}, far={far}"
    );
    assert!((near + far - 500.0).abs() < 1.0e-3 * 500.0);
}

/// Surface binding with the volume ligand clamped by repeated resets:
/// nearly all receptors convert within a second.
#[test]
fn surface_binding_consumes_receptors() {
    let mut model = Model::new();
    let ca = model.add_species("Ca").unwrap();
    let r = model.add_species("R").unwrap();
    let rca = model.add_species("RCa").unwrap();
    let ssys = model.add_surfsys("memb_sys").unwrap();
    model
        .add_surf_reaction(
            ssys,
            "bind",
            SReacSpec {
                slhs: &[(r, 1)],
                ilhs: &[(ca, 1)],
                srhs: &[(rca, 1)],
                kcst: 8.889e6,
                ..Default::default()
            },
        )
        .unwrap();

    let (mut mb, tet) = common::single_tet(1.0e-18);
    let comp = mb.add_compartment("cyto", &[], &[tet]);
    let patch = mb.add_patch("memb", &["memb_sys"], &[[1, 2, 3]], comp, None);
    let mesh = mb.build().unwrap();

    let mut eng = build(model, mesh);
    let ca_conc = 150.0e-6;
    eng.set_comp_conc(comp, ca, ca_conc).unwrap();
    eng.set_patch_count(patch, r, 160.0).unwrap();

    // clamp the ligand by resetting its concentration every 100 ms
    for step in 1..=10 {
        eng.run(0.1 * step as f64).unwrap();
        eng.set_comp_conc(comp, ca, ca_conc).unwrap();
    }

    let bound = eng.get_patch_count(patch, rca).unwrap();
    let free = eng.get_patch_count(patch, r).unwrap();
    assert!(
        (140.0..=160.0 + 1.0e-6).contains(&bound),
        "bound receptors out of range: {bound}"
    );
    assert!((bound + free - 160.0).abs() < 1.0e-6 * 160.0);
}

/// A + B <-> C in one well-mixed tet reaches the mass-action equilibrium
/// ratio kf/kb within 0.1 %.
#[test]
fn reversible_reaction_reaches_equilibrium() {
    let kf = 3.0e5;
    let kb = 0.7;

    let mut model = Model::new();
    let a = model.add_species("A").unwrap();
    let b = model.add_species("B").unwrap();
    let c = model.add_species("C").unwrap();
    let vsys = model.add_volsys("cyto").unwrap();
    model
        .add_reaction(vsys, "fwd", &[(a, 1), (b, 1)], &[(c, 1)], kf)
        .unwrap();
    model
        .add_reaction(vsys, "bwd", &[(c, 1)], &[(a, 1), (b, 1)], kb)
        .unwrap();

    let (mut mb, tet) = common::single_tet(1.6667e-21);
    let comp = mb.add_compartment("cyto_region", &["cyto"], &[tet]);
    let mesh = mb.build().unwrap();

    let mut eng = build(model, mesh);
    eng.set_tolerances(1.0e-9, 1.0e-9).unwrap();
    eng.set_comp_conc(comp, a, 31.4e-6).unwrap();
    eng.set_comp_conc(comp, b, 22.3e-6).unwrap();
    eng.run(5.0).unwrap();

    let conc_a = eng.get_tet_conc(tet, a).unwrap();
    let conc_b = eng.get_tet_conc(tet, b).unwrap();
    let conc_c = eng.get_tet_conc(tet, c).unwrap();
    let keq = conc_c / (conc_a * conc_b);
    let expected = kf / kb;
    let tol = Tolerances {
        abs: 0.0,
        rel: 1.0e-3,
    };
    assert!(
        nearly_equal(keq, expected, tol),
        "equilibrium ratio {keq} differs from {expected}"
    );
}

/// Injecting molecules mid-run reinitialises the integrator: the
/// continued trajectory equals a fresh run started from the mutated
/// state.
#[test]
fn mid_run_injection_matches_fresh_start() {
    let make = || {
        let mut model = Model::new();
        let x = model.add_species("X").unwrap();
        let vsys = model.add_volsys("cyto").unwrap();
        model.add_diffusion(vsys, "dX", x, 1.0e-12).unwrap();
        let (mut mb, t0, t1) = common::mirror_pair(1.0e-6);
        let _ = mb.add_compartment("pair", &["cyto"], &[t0, t1]);
        (build(model, mb.build().unwrap()), x, t0, t1)
    };

    let (mut eng1, x, t0, t1) = make();
    eng1.set_tet_count(t0, x, 1000.0).unwrap();
    eng1.run(1.0).unwrap();
    let c0 = eng1.get_tet_count(t0, x).unwrap();
    let c1 = eng1.get_tet_count(t1, x).unwrap();
    eng1.set_tet_count(t0, x, c0 + 10.0).unwrap();
    eng1.run(2.0).unwrap();

    let (mut eng2, x2, u0, u1) = make();
    eng2.set_tet_count(u0, x2, c0 + 10.0).unwrap();
    eng2.set_tet_count(u1, x2, c1).unwrap();
    eng2.run(1.0).unwrap();

    let d0 = (eng1.get_tet_count(t0, x).unwrap() - eng2.get_tet_count(u0, x2).unwrap()).abs();
    let d1 = (eng1.get_tet_count(t1, x).unwrap() - eng2.get_tet_count(u1, x2).unwrap()).abs();
    assert!(d0 < 1.0e-9 && d1 < 1.0e-9, "trajectories diverged: {d0}, {d1}");
}

/// A zero-order source produces `k * 1e3 * V * N_A` molecules per second.
#[test]
fn zero_order_source_rate() {
    let mut model = Model::new();
    let a = model.add_species("A").unwrap();
    let vsys = model.add_volsys("cyto").unwrap();
    model.add_reaction(vsys, "src", &[], &[(a, 1)], 1.0).unwrap();

    let vol = 1.6667e-21;
    let (mut mb, tet) = common::single_tet(vol);
    mb.add_compartment("cyto_region", &["cyto"], &[tet]);
    let mesh = mb.build().unwrap();

    let mut eng = build(model, mesh);
    eng.run(1.0).unwrap();

    let count = eng.get_tet_count(tet, a).unwrap();
    let expected = mk_core::conc_to_count(eng.tet_vol(tet).unwrap());
    let tol = Tolerances {
        abs: 0.0,
        rel: 1.0e-3,
    };
    assert!(
        nearly_equal(count, expected, tol),
        "source produced {count}, expected {expected}"
    );
}
