//! Shared mesh fixtures for the engine integration tests.

use mk_core::TetId;
use mk_mesh::TetMeshBuilder;

/// A bar of `n_cubes` unit cubes of edge `h` (metres) along x, each cube
/// split into the six path tetrahedra around its main diagonal. The
/// subdivision is translation-invariant, so faces between neighbouring
/// cubes conform. Returns the builder plus the tet ids grouped by cube.
pub fn bar(n_cubes: usize, h: f64) -> (TetMeshBuilder, Vec<Vec<TetId>>) {
    let mut b = TetMeshBuilder::new();

    // vertex grid: (n_cubes + 1) x 2 x 2
    let vid = |i: usize, y: usize, z: usize| (i * 4 + y * 2 + z) as u32;
    for i in 0..=n_cubes {
        for y in 0..2 {
            for z in 0..2 {
                b.add_vertex([i as f64 * h, y as f64 * h, z as f64 * h]);
            }
        }
    }

    let mut cubes = Vec::with_capacity(n_cubes);
    for i in 0..n_cubes {
        let c = |dx: usize, dy: usize, dz: usize| vid(i + dx, dy, dz);
        // six tets sharing the main diagonal c000-c111
        let tets = [
            [c(0, 0, 0), c(1, 0, 0), c(1, 1, 0), c(1, 1, 1)],
            [c(0, 0, 0), c(1, 0, 0), c(1, 0, 1), c(1, 1, 1)],
            [c(0, 0, 0), c(0, 1, 0), c(1, 1, 0), c(1, 1, 1)],
            [c(0, 0, 0), c(0, 1, 0), c(0, 1, 1), c(1, 1, 1)],
            [c(0, 0, 0), c(0, 0, 1), c(1, 0, 1), c(1, 1, 1)],
            [c(0, 0, 0), c(0, 0, 1), c(0, 1, 1), c(1, 1, 1)],
        ];
        cubes.push(tets.into_iter().map(|t| b.add_tet(t)).collect());
    }

    (b, cubes)
}

/// A single corner tetrahedron with the requested volume (m^3).
/// Vertex 0 is the right-angle corner; the face opposite it is (1,2,3).
pub fn single_tet(vol: f64) -> (TetMeshBuilder, TetId) {
    let s = (6.0 * vol).cbrt();
    let mut b = TetMeshBuilder::new();
    let v0 = b.add_vertex([0.0, 0.0, 0.0]);
    let v1 = b.add_vertex([s, 0.0, 0.0]);
    let v2 = b.add_vertex([0.0, s, 0.0]);
    let v3 = b.add_vertex([0.0, 0.0, s]);
    let t = b.add_tet([v0, v1, v2, v3]);
    (b, t)
}

/// Two congruent tets sharing the face (1,2,3); the second is the mirror
/// image of the first through that face's plane. `scale` sets the edge
/// length scale in metres.
pub fn mirror_pair(scale: f64) -> (TetMeshBuilder, TetId, TetId) {
    let mut b = TetMeshBuilder::new();
    let v0 = b.add_vertex([0.0, 0.0, 0.0]);
    let v1 = b.add_vertex([scale, 0.0, 0.0]);
    let v2 = b.add_vertex([0.0, scale, 0.0]);
    let v3 = b.add_vertex([0.0, 0.0, scale]);
    let v4 = b.add_vertex([2.0 * scale / 3.0, 2.0 * scale / 3.0, 2.0 * scale / 3.0]);
    let t0 = b.add_tet([v0, v1, v2, v3]);
    let t1 = b.add_tet([v4, v1, v2, v3]);
    (b, t0, t1)
}
