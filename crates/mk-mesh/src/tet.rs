//! Tetrahedral elements.

use mk_core::{CompId, TetId, TriId};

/// A tetrahedron assigned to a compartment, with the metric data needed to
/// derive per-face diffusion conductances.
///
/// Face slots are indexed 0..4. `next_tet[l]` is the face-`l` neighbour
/// *within the same compartment*; faces on the compartment boundary (or
/// facing a different compartment) hold `None` and carry no flux. A slot
/// left free by an absent neighbour may instead hold an adjacent patch
/// triangle in `next_tri`.
#[derive(Debug, Clone)]
pub struct Tet {
    /// Global (mesh-wide) element index.
    pub idx: TetId,
    /// Parent compartment.
    pub comp: CompId,
    /// Volume, m^3.
    pub vol: f64,
    /// Area of each face, m^2.
    pub areas: [f64; 4],
    /// Barycenter-to-barycenter distance to each face neighbour, m.
    /// Zero where no neighbour exists.
    pub dists: [f64; 4],
    /// Same-compartment face neighbours.
    pub next_tet: [Option<TetId>; 4],
    /// Adjacent patch triangles occupying otherwise-free face slots.
    pub next_tri: [Option<TriId>; 4],
}

impl Tet {
    /// Number of same-compartment neighbours.
    pub fn n_neighbours(&self) -> usize {
        self.next_tet.iter().filter(|n| n.is_some()).count()
    }
}
