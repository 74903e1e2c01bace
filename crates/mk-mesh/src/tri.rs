//! Boundary triangle elements.

use mk_core::{PatchId, TetId, TriId};

/// A patch triangle with the metric data needed for surface diffusion and
/// for locating the adjacent volume elements of surface reactions.
///
/// Edge slots are indexed 0..3 in vertex order (v0-v1, v1-v2, v2-v0).
/// `next_tri[l]` is the edge-`l` neighbour *within the same patch*; edges
/// on the patch boundary hold `None`.
///
/// Orientation: every patch triangle has a well-defined inner tetrahedron;
/// the outer one exists only where the patch separates two compartments.
#[derive(Debug, Clone)]
pub struct Tri {
    /// Global (mesh-wide) triangle index.
    pub idx: TriId,
    /// Parent patch.
    pub patch: PatchId,
    /// Area, m^2.
    pub area: f64,
    /// Length of each edge, m.
    pub lengths: [f64; 3],
    /// Barycenter-to-barycenter distance to each edge neighbour, m.
    /// Zero where no neighbour exists.
    pub dists: [f64; 3],
    /// Same-patch edge neighbours.
    pub next_tri: [Option<TriId>; 3],
    /// Adjacent tetrahedron in the patch's inner compartment.
    pub inner_tet: TetId,
    /// Adjacent tetrahedron in the patch's outer compartment, if any.
    pub outer_tet: Option<TetId>,
}
