//! Patches: sets of boundary triangles sharing surface systems.

use std::collections::HashMap;

use mk_core::{CompId, TriId};

/// A set of triangles that share the surface systems attached to it.
///
/// A patch always references an inner compartment; the outer compartment
/// is present only where the patch separates two volumes.
#[derive(Debug, Clone)]
pub struct Patch {
    pub name: String,
    /// Names of attached surface systems.
    pub ssys: Vec<String>,
    /// Member tris in local order (the order they were registered in).
    pub tris: Vec<TriId>,
    /// Total area, m^2.
    pub area: f64,
    pub icomp: CompId,
    pub ocomp: Option<CompId>,
    pub(crate) tri_l: HashMap<TriId, u32>,
}

impl Patch {
    pub fn n_tris(&self) -> usize {
        self.tris.len()
    }

    /// Global-to-local tri index translation; `None` if the tri does not
    /// belong to this patch.
    pub fn tri_g2l(&self, tri: TriId) -> Option<u32> {
        self.tri_l.get(&tri).copied()
    }
}
