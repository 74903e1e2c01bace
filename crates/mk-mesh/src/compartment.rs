//! Compartments: sets of tetrahedra sharing volume systems.

use std::collections::HashMap;

use mk_core::TetId;

/// A set of tetrahedra that share the reaction/diffusion rules of the
/// volume systems attached to it (referenced by name; resolved when the
/// model and mesh are compiled together).
#[derive(Debug, Clone)]
pub struct Compartment {
    pub name: String,
    /// Names of attached volume systems.
    pub vsys: Vec<String>,
    /// Member tets in local order (the order they were registered in).
    pub tets: Vec<TetId>,
    /// Total volume, m^3.
    pub vol: f64,
    pub(crate) tet_l: HashMap<TetId, u32>,
}

impl Compartment {
    pub fn n_tets(&self) -> usize {
        self.tets.len()
    }

    /// Global-to-local tet index translation; `None` if the tet does not
    /// belong to this compartment.
    pub fn tet_g2l(&self, tet: TetId) -> Option<u32> {
        self.tet_l.get(&tet).copied()
    }
}
