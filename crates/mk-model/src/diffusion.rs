//! Diffusion rules: one diffusing species per rule.

use mk_core::{DiffId, SDiffId, SpecId};
use serde::{Deserialize, Serialize};

/// Volumetric diffusion rule: species `lig` diffuses with constant
/// `dcst` (m^2/s) between face-neighbouring tetrahedra of one compartment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diffusion {
    pub name: String,
    /// Global diffusion-rule index, stable across the whole model.
    pub gidx: DiffId,
    pub lig: SpecId,
    pub dcst: f64,
}

/// Surface diffusion rule: species `lig` diffuses with constant
/// `dcst` (m^2/s) between edge-neighbouring triangles of one patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfDiffusion {
    pub name: String,
    /// Global surface-diffusion-rule index, stable across the whole model.
    pub gidx: SDiffId,
    pub lig: SpecId,
    pub dcst: f64,
}
