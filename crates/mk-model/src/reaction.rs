//! Volumetric mass-action reactions.

use mk_core::{ReacId, SpecId};
use serde::{Deserialize, Serialize};

/// A volumetric reaction: `lhs -> rhs` with mass-action rate constant `kcst`.
///
/// Stoichiometry is stored as `(species, multiplicity)` pairs with
/// multiplicities > 0; duplicate species entries are merged at registration.
/// The reaction *order* is the sum of left-hand multiplicities.
///
/// `kcst` follows the litres-basis convention: units are
/// `(mol/L)^(1-order) / s` (so a second-order constant is in L/mol/s and a
/// zero-order constant is an intensive source rate in mol/L/s).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    /// Global reaction index, stable across the whole model.
    pub gidx: ReacId,
    pub lhs: Vec<(SpecId, u32)>,
    pub rhs: Vec<(SpecId, u32)>,
    pub kcst: f64,
    pub order: u32,
}

/// Merge duplicate species entries of a raw stoichiometry list, rejecting
/// negative multiplicities. Zero entries are dropped.
pub(crate) fn merge_stoich(
    raw: &[(SpecId, i32)],
) -> Result<Vec<(SpecId, u32)>, (SpecId, i32)> {
    let mut merged: Vec<(SpecId, u32)> = Vec::with_capacity(raw.len());
    for &(spec, mult) in raw {
        if mult < 0 {
            return Err((spec, mult));
        }
        if mult == 0 {
            continue;
        }
        match merged.iter_mut().find(|(s, _)| *s == spec) {
            Some((_, m)) => *m += mult as u32,
            None => merged.push((spec, mult as u32)),
        }
    }
    Ok(merged)
}

pub(crate) fn total_mult(stoich: &[(SpecId, u32)]) -> u32 {
    stoich.iter().map(|(_, m)| m).sum()
}
