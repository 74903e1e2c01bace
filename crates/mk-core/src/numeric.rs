use crate::CoreError;

/// Floating point type used throughout the engine. State slots hold
/// molecule counts as `Real`, so counts are continuous quantities here.
pub type Real = f64;

/// Avogadro's constant, mol^-1.
pub const AVOGADRO: Real = 6.02214076e23;

/// Conversion between molecule counts and molar concentration in a
/// volume `vol` (m^3): `count = conc * conc_to_count(vol)`.
/// Concentrations are mol/L, hence the litre factor.
pub fn conc_to_count(vol: Real) -> Real {
    1.0e3 * vol * AVOGADRO
}

/// Paired absolute/relative tolerance for count comparisons.
///
/// The absolute part covers slots that have drained to (near) zero; the
/// relative part covers everything else.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

/// Whether `a` and `b` agree within `tol`, whichever of the absolute or
/// scaled-relative bound is looser.
pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let scale = a.abs().max(b.abs());
    (a - b).abs() <= tol.abs.max(tol.rel * scale)
}

/// Reject NaN/infinite values at the API boundary before they can reach
/// the state vector.
pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        return Ok(v);
    }
    Err(CoreError::NonFinite { what, value: v })
}
