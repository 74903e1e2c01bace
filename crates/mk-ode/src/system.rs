//! Right-hand side of an ODE system `dy/dt = f(t, y)`.

/// The system contract the integrator steps against.
///
/// `rhs` must be side-effect free and allocation free: it is invoked many
/// times per step from the integrator's inner loop.
pub trait OdeSystem {
    /// Number of state variables.
    fn n_dim(&self) -> usize;

    /// Evaluate `f(t, y)` and write into `dydt`.
    ///
    /// `y` and `dydt` have length `n_dim()`.
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);
}
