//! mk-ode: serial adaptive ODE integration.
//!
//! Provides:
//! - [`OdeSystem`]: the right-hand-side contract (`dy/dt = f(t, y)`)
//! - [`Dopri5`]: an embedded Dormand-Prince 5(4) integrator with FSAL,
//!   per-equation absolute tolerances, a step budget per advance call,
//!   and explicit reinitialisation that discards step history
//!
//! The engine drives the integrator exclusively through
//! `init`/`reinit`/`set_tolerances`/`set_max_steps`/`advance`, so the
//! method can be swapped without touching the callers.

pub mod dopri;
pub mod error;
pub mod system;

pub use dopri::Dopri5;
pub use error::{OdeError, OdeResult};
pub use system::OdeSystem;
