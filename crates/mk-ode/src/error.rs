use thiserror::Error;

pub type OdeResult<T> = Result<T, OdeError>;

/// Errors raised by the integrator.
///
/// On `MaxStepsExceeded` and `StepSizeUnderflow` the integrator state
/// remains at the last accepted step, so callers can report the time
/// actually reached.
#[derive(Error, Debug, Clone)]
pub enum OdeError {
    #[error("Dimension mismatch: expected {expected} equations, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Integrator used before initialisation")]
    NotInitialised,

    #[error("Step budget of {max_steps} exhausted at t={t:.6e}")]
    MaxStepsExceeded { max_steps: usize, t: f64 },

    #[error("Step size underflow at t={t:.6e} (error control cannot converge)")]
    StepSizeUnderflow { t: f64 },
}
