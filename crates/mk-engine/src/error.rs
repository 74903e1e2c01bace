//! The engine-level error taxonomy.
//!
//! Setup-time errors from the model, mesh and resolver crates convert
//! into these kinds so that callers see one coherent surface.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Argument out of range: {what}")]
    ArgumentOutOfRange { what: String },

    #[error("Not defined: {what}")]
    NotDefined { what: String },

    #[error("Unresolved system: '{name}' attached to {region} was never registered")]
    UnresolvedSystem { name: String, region: String },

    #[error("Invalid stoichiometry in '{name}': {what}")]
    InvalidStoichiometry { name: String, what: String },

    #[error("Unsupported order {order} in '{name}' (maximum is 4)")]
    UnsupportedOrder { name: String, order: u32 },

    #[error("Invalid surface reaction '{name}': {what}")]
    InvalidReaction { name: String, what: String },

    #[error("Name conflict: {kind} '{name}' already registered")]
    NameConflict { kind: &'static str, name: String },

    #[error("Invalid geometry: {what}")]
    InvalidGeometry { what: String },

    #[error("Invalid tolerance: {what}")]
    InvalidTolerance { what: String },

    #[error("Checkpoint mismatch: {what}")]
    CheckpointMismatch { what: String },

    #[error("Integration failure: {what}")]
    IntegrationFailure { what: String },

    #[error("Time regression: t_end {t_end} is before current time {t_now}")]
    TimeRegression { t_end: f64, t_now: f64 },

    #[error("Not implemented: {what}")]
    NotImplemented { what: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<mk_model::ModelError> for EngineError {
    fn from(err: mk_model::ModelError) -> Self {
        use mk_model::ModelError as M;
        match err {
            M::NameConflict { kind, name } => EngineError::NameConflict { kind, name },
            M::InvalidStoichiometry { name, what } => {
                EngineError::InvalidStoichiometry { name, what }
            }
            M::UnsupportedOrder { name, order } => EngineError::UnsupportedOrder { name, order },
            M::InvalidReaction { name, what } => EngineError::InvalidReaction { name, what },
            M::OutOfRange { what } => EngineError::ArgumentOutOfRange { what },
        }
    }
}

impl From<mk_mesh::MeshError> for EngineError {
    fn from(err: mk_mesh::MeshError) -> Self {
        use mk_mesh::MeshError as M;
        match err {
            M::InvalidGeometry { what } => EngineError::InvalidGeometry { what },
            M::NameConflict { kind, name } => EngineError::NameConflict { kind, name },
            M::OutOfRange { what } => EngineError::ArgumentOutOfRange { what },
        }
    }
}

impl From<mk_state::StateError> for EngineError {
    fn from(err: mk_state::StateError) -> Self {
        use mk_state::StateError as S;
        match err {
            S::UnresolvedSystem { name, region } => EngineError::UnresolvedSystem { name, region },
            S::NoOuterCompartment { patch, sreac } => EngineError::InvalidGeometry {
                what: format!(
                    "surface reaction '{sreac}' needs an outer volume, \
                     but patch '{patch}' has none"
                ),
            },
        }
    }
}
