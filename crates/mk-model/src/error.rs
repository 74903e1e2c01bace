use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised during model registration.
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("Name conflict: {kind} '{name}' already registered")]
    NameConflict { kind: &'static str, name: String },

    #[error("Invalid stoichiometry in '{name}': {what}")]
    InvalidStoichiometry { name: String, what: String },

    #[error("Unsupported order {order} in '{name}' (maximum is 4)")]
    UnsupportedOrder { name: String, order: u32 },

    #[error("Invalid surface reaction '{name}': {what}")]
    InvalidReaction { name: String, what: String },

    #[error("Argument out of range: {what}")]
    OutOfRange { what: String },
}
