use thiserror::Error;

pub type MeshResult<T> = Result<T, MeshError>;

/// Errors raised while assembling or querying the mesh.
#[derive(Error, Debug, Clone)]
pub enum MeshError {
    #[error("Invalid geometry: {what}")]
    InvalidGeometry { what: String },

    #[error("Name conflict: {kind} '{name}' already registered")]
    NameConflict { kind: &'static str, name: String },

    #[error("Argument out of range: {what}")]
    OutOfRange { what: String },
}
