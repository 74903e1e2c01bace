use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

/// Errors raised while resolving a model against a mesh.
#[derive(Error, Debug, Clone)]
pub enum StateError {
    #[error("Unresolved system: '{name}' attached to {region} was never registered")]
    UnresolvedSystem { name: String, region: String },

    #[error(
        "Surface reaction '{sreac}' on patch '{patch}' references the outer volume, \
         but the patch has no outer compartment"
    )]
    NoOuterCompartment { patch: String, sreac: String },
}
