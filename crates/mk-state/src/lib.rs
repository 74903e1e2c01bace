//! mk-state: resolves a model plus a mesh into flat index spaces.
//!
//! Produces, for every compartment and patch:
//! - local species indices (a species may be absent from a region)
//! - local reaction/diffusion indices with per-reaction update and
//!   left-hand vectors expressed in local species coordinates
//! - the global state-vector layout (compartment blocks first, then patch
//!   blocks; within a block, elements in local order, species innermost)
//! - the process-id layout used to rebind rate constants after setup
//!
//! Nothing here is mutable after construction; the engine reads these
//! tables when building the process graph and when translating the user
//! API's global ids.

pub mod comp;
pub mod error;
pub mod patch;
pub mod statedef;

pub use comp::{CompDef, DiffDef, ReacDef};
pub use error::{StateError, StateResult};
pub use patch::{PatchDef, SDiffDef, SReacDef};
pub use statedef::{LayoutDims, StateDef};
