//! mk-mesh: tetrahedral mesh index for the reaction-diffusion engine.
//!
//! Provides:
//! - an arena of tetrahedra and boundary triangles with per-element metric
//!   data (volumes, areas, inter-barycenter distances, neighbour indices)
//! - compartments (sets of tets) and patches (sets of boundary tris) that
//!   reference volume/surface systems by name
//! - a builder that derives all metrics from vertex coordinates and
//!   connectivity, then freezes the mesh
//!
//! Neighbour cycles are expressed through integer element ids, never
//! through ownership; absent neighbours are `None`.

pub mod compartment;
pub mod error;
pub mod mesh;
pub mod patch;
pub mod tet;
pub mod tri;

pub use compartment::Compartment;
pub use error::{MeshError, MeshResult};
pub use mesh::{TetMesh, TetMeshBuilder};
pub use patch::Patch;
pub use tet::Tet;
pub use tri::Tri;
