use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Compact element/entity identifier.
///
/// Stored as `NonZeroU32` holding `index + 1`, so `Option<Id>` costs
/// nothing extra — mesh neighbour slots are arrays of `Option<TetId>` /
/// `Option<TriId>` and stay four bytes per entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(NonZeroU32);

impl Id {
    /// Wrap a 0-based index. Panics at `u32::MAX`, which would overflow
    /// the niche encoding; no mesh or model gets anywhere near that.
    pub fn from_index(index: u32) -> Self {
        match NonZeroU32::new(index.wrapping_add(1)) {
            Some(raw) => Self(raw),
            None => panic!("id space exhausted at index {index}"),
        }
    }

    /// The 0-based index this id wraps.
    pub fn index(self) -> u32 {
        self.0.get().wrapping_sub(1)
    }

    /// The index widened for slice access.
    pub fn idx(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.index()).finish()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.index(), f)
    }
}

/// Domain-specific ID aliases for clarity (no runtime cost).
pub type SpecId = Id;
pub type ReacId = Id;
pub type SReacId = Id;
pub type DiffId = Id;
pub type SDiffId = Id;
pub type CompId = Id;
pub type PatchId = Id;
pub type TetId = Id;
pub type TriId = Id;
