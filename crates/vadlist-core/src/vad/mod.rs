//! VAD tree model: flag words, decoded records, the node decoder, the
//! tree walker and the arena the walk fills.

pub mod decoder;
pub mod flags;
pub mod record;
pub mod table;
pub mod walker;

// Synthetic trees for unit and integration tests
#[doc(hidden)]
pub mod fixture;

pub use decoder::{DecodedNode, decode_node};
pub use flags::{BaseProtection, Ownership, Protection, ProtectionModifier, RegionFlags, VadType};
pub use record::{Backing, FileName, RegionRecord};
pub use table::{Side, TableEntry, VadTable};
pub use walker::walk;
