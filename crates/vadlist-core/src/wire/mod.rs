//! Flattened region list: size estimation, serialization with rebased
//! links, and the caller-side reader.

pub mod client;
pub mod estimate;
pub mod format;
pub mod rebase;
pub mod serializer;

pub use client::{ListHeader, RegionList};
pub use estimate::estimate_size;
pub use format::{ENTRY_SIZE, HEADER_SIZE};
pub use rebase::Rebaser;
pub use serializer::serialize;
