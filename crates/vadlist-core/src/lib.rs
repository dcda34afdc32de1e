pub mod config;
pub mod engine;
pub mod error;
pub mod process;
pub mod vad;
pub mod wire;

pub use config::{NodeLayout, load_layout, save_layout};
pub use engine::{Destination, Engine, Session};
pub use error::{Error, ErrorKind, Result};
pub use process::{MemoryImage, ProcessInfo, ProcessProvider, ReadMemory};
pub use vad::{Backing, FileName, Ownership, RegionFlags, RegionRecord, VadTable, VadType};
pub use wire::{ListHeader, RegionList};
