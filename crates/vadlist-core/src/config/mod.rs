//! Configuration and support files.
//!
//! This module contains:
//! - `NodeLayout` - kernel structure offsets for the target build
//! - Layout file loading and saving
//! - Process and file name limits

mod layout;
mod loader;

pub use layout::*;
pub use loader::*;

/// Granularity the serialized region list is rounded up to.
pub const PAGE_SIZE: u64 = 0x1000;

/// Process identity policy.
///
/// PIDs are multiples of 4 on the target; 0 (idle) and 4 (system) are reserved.
pub mod process {
    /// Highest reserved process ID.
    pub const SYSTEM_PROCESS_ID: u32 = 4;

    /// Process IDs are always a multiple of this value.
    pub const PROCESS_ID_ALIGNMENT: u32 = 4;

    /// Check whether a PID is plausible for a user process.
    pub fn is_valid_process_id(pid: u32) -> bool {
        pid > SYSTEM_PROCESS_ID && pid % PROCESS_ID_ALIGNMENT == 0
    }
}

/// Backing file name limits.
pub mod names {
    /// `UNICODE_STRING::Length` is a u16, so no name can exceed this.
    pub const MAX_FILE_NAME_BYTES: usize = u16::MAX as usize & !1;

    /// Width of the UTF-16 terminator reserved after each name.
    pub const NAME_TERMINATOR_SIZE: u64 = 2;
}
