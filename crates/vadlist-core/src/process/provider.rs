//! Process provider abstraction for testability.
//!
//! This module provides traits that abstract process lookup and attachment,
//! enabling mock implementations for testing without a live kernel.

use crate::error::Result;
use crate::process::ReadMemory;

/// Trait for accessing process information.
///
/// This trait abstracts the properties of an attached process, allowing
/// mock implementations for testing.
pub trait ProcessInfo {
    /// Get the process ID.
    fn pid(&self) -> u32;

    /// Get the address of the kernel process object (EPROCESS).
    fn object_address(&self) -> u64;

    /// Check if the process is still running.
    fn is_alive(&self) -> bool;
}

/// Trait for finding and attaching to processes.
///
/// The attached process doubles as the memory view the walk reads through.
/// Dropping it releases the attachment.
pub trait ProcessProvider {
    /// The type of attached process returned by this provider.
    type Process: ProcessInfo + ReadMemory;

    /// Attach to a process by its PID.
    fn open_process(&self, pid: u32) -> Result<Self::Process>;
}

impl<T: ProcessProvider + ?Sized> ProcessProvider for &T {
    type Process = T::Process;

    fn open_process(&self, pid: u32) -> Result<Self::Process> {
        (**self).open_process(pid)
    }
}
