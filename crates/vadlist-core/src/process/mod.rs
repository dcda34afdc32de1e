mod bytes;
pub mod image;
pub mod provider;
mod reader;

// Mock memory reader for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use bytes::{ByteBuffer, ByteWriter, decode_utf16le, encode_utf16le};
pub use image::{ImageManifest, ImageProcess, MemoryImage};
pub use provider::{ProcessInfo, ProcessProvider};
pub use reader::ReadMemory;

// Re-export mock for convenient access in tests
#[doc(hidden)]
pub use mock::{MockMemoryBuilder, MockMemoryReader, MockProcess, MockProcessProvider};
