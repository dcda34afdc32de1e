//! Offline memory image backend.
//!
//! A memory image is a set of raw memory segments captured from a target
//! machine plus the process objects found in it, described by a JSON
//! manifest:
//!
//! ```json
//! {
//!   "build": "10.0.19044-x64",
//!   "processes": [{ "pid": 1234, "object": "0xffffa50c1d2e3080" }],
//!   "segments": [{ "base": "0xffffa50c1d2e0000", "file": "pool-0.bin" }]
//! }
//! ```
//!
//! Segment files are resolved relative to the manifest.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::process::{ProcessInfo, ProcessProvider, ReadMemory};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    pub processes: Vec<ProcessEntry>,
    pub segments: Vec<SegmentEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub pid: u32,
    #[serde(with = "hex_address")]
    pub object: u64,
    #[serde(default = "default_alive")]
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEntry {
    #[serde(with = "hex_address")]
    pub base: u64,
    pub file: PathBuf,
}

fn default_alive() -> bool {
    true
}

mod hex_address {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use crate::config::parse_hex_value;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_hex_value(&text).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone)]
struct Segment {
    base: u64,
    data: Vec<u8>,
}

impl Segment {
    fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }
}

/// Captured memory plus the processes it contains.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    build: Option<String>,
    processes: Vec<ProcessEntry>,
    segments: Arc<Vec<Segment>>,
}

impl MemoryImage {
    /// Create an empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an image from its JSON manifest.
    pub fn load<P: AsRef<Path>>(manifest_path: P) -> Result<Self> {
        let manifest_path = manifest_path.as_ref();
        let content = fs::read_to_string(manifest_path)?;
        let manifest: ImageManifest = serde_json::from_str(&content)?;
        let root = manifest_path.parent().unwrap_or_else(|| Path::new("."));

        let mut image = Self {
            build: manifest.build,
            processes: manifest.processes,
            segments: Arc::default(),
        };
        for entry in manifest.segments {
            let path = root.join(&entry.file);
            let data = fs::read(&path).map_err(|e| {
                Error::ImageError(format!("Failed to read segment {}: {}", path.display(), e))
            })?;
            debug!(
                "Loaded segment {} at {:#x} ({} bytes)",
                entry.file.display(),
                entry.base,
                data.len()
            );
            image = image.with_segment(entry.base, data)?;
        }

        Ok(image)
    }

    /// Target build recorded in the manifest, if any.
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into());
        self
    }

    pub fn with_process(mut self, pid: u32, object: u64) -> Self {
        self.processes.push(ProcessEntry {
            pid,
            object,
            alive: true,
        });
        self
    }

    /// Add a memory segment.
    ///
    /// # Errors
    ///
    /// Fails if the segment overlaps an existing one or wraps the address space.
    pub fn with_segment(mut self, base: u64, data: Vec<u8>) -> Result<Self> {
        let segment = Segment { base, data };
        if base.checked_add(segment.data.len() as u64).is_none() {
            return Err(Error::ImageError(format!(
                "Segment at {:#x} wraps the address space",
                base
            )));
        }
        if let Some(existing) = self
            .segments
            .iter()
            .find(|s| s.base < segment.end() && segment.base < s.end())
        {
            return Err(Error::ImageError(format!(
                "Segment at {:#x} overlaps segment at {:#x}",
                base, existing.base
            )));
        }

        let segments = Arc::make_mut(&mut self.segments);
        let index = segments.partition_point(|s| s.base < base);
        segments.insert(index, segment);
        Ok(self)
    }

    /// Processes listed in the image.
    pub fn processes(&self) -> &[ProcessEntry] {
        &self.processes
    }
}

fn read_segments(segments: &[Segment], address: u64, size: usize) -> Result<Vec<u8>> {
    let index = segments.partition_point(|s| s.end() <= address);
    let Some(segment) = segments.get(index).filter(|s| s.base <= address) else {
        return Err(Error::MemoryReadFailed {
            address,
            message: "Address not captured in image".to_string(),
        });
    };

    let offset = (address - segment.base) as usize;
    if offset.saturating_add(size) > segment.data.len() {
        return Err(Error::MemoryReadFailed {
            address,
            message: format!(
                "Read of {} bytes crosses segment end {:#x}",
                size,
                segment.end()
            ),
        });
    }
    Ok(segment.data[offset..offset + size].to_vec())
}

impl ReadMemory for MemoryImage {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        read_segments(&self.segments, address, size)
    }
}

/// A process attached inside a memory image.
#[derive(Debug, Clone)]
pub struct ImageProcess {
    pid: u32,
    object: u64,
    alive: bool,
    segments: Arc<Vec<Segment>>,
}

impl ProcessInfo for ImageProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn object_address(&self) -> u64 {
        self.object
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

impl ReadMemory for ImageProcess {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        read_segments(&self.segments, address, size)
    }
}

impl ProcessProvider for MemoryImage {
    type Process = ImageProcess;

    fn open_process(&self, pid: u32) -> Result<Self::Process> {
        let entry = self
            .processes
            .iter()
            .find(|p| p.pid == pid)
            .ok_or_else(|| Error::ProcessNotFound(format!("PID {} not present in image", pid)))?;

        Ok(ImageProcess {
            pid: entry.pid,
            object: entry.object,
            alive: entry.alive,
            segments: Arc::clone(&self.segments),
        })
    }
}
