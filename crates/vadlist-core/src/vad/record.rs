use serde::{Serialize, Serializer};

use crate::process::{decode_utf16le, encode_utf16le};
use crate::vad::flags::{Ownership, RegionFlags};

/// Backing file name as raw UTF-16LE bytes.
///
/// The bytes are kept as read so the name survives serialization unchanged,
/// even when it is not valid UTF-16.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FileName {
    bytes: Vec<u8>,
}

impl FileName {
    /// Wrap raw UTF-16LE bytes; a trailing odd byte is dropped.
    pub fn from_utf16le(mut bytes: Vec<u8>) -> Self {
        bytes.truncate(bytes.len() & !1);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the name in bytes, without terminator.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_string_lossy(&self) -> String {
        decode_utf16le(&self.bytes)
    }
}

impl From<&str> for FileName {
    fn from(name: &str) -> Self {
        Self {
            bytes: encode_utf16le(name),
        }
    }
}

impl std::fmt::Display for FileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}

impl Serialize for FileName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

/// What stands behind a region's pages.
///
/// A shared region carries either a file name or a pagefile commit count,
/// never both; a private region carries neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backing {
    #[default]
    Private,
    File { name: FileName },
    Pagefile { committed_pages: u64 },
}

impl Backing {
    /// Wire tag for this variant.
    pub fn kind_code(&self) -> u32 {
        match self {
            Backing::Private => 0,
            Backing::File { .. } => 1,
            Backing::Pagefile { .. } => 2,
        }
    }
}

/// Decoded, address-space-independent description of one tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionRecord {
    /// Address of the source node. Display only, never dereferenced.
    pub identity: u64,
    pub depth: u32,
    pub start_vpn: u64,
    /// Exclusive end page.
    pub end_vpn: u64,
    pub flags: RegionFlags,
    pub commit_charge: u64,
    pub backing: Backing,
}

impl RegionRecord {
    pub fn ownership(&self) -> Ownership {
        self.flags.ownership()
    }

    pub fn page_count(&self) -> u64 {
        self.end_vpn.saturating_sub(self.start_vpn)
    }

    pub fn backing_file(&self) -> Option<&FileName> {
        match &self.backing {
            Backing::File { name } => Some(name),
            _ => None,
        }
    }

    pub fn shared_commit_pages(&self) -> Option<u64> {
        match self.backing {
            Backing::Pagefile { committed_pages } => Some(committed_pages),
            _ => None,
        }
    }

    /// Bytes the name payload occupies on the wire.
    pub fn file_name_len(&self) -> usize {
        self.backing_file().map_or(0, FileName::byte_len)
    }
}
