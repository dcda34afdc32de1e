//! Byte layout of a flattened region list.
//!
//! ```text
//! Header (56 bytes)
//! 0x00 u64 size            header + envelopes + names
//! 0x08 u32 max_depth
//! 0x0C u32 node_count
//! 0x10 u64 total_private_commit
//! 0x18 u64 total_shared_commit
//! 0x20 u64 process
//! 0x28 u64 first           rebased link, 0 if empty
//! 0x30 u64 last            rebased link, 0 if empty
//!
//! Envelope (88 bytes), followed by name_len bytes of UTF-16LE
//! 0x00 u64 next
//! 0x08 u64 prev
//! 0x10 u64 entry_size      ENTRY_SIZE + name_len
//! 0x18 u64 identity
//! 0x20 u32 depth
//! 0x24 u32 backing kind    0 private, 1 file, 2 pagefile
//! 0x28 u64 start_vpn
//! 0x30 u64 end_vpn
//! 0x38 u64 commit_charge
//! 0x40 u64 committed_pages
//! 0x48 u32 vad
//! 0x4C u32 vad1
//! 0x50 u32 vad2
//! 0x54 u32 name_len
//! ```
//!
//! All fields are little-endian. Envelopes are packed with no padding.

/// Null link sentinel.
pub const NULL_LINK: u64 = 0;

pub const HEADER_SIZE: usize = 56;
pub const ENTRY_SIZE: usize = 88;

pub mod header {
    pub const SIZE: usize = 0x00;
    pub const MAX_DEPTH: usize = 0x08;
    pub const NODE_COUNT: usize = 0x0C;
    pub const TOTAL_PRIVATE_COMMIT: usize = 0x10;
    pub const TOTAL_SHARED_COMMIT: usize = 0x18;
    pub const PROCESS: usize = 0x20;
    pub const FIRST: usize = 0x28;
    pub const LAST: usize = 0x30;
}

pub mod entry {
    pub const NEXT: usize = 0x00;
    pub const PREV: usize = 0x08;
    pub const ENTRY_SIZE: usize = 0x10;
    pub const IDENTITY: usize = 0x18;
    pub const DEPTH: usize = 0x20;
    pub const BACKING_KIND: usize = 0x24;
    pub const START_VPN: usize = 0x28;
    pub const END_VPN: usize = 0x30;
    pub const COMMIT_CHARGE: usize = 0x38;
    pub const COMMITTED_PAGES: usize = 0x40;
    pub const VAD: usize = 0x48;
    pub const VAD1: usize = 0x4C;
    pub const VAD2: usize = 0x50;
    pub const NAME_LEN: usize = 0x54;
}
