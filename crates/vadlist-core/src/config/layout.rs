//! Kernel structure offsets used to decode the VAD tree.
//!
//! The offsets are fixed for a given target build. The defaults describe
//! Windows 10 21H2 (19044) x64.
//!
//! # Structure Overview
//!
//! ```text
//! EPROCESS
//! 0x7D8    VadRoot            8       Root MMVAD of the process (RTL_AVL_TREE)
//!
//! MMVAD (MMVAD_SHORT is the first 0x40 bytes)
//! 0x00     Left               8       RTL_BALANCED_NODE children[0]
//! 0x08     Right              8       RTL_BALANCED_NODE children[1]
//! 0x18     StartingVpn        4       Low 32 bits of the first page
//! 0x1C     EndingVpn          4       Low 32 bits of the last page
//! 0x20     StartingVpnHigh    1       Bits 32..40 of the first page
//! 0x21     EndingVpnHigh      1       Bits 32..40 of the last page
//! 0x22     CommitChargeHigh   1       Bits 31..39 of the commit charge
//! 0x30     u.LongFlags        4       MMVAD_FLAGS
//! 0x34     u1.LongFlags1      4       MMVAD_FLAGS1
//! 0x40     u2.LongFlags2      4       MMVAD_FLAGS2
//! 0x48     Subsection         8       SUBSECTION for mapped views
//!
//! SUBSECTION
//! 0x00     ControlArea        8
//!
//! CONTROL_AREA
//! 0x40     FilePointer        8       EX_FAST_REF, low 4 bits are the ref count
//! 0x78     u3                 8       CommittedPageCount in the low 36 bits
//!
//! FILE_OBJECT
//! 0x58     FileName           16      UNICODE_STRING
//! ```

use serde::{Deserialize, Serialize};

/// Offsets of every field the decoder reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLayout {
    /// Target build the offsets were taken from.
    pub build: String,
    pub process_vad_root: u64,
    pub node_left: u64,
    pub node_right: u64,
    pub starting_vpn: u64,
    pub ending_vpn: u64,
    pub starting_vpn_high: u64,
    pub ending_vpn_high: u64,
    pub commit_charge_high: u64,
    pub vad_flags: u64,
    pub vad_flags1: u64,
    pub vad_flags2: u64,
    pub subsection: u64,
    /// Number of bytes read for one node.
    pub node_size: u64,
    pub subsection_control_area: u64,
    pub control_area_file_pointer: u64,
    pub control_area_committed_pages: u64,
    pub file_object_name: u64,
}

impl NodeLayout {
    pub const DEFAULT_BUILD: &'static str = "10.0.19044-x64";

    /// Check that every per-node field lies inside the node block.
    pub fn is_valid(&self) -> bool {
        let node_fields = [
            (self.node_left, 8),
            (self.node_right, 8),
            (self.starting_vpn, 4),
            (self.ending_vpn, 4),
            (self.starting_vpn_high, 1),
            (self.ending_vpn_high, 1),
            (self.commit_charge_high, 1),
            (self.vad_flags, 4),
            (self.vad_flags1, 4),
            (self.vad_flags2, 4),
            (self.subsection, 8),
        ];
        !self.build.is_empty()
            && self.node_size > 0
            && node_fields
                .iter()
                .all(|&(offset, width)| {
                    offset
                        .checked_add(width)
                        .is_some_and(|end| end <= self.node_size)
                })
    }
}

impl Default for NodeLayout {
    fn default() -> Self {
        Self {
            build: Self::DEFAULT_BUILD.to_string(),
            process_vad_root: 0x7D8,
            node_left: 0x00,
            node_right: 0x08,
            starting_vpn: 0x18,
            ending_vpn: 0x1C,
            starting_vpn_high: 0x20,
            ending_vpn_high: 0x21,
            commit_charge_high: 0x22,
            vad_flags: 0x30,
            vad_flags1: 0x34,
            vad_flags2: 0x40,
            subsection: 0x48,
            node_size: 0x50,
            subsection_control_area: 0x00,
            control_area_file_pointer: 0x40,
            control_area_committed_pages: 0x78,
            file_object_name: 0x58,
        }
    }
}
