//! Synthetic VAD trees laid out in mock memory.
//!
//! Used by unit and integration tests to build process objects, VAD nodes
//! and their section objects at the offsets of a `NodeLayout`.

use crate::config::NodeLayout;
use crate::process::{MockMemoryBuilder, MockProcess, MockProcessProvider, encode_utf16le};
use crate::vad::flags::{RegionFlags, VadType};

/// Kernel-looking base address of the fixture memory.
pub const FIXTURE_BASE: u64 = 0xFFFF_A000_0000_0000;

/// First byte after the process object.
const HEAP_START: u64 = 0x1000;

/// Allocation granularity inside the fixture.
const SLOT: u64 = 0x10;

#[derive(Debug, Clone)]
enum BackingSpec {
    Private,
    File(String),
    Pagefile(u64),
    NoSubsection,
    DanglingName(u16),
}

/// Description of one node to lay out.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    start_vpn: u64,
    end_vpn: u64,
    vad_type: VadType,
    protection: u8,
    commit: u64,
    backing: BackingSpec,
}

impl NodeSpec {
    fn new(start_vpn: u64, end_vpn: u64, backing: BackingSpec) -> Self {
        Self {
            start_vpn,
            end_vpn,
            vad_type: VadType::None,
            protection: 4,
            commit: 0,
            backing,
        }
    }

    /// Private region covering pages `[start_vpn, end_vpn)`.
    pub fn private(start_vpn: u64, end_vpn: u64) -> Self {
        Self::new(start_vpn, end_vpn, BackingSpec::Private)
    }

    /// Mapped view of a named file.
    pub fn mapped_file(start_vpn: u64, end_vpn: u64, name: &str) -> Self {
        Self::new(start_vpn, end_vpn, BackingSpec::File(name.to_string()))
    }

    /// Pagefile-backed section view.
    pub fn pagefile(start_vpn: u64, end_vpn: u64, committed_pages: u64) -> Self {
        Self::new(start_vpn, end_vpn, BackingSpec::Pagefile(committed_pages))
    }

    /// Shared region with no subsection at all.
    pub fn shared_anonymous(start_vpn: u64, end_vpn: u64) -> Self {
        Self::new(start_vpn, end_vpn, BackingSpec::NoSubsection)
    }

    /// Mapped file whose name buffer points at unreadable memory.
    pub fn dangling_file_name(start_vpn: u64, end_vpn: u64, name_len: u16) -> Self {
        Self::new(start_vpn, end_vpn, BackingSpec::DanglingName(name_len))
    }

    pub fn commit(mut self, commit: u64) -> Self {
        self.commit = commit;
        self
    }

    pub fn vad_type(mut self, vad_type: VadType) -> Self {
        self.vad_type = vad_type;
        self
    }

    pub fn protection(mut self, protection: u8) -> Self {
        self.protection = protection;
        self
    }
}

/// Builder for a process object and its VAD tree in mock memory.
#[derive(Debug, Clone)]
pub struct TreeFixture {
    layout: NodeLayout,
    memory: MockMemoryBuilder,
    next: u64,
    pid: u32,
}

impl Default for TreeFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeFixture {
    pub const PID: u32 = 1236;

    pub fn new() -> Self {
        Self::with_layout(NodeLayout::default())
    }

    pub fn with_layout(layout: NodeLayout) -> Self {
        Self {
            layout,
            memory: MockMemoryBuilder::new()
                .base(FIXTURE_BASE)
                .with_size(HEAP_START as usize),
            next: FIXTURE_BASE + HEAP_START,
            pid: Self::PID,
        }
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Address of the process object.
    pub fn object_address(&self) -> u64 {
        FIXTURE_BASE
    }

    /// Lay out a node and return its address.
    pub fn add_node(&mut self, spec: NodeSpec) -> u64 {
        let node = self.alloc(self.layout.node_size);
        let last_vpn = spec.end_vpn - 1;
        let private = matches!(spec.backing, BackingSpec::Private);
        let vad = RegionFlags::compose_vad(spec.vad_type, spec.protection, private);
        let vad1 = (spec.commit & u64::from(RegionFlags::COMMIT_CHARGE_MASK)) as u32;

        let layout = self.layout.clone();
        self.write_u32(node + layout.starting_vpn, spec.start_vpn as u32);
        self.write_u8(node + layout.starting_vpn_high, (spec.start_vpn >> 32) as u8);
        self.write_u32(node + layout.ending_vpn, last_vpn as u32);
        self.write_u8(node + layout.ending_vpn_high, (last_vpn >> 32) as u8);
        self.write_u8(node + layout.commit_charge_high, (spec.commit >> 31) as u8);
        self.write_u32(node + layout.vad_flags, vad);
        self.write_u32(node + layout.vad_flags1, vad1);

        let subsection = match spec.backing {
            BackingSpec::Private | BackingSpec::NoSubsection => 0,
            BackingSpec::File(name) => {
                let name = encode_utf16le(&name);
                let buffer = self.alloc(name.len() as u64);
                self.write_bytes(buffer, &name);
                self.section_with_file(name.len() as u16, buffer)
            }
            BackingSpec::DanglingName(len) => self.section_with_file(len, 0x10),
            BackingSpec::Pagefile(pages) => {
                let (subsection, control_area) = self.section();
                // Bits above the 36-bit count belong to other union members.
                self.write_u64(
                    control_area + layout.control_area_committed_pages,
                    pages | (1 << 40),
                );
                subsection
            }
        };
        self.write_u64(node + layout.subsection, subsection);

        node
    }

    pub fn set_left(&mut self, parent: u64, child: u64) {
        let offset = self.layout.node_left;
        self.write_u64(parent + offset, child);
    }

    pub fn set_right(&mut self, parent: u64, child: u64) {
        let offset = self.layout.node_right;
        self.write_u64(parent + offset, child);
    }

    /// Make `root` the process's VAD root.
    pub fn set_root(&mut self, root: u64) {
        let offset = self.layout.process_vad_root;
        self.write_u64(FIXTURE_BASE + offset, root);
    }

    /// Attached process view of the fixture memory.
    pub fn process(&self) -> MockProcess {
        MockProcess {
            pid: self.pid,
            object_address: FIXTURE_BASE,
            alive: true,
            memory: self.memory.clone().build(),
        }
    }

    pub fn provider(&self) -> MockProcessProvider {
        MockProcessProvider::new().with_process(self.process())
    }

    fn section(&mut self) -> (u64, u64) {
        let subsection = self.alloc(0x10);
        let control_area = self.alloc(0x80);
        let offset = self.layout.subsection_control_area;
        self.write_u64(subsection + offset, control_area);
        (subsection, control_area)
    }

    fn section_with_file(&mut self, name_len: u16, buffer: u64) -> u64 {
        let (subsection, control_area) = self.section();
        let file_object = self.alloc(self.layout.file_object_name + 0x10);
        // Low bits of the fast reference carry a reference count.
        self.write_u64(
            control_area + self.layout.control_area_file_pointer,
            file_object | 0x3,
        );
        let name = file_object + self.layout.file_object_name;
        self.write_u16(name, name_len);
        self.write_u16(name + 2, name_len);
        self.write_u64(name + 8, buffer);
        subsection
    }

    fn alloc(&mut self, size: u64) -> u64 {
        let address = self.next;
        self.next += size.div_ceil(SLOT).max(1) * SLOT;
        self.memory = std::mem::take(&mut self.memory)
            .base(FIXTURE_BASE)
            .with_size((self.next - FIXTURE_BASE) as usize);
        address
    }

    fn offset(address: u64) -> usize {
        (address - FIXTURE_BASE) as usize
    }

    fn write_u8(&mut self, address: u64, value: u8) {
        self.memory = std::mem::take(&mut self.memory).write_u8(Self::offset(address), value);
    }

    fn write_u16(&mut self, address: u64, value: u16) {
        self.memory = std::mem::take(&mut self.memory).write_u16(Self::offset(address), value);
    }

    fn write_u32(&mut self, address: u64, value: u32) {
        self.memory = std::mem::take(&mut self.memory).write_u32(Self::offset(address), value);
    }

    /// Overwrite a pointer-sized value, e.g. to corrupt a link.
    pub fn write_u64(&mut self, address: u64, value: u64) {
        self.memory = std::mem::take(&mut self.memory).write_u64(Self::offset(address), value);
    }

    fn write_bytes(&mut self, address: u64, bytes: &[u8]) {
        self.memory = std::mem::take(&mut self.memory).write_bytes(Self::offset(address), bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ReadMemory;

    #[test]
    fn test_nodes_do_not_overlap() {
        let mut fixture = TreeFixture::new();
        let a = fixture.add_node(NodeSpec::private(1, 2));
        let b = fixture.add_node(NodeSpec::private(3, 4));

        assert!(b >= a + fixture.layout().node_size);
    }

    #[test]
    fn test_root_pointer_written() {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(1, 2));
        fixture.set_root(root);

        let process = fixture.process();
        let stored = process
            .read_u64(fixture.object_address() + fixture.layout().process_vad_root)
            .unwrap();
        assert_eq!(stored, root);
    }
}
