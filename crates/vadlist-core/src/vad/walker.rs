//! Depth-first pre-order walk of a VAD tree.
//!
//! The walk uses an explicit work stack, so a degenerate tree of any height
//! is walked in full. Nodes that cannot be read are dropped together with
//! their subtree; the rest of the tree is still collected.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::NodeLayout;
use crate::error::Result;
use crate::process::ReadMemory;
use crate::vad::decoder::decode_node;
use crate::vad::table::{Side, VadTable};

struct Pending {
    address: u64,
    depth: u32,
    parent: Option<(usize, Side)>,
}

/// Walk the tree rooted at `root` and collect every readable node.
///
/// A null root yields an empty table.
///
/// # Errors
///
/// Unreadable nodes are skipped, not reported. Any other decode failure,
/// such as a layout whose offsets fall outside the node block, aborts the
/// walk.
pub fn walk<R: ReadMemory>(
    reader: &R,
    layout: &NodeLayout,
    process: u64,
    root: u64,
) -> Result<VadTable> {
    let mut table = VadTable::new(process);
    let mut visited = HashSet::new();
    let mut stack = Vec::new();

    if root != 0 {
        stack.push(Pending {
            address: root,
            depth: 0,
            parent: None,
        });
    }

    while let Some(item) = stack.pop() {
        if !visited.insert(item.address) {
            warn!("Skipping VAD {:#x}: already visited", item.address);
            table.note_skipped();
            continue;
        }

        let node = match decode_node(reader, layout, item.address, item.depth) {
            Ok(node) => node,
            Err(e) if e.is_unreadable() => {
                warn!("Skipping VAD {:#x} and its subtree: {}", item.address, e);
                table.note_skipped();
                continue;
            }
            Err(e) => return Err(e),
        };

        let index = table.push(node.record, item.parent);

        // Right first so the left subtree is popped first.
        if node.right != 0 {
            stack.push(Pending {
                address: node.right,
                depth: item.depth + 1,
                parent: Some((index, Side::Right)),
            });
        }
        if node.left != 0 {
            stack.push(Pending {
                address: node.left,
                depth: item.depth + 1,
                parent: Some((index, Side::Left)),
            });
        }
    }

    debug!(
        "Walked VAD tree of {:#x}: {} nodes, max depth {}, {} subtrees skipped",
        process,
        table.node_count(),
        table.max_depth(),
        table.skipped_subtrees()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::fixture::{NodeSpec, TreeFixture};

    fn walk_fixture(fixture: &TreeFixture, root: u64) -> VadTable {
        let process = fixture.process();
        walk(&process, fixture.layout(), fixture.object_address(), root).unwrap()
    }

    fn starts(table: &VadTable) -> Vec<u64> {
        table.records().map(|r| r.start_vpn).collect()
    }

    #[test]
    fn test_null_root_is_empty() {
        let fixture = TreeFixture::new();
        let table = walk_fixture(&fixture, 0);
        assert!(table.is_empty());
        assert_eq!(table.skipped_subtrees(), 0);
    }

    #[test]
    fn test_pre_order_left_before_right() {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(0x40, 0x41));
        let left = fixture.add_node(NodeSpec::private(0x20, 0x21));
        let left_left = fixture.add_node(NodeSpec::private(0x10, 0x11));
        let left_right = fixture.add_node(NodeSpec::private(0x30, 0x31));
        let right = fixture.add_node(NodeSpec::private(0x60, 0x61));
        fixture.set_left(root, left);
        fixture.set_right(root, right);
        fixture.set_left(left, left_left);
        fixture.set_right(left, left_right);

        let table = walk_fixture(&fixture, root);
        assert_eq!(starts(&table), vec![0x40, 0x20, 0x10, 0x30, 0x60]);
        let depths: Vec<u32> = table.records().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 1]);
        assert_eq!(table.max_depth(), 2);
    }

    #[test]
    fn test_child_depth_is_parent_plus_one() {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(0x40, 0x41));
        let right = fixture.add_node(NodeSpec::private(0x50, 0x51));
        let right_right = fixture.add_node(NodeSpec::private(0x60, 0x61));
        fixture.set_right(root, right);
        fixture.set_right(right, right_right);

        let table = walk_fixture(&fixture, root);
        for entry in table.entries() {
            match entry.parent {
                Some(parent) => assert_eq!(
                    entry.record.depth,
                    table.get(parent).unwrap().record.depth + 1
                ),
                None => assert_eq!(entry.record.depth, 0),
            }
        }
    }

    #[test]
    fn test_unreadable_subtree_is_skipped() {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(0x40, 0x41));
        let bad = fixture.add_node(NodeSpec::dangling_file_name(0x20, 0x21, 8));
        let hidden = fixture.add_node(NodeSpec::private(0x10, 0x11));
        let right = fixture.add_node(NodeSpec::private(0x60, 0x61));
        fixture.set_left(root, bad);
        fixture.set_left(bad, hidden);
        fixture.set_right(root, right);

        let table = walk_fixture(&fixture, root);
        assert_eq!(starts(&table), vec![0x40, 0x60]);
        assert_eq!(table.skipped_subtrees(), 1);
        assert_eq!(table.get(0).unwrap().left, None);
    }

    #[test]
    fn test_wild_child_pointer_is_skipped() {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(0x40, 0x41));
        fixture.set_left(root, 0xDEAD_0000);

        let table = walk_fixture(&fixture, root);
        assert_eq!(table.node_count(), 1);
        assert_eq!(table.skipped_subtrees(), 1);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(0x40, 0x41));
        let left = fixture.add_node(NodeSpec::private(0x20, 0x21));
        fixture.set_left(root, left);
        fixture.set_right(left, root);

        let table = walk_fixture(&fixture, root);
        assert_eq!(table.node_count(), 2);
        assert_eq!(table.skipped_subtrees(), 1);
    }

    #[test]
    fn test_skewed_chain_is_walked_in_full() {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(0, 1));
        let mut parent = root;
        for vpn in 1..100 {
            let child = fixture.add_node(NodeSpec::private(vpn, vpn + 1));
            fixture.set_right(parent, child);
            parent = child;
        }

        let table = walk_fixture(&fixture, root);
        assert_eq!(table.node_count(), 100);
        assert_eq!(table.max_depth(), 99);
        assert_eq!(table.skipped_subtrees(), 0);
        assert_eq!(starts(&table), (0..100).collect::<Vec<u64>>());
    }

    #[test]
    fn test_wild_control_area_pointer_is_skipped() {
        let mut fixture = TreeFixture::new();
        let root = fixture.add_node(NodeSpec::private(0x40, 0x41));
        let shared = fixture.add_node(NodeSpec::pagefile(0x20, 0x21, 4));
        let right = fixture.add_node(NodeSpec::private(0x60, 0x61));
        fixture.set_left(root, shared);
        fixture.set_right(root, right);

        let subsection = fixture
            .process()
            .read_u64(shared + fixture.layout().subsection)
            .unwrap();
        let control_area_slot = subsection + fixture.layout().subsection_control_area;
        fixture.write_u64(control_area_slot, 0xFFFF_FFFF_FFFF_FFF0);

        let table = walk_fixture(&fixture, root);
        assert_eq!(starts(&table), vec![0x40, 0x60]);
        assert_eq!(table.skipped_subtrees(), 1);
    }
}
