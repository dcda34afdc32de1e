use tracing::warn;

use crate::config::NodeLayout;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

pub fn load_layout<P: AsRef<Path>>(path: P) -> Result<NodeLayout> {
    let content = fs::read_to_string(&path)?;
    parse_layout(&content)
}

pub fn save_layout<P: AsRef<Path>>(path: P, layout: &NodeLayout) -> Result<()> {
    let content = format_layout(layout);
    fs::write(path, content)?;
    Ok(())
}

fn parse_layout(content: &str) -> Result<NodeLayout> {
    let mut layout = NodeLayout::default();
    let mut lines = content.lines();

    // First line is the target build
    if let Some(build) = lines.next() {
        layout.build = build.trim().to_string();
    }

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::LayoutParseError(format!(
                "Expected 'key = value', got '{}'",
                line
            )));
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        let parsed_value = parse_hex_value(value)?;

        let field = match key.as_str() {
            "processvadroot" => &mut layout.process_vad_root,
            "nodeleft" => &mut layout.node_left,
            "noderight" => &mut layout.node_right,
            "startingvpn" => &mut layout.starting_vpn,
            "endingvpn" => &mut layout.ending_vpn,
            "startingvpnhigh" => &mut layout.starting_vpn_high,
            "endingvpnhigh" => &mut layout.ending_vpn_high,
            "commitchargehigh" => &mut layout.commit_charge_high,
            "vadflags" => &mut layout.vad_flags,
            "vadflags1" => &mut layout.vad_flags1,
            "vadflags2" => &mut layout.vad_flags2,
            "subsection" => &mut layout.subsection,
            "nodesize" => &mut layout.node_size,
            "subsectioncontrolarea" => &mut layout.subsection_control_area,
            "controlareafilepointer" => &mut layout.control_area_file_pointer,
            "controlareacommittedpages" => &mut layout.control_area_committed_pages,
            "fileobjectname" => &mut layout.file_object_name,
            _ => {
                warn!("Unknown layout key: '{}' (value: {})", key, value);
                continue;
            }
        };
        *field = parsed_value;
    }

    if !layout.is_valid() {
        return Err(Error::LayoutParseError(format!(
            "Layout for '{}' places node fields outside nodeSize {:#x}",
            layout.build, layout.node_size
        )));
    }

    Ok(layout)
}

/// Parse a hexadecimal value with an optional `0x` prefix.
pub fn parse_hex_value(value: &str) -> Result<u64> {
    let value = value.trim();
    let value = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    u64::from_str_radix(value, 16)
        .map_err(|e| Error::LayoutParseError(format!("Failed to parse '{}': {}", value, e)))
}

fn format_layout(layout: &NodeLayout) -> String {
    let mut lines = Vec::new();

    lines.push(layout.build.clone());
    lines.push("# EPROCESS".to_string());
    lines.push(format!("processVadRoot = {:#x}", layout.process_vad_root));
    lines.push("# MMVAD".to_string());
    lines.push(format!("nodeLeft = {:#x}", layout.node_left));
    lines.push(format!("nodeRight = {:#x}", layout.node_right));
    lines.push(format!("startingVpn = {:#x}", layout.starting_vpn));
    lines.push(format!("endingVpn = {:#x}", layout.ending_vpn));
    lines.push(format!("startingVpnHigh = {:#x}", layout.starting_vpn_high));
    lines.push(format!("endingVpnHigh = {:#x}", layout.ending_vpn_high));
    lines.push(format!("commitChargeHigh = {:#x}", layout.commit_charge_high));
    lines.push(format!("vadFlags = {:#x}", layout.vad_flags));
    lines.push(format!("vadFlags1 = {:#x}", layout.vad_flags1));
    lines.push(format!("vadFlags2 = {:#x}", layout.vad_flags2));
    lines.push(format!("subsection = {:#x}", layout.subsection));
    lines.push(format!("nodeSize = {:#x}", layout.node_size));
    lines.push("# SUBSECTION / CONTROL_AREA / FILE_OBJECT".to_string());
    lines.push(format!(
        "subsectionControlArea = {:#x}",
        layout.subsection_control_area
    ));
    lines.push(format!(
        "controlAreaFilePointer = {:#x}",
        layout.control_area_file_pointer
    ));
    lines.push(format!(
        "controlAreaCommittedPages = {:#x}",
        layout.control_area_committed_pages
    ));
    lines.push(format!("fileObjectName = {:#x}", layout.file_object_name));

    lines.join("\n")
}
