//! Size command implementation.

use std::path::Path;

use anyhow::Result;

/// Run the size command
pub fn run(image: &Path, pid: u32, layout: Option<&Path>) -> Result<()> {
    let engine = super::open_engine(image, layout)?;
    let session = engine.query_size(pid)?;

    println!("Required size: {} bytes", session.required_size());
    if let Some(table) = session.table() {
        println!("Total VADs   : {}", table.node_count());
        println!("Maximum depth: {}", table.max_depth());
        if table.skipped_subtrees() > 0 {
            println!("Skipped trees: {}", table.skipped_subtrees());
        }
    }

    Ok(())
}
