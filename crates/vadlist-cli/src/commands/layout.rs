//! Layout command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use vadlist_core::{NodeLayout, save_layout};

/// Run the layout command
pub fn run(output: &Path) -> Result<()> {
    let layout = NodeLayout::default();
    save_layout(output, &layout)
        .with_context(|| format!("Failed to write layout to {}", output.display()))?;
    println!("Layout for {} saved to {}", layout.build, output.display());
    Ok(())
}
