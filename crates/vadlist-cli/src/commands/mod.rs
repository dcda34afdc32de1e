//! CLI command implementations.

pub mod layout;
pub mod list;
pub mod size;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use vadlist_core::{Engine, MemoryImage, NodeLayout, load_layout};

/// Load the memory image and pick the structure layout.
///
/// An explicit layout file wins; otherwise the default layout is used and a
/// build mismatch with the image is reported.
pub fn open_engine(image: &Path, layout: Option<&Path>) -> Result<Engine<MemoryImage>> {
    let image = MemoryImage::load(image)
        .with_context(|| format!("Failed to load memory image {}", image.display()))?;

    let layout = match layout {
        Some(path) => {
            let layout = load_layout(path)
                .with_context(|| format!("Failed to load layout {}", path.display()))?;
            info!("Loaded layout for {} from {}", layout.build, path.display());
            layout
        }
        None => {
            let layout = NodeLayout::default();
            if let Some(build) = image.build()
                && build != layout.build
            {
                warn!(
                    "Image was captured on {}, default layout is for {}",
                    build, layout.build
                );
            }
            layout
        }
    };

    Ok(Engine::with_layout(image, layout)?)
}
