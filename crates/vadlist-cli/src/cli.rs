//! CLI argument definitions for vadlist.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vadlist")]
#[command(about = "Process VAD tree lister", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Report the buffer size a region list needs
    Size {
        /// Memory image manifest (JSON)
        #[arg(long, value_name = "FILE", env = "VADLIST_IMAGE")]
        image: PathBuf,
        /// Process ID
        #[arg(long)]
        pid: u32,
        /// Load structure offsets from file
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,
    },
    /// List the VAD tree of a process
    List {
        /// Memory image manifest (JSON)
        #[arg(long, value_name = "FILE", env = "VADLIST_IMAGE")]
        image: PathBuf,
        /// Process ID
        #[arg(long)]
        pid: u32,
        /// Load structure offsets from file
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the default structure offsets to a file
    Layout {
        /// Output file path
        #[arg(short, long, default_value = "layout.txt")]
        output: PathBuf,
    },
}
