mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("vadlist=info".parse()?)
                .add_directive("vadlist_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Size { image, pid, layout } => {
            commands::size::run(&image, pid, layout.as_deref())
        }
        Command::List {
            image,
            pid,
            layout,
            json,
        } => commands::list::run(&image, pid, layout.as_deref(), json),
        Command::Layout { output } => commands::layout::run(&output),
    }
}
