//! CLI argument parsing tests.
//!
//! These tests verify that command-line arguments are parsed correctly
//! without actually executing the commands (which would require a memory image).

use std::path::PathBuf;

use clap::Parser;

// Re-create Args structure for testing since it's not publicly exported
#[derive(Parser)]
#[command(name = "vadlist")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    Size {
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
        #[arg(long)]
        pid: u32,
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,
    },
    List {
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
        #[arg(long)]
        pid: u32,
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    Layout {
        #[arg(short, long, default_value = "layout.txt")]
        output: PathBuf,
    },
}

#[test]
fn test_parse_no_args_fails() {
    assert!(Args::try_parse_from(["vadlist"]).is_err());
}

#[test]
fn test_parse_size() {
    let args =
        Args::try_parse_from(["vadlist", "size", "--image", "image.json", "--pid", "1236"])
            .unwrap();
    match args.command {
        Command::Size { image, pid, layout } => {
            assert_eq!(image, PathBuf::from("image.json"));
            assert_eq!(pid, 1236);
            assert!(layout.is_none());
        }
        _ => panic!("Expected Size command"),
    }
}

#[test]
fn test_parse_size_requires_pid() {
    assert!(Args::try_parse_from(["vadlist", "size", "--image", "image.json"]).is_err());
}

#[test]
fn test_parse_list_with_json_and_layout() {
    let args = Args::try_parse_from([
        "vadlist",
        "list",
        "--image",
        "image.json",
        "--pid",
        "8",
        "--layout",
        "win11.txt",
        "--json",
    ])
    .unwrap();
    match args.command {
        Command::List {
            pid, layout, json, ..
        } => {
            assert_eq!(pid, 8);
            assert_eq!(layout, Some(PathBuf::from("win11.txt")));
            assert!(json);
        }
        _ => panic!("Expected List command"),
    }
}

#[test]
fn test_parse_list_rejects_negative_pid() {
    assert!(
        Args::try_parse_from(["vadlist", "list", "--image", "i.json", "--pid", "-4"]).is_err()
    );
}

#[test]
fn test_parse_layout_default_output() {
    let args = Args::try_parse_from(["vadlist", "layout"]).unwrap();
    match args.command {
        Command::Layout { output } => assert_eq!(output, PathBuf::from("layout.txt")),
        _ => panic!("Expected Layout command"),
    }
}

#[test]
fn test_parse_layout_with_output() {
    let args = Args::try_parse_from(["vadlist", "layout", "-o", "custom.txt"]).unwrap();
    match args.command {
        Command::Layout { output } => assert_eq!(output, PathBuf::from("custom.txt")),
        _ => panic!("Expected Layout command"),
    }
}
