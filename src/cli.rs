// Command line interface module
// Handles parsing of command line arguments

use crate::config::{DEFAULT_DEBOUNCE_MS, DEFAULT_RELOAD_GRACE_MS};
use crate::image_loader::is_image_file;
use anyhow::Result;
use clap::Parser;
use log::warn;
use std::path::PathBuf;

/// Longest accepted debounce or grace period
const MAX_DELAY_MS: u64 = 60_000;

/// refpin - A pinnable reference-image canvas with live reload
#[derive(Parser, Debug)]
#[command(name = "refpin")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image files to place on the canvas at startup
    #[arg(value_name = "IMAGE")]
    pub image_paths: Vec<PathBuf>,

    /// Start in pinned mode (always on top, borderless)
    #[arg(short, long)]
    pub pinned: bool,

    /// Ignore repeated change notifications for a file within this many milliseconds
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_MS, value_parser = parse_delay)]
    pub debounce_ms: u64,

    /// Wait this many milliseconds after a change before re-reading the file
    #[arg(long, default_value_t = DEFAULT_RELOAD_GRACE_MS, value_parser = parse_delay)]
    pub grace_ms: u64,

    /// Do not reload images when their files change
    #[arg(long)]
    pub no_watch: bool,
}

/// Parsed arguments with startup images filtered
#[derive(Debug)]
pub struct ParsedArgs {
    pub image_paths: Vec<PathBuf>,
    pub pinned: bool,
    pub debounce_ms: u64,
    pub grace_ms: u64,
    pub watch_files: bool,
    /// Stdin is a terminal, so prompt for commands
    pub interactive: bool,
}

/// Parse a delay in milliseconds and ensure it's within a sane range
fn parse_delay(s: &str) -> Result<u64, String> {
    let millis: u64 = s.parse().map_err(|_| "Invalid delay value")?;
    if millis > MAX_DELAY_MS {
        return Err(format!("Delay must be at most {} ms", MAX_DELAY_MS));
    }
    Ok(millis)
}

/// Keep only existing image files, warning about the rest
fn startup_images(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|path| {
            let keep = is_image_file(path) && path.is_file();
            if !keep {
                warn!("Ignoring {}: not an existing image file", path.display());
            }
            keep
        })
        .collect()
}

/// Parse command line arguments
pub fn parse_args() -> Result<ParsedArgs> {
    let args = Args::parse();
    Ok(resolve(args, atty::is(atty::Stream::Stdin)))
}

fn resolve(args: Args, interactive: bool) -> ParsedArgs {
    ParsedArgs {
        image_paths: startup_images(args.image_paths),
        pinned: args.pinned,
        debounce_ms: args.debounce_ms,
        grace_ms: args.grace_ms,
        watch_files: !args.no_watch,
        interactive,
    }
}
