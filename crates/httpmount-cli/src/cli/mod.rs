//! CLI for httpmount.

mod mount;

use anyhow::Result;
use clap::Parser;
use httpmount_core::config::{self, MountConfig};
use std::path::PathBuf;

/// Mount a file served over HTTP as a read-only local file.
#[derive(Debug, Parser)]
#[command(name = "httpmount")]
#[command(
    about = "httpmount: expose a remote HTTP file through a read-only FUSE mount",
    long_about = None
)]
pub struct Cli {
    /// HTTP/HTTPS URL of the file; the server must support byte ranges.
    #[arg(long, value_name = "URL")]
    pub url: String,

    /// Existing empty directory to mount on.
    #[arg(long, value_name = "PATH")]
    pub mount: PathBuf,

    /// Verbose logging, including FUSE traffic.
    #[arg(long)]
    pub debug: bool,

    /// Name of the file inside the mount (overrides file_name; default: taken from the URL).
    #[arg(long, value_name = "FILE")]
    pub name: Option<String>,

    /// Config file to use instead of ~/.config/httpmount/config.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Keep up to N 128 KiB blocks in memory (overrides cache_blocks).
    #[arg(long, value_name = "N")]
    pub cache_blocks: Option<usize>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let cfg = self.load_config()?;
        mount::run_mount(&self, cfg)
    }

    /// Config file contents with command-line overrides applied.
    pub fn load_config(&self) -> Result<MountConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?,
        };
        if let Some(blocks) = self.cache_blocks {
            cfg.cache_blocks = blocks;
        }
        if let Some(name) = &self.name {
            cfg.file_name = Some(name.clone());
        }
        Ok(cfg)
    }
}
