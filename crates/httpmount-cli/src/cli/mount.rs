use anyhow::{Context, Result};
use httpmount_core::config::MountConfig;
use httpmount_core::fs::{self, HttpMountFs, MountTree};

use super::Cli;

/// Probe the origin, then serve the mount until it is unmounted.
pub(super) fn run_mount(cli: &Cli, cfg: MountConfig) -> Result<()> {
    fs::check_mountpoint(&cli.mount)?;

    let mut tree = MountTree::new(
        cli.url.clone(),
        cfg.file_name.clone(),
        cfg.remote_file_options(),
    );
    // Probe before mounting so an unusable origin never leaves a dead mount behind.
    let node = tree
        .attach()
        .with_context(|| format!("probing {}", cli.url))?;
    tracing::info!(
        name = %node.name,
        size = node.file.size(),
        mountpoint = %cli.mount.display(),
        "mounting"
    );

    let filesystem = HttpMountFs::new(tree, cfg.worker_threads.max(1));
    fs::mount(filesystem, &cli.mount, cfg.allow_other)
        .with_context(|| format!("mounting on {}", cli.mount.display()))?;

    tracing::info!("unmounted {}", cli.mount.display());
    Ok(())
}
