use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::probe::ProbeMethod;
use crate::remote_file::RemoteFileOptions;
use crate::retry::RetryPolicy;
use crate::transport::TransportOptions;

/// Connection pool limits and timeouts (`[transport]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub max_idle_connections: usize,
    pub max_connections_per_host: usize,
    /// Seconds an idle connection is kept for reuse.
    pub idle_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Seconds without any response bytes before a request is aborted.
    pub response_timeout_secs: u64,
    /// Upper bound in seconds on one whole ranged read.
    pub read_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: 100,
            max_connections_per_host: 100,
            idle_timeout_secs: 15,
            connect_timeout_secs: 15,
            response_timeout_secs: 15,
            read_timeout_secs: 60,
        }
    }
}

impl TransportConfig {
    pub fn to_options(&self) -> TransportOptions {
        TransportOptions {
            max_idle_connections: self.max_idle_connections,
            max_connections_per_host: self.max_connections_per_host.max(1),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            response_timeout: Duration::from_secs(self.response_timeout_secs),
            request_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per read (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 5,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/httpmount/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Threads serving kernel read requests.
    pub worker_threads: usize,
    /// LRU block cache size in 128 KiB blocks; 0 disables the cache.
    pub cache_blocks: usize,
    pub probe_method: ProbeMethod,
    /// Let users other than the mounting user access the mount.
    pub allow_other: bool,
    /// Name of the file inside the mount; derived from the URL when unset.
    pub file_name: Option<String>,
    pub transport: TransportConfig,
    /// Optional retry policy; if missing, reads are not retried.
    pub retry: Option<RetryConfig>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            worker_threads: 16,
            cache_blocks: 0,
            probe_method: ProbeMethod::Head,
            allow_other: false,
            file_name: None,
            transport: TransportConfig::default(),
            retry: None,
        }
    }
}

impl MountConfig {
    /// Options for opening the remote file under this configuration.
    pub fn remote_file_options(&self) -> RemoteFileOptions {
        RemoteFileOptions {
            transport: self.transport.to_options(),
            probe_method: self.probe_method,
            retry: self.retry.as_ref().map(RetryConfig::to_policy),
            cache_blocks: self.cache_blocks,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("httpmount")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MountConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MountConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load an explicit config file; it must exist.
pub fn load_from(path: &Path) -> Result<MountConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: MountConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
