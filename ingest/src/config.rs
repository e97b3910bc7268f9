/*!
Configuration for the ingest pipeline.
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// UDP bind address (no port).
    pub udp_bind_addr: String,

    /// UDP port to listen on.
    pub udp_port: u16,

    /// Directory used for control files and the `.img` rendezvous point.
    /// Typically a ramdisk mount.
    pub ramdisk_dir: PathBuf,

    /// Capacity of each of the two Ingestor -> worker channels, in
    /// datagrams.
    pub channel_capacity: usize,

    /// Receive-buffer hint set on the UDP socket, in bytes.
    pub recv_buffer_bytes: usize,

    /// Receive timeout, in seconds, used to re-poll the shutdown signal
    /// between datagrams.
    pub recv_timeout_secs: u64,

    /// Path (or bare name, resolved via `PATH`) of the downstream PNG
    /// renderer invoked after every flushed `.img` file.
    pub renderer_path: String,
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "failed to parse config file as TOML")?;

        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).with_context(|| "failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            udp_bind_addr: "0.0.0.0".to_string(),
            udp_port: 50000,
            ramdisk_dir: PathBuf::from("/dev/shm/photon-ingest"),
            channel_capacity: 4096,
            recv_buffer_bytes: 32 * 1024 * 1024,
            recv_timeout_secs: 3,
            renderer_path: "Bin2PNG".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn config_roundtrip() {
        let original = AppConfig::new();

        let temp_file = NamedTempFile::new().unwrap();
        original.save_to_file(temp_file.path()).unwrap();
        let loaded = AppConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(format!("{:?}", original), format!("{:?}", loaded));
    }

    #[test]
    fn default_values() {
        let config = AppConfig::new();

        assert_eq!(config.udp_bind_addr, "0.0.0.0");
        assert_eq!(config.udp_port, 50000);
        assert_eq!(config.channel_capacity, 4096);
        assert_eq!(config.recv_buffer_bytes, 32 * 1024 * 1024);
        assert_eq!(config.recv_timeout_secs, 3);
        assert_eq!(config.renderer_path, "Bin2PNG");
    }
}
