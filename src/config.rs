use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/// Server settings, read once at startup and passed by reference from there;
/// nothing re-reads configuration while serving.
///
/// Defaults match the original deployment values: port 8080, a pool of 20
/// workers, a 5000ms socket idle timeout, and "www" as the content root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub poolsize: usize,
    /// Socket idle timeout in milliseconds.
    pub timeout: u64,
    /// Content root served by the default responder.
    pub directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            poolsize: 20,
            timeout: 5000,
            directory: PathBuf::from("www"),
        }
    }
}

impl Config {
    /// Load from `minnow.yaml`, or the file named by `MINNOW_CONFIG`.
    pub fn load() -> Self {
        let path =
            std::env::var("MINNOW_CONFIG").unwrap_or_else(|_| "minnow.yaml".to_string());
        Self::load_from(path)
    }

    /// Load from a specific file. A missing or malformed file logs a warning
    /// and falls back to the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_yaml::from_str(&text) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("Bad config file {}: {}; using defaults", path.display(), e);
                    Config::default()
                }
            },
            Err(_) => {
                warn!("Missing config file {}; using defaults", path.display());
                Config::default()
            }
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}
