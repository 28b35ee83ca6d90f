/// Config file loading and creation for the pickrank CLI.
///
/// Config lives at ~/.config/pickrank/config.toml.
/// All fields are optional; CLI flags override config values.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bail;

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct PickrankConfig {
    pub data_dir: Option<PathBuf>,
    pub namespace: Option<String>,
    pub top_k: Option<usize>,
    pub shuffle: Option<bool>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# pickrank configuration
# All values here can be overridden by CLI flags.

# Where session state is kept (one JSON file per key)
# data_dir = \"/home/me/.local/share/pickrank\"

# Session namespace; use different ones to keep separate rankings
# namespace = \"ranking\"

# Only rank the best K items. 0 or absent ranks everything.
# top_k = 10

# Shuffle items before each run
# shuffle = false
";

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| bail("HOME environment variable not set"));
    PathBuf::from(home)
}

/// Returns the default config path: ~/.config/pickrank/config.toml
pub fn config_path() -> PathBuf {
    home_dir().join(".config").join("pickrank").join("config.toml")
}

/// Default data directory: $XDG_DATA_HOME/pickrank, else ~/.local/share/pickrank
pub fn default_data_dir() -> PathBuf {
    match std::env::var_os("XDG_DATA_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir).join("pickrank"),
        _ => home_dir().join(".local").join("share").join("pickrank"),
    }
}

pub fn parse_config(content: &str) -> Result<PickrankConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> PickrankConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content)
            .unwrap_or_else(|e| bail(format!("Failed to parse config at {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config at {}, using defaults", path.display());
            PickrankConfig::default()
        }
        Err(e) => bail(format!("Failed to read config at {}: {e}", path.display())),
    }
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config(path: &Path) -> PathBuf {
    if path.exists() {
        bail(format!("Config file already exists at {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| bail(format!("Failed to create directory {}: {e}", parent.display())));
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write config to {}: {e}", path.display())));

    path.to_path_buf()
}
