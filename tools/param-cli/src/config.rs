//! param.toml editor configuration
//!
//! Every section is optional; a missing file means all defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when no config is given
pub const DEFAULT_CONFIG_FILE: &str = "param.toml";

/// param.toml structure
#[derive(Debug, Default, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub schema: SchemaSection,
    #[serde(default)]
    pub save: SaveSection,
    #[serde(default)]
    pub display: DisplaySection,

    /// Directory the config was loaded from; relative paths resolve against it
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Schema location
#[derive(Debug, Default, Deserialize)]
pub struct SchemaSection {
    /// Path to the schema TOML file
    pub path: Option<PathBuf>,
}

/// Save behaviour
#[derive(Debug, Deserialize)]
pub struct SaveSection {
    /// Copy the original to `<file>.bak` before overwriting it in place.
    /// Default: true
    #[serde(default = "default_backup")]
    pub backup: bool,
}

impl Default for SaveSection {
    fn default() -> Self {
        Self {
            backup: default_backup(),
        }
    }
}

/// Output formatting
#[derive(Debug, Deserialize)]
pub struct DisplaySection {
    /// Bytes per row in hex dumps.
    /// Default: 16
    #[serde(default = "default_hex_columns")]
    pub hex_columns: usize,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            hex_columns: default_hex_columns(),
        }
    }
}

fn default_backup() -> bool {
    true
}

fn default_hex_columns() -> usize {
    16
}

impl EditorConfig {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Parse config from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Load `explicit` if given, else `param.toml` in `dir` if it exists, else defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!("Using config {}", candidate.display());
            return Self::load(&candidate);
        }
        Ok(Self::default())
    }

    /// Schema file to use: the override if given, else the configured path
    pub fn schema_path(&self, override_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = override_path {
            return Some(path.to_path_buf());
        }
        self.schema.path.as_ref().map(|p| self.base_dir.join(p))
    }
}
