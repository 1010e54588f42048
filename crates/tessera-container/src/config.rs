use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tessera_store::SyncMode;

use crate::error::{ContainerError, ContainerResult};

/// Options applied when a container is created or opened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
    /// Reject every mutation, including rebuild, with `Forbidden`.
    pub read_only: bool,
    pub sync_mode: SyncMode,
    /// Build the identity registry on open if the container has none.
    pub auto_rebuild: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            sync_mode: SyncMode::EveryWrite,
            auto_rebuild: true,
        }
    }
}

impl ContainerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> ContainerResult<Self> {
        toml::from_str(text).map_err(|e| ContainerError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> ContainerResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }
}
