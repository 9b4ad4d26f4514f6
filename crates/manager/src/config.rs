//! Manager configuration

use anyhow::{Context, Result};
use head_client::HeadConfig;
use serde::Deserialize;
use std::path::Path;

/// Head manager configuration, loaded from a JSON file
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    pub head: HeadConfig,
}

impl ManagerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))
    }
}
