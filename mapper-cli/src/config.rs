use std::fs;
use std::path::Path;

use anyhow::Context;
use mapper_core::{BundleType, MapperConfig};
use serde::Deserialize;

/// `--config` file contents; absent fields keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub pretty_print: Option<bool>,
    #[serde(default)]
    pub skip_malformed_records: Option<bool>,
    #[serde(default)]
    pub bundle_type: Option<BundleType>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}

impl From<FileConfig> for MapperConfig {
    fn from(cfg: FileConfig) -> Self {
        let mut base = MapperConfig::default();
        if let Some(pretty) = cfg.pretty_print {
            base.pretty_print = pretty;
        }
        if let Some(skip) = cfg.skip_malformed_records {
            base.skip_malformed_records = skip;
        }
        if let Some(bundle_type) = cfg.bundle_type {
            base.bundle_type = bundle_type;
        }
        base
    }
}
