//! Service configuration

use crate::cli::Cli;
use cropguard_advisory::AdvisoryTable;
use cropguard_classifiers::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default upload limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Model artifact locations and inference settings
    #[serde(flatten)]
    pub model: ClassifierConfig,

    /// Extra advisory entries merged over the built-in table
    #[serde(default)]
    pub advisory_path: Option<PathBuf>,

    /// Largest accepted image upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &Path, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            info!("Loading configuration from {}", config_path.display());
            Self::from_yaml(&content)?
        } else {
            info!(
                "Config file {} not found, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_overrides(cli);
        Ok(config)
    }

    /// Parse from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Apply CLI overrides
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(weights) = &cli.weights {
            self.model.weights_path = Some(weights.clone());
        }

        if let Some(class_index) = &cli.class_index {
            self.model.class_index_path = Some(class_index.clone());
        }

        if let Some(device) = cli.device {
            self.model.device = device;
        }
    }

    /// Built-in advisory table with the configured overlay applied
    pub fn advisory_table(&self) -> cropguard_core::Result<AdvisoryTable> {
        let mut table = AdvisoryTable::builtin();
        if let Some(path) = &self.advisory_path {
            let overlay = AdvisoryTable::from_file(path)?;
            info!(
                "Merged {} advisory entries from {}",
                overlay.len(),
                path.display()
            );
            table.merge(overlay);
        }
        Ok(table)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: ClassifierConfig::default(),
            advisory_path: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}
