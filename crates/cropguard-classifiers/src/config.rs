//! Configuration for locating and loading the classifier

use crate::locator::ModelLocator;
use crate::{DeviceType, ModelConfig, ModelFormat};
use cropguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default number of ranked predictions returned with each result
pub const DEFAULT_TOP_K: usize = 3;

/// Classifier settings, usually read from the `model` part of a YAML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Root the standard artifact layouts are resolved against
    /// (defaults to the working directory)
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Explicit weights file, searched before the standard layouts
    #[serde(default)]
    pub weights_path: Option<PathBuf>,

    /// Explicit class-index file, searched before the standard layouts
    #[serde(default)]
    pub class_index_path: Option<PathBuf>,

    /// Weights file format
    #[serde(default)]
    pub weights_format: ModelFormatSpec,

    /// Device to run inference on
    #[serde(default)]
    pub device: DeviceSpec,

    /// Number of ranked predictions to report
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Device specification, written as `auto`, `cpu`, `cuda[:N]` or `metal[:N]`
/// in config files and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceSpec {
    #[default]
    Auto,
    Cpu,
    Cuda { index: Option<usize> },
    Metal { index: Option<usize> },
}

/// Model format specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormatSpec {
    #[default]
    Auto,
    SafeTensors,
    PyTorch,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            project_root: None,
            weights_path: None,
            class_index_path: None,
            weights_format: ModelFormatSpec::Auto,
            device: DeviceSpec::Auto,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl ClassifierConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Invalid classifier configuration: {}", e)))
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Root directory for the standard layouts
    pub fn project_root(&self) -> PathBuf {
        self.project_root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Locator over the standard layouts plus any explicit paths
    pub fn locator(&self) -> ModelLocator {
        let mut locator = ModelLocator::with_defaults(self.project_root());
        if let Some(path) = &self.weights_path {
            locator = locator.with_weights_override(path);
        }
        if let Some(path) = &self.class_index_path {
            locator = locator.with_class_index_override(path);
        }
        locator
    }

    /// Convert to ModelConfig for loading the given weights file
    pub fn to_model_config(&self, weights_path: impl Into<PathBuf>) -> ModelConfig {
        ModelConfig::from_local(weights_path)
            .with_device(self.device.to_device_type())
            .with_format(self.weights_format.to_model_format())
    }
}

impl DeviceSpec {
    /// Convert to DeviceType
    pub fn to_device_type(&self) -> DeviceType {
        match self {
            DeviceSpec::Auto => DeviceType::Auto,
            DeviceSpec::Cpu => DeviceType::Cpu,
            DeviceSpec::Cuda { index } => DeviceType::Cuda(index.unwrap_or(0)),
            DeviceSpec::Metal { index } => DeviceType::Metal(index.unwrap_or(0)),
        }
    }
}

/// Parses `auto`, `cpu`, `cuda`, `cuda:1`, `metal`, `metal:0`
impl FromStr for DeviceSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, index) = match s.split_once(':') {
            Some((kind, index)) => {
                let index = index
                    .parse::<usize>()
                    .map_err(|_| Error::config(format!("Invalid device index in '{}'", s)))?;
                (kind, Some(index))
            }
            None => (s.as_str(), None),
        };

        match (kind, index) {
            ("auto", None) => Ok(Self::Auto),
            ("cpu", None) => Ok(Self::Cpu),
            ("cuda", index) => Ok(Self::Cuda { index }),
            ("metal", index) => Ok(Self::Metal { index }),
            _ => Err(Error::config(format!(
                "Unknown device '{}' (expected auto, cpu, cuda[:N] or metal[:N])",
                s
            ))),
        }
    }
}

impl TryFrom<String> for DeviceSpec {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSpec::Auto => write!(f, "auto"),
            DeviceSpec::Cpu => write!(f, "cpu"),
            DeviceSpec::Cuda { index: None } => write!(f, "cuda"),
            DeviceSpec::Cuda { index: Some(i) } => write!(f, "cuda:{}", i),
            DeviceSpec::Metal { index: None } => write!(f, "metal"),
            DeviceSpec::Metal { index: Some(i) } => write!(f, "metal:{}", i),
        }
    }
}

impl From<DeviceSpec> for String {
    fn from(spec: DeviceSpec) -> Self {
        spec.to_string()
    }
}

impl ModelFormatSpec {
    pub fn to_model_format(&self) -> ModelFormat {
        match self {
            Self::Auto => ModelFormat::Auto,
            Self::SafeTensors => ModelFormat::SafeTensors,
            Self::PyTorch => ModelFormat::PyTorch,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
