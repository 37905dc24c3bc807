//! Model loading for the ResNet-18 disease classifier
//!
//! The network is the torchvision ResNet-18 layout (`conv1`, `bn1`,
//! `layer1`..`layer4`) with its `fc` head replaced by a `512 -> num_classes`
//! linear layer. Weights come from a safetensors file or a PyTorch state dict.
//! Batch norm layers run on their stored running statistics (evaluation mode).

use candle_core::{DType, Device, DeviceLocation, Tensor};
use candle_nn::{Func, VarBuilder};
use cropguard_core::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Width of the ResNet-18 feature vector feeding the classification head
pub const BACKBONE_FEATURES: usize = 512;

/// Architecture identifier reported in model metadata
pub const ARCHITECTURE: &str = "resnet18";

/// Parameter name of the classification head weight
const HEAD_WEIGHT: &str = "fc.weight";

/// Prefix added by `torch.nn.DataParallel` when saving
const DATA_PARALLEL_PREFIX: &str = "module.";

/// Configuration for loading the classifier weights
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Path to the weights file
    pub weights_path: PathBuf,

    /// Device to run inference on
    pub device: DeviceType,

    /// Weights file format
    pub format: ModelFormat,
}

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// CUDA GPU 0 if available, otherwise CPU
    Auto,
    /// CPU inference (always available)
    Cpu,
    /// CUDA GPU inference
    Cuda(usize), // GPU index
    /// Metal (Apple Silicon)
    Metal(usize),
}

/// Weights file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// Decide from the file extension
    Auto,
    /// SafeTensors format (recommended)
    SafeTensors,
    /// PyTorch pickled state dict
    PyTorch,
}

impl ModelFormat {
    /// Concrete format for a weights path
    pub fn resolve(self, path: &Path) -> Self {
        match self {
            Self::Auto => match path.extension().and_then(|e| e.to_str()) {
                Some("pth") | Some("pt") | Some("bin") => Self::PyTorch,
                _ => Self::SafeTensors,
            },
            other => other,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_path: PathBuf::new(),
            device: DeviceType::Auto,
            format: ModelFormat::Auto,
        }
    }
}

impl ModelConfig {
    /// Create a new model configuration from local path
    pub fn from_local(path: impl Into<PathBuf>) -> Self {
        Self {
            weights_path: path.into(),
            ..Default::default()
        }
    }

    /// Set device
    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    /// Set model format
    pub fn with_format(mut self, format: ModelFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ModelMetadata {
    /// Model name (weights file stem)
    pub name: String,

    /// Backbone architecture
    pub architecture: &'static str,

    /// Width of the classification head
    pub num_classes: usize,

    /// Device the weights live on, e.g. `cpu` or `cuda:0`
    pub device: String,
}

/// ResNet-18 with trained weights, ready for inference
pub struct LoadedModel {
    network: Func<'static>,
    device: Device,
    metadata: ModelMetadata,
    weights_path: PathBuf,
}

impl LoadedModel {
    /// Load trained weights for a head of `num_classes` outputs
    pub fn load(config: &ModelConfig, num_classes: usize) -> Result<Self> {
        let weights_path = config.weights_path.clone();
        if !weights_path.is_file() {
            return Err(Error::model_load(format!(
                "Model weights not found: {}",
                weights_path.display()
            )));
        }

        let device = create_device(config.device)?;
        let format = config.format.resolve(&weights_path);
        debug!(
            "Reading {:?} weights from {}",
            format,
            weights_path.display()
        );

        let tensors = read_tensors(&weights_path, format)?;
        check_head(&tensors, num_classes)?;

        let var_builder = VarBuilder::from_tensors(tensors, DType::F32, &device);
        let name = weights_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let model = Self::from_var_builder(var_builder, num_classes, device)?
            .with_source(name, weights_path);

        info!(
            "Loaded {} with {} classes on {}",
            ARCHITECTURE, num_classes, model.metadata.device
        );
        Ok(model)
    }

    /// Build the network from any variable source (trained tensors, a `VarMap`, ...)
    pub fn from_var_builder(
        var_builder: VarBuilder<'static>,
        num_classes: usize,
        device: Device,
    ) -> Result<Self> {
        if num_classes == 0 {
            return Err(Error::model_load("Classification head needs at least one class"));
        }

        let network = candle_transformers::models::resnet::resnet18(num_classes, var_builder)
            .map_err(|e| {
                Error::model_load(format!(
                    "Weights are incompatible with {} ({} classes): {}",
                    ARCHITECTURE, num_classes, e
                ))
            })?;

        Ok(Self {
            network,
            metadata: ModelMetadata {
                name: ARCHITECTURE.to_string(),
                architecture: ARCHITECTURE,
                num_classes,
                device: describe_device(&device),
            },
            device,
            weights_path: PathBuf::new(),
        })
    }

    fn with_source(mut self, name: String, weights_path: PathBuf) -> Self {
        self.metadata.name = name;
        self.weights_path = weights_path;
        self
    }

    /// Get reference to the device
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Get model metadata
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Get weights path (empty for models not loaded from disk)
    pub fn weights_path(&self) -> &Path {
        &self.weights_path
    }

    /// Split into the network and its device
    pub fn into_parts(self) -> (Func<'static>, Device, ModelMetadata) {
        (self.network, self.device, self.metadata)
    }
}

/// Create Candle device from device type
pub fn create_device(device_type: DeviceType) -> Result<Device> {
    match device_type {
        DeviceType::Auto => Device::cuda_if_available(0)
            .map_err(|e| Error::model_load(format!("Failed to probe CUDA device: {}", e))),
        DeviceType::Cpu => Ok(Device::Cpu),
        DeviceType::Cuda(idx) => Device::new_cuda(idx)
            .map_err(|e| Error::model_load(format!("Failed to create CUDA device: {}", e))),
        DeviceType::Metal(idx) => Device::new_metal(idx)
            .map_err(|e| Error::model_load(format!("Failed to create Metal device: {}", e))),
    }
}

/// Human-readable device name
pub fn describe_device(device: &Device) -> String {
    match device.location() {
        DeviceLocation::Cpu => "cpu".to_string(),
        DeviceLocation::Cuda { gpu_id } => format!("cuda:{}", gpu_id),
        DeviceLocation::Metal { gpu_id } => format!("metal:{}", gpu_id),
    }
}

fn read_tensors(path: &Path, format: ModelFormat) -> Result<HashMap<String, Tensor>> {
    let tensors: HashMap<String, Tensor> = match format {
        ModelFormat::PyTorch => candle_core::pickle::read_all(path)
            .map_err(|e| {
                Error::model_load(format!(
                    "Failed to read PyTorch weights {}: {}",
                    path.display(),
                    e
                ))
            })?
            .into_iter()
            .collect(),
        ModelFormat::SafeTensors | ModelFormat::Auto => {
            candle_core::safetensors::load(path, &Device::Cpu).map_err(|e| {
                Error::model_load(format!(
                    "Failed to read SafeTensors weights {}: {}",
                    path.display(),
                    e
                ))
            })?
        }
    };

    if tensors.is_empty() {
        return Err(Error::model_load(format!(
            "Weights file {} contains no tensors",
            path.display()
        )));
    }

    Ok(strip_data_parallel_prefix(tensors))
}

fn strip_data_parallel_prefix(tensors: HashMap<String, Tensor>) -> HashMap<String, Tensor> {
    if !tensors.keys().all(|k| k.starts_with(DATA_PARALLEL_PREFIX)) {
        return tensors;
    }
    tensors
        .into_iter()
        .map(|(k, v)| (k[DATA_PARALLEL_PREFIX.len()..].to_string(), v))
        .collect()
}

/// Reject weights whose head width differs from the class index
fn check_head(tensors: &HashMap<String, Tensor>, num_classes: usize) -> Result<()> {
    let head = tensors.get(HEAD_WEIGHT).ok_or_else(|| {
        Error::model_load(format!(
            "Weights have no '{}' tensor; expected a {} state dict",
            HEAD_WEIGHT, ARCHITECTURE
        ))
    })?;

    match head.dims() {
        [outputs, BACKBONE_FEATURES] if *outputs == num_classes => Ok(()),
        [outputs, BACKBONE_FEATURES] => Err(Error::model_load(format!(
            "Classification head has {} outputs but the class index defines {} classes",
            outputs, num_classes
        ))),
        dims => Err(Error::model_load(format!(
            "Unexpected '{}' shape {:?}, expected [{}, {}]",
            HEAD_WEIGHT, dims, num_classes, BACKBONE_FEATURES
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(outputs: usize, features: usize) -> HashMap<String, Tensor> {
        let mut tensors = HashMap::new();
        tensors.insert(
            HEAD_WEIGHT.to_string(),
            Tensor::zeros((outputs, features), DType::F32, &Device::Cpu).unwrap(),
        );
        tensors
    }

    #[test]
    fn test_model_config_local() {
        let config = ModelConfig::from_local("/path/to/best_model.pth")
            .with_device(DeviceType::Cpu)
            .with_format(ModelFormat::PyTorch);

        assert_eq!(config.weights_path, PathBuf::from("/path/to/best_model.pth"));
        assert_eq!(config.device, DeviceType::Cpu);
        assert_eq!(config.format, ModelFormat::PyTorch);
    }

    #[test]
    fn test_format_from_extension() {
        let auto = ModelFormat::Auto;
        assert_eq!(auto.resolve(Path::new("m.pth")), ModelFormat::PyTorch);
        assert_eq!(auto.resolve(Path::new("m.pt")), ModelFormat::PyTorch);
        assert_eq!(auto.resolve(Path::new("m.safetensors")), ModelFormat::SafeTensors);
        assert_eq!(
            ModelFormat::SafeTensors.resolve(Path::new("m.pth")),
            ModelFormat::SafeTensors
        );
    }

    #[test]
    fn test_head_check() {
        assert!(check_head(&head(38, 512), 38).is_ok());

        let err = check_head(&head(38, 512), 39).unwrap_err();
        assert!(err.to_string().contains("38 outputs"));
        assert!(err.to_string().contains("39 classes"));

        assert!(check_head(&head(38, 256), 38).is_err());
        assert!(check_head(&HashMap::new(), 38).is_err());
    }

    #[test]
    fn test_data_parallel_prefix() {
        let mut tensors = HashMap::new();
        let t = Tensor::zeros(1, DType::F32, &Device::Cpu).unwrap();
        tensors.insert("module.fc.bias".to_string(), t.clone());
        tensors.insert("module.fc.weight".to_string(), t);

        let stripped = strip_data_parallel_prefix(tensors);
        assert!(stripped.contains_key("fc.bias"));
        assert!(stripped.contains_key("fc.weight"));
    }

    #[test]
    fn test_missing_weights_file() {
        let config = ModelConfig::from_local("/nope/best_model.safetensors");
        let err = LoadedModel::load(&config, 4).err().unwrap();
        assert!(matches!(err, Error::ModelLoad(_)));
        assert!(err.to_string().contains("/nope/best_model.safetensors"));
    }

    #[test]
    fn test_corrupt_weights_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_model.safetensors");
        std::fs::write(&path, b"definitely not safetensors").unwrap();

        let config = ModelConfig::from_local(&path).with_device(DeviceType::Cpu);
        let err = LoadedModel::load(&config, 4).err().unwrap();
        assert!(matches!(err, Error::ModelLoad(_)));
    }

    #[test]
    fn test_zero_classes_rejected() {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let err = LoadedModel::from_var_builder(vb, 0, Device::Cpu).err().unwrap();
        assert!(matches!(err, Error::ModelLoad(_)));
    }

    #[test]
    fn test_describe_cpu() {
        assert_eq!(describe_device(&Device::Cpu), "cpu");
    }
}
