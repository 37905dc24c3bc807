//! CropGuard Classifiers
//!
//! Crop disease classification from leaf images.
//!
//! The pipeline runs in fixed stages:
//! - Locate the weights and class-index artifacts ([`locator`])
//! - Normalize the class index into a dense `index -> label` table ([`class_index`])
//! - Load a ResNet-18 with a classification head sized to that table ([`model_loader`])
//! - Resize and normalize the image into a `[1, 3, 224, 224]` tensor ([`preprocessing`])
//! - Softmax, arg-max and top-k over the network output ([`engine`])
//! - Split the winning label into crop and disease ([`label`])

pub mod class_index;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod label;
pub mod locator;
pub mod model_loader;
pub mod preprocessing;

pub use class_index::{ClassIndexFormat, ClassIndexMap};
pub use classifier::{ClassificationResult, Classifier};
pub use config::{ClassifierConfig, DeviceSpec, ModelFormatSpec};
pub use engine::InferenceContext;
pub use label::{parse_label, LABEL_SEPARATOR};
pub use locator::{Located, ModelArtifacts, ModelLocator, SearchPath};
pub use model_loader::{DeviceType, LoadedModel, ModelConfig, ModelFormat, ModelMetadata};
pub use preprocessing::ImagePreprocessor;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::class_index::ClassIndexMap;
    pub use crate::classifier::{ClassificationResult, Classifier};
    pub use crate::config::ClassifierConfig;
    pub use crate::engine::InferenceContext;
    pub use crate::label::parse_label;
}
