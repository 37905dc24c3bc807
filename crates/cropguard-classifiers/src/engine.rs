//! Inference engine
//!
//! [`InferenceContext`] bundles everything a prediction needs: the network,
//! the class map, the device and the preprocessing transform. It is built
//! once at startup, never mutated, and shared behind an `Arc`.

use crate::class_index::ClassIndexMap;
use crate::classifier::{ClassificationResult, Classifier};
use crate::config::ClassifierConfig;
use crate::model_loader::{describe_device, LoadedModel};
use crate::preprocessing::ImagePreprocessor;
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::VarBuilder;
use cropguard_core::{Error, RankedClass, Result};
use std::time::Instant;
use tracing::{debug, info};

/// Immutable model + class map + device, ready for concurrent inference
pub struct InferenceContext {
    name: String,
    network: Box<dyn Module + Send + Sync>,
    classes: ClassIndexMap,
    device: Device,
    preprocessor: ImagePreprocessor,
    top_k: usize,
}

impl InferenceContext {
    /// Wrap an arbitrary network producing `[1, N]` logits
    pub fn new(
        network: impl Module + Send + Sync + 'static,
        classes: ClassIndexMap,
        device: Device,
    ) -> Self {
        Self {
            name: "custom".to_string(),
            network: Box::new(network),
            classes,
            device,
            preprocessor: ImagePreprocessor::default(),
            top_k: crate::config::DEFAULT_TOP_K,
        }
    }

    /// Pair a loaded ResNet-18 with its class map
    pub fn from_loaded(model: LoadedModel, classes: ClassIndexMap) -> Result<Self> {
        let (network, device, metadata) = model.into_parts();
        if metadata.num_classes != classes.num_classes() {
            return Err(Error::model_load(format!(
                "Model has {} outputs but the class index defines {} classes",
                metadata.num_classes,
                classes.num_classes()
            )));
        }

        Ok(Self::new(network, classes, device).with_name(metadata.name))
    }

    /// Build a ResNet-18 from any variable source sized to `classes`
    pub fn from_var_builder(
        var_builder: VarBuilder<'static>,
        classes: ClassIndexMap,
        device: Device,
    ) -> Result<Self> {
        let model = LoadedModel::from_var_builder(var_builder, classes.num_classes(), device)?;
        Self::from_loaded(model, classes)
    }

    /// Locate the artifacts, resolve the class index and load the weights.
    ///
    /// Missing artifacts fail with the full list of searched paths.
    pub fn initialize(config: &ClassifierConfig) -> Result<Self> {
        let locator = config.locator();
        let artifacts = locator.locate();
        info!("Resolved model artifacts: {}", artifacts);

        if !artifacts.class_index.found {
            return Err(Error::config(format!(
                "Class index file not found. Searched:\n{}",
                locator.class_index().describe()
            )));
        }
        let classes = ClassIndexMap::from_file(&artifacts.class_index.path)?;
        info!(
            "Loaded {} classes from {} ({:?})",
            classes.num_classes(),
            artifacts.class_index.path.display(),
            classes.format()
        );

        if !artifacts.weights.found {
            return Err(Error::model_load(format!(
                "Model weights not found. Searched:\n{}",
                locator.weights().describe()
            )));
        }
        let model_config = config.to_model_config(&artifacts.weights.path);
        let model = LoadedModel::load(&model_config, classes.num_classes())?;

        Ok(Self::from_loaded(model, classes)?.with_top_k(config.top_k))
    }

    /// Set the name reported by [`Classifier::name`]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set how many ranked predictions each result carries
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn classes(&self) -> &ClassIndexMap {
        &self.classes
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Class probabilities for a preprocessed `[1, 3, H, W]` input
    pub fn probabilities(&self, input: &Tensor) -> Result<Vec<f32>> {
        let input = input
            .to_device(&self.device)
            .map_err(|e| Error::prediction(format!("Failed to move input to device: {}", e)))?;

        let logits = self
            .network
            .forward(&input)
            .map_err(|e| Error::prediction(format!("Model forward pass failed: {}", e)))?;

        match logits.dims() {
            [1, n] if *n > 0 => {}
            dims => {
                return Err(Error::prediction(format!(
                    "Expected model output of shape [1, N], got {:?}",
                    dims
                )))
            }
        }

        let probabilities = candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|p| p.squeeze(0))
            .and_then(|p| p.to_dtype(DType::F32))
            .and_then(|p| p.to_vec1::<f32>())
            .map_err(|e| Error::prediction(format!("Failed to compute softmax: {}", e)))?;

        Ok(probabilities)
    }

    /// Arg-max and top-k over a probability vector
    pub fn rank(&self, probabilities: &[f32]) -> Result<ClassificationResult> {
        let (class_index, confidence) = argmax(probabilities)
            .ok_or_else(|| Error::prediction("Model produced no finite probabilities"))?;

        let label = self.classes.get(class_index).ok_or_else(|| {
            Error::prediction(format!(
                "Predicted index {} is not in the class index ({} classes)",
                class_index,
                self.classes.num_classes()
            ))
        })?;

        let mut result = ClassificationResult::new(label, class_index, confidence.clamp(0.0, 1.0));
        result.top_predictions = self.top_predictions(probabilities);
        Ok(result)
    }

    /// Inference on an already preprocessed input tensor
    pub fn predict_tensor(&self, input: &Tensor) -> Result<ClassificationResult> {
        let probabilities = self.probabilities(input)?;
        self.rank(&probabilities)
    }

    fn top_predictions(&self, probabilities: &[f32]) -> Vec<RankedClass> {
        let mut ranked: Vec<(usize, f32)> = probabilities
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .collect();
        // Stable sort keeps the lower index first on ties.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranked
            .into_iter()
            .filter_map(|(index, probability)| {
                self.classes.get(index).map(|label| RankedClass {
                    index,
                    label: label.to_string(),
                    probability: probability.clamp(0.0, 1.0),
                })
            })
            .take(self.top_k)
            .collect()
    }
}

impl Classifier for InferenceContext {
    fn classify(&self, image: &[u8]) -> Result<ClassificationResult> {
        let start = Instant::now();

        let input = self.preprocessor.preprocess(image, &self.device)?;
        let mut result = self.predict_tensor(&input)?;
        result.latency_us = start.elapsed().as_micros() as u64;

        debug!(
            "{} predicted '{}' ({:.4}) in {}us",
            self.name, result.label, result.confidence, result.latency_us
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_classes(&self) -> usize {
        self.classes.num_classes()
    }

    fn device_name(&self) -> String {
        describe_device(&self.device)
    }
}

/// Index and value of the largest finite entry; the first one wins on ties
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
}
