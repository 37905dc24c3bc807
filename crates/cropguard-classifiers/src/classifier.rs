//! Classifier trait and common types

use cropguard_core::{RankedClass, Result};

/// Trait for image classifiers
///
/// Inference is CPU/GPU bound, so `classify` is synchronous. Async callers
/// run it on a blocking thread.
pub trait Classifier: Send + Sync {
    /// Classify an encoded image (JPEG, PNG, BMP, ...)
    fn classify(&self, image: &[u8]) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Number of classes the classifier distinguishes
    fn num_classes(&self) -> usize;

    /// Device the classifier runs on, e.g. `cpu` or `cuda:0`
    fn device_name(&self) -> String {
        "cpu".to_string()
    }
}

/// Result of classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Predicted class label
    pub label: String,

    /// Index of the predicted class
    pub class_index: usize,

    /// Probability of the predicted class (0.0-1.0)
    pub confidence: f32,

    /// Highest-probability classes, best first
    pub top_predictions: Vec<RankedClass>,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create a new classification result
    pub fn new(label: impl Into<String>, class_index: usize, confidence: f32) -> Self {
        Self {
            label: label.into(),
            class_index,
            confidence,
            top_predictions: Vec::new(),
            latency_us: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_result() {
        let result = ClassificationResult::new("Tomato___Late_blight", 3, 0.8);
        assert_eq!(result.class_index, 3);
        assert_eq!(result.latency_us, 0);
        assert!(result.top_predictions.is_empty());
    }
}
