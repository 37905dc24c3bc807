//! Diagnosis service and shared application state

use cropguard_advisory::AdvisoryResolver;
use cropguard_classifiers::{parse_label, Classifier, InferenceContext};
use cropguard_core::{round_confidence, PredictionResponse, RankedClass, Result, HEALTHY_DISPLAY_NAME};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ServiceConfig;

/// Image in, diagnosis out: classification, label parsing and advice lookup
pub struct DiagnosisService {
    classifier: Arc<dyn Classifier>,
    resolver: AdvisoryResolver,
}

impl DiagnosisService {
    pub fn new(classifier: Arc<dyn Classifier>, resolver: AdvisoryResolver) -> Self {
        Self {
            classifier,
            resolver,
        }
    }

    /// Build the service from configuration, loading the model
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let context = InferenceContext::initialize(&config.model)?;
        info!(
            "Classifier '{}' ready: {} classes on {}",
            context.name(),
            context.num_classes(),
            context.device_name()
        );

        let table = config.advisory_table()?;
        info!("Advisory table has {} curated entries", table.len());

        Ok(Self::new(Arc::new(context), AdvisoryResolver::new(table)))
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Classify an encoded image and attach treatment advice
    pub fn diagnose(&self, image: &[u8]) -> Result<PredictionResponse> {
        let result = self.classifier.classify(image)?;
        metrics::histogram!("cropguard_inference_latency_us").record(result.latency_us as f64);

        let label = parse_label(&result.label);
        let resolution = self.resolver.resolve_label(&label);
        debug!(
            "Label '{}' parsed as crop='{}' disease='{}', advice from {} match",
            result.label,
            label.crop,
            label.disease,
            resolution.tier.as_str()
        );

        metrics::counter!("cropguard_predictions_total", "crop" => label.crop.clone())
            .increment(1);

        let disease_name = if label.is_healthy() {
            HEALTHY_DISPLAY_NAME.to_string()
        } else {
            label.disease
        };

        Ok(PredictionResponse {
            predicted_class: result.label,
            confidence: round_confidence(result.confidence),
            crop_name: label.crop,
            disease_name,
            recommendation: resolution.record,
            advisory_source: resolution.tier,
            top_predictions: result
                .top_predictions
                .into_iter()
                .map(|ranked| RankedClass {
                    probability: round_confidence(ranked.probability),
                    ..ranked
                })
                .collect(),
        })
    }
}

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServiceConfig>,

    /// Model and advisory lookup
    pub service: Arc<DiagnosisService>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        service: DiagnosisService,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
            metrics_handle,
        }
    }
}
