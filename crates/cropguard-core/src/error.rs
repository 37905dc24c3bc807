//! Error types for CropGuard

/// Result type alias using CropGuard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for CropGuard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed class-index/weights configuration (fatal at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// Weights could not be loaded into the network (fatal at startup)
    #[error("model load error: {0}")]
    ModelLoad(String),

    /// Image bytes could not be turned into an input tensor (per request)
    #[error("preprocess error: {0}")]
    Preprocess(String),

    /// Forward pass or label lookup failed (per request)
    #[error("prediction error: {0}")]
    Prediction(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new model load error
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create a new preprocessing error
    pub fn preprocess(msg: impl Into<String>) -> Self {
        Self::Preprocess(msg.into())
    }

    /// Create a new prediction error
    pub fn prediction(msg: impl Into<String>) -> Self {
        Self::Prediction(msg.into())
    }

    /// Whether this error was caused by the client's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Preprocess(_))
    }

    /// Short stable identifier, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::ModelLoad(_) => "model_load",
            Self::Preprocess(_) => "preprocess",
            Self::Prediction(_) => "prediction",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}
