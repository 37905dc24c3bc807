//! CropGuard Core
//!
//! Core types and utilities shared across CropGuard components.
//!
//! This crate provides:
//! - Error types and result handling
//! - The label, advisory and response records exchanged between the
//!   classifier, the advisory resolver and the HTTP layer

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    round_confidence, AdvisoryRecord, MatchTier, ParsedLabel, PredictionResponse, RankedClass,
    HEALTHY_DISPLAY_NAME,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{AdvisoryRecord, MatchTier, ParsedLabel, PredictionResponse, RankedClass};
}
