//! CropGuard Server
//!
//! HTTP front end for crop disease diagnosis. Accepts a leaf image as a
//! multipart upload on `POST /predict` and answers with the predicted class,
//! its crop and disease components and treatment advice.
//!
//! The model is loaded once at startup; a failure to locate or load it is
//! fatal. Each prediction runs on tokio's blocking pool.

pub mod cli;
pub mod config;
pub mod routes;
pub mod service;

pub use cli::Cli;
pub use config::ServiceConfig;
pub use routes::create_router;
pub use service::{AppState, DiagnosisService};
