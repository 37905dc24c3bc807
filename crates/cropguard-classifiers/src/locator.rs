//! Model artifact discovery
//!
//! Deployments lay the weights and class-index files out differently (a
//! source checkout, a backend-only bundle, a container image). The locator
//! walks a fixed, ordered list of candidate paths and picks the first that
//! exists. It never fails: when nothing exists it returns the first candidate
//! so that the loader reports a "not found" error naming that path.

use std::fmt;
use std::path::{Path, PathBuf};

/// Default weights file name
pub const WEIGHTS_FILE: &str = "best_model.safetensors";

/// PyTorch state-dict alternative to [`WEIGHTS_FILE`]
pub const WEIGHTS_FILE_PTH: &str = "best_model.pth";

/// Default class-index file name
pub const CLASS_INDEX_FILE: &str = "class_indices.json";

/// Container image layout root
const CONTAINER_ROOT: &str = "/app";

/// Ordered candidate paths for one artifact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    candidates: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Put an explicit path ahead of every other candidate
    pub fn prepend(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.candidates.retain(|c| c != &path);
        self.candidates.insert(0, path);
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First candidate that exists, or the first candidate when none does
    pub fn resolve(&self) -> Located {
        match self.candidates.iter().find(|c| c.exists()) {
            Some(found) => Located {
                path: found.clone(),
                found: true,
            },
            None => Located {
                path: self.candidates.first().cloned().unwrap_or_default(),
                found: false,
            },
        }
    }

    /// Bullet list of every candidate, for startup diagnostics
    pub fn describe(&self) -> String {
        self.candidates
            .iter()
            .map(|c| format!("  - {}", c.display()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Outcome of resolving a [`SearchPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub path: PathBuf,
    /// Whether `path` existed at resolution time
    pub found: bool,
}

/// Resolved locations for both model artifacts
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub weights: Located,
    pub class_index: Located,
}

impl fmt::Display for ModelArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "weights={} ({}), class_index={} ({})",
            self.weights.path.display(),
            if self.weights.found { "found" } else { "missing" },
            self.class_index.path.display(),
            if self.class_index.found { "found" } else { "missing" },
        )
    }
}

/// Searches the known deployment layouts for model artifacts
#[derive(Debug, Clone)]
pub struct ModelLocator {
    weights: SearchPath,
    class_index: SearchPath,
}

impl ModelLocator {
    /// Locator over explicit candidate lists
    pub fn new(weights: Vec<PathBuf>, class_index: Vec<PathBuf>) -> Self {
        Self {
            weights: SearchPath::new(weights),
            class_index: SearchPath::new(class_index),
        }
    }

    /// Locator over the standard layouts relative to `root`
    pub fn with_defaults(root: impl AsRef<Path>) -> Self {
        let model_dirs = default_model_dirs(root.as_ref());

        let weights = model_dirs
            .iter()
            .flat_map(|d| [d.join(WEIGHTS_FILE), d.join(WEIGHTS_FILE_PTH)])
            .collect();
        let class_index = model_dirs
            .iter()
            .map(|d| d.join(CLASS_INDEX_FILE))
            .collect();

        Self::new(weights, class_index)
    }

    /// Search an explicit weights path first
    pub fn with_weights_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.weights.prepend(path);
        self
    }

    /// Search an explicit class-index path first
    pub fn with_class_index_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.class_index.prepend(path);
        self
    }

    pub fn weights(&self) -> &SearchPath {
        &self.weights
    }

    pub fn class_index(&self) -> &SearchPath {
        &self.class_index
    }

    /// Resolve both artifacts
    pub fn locate(&self) -> ModelArtifacts {
        ModelArtifacts {
            weights: self.weights.resolve(),
            class_index: self.class_index.resolve(),
        }
    }
}

/// Directories that may hold `saved_models` artifacts, highest priority first
fn default_model_dirs(root: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![
        root.join("model").join("saved_models"),
        root.join("backend").join("model_files").join("saved_models"),
        Path::new(CONTAINER_ROOT)
            .join("model_files")
            .join("saved_models"),
        root.join("backend").join("saved_models"),
    ];

    if let Some(data_dir) = dirs::data_dir() {
        candidates.push(data_dir.join("cropguard").join("saved_models"));
    }

    candidates
}
