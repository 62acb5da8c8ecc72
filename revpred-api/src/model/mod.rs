//! Model capability and artifact loading
//!
//! The pipeline only sees the [`Predictor`] trait. The production
//! implementation is [`TreeEnsemble`], loaded once at startup from a JSON
//! artifact exported by the training process.

pub mod gbdt;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::features::FeatureRow;
pub use gbdt::TreeEnsemble;

/// Model loading and inference errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Trained regression model as seen by the pipeline
///
/// Implementations are immutable after construction and shared across
/// concurrent requests.
pub trait Predictor: Send + Sync {
    /// One log1p-scale prediction per row, in row order
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError>;
}

/// Identification of the loaded artifact, reported by `GET /`
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub path: String,
    pub sha256: String,
    pub trees: usize,
}

/// A loaded model ready to be shared by request handlers
pub struct LoadedModel {
    pub predictor: Arc<dyn Predictor>,
    pub info: ModelInfo,
}

/// Read, fingerprint and validate the model artifact at `path`
pub fn load_model(path: &Path) -> Result<LoadedModel, ModelError> {
    info!("Loading model from {}...", path.display());

    let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    let ensemble = TreeEnsemble::from_json_slice(&bytes)?;

    let info = ModelInfo {
        path: path.display().to_string(),
        sha256,
        trees: ensemble.tree_count(),
    };
    info!(
        "Model loaded successfully: {} trees, {} encoded features, sha256 {}",
        info.trees,
        ensemble.encoded_width(),
        info.sha256
    );

    Ok(LoadedModel {
        predictor: Arc::new(ensemble),
        info,
    })
}
