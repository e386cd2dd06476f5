use ndarray::{Array, Ix4};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to build tensor: {0}")]
    Tensor(String),
    #[error("inference failed: {0}")]
    Run(String),
    #[error("failed to extract tensor: {0}")]
    Extract(String),
    #[error("expected {expected} class scores, got {actual}")]
    OutputShape { expected: usize, actual: usize },
}

/// Runs the classifier on one preprocessed `[1, 224, 224, 3]` batch and returns
/// the raw per-class scores in model output order.
pub trait ModelService: Send + Sync + 'static {
    fn predict(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError>;
}
