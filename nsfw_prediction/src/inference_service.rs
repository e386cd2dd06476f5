use crate::{
    labels::{Category, ClassLabel, NUM_CLASSES},
    model_service::{ModelError, ModelService},
    preprocess::{transform_image, ImageError},
};
use axum::body::Bytes;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Image transformation error: {0}")]
    Image(#[from] ImageError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Inference task failed: {0}")]
    Task(String),
}

/// Top class of a single image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    #[serde(rename = "class")]
    pub class_label: ClassLabel,
    pub confidence: f32,
    pub category: Category,
}

impl Classification {
    /// Picks the highest score. Ties go to the lowest class index.
    pub fn from_scores(scores: &[f32]) -> Result<Self, ModelError> {
        let (index, confidence) = scores
            .iter()
            .copied()
            .enumerate()
            .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
            .ok_or(ModelError::OutputShape {
                expected: NUM_CLASSES,
                actual: 0,
            })?;

        let class_label = ClassLabel::try_from(index).map_err(|_| ModelError::OutputShape {
            expected: NUM_CLASSES,
            actual: scores.len(),
        })?;

        Ok(Self {
            class_label,
            confidence,
            category: class_label.category(),
        })
    }
}

pub struct InferenceService<M: ModelService> {
    model_service: Arc<M>,
}

impl<M: ModelService> Clone for InferenceService<M> {
    fn clone(&self) -> Self {
        Self {
            model_service: self.model_service.clone(),
        }
    }
}

impl<M: ModelService> InferenceService<M> {
    pub fn new(model_service: M) -> Self {
        Self {
            model_service: Arc::new(model_service),
        }
    }

    /// Decodes, preprocesses and classifies `image_data` on the blocking pool.
    pub async fn classify(&self, image_data: Bytes) -> Result<Classification, InferenceError> {
        let model_service = self.model_service.clone();

        tokio::task::spawn_blocking(move || -> Result<Classification, InferenceError> {
            let input = transform_image(&image_data)?;
            let scores = model_service.predict(&input)?;
            tracing::debug!("Class scores: {:?}", scores);
            Ok(Classification::from_scores(&scores)?)
        })
        .await
        .map_err(|e| InferenceError::Task(e.to_string()))?
    }
}
