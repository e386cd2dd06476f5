use crate::labels::{Category, ClassLabel, CLASS_LABELS};
use axum::response::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct LabelInfo {
    class: ClassLabel,
    category: Category,
}

/// Class list in model output order, with the category each class maps to.
pub async fn labels() -> Json<Vec<LabelInfo>> {
    Json(
        CLASS_LABELS
            .iter()
            .map(|&class| LabelInfo {
                class,
                category: class.category(),
            })
            .collect(),
    )
}
