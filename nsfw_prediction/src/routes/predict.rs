use crate::{
    config::ResponseMode,
    inference_service::{Classification, InferenceError},
    labels::Category,
    model_service::ModelService,
    preprocess::ImageError,
    server::SharedState,
};
use axum::{
    body::{Body, Bytes},
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("No file provided")]
    NoFile,
    #[error("Invalid file")]
    InvalidFile,
    #[error("Multipart read failed: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Content blocked due to NSFW image")]
    Blocked,
    #[error("Image decode failed: {0}")]
    Decode(ImageError),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("HTTP builder failed: {0}")]
    HttpBuilder(String),
}

impl From<InferenceError> for PredictError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Image(e) => PredictError::Decode(e),
            other => PredictError::Inference(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            PredictError::NoFile => (StatusCode::BAD_REQUEST, "No file provided"),
            PredictError::InvalidFile | PredictError::Multipart(_) => {
                (StatusCode::BAD_REQUEST, "Invalid file")
            }
            PredictError::Blocked => (StatusCode::FORBIDDEN, "Content blocked due to NSFW image"),
            PredictError::Decode(_) => (StatusCode::BAD_REQUEST, "Unable to decode image"),
            PredictError::Inference(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Inference failed"),
            PredictError::HttpBuilder(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
            }
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Rejecting request: {}", self);
        }

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Debug)]
struct Upload {
    file_name: String,
    data: Bytes,
}

/// Pulls the `file` field out of the form. A request that is not multipart at
/// all is treated like a form without the field.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Upload, PredictError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!("Not a multipart request: {}", rejection);
            return Err(PredictError::NoFile);
        }
    };

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        // A part without a filename is a plain form value, not an upload.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field.bytes().await?;
        if file_name.is_empty() || data.is_empty() {
            return Err(PredictError::InvalidFile);
        }

        return Ok(Upload { file_name, data });
    }

    Err(PredictError::NoFile)
}

#[instrument(skip(state, multipart))]
pub async fn predict<M: ModelService>(
    State(state): State<SharedState<M>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, PredictError> {
    let upload = read_upload(multipart).await?;

    let start = Instant::now();
    let classification = state
        .inference_service
        .classify(upload.data.clone())
        .await?;
    state
        .metrics
        .record_inference_duration(start.elapsed().as_millis() as u64);
    state
        .metrics
        .record_prediction(classification.class_label, classification.category);

    tracing::debug!(
        "Classified {} as {} ({:.3}), category {}",
        upload.file_name,
        classification.class_label,
        classification.confidence,
        classification.category
    );

    match state.response_mode {
        ResponseMode::Classify => Ok(Json(classification).into_response()),
        ResponseMode::Gate => gate(&state, upload, classification),
    }
}

fn gate<M: ModelService>(
    state: &SharedState<M>,
    upload: Upload,
    classification: Classification,
) -> Result<Response, PredictError> {
    if classification.category == Category::Nsfw {
        state.metrics.record_blocked(classification.class_label);
        tracing::info!(
            "Blocked upload classified as {}",
            classification.class_label
        );
        return Err(PredictError::Blocked);
    }

    Response::builder()
        .header(header::CONTENT_TYPE, "image/jpeg")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&upload.file_name),
        )
        .body(Body::from(upload.data))
        .map_err(|e| PredictError::HttpBuilder(e.to_string()))
}

/// `attachment` disposition for `file_name`. Names that are not printable
/// ASCII get an RFC 5987 `filename*` next to an ASCII fallback.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if fallback == file_name {
        return format!("attachment; filename=\"{}\"", fallback);
    }

    let encoded: String = file_name
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file_name() {
        assert_eq!(
            content_disposition("cat.jpg"),
            "attachment; filename=\"cat.jpg\""
        );
    }

    #[test]
    fn test_quoted_file_name() {
        assert_eq!(
            content_disposition("a\"b.jpg"),
            "attachment; filename=\"a_b.jpg\"; filename*=UTF-8''a%22b.jpg"
        );
    }

    #[test]
    fn test_non_ascii_file_name() {
        assert_eq!(
            content_disposition("été.png"),
            "attachment; filename=\"_t_.png\"; filename*=UTF-8''%C3%A9t%C3%A9.png"
        );
    }

    #[test]
    fn test_inference_error_mapping() {
        let decode = PredictError::from(InferenceError::Image(ImageError::Format(
            std::io::Error::other("eof"),
        )));
        assert_eq!(decode.into_response().status(), StatusCode::BAD_REQUEST);

        let task = PredictError::from(InferenceError::Task("panicked".to_string()));
        assert_eq!(
            task.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
