//! HTTP interface (axum) with JSON request/response bodies.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use hark_core::HarkError;

use crate::service::SttService;

/// Body of `POST /api/transcribe`.
///
/// A present `filePath` transcribes that WAV file; otherwise one utterance
/// is captured live from the microphone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscribeBody {
    pub file_path: Option<String>,
    /// When true the response carries timestamped segments instead of one
    /// concatenated text field.
    pub with_segments: bool,
}

pub fn router(service: Arc<SttService>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/transcribe", post(transcribe))
        .with_state(service)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn transcribe(
    State(service): State<Arc<SttService>>,
    Json(body): Json<TranscribeBody>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let with_segments = body.with_segments;
    let file_path = body.file_path;

    let result = tokio::task::spawn_blocking(move || match file_path {
        Some(path) => service.transcribe_file(Path::new(&path)),
        None => service.transcribe_live(),
    })
    .await;

    let transcription = match result {
        Ok(Ok(t)) => t,
        Ok(Err(e)) => {
            warn!("transcription request failed: {e}");
            return Err(error_reply(&e));
        }
        Err(e) => {
            warn!("transcription task panicked: {e}");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal failure" })),
            ));
        }
    };

    if with_segments {
        Ok(Json(json!({
            "segments": transcription.segments,
            "language": transcription.language,
        })))
    } else {
        Ok(Json(json!({ "text": transcription.text() })))
    }
}

fn error_reply(e: &HarkError) -> (StatusCode, Json<Value>) {
    let status = match e {
        HarkError::AudioDevice(_)
        | HarkError::AudioStream(_)
        | HarkError::NoDefaultInputDevice
        | HarkError::CaptureStopped => StatusCode::SERVICE_UNAVAILABLE,
        HarkError::Transcription(_) => StatusCode::BAD_GATEWAY,
        HarkError::AudioFileNotFound { .. }
        | HarkError::Wav(_)
        | HarkError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() })))
}
