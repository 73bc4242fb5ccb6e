use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::upload::{EncodedDocument, ACCEPTED_CONTENT_TYPE, DEFAULT_LANGUAGE};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub file_data: Option<String>,
    pub filename: Option<String>,
    pub language: Option<String>,
}

/// POST /api/evaluate
///
/// Body: `{fileData, filename, language}` as returned by the upload endpoint.
/// Responds with a `text/plain` event stream; see `relay::events` for framing.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    body: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            warn!("Evaluate rejected, body over the request limit: {e}");
            return AppError::PayloadTooLarge("Archivo muy grande para procesar".to_string());
        }
        warn!("Evaluate rejected, body is not valid JSON: {e}");
        AppError::Validation("Datos de archivo requeridos".to_string())
    })?;

    let file_data = req
        .file_data
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::Validation("Datos de archivo requeridos".to_string()))?;
    let filename = req
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Nombre de archivo requerido".to_string()))?;
    let language = req
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    info!("Evaluation requested for {filename} (language {language})");

    let document = EncodedDocument {
        data: file_data,
        filename,
        content_type: ACCEPTED_CONTENT_TYPE.to_string(),
    };
    let stream = state.relay.open(document, &language).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream.map(Ok::<_, Infallible>)),
    )
        .into_response())
}
