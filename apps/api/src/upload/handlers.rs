use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        Multipart, State,
    },
    Json,
};
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::upload::{accept_upload, check_content_type, UploadError, UploadedFile};

const DEFAULT_FILENAME: &str = "curriculum.pdf";
const SUCCESS_MESSAGE: &str = "Archivo procesado exitosamente";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: &'static str,
    pub evaluation_id: String,
    pub file_data: String,
    pub filename: String,
    pub language: String,
}

/// POST /api/upload
///
/// Multipart form: `file` (PDF, required) and `language` (optional, default "es").
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| {
        warn!("Upload rejected, body is not a multipart form: {e}");
        AppError::from(UploadError::MissingFile)
    })?;
    let max_bytes = state.config.limits.max_upload_bytes;

    let mut file = None;
    let mut language = None;

    while let Some(mut field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                // Browsers send an empty part when no file was picked.
                if field.file_name() == Some("") {
                    continue;
                }
                check_content_type(field.content_type())?;
                let filename = field.file_name().unwrap_or(DEFAULT_FILENAME).to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = read_capped(&mut field, max_bytes).await?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            Some("language") => {
                language = Some(field.text().await.map_err(invalid_form)?);
            }
            _ => {}
        }
    }

    let accepted = accept_upload(file, language, max_bytes)?;
    info!(
        "Accepted upload {} ({}, {} base64 chars)",
        accepted.evaluation_id,
        accepted.document.filename,
        accepted.document.data.len()
    );

    Ok(Json(UploadResponse {
        message: SUCCESS_MESSAGE,
        evaluation_id: accepted.evaluation_id,
        file_data: accepted.document.data,
        filename: accepted.document.filename,
        language: accepted.language,
    }))
}

/// Reads a field chunk by chunk, bailing out as soon as the ceiling is crossed.
async fn read_capped(field: &mut Field<'_>, max_bytes: usize) -> Result<Bytes, AppError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(invalid_form)? {
        if buf.len() + chunk.len() > max_bytes {
            return Err(UploadError::TooLarge.into());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

fn invalid_form(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Formulario inválido: {}", e.body_text()))
}
