//! Upload Handler — validates an uploaded résumé and turns it into a
//! transport-friendly `EncodedDocument` plus a correlation id.
//!
//! Nothing is written to disk; the encoded document travels back to the
//! caller, who forwards it to the evaluate endpoint.

pub mod handlers;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

/// The only accepted document type.
pub const ACCEPTED_CONTENT_TYPE: &str = "application/pdf";
/// Language used when the form omits one.
pub const DEFAULT_LANGUAGE: &str = "es";
/// Prefix of every correlation id.
pub const EVALUATION_ID_PREFIX: &str = "eval_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("No se encontró archivo")]
    MissingFile,

    #[error("Solo se permiten archivos PDF")]
    InvalidType,

    #[error("El archivo es muy grande")]
    TooLarge,
}

/// Binary content as received from the client, before validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Base64 text of a validated document. Owned by the in-flight request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    pub data: String,
    pub filename: String,
    pub content_type: String,
}

impl EncodedDocument {
    /// `data:` URL form expected by the completion API's file parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, self.data)
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct AcceptedUpload {
    pub evaluation_id: String,
    pub document: EncodedDocument,
    pub language: String,
}

/// Rejects a content type that is not exactly the accepted document type.
/// Parameters such as `; charset=...` are ignored.
pub fn check_content_type(content_type: Option<&str>) -> Result<(), UploadError> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some(ACCEPTED_CONTENT_TYPE) => Ok(()),
        _ => Err(UploadError::InvalidType),
    }
}

/// Validation order: presence, then type, then size. No encoding happens
/// until every check has passed.
pub fn accept_upload(
    file: Option<UploadedFile>,
    language: Option<String>,
    max_bytes: usize,
) -> Result<AcceptedUpload, UploadError> {
    let file = file.ok_or(UploadError::MissingFile)?;
    check_content_type(file.content_type.as_deref())?;
    if file.bytes.len() > max_bytes {
        return Err(UploadError::TooLarge);
    }

    let language = language
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    Ok(AcceptedUpload {
        evaluation_id: new_evaluation_id(),
        document: EncodedDocument {
            data: STANDARD.encode(&file.bytes),
            filename: file.filename,
            content_type: ACCEPTED_CONTENT_TYPE.to_string(),
        },
        language,
    })
}

/// `eval_<unix millis>-<random hex>`. Not globally unique, only unlikely to
/// collide, which is enough for ids that are never persisted.
pub fn new_evaluation_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{EVALUATION_ID_PREFIX}{}-{}",
        Utc::now().timestamp_millis(),
        &random[..12]
    )
}
