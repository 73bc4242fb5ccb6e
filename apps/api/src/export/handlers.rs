use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::export::export_report;
use crate::report::AssembledReport;

/// POST /api/export
///
/// Body: an `AssembledReport`. Responds with the paginated text document as
/// an attachment named after the candidate.
pub async fn handle_export(
    body: Result<Json<AssembledReport>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(report) = body.map_err(|e| {
        warn!("Export rejected: {e}");
        AppError::Validation(format!("Reporte inválido: {}", e.body_text()))
    })?;

    let (filename, text) = export_report(&report);
    info!("Exporting report for {} as {filename}", report.candidate_name);

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        text,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::routes::build_router;
    use crate::state::test_state;

    fn export_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/export")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_export_returns_attachment() {
        let app = build_router(test_state(None));
        let resp = app
            .oneshot(export_request(json!({
                "candidateName": "Ana García",
                "overallScore": 78,
                "strengths": ["Rust"],
                "weaknesses": [],
                "recommendations": ["Añadir enlaces"],
                "technicalAnalysis": "Stack moderno."
            })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["content-disposition"],
            "attachment; filename=\"reporte-cv-ana-garcia.txt\""
        );

        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Reporte de Evaluación de Currículum"));
        assert!(text.contains("Candidato: Ana García"));
        assert!(text.contains("• Añadir enlaces"));
        assert!(text.contains("Stack moderno."));
    }

    #[tokio::test]
    async fn test_export_rejects_out_of_range_score() {
        let app = build_router(test_state(None));
        let resp = app
            .oneshot(export_request(json!({"candidateName": "Ana", "overallScore": 130})))
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
        let bytes = axum::body::to_bytes(resp.into_body(), 4096).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["message"]
            .as_str()
            .unwrap()
            .starts_with("Reporte inválido"));
    }
}
