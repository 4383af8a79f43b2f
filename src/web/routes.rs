//! REST API routes

use super::AppState;
use crate::catalog::{FrameworkInfo, RiskCatalogEntry};
use crate::error::{EngineError, SkippedFile};
use crate::{SystemAnalysis, UploadedFile};
use axum::{extract::State, http::StatusCode, Json};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

// ============================================================================
// Status
// ============================================================================

#[derive(Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub catalog_version: String,
    pub profile: String,
    pub classifier: String,
    pub classifier_enabled: bool,
    pub risks: usize,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds()
        .max(0) as u64;
    let engine = &state.engine;

    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        catalog_version: engine.catalog().version().to_string(),
        profile: engine.profile().to_string(),
        classifier: engine.classifier_name().to_string(),
        classifier_enabled: engine.classifier_enabled(),
        risks: engine.catalog().risks().len(),
    })
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Serialize)]
pub struct CatalogResponse {
    pub version: String,
    pub risks: Vec<RiskCatalogEntry>,
}

pub async fn get_catalog(State(state): State<Arc<AppState>>) -> Json<CatalogResponse> {
    let catalog = state.engine.catalog();
    Json(CatalogResponse {
        version: catalog.version().to_string(),
        risks: catalog.risks().to_vec(),
    })
}

pub async fn get_frameworks(State(state): State<Arc<AppState>>) -> Json<Vec<FrameworkInfo>> {
    Json(state.engine.catalog().frameworks().to_vec())
}

// ============================================================================
// Analysis
// ============================================================================

#[derive(Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    pub content_base64: String,
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub files: Vec<UploadRequest>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<SkippedFile>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: String, skipped_files: Vec<SkippedFile>) -> ApiError {
    (status, Json(ErrorResponse { error, skipped_files }))
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<SystemAnalysis>, ApiError> {
    let mut files = Vec::with_capacity(body.files.len());
    for upload in body.files {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(upload.content_base64.trim())
            .map_err(|e| {
                api_error(
                    StatusCode::BAD_REQUEST,
                    format!("invalid base64 for {}: {}", upload.filename, e),
                    vec![],
                )
            })?;
        files.push(UploadedFile::new(upload.filename, bytes));
    }

    let engine = Arc::clone(&state.engine);
    match engine.analyze_system_concurrent(files, state.jobs).await {
        Ok(analysis) => Ok(Json(analysis)),
        Err(EngineError::NoValidFiles { skipped }) => Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "no valid files to analyze".to_string(),
            skipped,
        )),
        Err(e) => {
            warn!("Analysis failed: {}", e);
            Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string(), vec![]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::ScoringProfile;
    use crate::catalog::{Catalog, CatalogVersion};
    use crate::web::router;
    use crate::Engine;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let engine = Engine::offline(
            Catalog::builtin(CatalogVersion::Core).unwrap(),
            ScoringProfile::Standard,
        );
        router(Arc::new(AppState::new(Arc::new(engine), 2)))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(text)
    }

    fn post_analyze(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_status() {
        let response = app()
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["classifier_enabled"], false);
        assert_eq!(body["risks"], 10);
        assert_eq!(body["profile"], "standard");
    }

    #[tokio::test]
    async fn test_frameworks() {
        let response = app()
            .oneshot(Request::builder().uri("/api/frameworks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), 6);
        assert_eq!(body[0]["id"], "EU_AI_ACT");
    }

    #[tokio::test]
    async fn test_analyze_uploaded_files() {
        let request = post_analyze(serde_json::json!({
            "files": [
                {"filename": "config.json", "content_base64": encode("password = \"x\"")},
                {"filename": "api.py", "content_base64": encode("def handle_request(): eval(input())")}
            ]
        }));
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["files_analyzed"], 2);
        assert_eq!(body["files_data"][0]["filename"], "config.json");
        assert_eq!(body["cross_file_risks"].as_array().unwrap().len(), 2);
        assert_eq!(body["mode"], "fallback");
    }

    #[tokio::test]
    async fn test_analyze_without_valid_files() {
        let request = post_analyze(serde_json::json!({
            "files": [{"filename": "empty.py", "content_base64": ""}]
        }));
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["skipped_files"][0]["filename"], "empty.py");
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_base64() {
        let request = post_analyze(serde_json::json!({
            "files": [{"filename": "a.py", "content_base64": "***"}]
        }));
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
