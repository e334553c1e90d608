pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

/// Files in one multipart upload, on top of the per-file limit.
const MAX_FILES_PER_UPLOAD: usize = 20;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_mul(MAX_FILES_PER_UPLOAD);

    Router::new()
        .route("/health", get(health::health_handler))
        // Documents
        .route(
            "/api/v1/documents",
            post(handlers::handle_upload).get(handlers::handle_list_documents),
        )
        .route(
            "/api/v1/documents/:id",
            get(handlers::handle_get_document).delete(handlers::handle_delete_document),
        )
        // Screening
        .route("/api/v1/skills/extract", post(handlers::handle_extract_skills))
        .route("/api/v1/screenings", post(handlers::handle_run_screening))
        .route(
            "/api/v1/screenings/progress",
            get(handlers::handle_progress),
        )
        .route("/api/v1/screenings/latest", get(handlers::handle_latest))
        .route("/api/v1/session/reset", post(handlers::handle_reset))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::models::screening::SkillSet;
    use crate::screening::ingest::DocumentIngestor;
    use crate::screening::orchestrator::ScreeningOrchestrator;
    use crate::screening::testing::{raw_assessment, StubExtractor, StubScorer};

    const BOUNDARY: &str = "screener-test-boundary";

    fn test_state(scorer: StubScorer) -> AppState {
        let config = Config {
            anthropic_api_key: "test".to_string(),
            port: 0,
            rust_log: "info".to_string(),
            max_concurrent_evaluations: 2,
            scorer_timeout_secs: 5,
            max_upload_bytes: 64,
        };
        let ingestor = Arc::new(DocumentIngestor::new(Arc::new(StubExtractor::default())));
        let orchestrator =
            ScreeningOrchestrator::new(ingestor, Arc::new(scorer), config.screening_settings());
        AppState {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn upload_request(files: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, content) in files {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/api/v1/documents")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_service() {
        let app = build_router(test_state(StubScorer::new()));
        let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "screener-api");
    }

    #[tokio::test]
    async fn test_progress_starts_idle() {
        let app = build_router(test_state(StubScorer::new()));
        let response = app
            .oneshot(empty_request("GET", "/api/v1/screenings/progress"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["stage"], "idle");
        assert_eq!(body["current_step"], 0);
        assert_eq!(body["total_steps"], 4);
    }

    #[tokio::test]
    async fn test_latest_is_not_found_before_any_run() {
        let app = build_router(test_state(StubScorer::new()));
        let response = app
            .oneshot(empty_request("GET", "/api/v1/screenings/latest"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_screening_without_documents_is_empty_batch() {
        let app = build_router(test_state(StubScorer::new()));
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/screenings",
                r#"{"title": "Data Engineer", "description": "SQL"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "EMPTY_BATCH");
    }

    #[tokio::test]
    async fn test_screening_without_title_is_rejected() {
        let app = build_router(test_state(StubScorer::new()));
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/screenings",
                r#"{"title": "", "description": "SQL"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected() {
        let state = test_state(StubScorer::new());
        let app = build_router(state.clone());
        let response = app
            .oneshot(upload_request(&[("notes.txt", "ok"), ("virus.exe", "MZ")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        // Nothing from a rejected batch is registered.
        assert!(state.orchestrator.ingestor().list().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let app = build_router(test_state(StubScorer::new()));
        let big = "x".repeat(65);
        let response = app
            .oneshot(upload_request(&[("big.txt", big.as_str())]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_then_screen_then_reset() {
        let scorer = StubScorer::new()
            .with_skills(SkillSet {
                required: vec!["SQL".to_string()],
                ..SkillSet::default()
            })
            .with_assessment("ada resume", raw_assessment("Ada", 88.0, 80.0, &[("SQL", true, 0.95)]))
            .with_assessment("bob resume", raw_assessment("Bob", 61.0, 55.0, &[]));
        let state = test_state(scorer);
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(upload_request(&[("bob.txt", "bob resume"), ("ada.md", "ada resume")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let documents = json_body(response).await;
        assert_eq!(documents.as_array().unwrap().len(), 2);
        assert_eq!(documents[0]["status"], "queued");

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/screenings",
                r#"{"title": "Analyst", "description": "Strong SQL required"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = json_body(response).await;
        assert_eq!(outcome["rankings"][0]["candidate_name"], "Ada");
        assert_eq!(outcome["rankings"][0]["rank"], 1);
        assert_eq!(outcome["rankings"][1]["candidate_name"], "Bob");
        assert_eq!(outcome["summary"]["excellent_matches"], 1);
        assert_eq!(outcome["summary"]["good_matches"], 1);

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/v1/screenings/latest"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(empty_request("POST", "/api/v1/session/reset"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(empty_request("GET", "/api/v1/documents"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, serde_json::json!([]));
        assert!(state.orchestrator.latest().is_none());
    }

    #[tokio::test]
    async fn test_uploaded_document_can_be_fetched_and_deleted() {
        let app = build_router(test_state(StubScorer::new()));
        let response = app
            .clone()
            .oneshot(upload_request(&[("jane.txt", "Jane Doe")]))
            .await
            .unwrap();
        let documents = json_body(response).await;
        let uri = format!("/api/v1/documents/{}", documents[0]["id"].as_str().unwrap());

        let response = app.clone().oneshot(empty_request("GET", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let document = json_body(response).await;
        assert_eq!(document["file_name"], "jane.txt");
        assert!(document.get("text").is_none());

        let response = app.clone().oneshot(empty_request("DELETE", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app.oneshot(empty_request("GET", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_unknown_document_is_not_found() {
        let app = build_router(test_state(StubScorer::new()));
        let uri = format!("/api/v1/documents/{}", uuid::Uuid::new_v4());
        let response = app.oneshot(empty_request("DELETE", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_skill_preview_uses_scorer() {
        let scorer = StubScorer::new().with_skills(SkillSet {
            required: vec!["Kubernetes".to_string()],
            ..SkillSet::default()
        });
        let app = build_router(test_state(scorer));
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/skills/extract",
                r#"{"description": "Run our Kubernetes clusters"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let skills = json_body(response).await;
        assert_eq!(skills["required"][0], "Kubernetes");
    }
}
