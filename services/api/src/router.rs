//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ChatPayload, ChatResponse, ChatTurn, ErrorResponse, ExamResult, ProgressResponse,
        StatisticsResponse, StatisticsSummary,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::chat,
        handlers::statistics,
        handlers::exam_progress,
    ),
    components(
        schemas(ChatPayload, ChatResponse, ChatTurn, StatisticsResponse, StatisticsSummary, ExamResult, ProgressResponse, ErrorResponse)
    ),
    tags(
        (name = "Examiner API", description = "Chat relay and results for the oral exam assistant")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/chat", post(handlers::chat))
        .route("/statistics", get(handlers::statistics))
        .route("/exams/{email}/progress", get(handlers::exam_progress))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use examiner_core::{
        agent::{AgentSettings, ExamAgent},
        error::CompletionError,
        llm_client::{ChatMessage, Completion, CompletionService, OperationRequest},
        operation::OperationSpec,
        registry::{Candidate, CandidateRegistry},
        service::ExamService,
        topic::TopicCatalog,
    };
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Replays a fixed list of completions, one per call.
    struct Scripted(Mutex<Vec<Completion>>);

    #[async_trait]
    impl CompletionService for Scripted {
        async fn complete(
            &self,
            _credential: &str,
            _transcript: &[ChatMessage],
            _operations: &[OperationSpec],
        ) -> Result<Completion, CompletionError> {
            let mut script = self.0.lock().unwrap();
            Ok(if script.is_empty() {
                Completion::Reply("...".into())
            } else {
                script.remove(0)
            })
        }
    }

    fn app(script: Vec<Completion>) -> Router {
        let service = ExamService::new(
            CandidateRegistry::new(vec![Candidate::new("a@x.io", "A", true)]),
            TopicCatalog::new(vec!["One".into(), "Two".into(), "Three".into()]).unwrap(),
        );
        let agent = ExamAgent::new(
            Arc::new(tokio::sync::Mutex::new(service)),
            Arc::new(Scripted(Mutex::new(script))),
            Arc::new("You are an examiner.".to_string()),
            AgentSettings::default(),
        );
        let config = Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            completion_api_base: "http://localhost/v1".into(),
            chat_model: "test-model".into(),
            log_level: tracing::Level::INFO,
            prompts_path: "./prompts".into(),
            exam_data_path: None,
            max_operation_rounds: 3,
            credential_prefix: "gsk_".into(),
            max_completion_tokens: 500,
            temperature: 0.7,
        };
        create_router(Arc::new(AppState {
            agent: Arc::new(agent),
            config: Arc::new(config),
        }))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_chat(body: Value) -> Request<Body> {
        Request::post("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn chat_starts_exam_and_progress_reflects_it() {
        let app = app(vec![
            Completion::Operations(vec![OperationRequest {
                call_id: "c1".into(),
                name: "start_exam".into(),
                arguments: r#"{"email": "a@x.io", "name": "A"}"#.into(),
            }]),
            Completion::Reply("Tell me about topic one.".into()),
        ]);

        let (status, body) = send(
            &app,
            post_chat(json!({"message": "I'm A, a@x.io", "api_key": "gsk_abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "Tell me about topic one.");
        assert_eq!(body["history"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            Request::get("/exams/a@x.io/progress").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "in_progress");
        assert_eq!(body["topic_number"], 1);
        assert_eq!(body["questions_on_topic"], 0);
        assert_eq!(body["allowed_operations"], json!(["next_topic"]));
    }

    #[tokio::test]
    async fn chat_reports_credential_problems_in_reply() {
        let app = app(vec![]);
        let history = json!([{"user": "hi", "assistant": "hello"}]);
        let (status, body) = send(
            &app,
            post_chat(json!({"message": "start", "history": history, "api_key": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["reply"].as_str().unwrap().contains("API key"));
        assert_eq!(body["history"], history);
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let app = app(vec![]);
        let (status, body) = send(&app, post_chat(json!({"message": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn statistics_and_unknown_progress() {
        let app = app(vec![]);
        let (status, body) = send(
            &app,
            Request::get("/statistics").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"], "No exams have been completed yet.");
        assert!(body["summary"].is_null());

        let (status, _) = send(
            &app,
            Request::get("/exams/nobody@x.io/progress").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn openapi_lists_all_paths() {
        let doc = ApiDoc::openapi();
        let paths = doc.paths.paths;
        assert!(paths.contains_key("/chat"));
        assert!(paths.contains_key("/statistics"));
        assert!(paths.contains_key("/exams/{email}/progress"));
    }
}
