//! Admin HTTP surface for the ingestion service.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /ingest` – Run one ingestion immediately and return the run report. Returns `409` when
//!   a run (scheduled or manual) is already in progress.
//! - `GET /metrics` – Observe run and document counters plus the last completed run time.
//! - `GET /records` – List the records loaded into the startup cache (vectors omitted).
//! - `POST /ask` – Answer a question with the first cached record as context.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Manual runs go through the same orchestrator as the scheduler, so behavior is identical.

use crate::metrics::MetricsSnapshot;
use crate::processing::{AskError, IngestionApi, RunError, RunReport};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Build the HTTP router exposing the admin surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: IngestionApi + 'static,
{
    Router::new()
        .route("/ingest", post(trigger_ingest::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/records", get(list_records::<S>))
        .route("/ask", post(ask_question::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Run one ingestion now and return its report.
async fn trigger_ingest<S>(State(service): State<Arc<S>>) -> Result<Json<RunReport>, AppError>
where
    S: IngestionApi,
{
    let report = service.trigger_run().await?;
    tracing::info!(
        listed = report.documents_listed,
        upserted = report.records_upserted.len(),
        skipped = report.skipped.len(),
        "Ingest request completed"
    );
    Ok(Json(report))
}

/// Return the current metrics snapshot.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: IngestionApi,
{
    Json(service.metrics_snapshot())
}

/// Cached record as exposed over HTTP.
#[derive(Serialize)]
struct RecordSummary {
    id: String,
    score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

/// Response body for `GET /records`.
#[derive(Serialize)]
struct RecordsResponse {
    records: Vec<RecordSummary>,
}

async fn list_records<S>(State(service): State<Arc<S>>) -> Json<RecordsResponse>
where
    S: IngestionApi,
{
    let records = service
        .cached_records()
        .await
        .into_iter()
        .map(|record| RecordSummary {
            id: record.id,
            score: record.score,
            metadata: record.metadata,
        })
        .collect();
    Json(RecordsResponse { records })
}

/// Request body for `POST /ask`.
#[derive(Deserialize)]
struct AskRequest {
    /// Question forwarded to the completion model.
    question: String,
    /// Optional instructions replacing the default prompt.
    #[serde(default)]
    prompt: Option<String>,
}

/// Response body for `POST /ask`; `answer` is null when the model returned nothing usable.
#[derive(Serialize)]
struct AskResponse {
    answer: Option<String>,
}

async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError>
where
    S: IngestionApi,
{
    let answer = service.ask(request.question, request.prompt).await?;
    Ok(Json(AskResponse { answer }))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "ingest",
                method: "POST",
                path: "/ingest",
                description: "Run one ingestion over the documents directory now. Returns the run report, or 409 while another run is in progress.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return run and document counters useful for observability dashboards.",
                request_example: None,
            },
            CommandDescriptor {
                name: "records",
                method: "GET",
                path: "/records",
                description: "List records loaded from the index at startup, without vectors.",
                request_example: None,
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/ask",
                description: "Answer a question using the first cached record as context. Returns { \"answer\": string | null }.",
                request_example: Some(json!({
                    "question": "What does the latest report cover?",
                    "prompt": "optional instructions"
                })),
            },
        ],
    })
}

enum AppError {
    Run(RunError),
    Ask(AskError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Run(error @ RunError::AlreadyRunning) => (StatusCode::CONFLICT, error.to_string()),
            Self::Ask(error @ AskError::NoContext) => (StatusCode::NOT_FOUND, error.to_string()),
            Self::Ask(error @ AskError::Completion(_)) => (StatusCode::BAD_GATEWAY, error.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<RunError> for AppError {
    fn from(inner: RunError) -> Self {
        Self::Run(inner)
    }
}

impl From<AskError> for AppError {
    fn from(inner: AskError) -> Self {
        Self::Ask(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::completion::CompletionClientError;
    use crate::metrics::MetricsSnapshot;
    use crate::pinecone::IndexMatch;
    use crate::processing::{AskError, IngestionApi, RunError, RunReport};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_ingest_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let ingest = commands
            .iter()
            .find(|cmd| cmd.name == "ingest")
            .expect("ingest command present");

        assert_eq!(ingest.method, "POST");
        assert_eq!(ingest.path, "/ingest");
        assert!(commands.iter().any(|cmd| cmd.path == "/ask"));
    }

    #[tokio::test]
    async fn ingest_route_returns_run_report() {
        let service = Arc::new(StubIngestionService::default());
        let response = send(service.clone(), Method::POST, "/ingest", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["documents_listed"], 2);
        assert_eq!(json["records_upserted"], json!(["rec-a", "rec-b"]));
        assert_eq!(service.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ingest_route_maps_overlap_to_conflict() {
        let service = Arc::new(StubIngestionService {
            busy: true,
            ..StubIngestionService::default()
        });
        let response = send(service, Method::POST, "/ingest", None).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap_or_default().contains("already"));
    }

    #[tokio::test]
    async fn records_route_omits_vectors() {
        let service = Arc::new(StubIngestionService::default());
        let response = send(service, Method::GET, "/records", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let record = &json["records"][0];
        assert_eq!(record["id"], "rec-a");
        assert_eq!(record["metadata"]["filename"], "a.txt");
        assert!(record.get("values").is_none());
    }

    #[tokio::test]
    async fn ask_route_forwards_question_and_prompt() {
        let service = Arc::new(StubIngestionService::default());
        let payload = json!({ "question": "What is in a.txt?", "prompt": "Be brief" });
        let response = send(service.clone(), Method::POST, "/ask", Some(payload)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["answer"], "stub answer");
        let asked = service.asked.lock().await.clone();
        assert_eq!(
            asked,
            vec![("What is in a.txt?".to_string(), Some("Be brief".to_string()))]
        );
    }

    #[tokio::test]
    async fn ask_route_without_context_is_not_found() {
        let service = Arc::new(StubIngestionService {
            empty_cache: true,
            ..StubIngestionService::default()
        });
        let payload = json!({ "question": "Anything?" });
        let response = send(service, Method::POST, "/ask", Some(payload)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ask_route_maps_completion_failure_to_bad_gateway() {
        let service = Arc::new(StubIngestionService {
            failing_completion: true,
            ..StubIngestionService::default()
        });
        let payload = json!({ "question": "Anything?" });
        let response = send(service, Method::POST, "/ask", Some(payload)).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn metrics_route_serializes_snapshot() {
        let service = Arc::new(StubIngestionService::default());
        let response = send(service, Method::GET, "/metrics", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["runs_completed"], 3);
        assert_eq!(json["documents_skipped"], 1);
    }

    async fn send(
        service: Arc<StubIngestionService>,
        method: Method,
        uri: &str,
        payload: Option<Value>,
    ) -> Response {
        let body = payload.map_or_else(Body::empty, |payload| Body::from(payload.to_string()));
        create_router(service)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body)
                    .expect("request"),
            )
            .await
            .expect("router response")
    }

    async fn body_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[derive(Default)]
    struct StubIngestionService {
        busy: bool,
        empty_cache: bool,
        failing_completion: bool,
        runs: AtomicUsize,
        asked: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl IngestionApi for StubIngestionService {
        async fn trigger_run(&self) -> Result<RunReport, RunError> {
            if self.busy {
                return Err(RunError::AlreadyRunning);
            }
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(RunReport {
                documents_listed: 2,
                records_upserted: vec!["rec-a".into(), "rec-b".into()],
                skipped: Vec::new(),
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                runs_completed: 3,
                runs_rejected: 0,
                documents_upserted: 5,
                documents_skipped: 1,
                last_run_at: None,
            }
        }

        async fn cached_records(&self) -> Vec<IndexMatch> {
            let metadata = json!({ "filename": "a.txt", "textSnippet": "alpha" });
            vec![IndexMatch {
                id: "rec-a".into(),
                score: 0.5,
                values: vec![0.1, 0.2],
                metadata: metadata.as_object().cloned(),
            }]
        }

        async fn ask(
            &self,
            question: String,
            prompt: Option<String>,
        ) -> Result<Option<String>, AskError> {
            if self.empty_cache {
                return Err(AskError::NoContext);
            }
            if self.failing_completion {
                return Err(CompletionClientError::InvalidInput.into());
            }
            self.asked.lock().await.push((question, prompt));
            Ok(Some("stub answer".into()))
        }
    }
}
