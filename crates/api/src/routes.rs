use crate::cache::{Cache, CacheStats};
use crate::config::{AppConfig, OperationMode};
use crate::metrics::{Metrics, MetricsSnapshot, TimedOperation};
use crate::retry::RetryPolicy;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use extract::{Extractor, OllamaClient, RawExtraction, Resolver};
use ontology::{PipelineError, ProcessedBatch};
use render::CypherOptions;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub struct AppState {
    pub config: AppConfig,
    pub resolver: Resolver,
    pub extractor: Extractor,
    pub llm_permits: Semaphore,
    pub retry: RetryPolicy,
    pub cache: Cache,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let llm_client = OllamaClient::new(config.llm.base_url.clone(), config.llm.model.clone());
        let extractor = Extractor::new(llm_client).with_max_json_retries(config.llm.max_json_retries);
        let cache_entries = if config.cache.enabled { config.cache.max_entries } else { 0 };

        Self {
            resolver: Resolver::new(config.resolution.id_namespace),
            extractor,
            llm_permits: Semaphore::new(config.concurrency.max_concurrent_llm_calls.max(1)),
            retry: RetryPolicy::from_config(&config.retry),
            cache: Cache::new(cache_entries),
            metrics: Metrics::new(),
            config,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/resolve", post(resolve_batch))
        .route("/extract", post(extract_text))
        .route("/cypher", post(cypher_script))
        .route("/markdown", post(markdown_document))
        .route("/analyze", post(analyze_graph))
        .route("/stats", get(get_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Contract(PipelineError),
    Llm(anyhow::Error),
    Timeout(u64),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Contract(e) => (StatusCode::UNPROCESSABLE_ENTITY, "contract_violation", e.to_string()),
            ApiError::Llm(e) => (StatusCode::BAD_GATEWAY, "llm_error", format!("{:#}", e)),
            ApiError::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "llm_timeout",
                format!("LLM call exceeded {}s", secs),
            ),
        };
        (status, Json(ErrorResponse { error, code })).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    llm: String,
    model: String,
}

#[derive(Deserialize)]
struct ExtractRequest {
    text: String,
}

#[derive(Serialize)]
struct BatchResponse {
    batch_id: Uuid,
    #[serde(flatten)]
    batch: ProcessedBatch,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached: Option<bool>,
}

#[derive(Deserialize)]
struct CypherRequest {
    extraction: RawExtraction,
    #[serde(default)]
    include_constraints: Option<bool>,
    #[serde(default)]
    batch_size: Option<usize>,
}

#[derive(Serialize)]
struct CypherResponse {
    batch_id: Uuid,
    script: String,
    parameters: serde_json::Value,
    report: extract::ResolutionReport,
    typing: Vec<ontology::TypingViolation>,
}

#[derive(Serialize)]
struct CentralEntity {
    id: Uuid,
    label: String,
    degree_centrality: f64,
}

#[derive(Serialize)]
struct AnalysisResponse {
    batch_id: Uuid,
    statistics: render::NetworkStatistics,
    most_central: Vec<CentralEntity>,
    typing: Vec<ontology::TypingViolation>,
}

#[derive(Serialize)]
struct StatsResponse {
    mode: OperationMode,
    metrics: MetricsSnapshot,
    cache: CacheStats,
}

/// Resolve and map one batch, recording metrics.
fn process(state: &AppState, raw: &RawExtraction) -> Result<ProcessedBatch, ApiError> {
    let timer = TimedOperation::start();

    let batch = ontology::process_extraction(&state.resolver, raw).map_err(|e| {
        warn!(error = %e, "Rejecting batch");
        state.metrics.record_contract_violation();
        ApiError::Contract(e)
    })?;

    state.metrics.record_resolution(
        timer.elapsed(),
        batch.graph.entities.len(),
        batch.graph.relations.len(),
        &batch.report,
    );
    info!(
        entities = batch.graph.entities.len(),
        relations = batch.graph.relations.len(),
        diagnostics = batch.report.diagnostic_count(),
        typing_warnings = batch.typing.len(),
        "Batch processed"
    );

    Ok(batch)
}

fn finish<T>(state: &AppState, result: Result<T, ApiError>) -> Result<T, ApiError> {
    state.metrics.record_request(result.is_ok());
    result
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let client = state.extractor.llm_client();
    let url = format!("{}/api/tags", client.base_url());

    let llm = match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => "ok".to_string(),
        Ok(resp) => format!("error: status {}", resp.status()),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse {
        status: "ok",
        llm,
        model: client.model().to_string(),
    })
}

async fn resolve_batch(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawExtraction>,
) -> Result<Json<BatchResponse>, ApiError> {
    let batch_id = Uuid::new_v4();
    let _span = info_span!("resolve", %batch_id).entered();

    let result = process(&state, &raw).map(|batch| {
        Json(BatchResponse {
            batch_id,
            batch,
            cached: None,
        })
    });
    finish(&state, result)
}

/// Fetch extraction JSON for `text`, from the cache or the LLM. Nothing is
/// stored here; `extract_text` caches a reply only once it has been processed.
async fn llm_extraction(state: &AppState, text: &str) -> Result<(String, bool), ApiError> {
    let model = state.extractor.llm_client().model();
    if let Some(json) = state.cache.get_llm_response(model, text) {
        info!("LLM cache hit");
        return Ok((json, true));
    }

    let _permit = state
        .llm_permits
        .acquire()
        .await
        .map_err(|e| ApiError::Llm(e.into()))?;

    let timer = TimedOperation::start();
    let timeout_secs = state.config.concurrency.request_timeout_secs;
    let call = state
        .retry
        .retry("llm_extract", || state.extractor.request_json(text));

    let json = tokio::time::timeout(Duration::from_secs(timeout_secs), call)
        .await
        .map_err(|_| ApiError::Timeout(timeout_secs))?
        .map_err(ApiError::Llm)?;

    state.metrics.record_llm_call(timer.elapsed());
    Ok((json, false))
}

async fn extract_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let batch_id = Uuid::new_v4();

    let result = async {
        if req.text.trim().is_empty() {
            return Err(ApiError::BadRequest("text must not be empty".to_string()));
        }

        let model = state.extractor.llm_client().model();
        let (json, cached) = llm_extraction(&state, &req.text).await?;

        let batch = match extract::parse_extraction(&json)
            .map_err(ApiError::Llm)
            .and_then(|raw| process(&state, &raw))
        {
            Ok(batch) => batch,
            Err(e) => {
                if cached {
                    warn!("Evicting cached LLM reply that no longer processes");
                    state.cache.remove_llm_response(model, &req.text);
                }
                return Err(e);
            }
        };

        if !cached {
            state.cache.set_llm_response(model, &req.text, json);
        }

        Ok(Json(BatchResponse {
            batch_id,
            batch,
            cached: Some(cached),
        }))
    }
    .instrument(info_span!("extract", %batch_id))
    .await;

    finish(&state, result)
}

async fn cypher_script(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CypherRequest>,
) -> Result<Json<CypherResponse>, ApiError> {
    let batch_id = Uuid::new_v4();
    let _span = info_span!("cypher", %batch_id).entered();

    let defaults = CypherOptions::default();
    let options = CypherOptions {
        include_constraints: req.include_constraints.unwrap_or(defaults.include_constraints),
        batch_size: req.batch_size.unwrap_or(defaults.batch_size),
    };

    let result = process(&state, &req.extraction).map(|batch| {
        Json(CypherResponse {
            batch_id,
            script: render::generate_cypher_script(&batch.graph, &options),
            parameters: render::cypher_parameters(&batch.graph, &options),
            report: batch.report,
            typing: batch.typing,
        })
    });
    finish(&state, result)
}

async fn markdown_document(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawExtraction>,
) -> Result<impl IntoResponse, ApiError> {
    let result = process(&state, &raw).map(|batch| {
        (
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            render::render_graph(&batch.graph),
        )
    });
    finish(&state, result)
}

async fn analyze_graph(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawExtraction>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let batch_id = Uuid::new_v4();
    let _span = info_span!("analyze", %batch_id).entered();

    let result = process(&state, &raw).map(|batch| {
        let graph = render::KnowledgeGraph::build(&batch.graph);
        let most_central = graph
            .most_central(10)
            .into_iter()
            .filter_map(|(id, degree_centrality)| {
                graph.node(&id).map(|node| CentralEntity {
                    id,
                    label: node.label.clone(),
                    degree_centrality,
                })
            })
            .collect();

        Json(AnalysisResponse {
            batch_id,
            statistics: graph.statistics(),
            most_central,
            typing: batch.typing,
        })
    });
    finish(&state, result)
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        mode: state.config.mode,
        metrics: state.metrics.snapshot(),
        cache: state.cache.stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::routing::post as post_route;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::new(AppConfig::default()));
        (router(state.clone()), state)
    }

    fn einstein() -> Value {
        json!({
            "entities": [
                {"ref_id": "person_1", "entity_type": "Person", "label": "Albert Einstein"},
                {"ref_id": "place_1", "entity_type": "Place", "label": "Ulm"}
            ],
            "relationships": [
                {"source_ref": "person_1", "target_ref": "place_1", "property_code": "P98", "property_label": "was born"}
            ]
        })
    }

    async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_resolve_endpoint() {
        let (app, state) = app();
        let (status, body) = post(app, "/resolve", einstein()).await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["graph"]["entities"].as_array().unwrap().len(), 2);
        assert_eq!(body["graph"]["relations"][0]["property_code"], "P98");
        assert_eq!(body["report"]["broken_links"].as_array().unwrap().len(), 0);
        assert!(body["typing"].as_array().unwrap().is_empty());
        assert!(body.get("cached").is_none());

        let snapshot = state.metrics.snapshot();
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.entities_resolved, 2);
    }

    #[tokio::test]
    async fn test_broken_links_are_reported_not_rejected() {
        let (app, _) = app();
        let mut payload = einstein();
        payload["relationships"][0]["target_ref"] = json!("missing");

        let (status, body) = post(app, "/resolve", payload).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["report"]["broken_links"][0]["side"], "target");
        assert!(body["graph"]["relations"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_category_is_unprocessable() {
        let (app, state) = app();
        let mut payload = einstein();
        payload["entities"][1]["entity_type"] = json!("Organization");

        let (status, body) = post(app, "/resolve", payload).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["code"], "contract_violation");
        assert!(body["error"].as_str().unwrap().contains("place_1"));
        assert_eq!(state.metrics.snapshot().contract_violations, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_is_unprocessable() {
        let (app, _) = app();
        let mut payload = einstein();
        payload["relationships"][0]["confidence"] = json!(-3.0);

        let (status, body) = post(app, "/resolve", payload).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("confidence -3"));
    }

    #[tokio::test]
    async fn test_cypher_endpoint() {
        let (app, _) = app();
        let payload = json!({ "extraction": einstein(), "include_constraints": false });

        let (status, body) = post(app, "/cypher", payload).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        let script = body["script"].as_str().unwrap();
        assert!(script.contains("UNWIND $nodes_0 AS n"));
        assert!(!script.contains("CONSTRAINT"));
        assert_eq!(body["parameters"]["nodes_0"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_markdown_endpoint() {
        let (app, _) = app();
        let (status, body) = post(app, "/markdown", einstein()).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("### E21 · Person · Albert Einstein"));
    }

    #[tokio::test]
    async fn test_analyze_endpoint() {
        let (app, _) = app();
        let mut payload = einstein();
        payload["entities"]
            .as_array_mut()
            .unwrap()
            .push(json!({"ref_id": "timespan_1", "entity_type": "TimeSpan", "label": "1879"}));
        payload["relationships"]
            .as_array_mut()
            .unwrap()
            .push(json!({"source_ref": "place_1", "target_ref": "timespan_1", "property_code": "P4", "property_label": "has time-span"}));

        let (status, body) = post(app, "/analyze", payload).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["statistics"]["nodes"], 3);
        assert_eq!(body["statistics"]["edges"], 2);
        assert_eq!(body["statistics"]["is_weakly_connected"], true);
        assert_eq!(body["most_central"][0]["label"], "Ulm");
        assert_eq!(body["typing"][0]["mismatch"], "domain");
        assert_eq!(body["typing"][0]["property_code"], "P4");
    }

    #[tokio::test]
    async fn test_extract_rejects_empty_text() {
        let (app, state) = app();
        let (status, _) = post(app, "/extract", json!({ "text": "   " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.metrics.snapshot().failed_requests, 1);
    }

    #[tokio::test]
    async fn test_extract_uses_cached_response() {
        let (app, state) = app();
        let text = "Albert Einstein was born in Ulm.";
        state
            .cache
            .set_llm_response("llama3", text, einstein().to_string());

        let (status, body) = post(app, "/extract", json!({ "text": text })).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["cached"], true);
        assert_eq!(body["graph"]["entities"][0]["label"], "Albert Einstein");
        assert_eq!(state.metrics.snapshot().llm_calls, 0);
    }

    /// Stub Ollama server answering every generate call with `reply`.
    async fn stub_llm(reply: &str) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let reply = reply.to_string();
        let counter = hits.clone();
        let stub = Router::new().route(
            "/api/generate",
            post_route(move || {
                let counter = counter.clone();
                let reply = reply.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "response": reply }))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }

    fn app_with_llm(base_url: String) -> (Router, Arc<AppState>) {
        let mut config = AppConfig::default();
        config.llm.base_url = base_url;
        config.llm.max_json_retries = 1;
        config.retry.max_retries = 0;
        let state = Arc::new(AppState::new(config));
        (router(state.clone()), state)
    }

    #[tokio::test]
    async fn test_extract_caches_processed_reply() {
        let (url, hits) = stub_llm(&einstein().to_string()).await;
        let (app, state) = app_with_llm(url);
        let text = "Albert Einstein was born in Ulm.";

        let (status, body) = post(app.clone(), "/extract", json!({ "text": text })).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["cached"], false);

        let (status, body) = post(app, "/extract", json!({ "text": text })).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["cached"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(state.metrics.snapshot().llm_calls, 1);
    }

    #[tokio::test]
    async fn test_extract_does_not_cache_unparseable_reply() {
        let (url, hits) = stub_llm(r#"{"entities": [{"ref_id": "x"}]}"#).await;
        let (app, state) = app_with_llm(url);
        let text = "Albert Einstein was born in Ulm.";

        for _ in 0..2 {
            let (status, body) = post(app.clone(), "/extract", json!({ "text": text })).await;
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(body["code"], "llm_error");
        }

        // Each request went back to the LLM
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(state.cache.stats().llm_responses_cached, 0);
    }

    #[tokio::test]
    async fn test_extract_evicts_bad_cached_reply() {
        let (url, hits) = stub_llm(&einstein().to_string()).await;
        let (app, state) = app_with_llm(url);
        let text = "Albert Einstein was born in Ulm.";
        state
            .cache
            .set_llm_response("llama3", text, r#"{"entities": [{"ref_id": "x"}]}"#.to_string());

        let (status, _) = post(app.clone(), "/extract", json!({ "text": text })).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(state.cache.get_llm_response("llama3", text).is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let (status, body) = post(app, "/extract", json!({ "text": text })).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["cached"], false);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let (app, _) = app();
        let request = Request::builder().uri("/stats").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["mode"], "balanced");
        assert_eq!(body["metrics"]["total_requests"], 0);
    }
}
