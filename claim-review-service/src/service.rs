use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use claim_core::{
    ClaimDraft, ClaimError, ClaimFile, ClaimRecord, ClaimSession, ClaimSummary,
    ExtractionPipeline, InMemoryStorage,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::llm::{LlmClient, build_claim_context, fallback_classification};
use crate::models::{ChatRequest, ChatResponse, HistoryParams, SubmitClaimRequest};

const DEFAULT_HISTORY_LIMIT: usize = 20;

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn validation_error(field: &str, message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": message,
            "field": field
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ClaimSession>,
    pub pipeline: Arc<ExtractionPipeline>,
    pub llm: Arc<LlmClient>,
}

pub fn create_app() -> Router {
    let app_state = create_app_state();
    build_router(app_state)
}

fn create_app_state() -> AppState {
    let llm = LlmClient::from_env().unwrap_or_else(|e| {
        error!("Failed to create model client: {}", e);
        std::process::exit(1);
    });

    // The ephemeral slot and the durable history are distinct ports so a
    // deployment can give the history a real backing store later without
    // touching the hand-off slot.
    let session = ClaimSession::new(
        Arc::new(InMemoryStorage::new()),
        Arc::new(InMemoryStorage::new()),
    );

    AppState {
        session: Arc::new(session),
        pipeline: Arc::new(ExtractionPipeline::standard()),
        llm: Arc::new(llm),
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/claims", post(submit_claim).get(list_claims))
        .route("/claims/current", get(get_current_claim))
        .route("/chat", post(chat))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Claim Review Service",
        "version": "1.0.0",
        "description": "Insurance claim document review with AI-assisted fraud analysis",
        "endpoints": {
            "POST /claims": "Submit a claim document for extraction and analysis",
            "GET /claims": "List recent claims, most recent first",
            "GET /claims/current": "The most recently submitted claim",
            "POST /chat": "Ask the assistant about the current claim",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn submit_claim(
    State(state): State<AppState>,
    Json(request): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<ClaimRecord>), ApiError> {
    info!(
        patient = %request.patient_name,
        file = %request.file_name,
        "Processing claim submission"
    );

    let bytes = STANDARD
        .decode(&request.file_content)
        .map_err(|e| bad_request_error(&format!("fileContent is not valid base64: {e}")))?;

    let draft = ClaimDraft {
        patient_name: request.patient_name,
        patient_age: request.patient_age,
        claim_amount: request.claim_amount,
        claim_description: request.claim_description,
        file: ClaimFile::new(request.file_name, bytes),
    };

    // Validation runs before any extraction work
    if let Err(e) = draft.validate() {
        return Err(match &e {
            ClaimError::Validation { field, message } => validation_error(field, message),
            other => bad_request_error(&other.to_string()),
        });
    }

    // All strategies exhausted means no transcript to classify, so the
    // submission is aborted and nothing is recorded
    let extracted_text = state.pipeline.extract_text(&draft.file).await.map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    let classification = match state.llm.analyze_for_fraud(&extracted_text).await {
        Ok(classification) => classification,
        Err(e) => {
            warn!(
                error = %e,
                "Fraud analysis failed, substituting degraded-mode classification"
            );
            fallback_classification()
        }
    };

    let record = state
        .session
        .record_submission(draft, extracted_text, classification)
        .await
        .map_err(|e| internal_error("failed to record claim", &e.to_string()))?;

    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_current_claim(State(state): State<AppState>) -> ApiResult<ClaimRecord> {
    match state.session.load_current().await {
        Ok(Some(record)) => Ok(Json(record)),
        // Absence is expected (direct navigation before any upload); point
        // the caller back at the submission endpoint
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "no claim in progress",
                "redirect": "/claims"
            })),
        )),
        Err(e) => Err(internal_error("failed to load current claim", &e.to_string())),
    }
}

async fn list_claims(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Vec<ClaimSummary>> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    state
        .session
        .load_history(limit)
        .await
        .map(Json)
        .map_err(|e| internal_error("failed to load claim history", &e.to_string()))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    if request.message.trim().is_empty() {
        return Err(bad_request_error("message must not be empty"));
    }

    let current = match state.session.load_current().await {
        Ok(current) => current,
        Err(e) => {
            warn!(error = %e, "Could not load current claim for chat context");
            None
        }
    };
    let context = current.as_ref().map(build_claim_context);

    let reply = state
        .llm
        .chat(&request.message, context.as_deref())
        .await
        .map_err(|e| {
            error!(error = %e, "Assistant call failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "assistant is unavailable", "details": e.to_string() })),
            )
        })?;

    Ok(Json(ChatResponse { reply }))
}
