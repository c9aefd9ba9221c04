//! Route handlers.
//!
//! Endpoints:
//! - `GET  /health`                          — cleanup pass + per-tier counts
//! - `POST /tasks`                           — run the orchestration pipeline
//! - `POST /chat`                            — memory-augmented single completion
//! - `POST /generate-code`                   — code completion over `code` memories
//! - `POST /process_message`                 — completion over workspace resources
//! - `POST /knowledge`                       — store knowledge
//! - `POST /knowledge/search`                — ranked retrieval
//! - `GET|DELETE /knowledge/{tier}/{id}`     — fetch or delete one item
//! - `POST /knowledge/{tier}/{id}/retier`    — move an item to another tier
//! - `POST /manage-memory`                   — set an item's importance
//! - `GET  /tools`                           — list tools
//! - `POST /tools/{name}`                    — invoke a tool

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mastermind_agent::{PipelineRun, ResourceContextProvider};
use mastermind_core::agent::{ModelTier, TaskInput, TaskResult};
use mastermind_core::context::{ContextProvider, ContextSnippet};
use mastermind_core::error::Error;
use mastermind_core::knowledge::{KnowledgeItem, Tier};
use mastermind_core::provider::CompletionRequest;
use mastermind_core::tool::{ToolName, ToolOutput};
use mastermind_memory::{RetrieveRequest, StoreRequest, TierCounts};

use crate::{ApiError, SharedState, api_error, error_response};

const CHAT_MEMORY_RESULTS: usize = 3;
const RESOURCE_CONTEXT_LIMIT: usize = 5;
const MAX_RESOURCE_FILES: usize = 200;
const MAX_RESOURCE_BYTES: u64 = 64 * 1024;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/tasks", post(task_handler))
        .route("/chat", post(chat_handler))
        .route("/generate-code", post(generate_code_handler))
        .route("/process_message", post(process_message_handler))
        .route("/knowledge", post(store_knowledge_handler))
        .route("/knowledge/search", post(search_knowledge_handler))
        .route(
            "/knowledge/{tier}/{id}",
            get(get_knowledge_handler).delete(delete_knowledge_handler),
        )
        .route("/knowledge/{tier}/{id}/retier", post(retier_handler))
        .route("/manage-memory", post(manage_memory_handler))
        .route("/tools", get(list_tools_handler))
        .route("/tools/{name}", post(invoke_tool_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Items removed by the cleanup pass this check ran
    pub evicted: usize,
    pub memory_layers: TierCounts,
}

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub task: TaskInput,
    /// Return the strategy, worker results and stages as well
    #[serde(default)]
    pub trace: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskResponse {
    Traced(PipelineRun),
    Result(TaskResult),
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub model: String,
    pub memories: Vec<KnowledgeItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub prompt: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "python".into()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CodeResponse {
    pub code: String,
    pub language: String,
    pub model: String,
    pub memories: Vec<KnowledgeItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
    /// Tier name or alias ("fast", "sonnet", ...) or a configured model id
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub content: String,
    pub model: String,
    /// Names of the workspace resources used as context
    pub resources: Vec<String>,
    pub memories: Vec<KnowledgeItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreResponse {
    pub id: String,
    pub tier: Tier,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<KnowledgeItem>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct RetierRequest {
    pub to: Tier,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetierResponse {
    pub id: String,
    pub from: Tier,
    pub to: Tier,
}

#[derive(Debug, Deserialize)]
pub struct ManageMemoryRequest {
    pub entry_id: String,
    pub importance: f32,
    #[serde(default = "default_memory_type")]
    pub memory_type: String,
}

fn default_memory_type() -> String {
    Tier::LongTerm.as_str().to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolDto {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDto>,
    pub count: usize,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<SharedState>) -> Result<Json<HealthResponse>, ApiError> {
    let report = state.engine.cleanup_memories().await.map_err(error_response)?;
    let counts = state.engine.tier_counts().await.map_err(error_response)?;
    debug!(evicted = report.total(), "Health check with memory cleanup completed");

    Ok(Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        evicted: report.total(),
        memory_layers: counts,
    }))
}

async fn task_handler(
    State(state): State<SharedState>,
    Json(payload): Json<TaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    if let TaskInput::Text(ref text) = payload.task
        && text.trim().is_empty()
    {
        return Err(api_error(StatusCode::BAD_REQUEST, "task must not be empty"));
    }

    info!(trace = payload.trace, "Task received");
    if payload.trace {
        let run = state.orchestrator.process_task_traced(&payload.task).await;
        Ok(Json(TaskResponse::Traced(run)))
    } else {
        let result = state.orchestrator.process_task(&payload.task).await;
        Ok(Json(TaskResponse::Result(result)))
    }
}

/// Build the chat prompt: relevant memories, caller context, then the message.
fn chat_prompt(message: &str, context: &str, memories: &[KnowledgeItem]) -> String {
    let mut sections: Vec<String> = memories
        .iter()
        .map(|m| format!("Relevant memory: {}", m.content))
        .collect();
    if !context.trim().is_empty() {
        sections.push(format!("Additional context: {context}"));
    }
    sections.push(format!("Original message: {message}"));
    sections.join("\n\n")
}

async fn recall(
    state: &SharedState,
    request: RetrieveRequest,
) -> Result<Vec<KnowledgeItem>, ApiError> {
    state
        .engine
        .retrieve_knowledge(
            request
                .max_results(CHAT_MEMORY_RESULTS)
                .min_importance(state.config.memory.default_min_importance),
        )
        .await
        .map_err(error_response)
}

async fn complete(state: &SharedState, model: &str, prompt: String) -> Result<String, ApiError> {
    let models = &state.config.models;
    let request = CompletionRequest::new(model, prompt)
        .with_max_tokens(models.max_tokens)
        .with_temperature(models.temperature);
    state
        .provider
        .complete(request)
        .await
        .map(|completion| completion.text)
        .map_err(|e| error_response(Error::Completion(e)))
}

/// Store a reply as knowledge. Failures are logged, never returned.
async fn remember(state: &SharedState, text: &str, category: &str, importance: f32) -> Option<String> {
    let store = StoreRequest::new(text)
        .category(category)
        .importance(importance);
    match state.engine.store_knowledge(store).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(error = %e, category, "Failed to store response");
            None
        }
    }
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must not be empty"));
    }

    let memories = recall(&state, RetrieveRequest::new(payload.message.clone())).await?;
    let model = state.config.models.model_for(ModelTier::Premium).to_string();
    let response = complete(
        &state,
        &model,
        chat_prompt(&payload.message, &payload.context, &memories),
    )
    .await?;
    let knowledge_id = remember(
        &state,
        &response,
        "chat_response",
        state.config.memory.chat_response_importance,
    )
    .await;

    Ok(Json(ChatResponse {
        response,
        model,
        memories,
        knowledge_id,
    }))
}

fn code_prompt(prompt: &str, language: &str, memories: &[KnowledgeItem]) -> String {
    let mut sections: Vec<String> = memories
        .iter()
        .map(|m| format!("Relevant code memory: {}", m.content))
        .collect();
    sections.push(format!("Generation request ({language}): {prompt}"));
    sections.join("\n\n")
}

async fn generate_code_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CodeRequest>,
) -> Result<Json<CodeResponse>, ApiError> {
    if payload.prompt.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "prompt must not be empty"));
    }

    let query = format!("Code generation for {}: {}", payload.language, payload.prompt);
    let memories = recall(&state, RetrieveRequest::new(query).category("code")).await?;
    let model = state.config.models.model_for(ModelTier::Premium).to_string();
    let code = complete(
        &state,
        &model,
        code_prompt(&payload.prompt, &payload.language, &memories),
    )
    .await?;
    let knowledge_id = remember(&state, &code, "code", state.config.memory.code_importance).await;
    info!(language = %payload.language, memories = memories.len(), "Generated code");

    Ok(Json(CodeResponse {
        code,
        language: payload.language,
        model,
        memories,
        knowledge_id,
    }))
}

fn message_prompt(message: &str, resources: &[ContextSnippet], memories: &[KnowledgeItem]) -> String {
    let mut sections: Vec<String> = memories
        .iter()
        .map(|m| format!("Relevant memory: {}", m.content))
        .collect();
    sections.extend(
        resources
            .iter()
            .map(|r| format!("Resource {}:\n{}", r.source, r.content)),
    );
    sections.push(format!("Original message: {message}"));
    sections.join("\n\n")
}

async fn process_message_handler(
    State(state): State<SharedState>,
    Json(payload): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must not be empty"));
    }
    let model = state
        .config
        .models
        .resolve(&payload.model)
        .map_err(error_response)?
        .to_string();

    let resources = state
        .workspace
        .resources(MAX_RESOURCE_FILES, MAX_RESOURCE_BYTES)
        .await
        .map_err(|e| error_response(Error::Internal(format!("failed to read workspace: {e}"))))?;
    let provider = resources
        .into_iter()
        .fold(ResourceContextProvider::new(), |provider, resource| {
            provider.with_resource(resource)
        });
    let snippets = provider
        .get_context(&payload.message, RESOURCE_CONTEXT_LIMIT)
        .await
        .map_err(error_response)?;

    let memories = recall(&state, RetrieveRequest::new(payload.message.clone())).await?;
    let content = complete(
        &state,
        &model,
        message_prompt(&payload.message, &snippets, &memories),
    )
    .await?;
    let knowledge_id = remember(
        &state,
        &content,
        "message_response",
        state.config.memory.message_response_importance,
    )
    .await;

    Ok(Json(MessageResponse {
        content,
        model,
        resources: snippets.into_iter().map(|s| s.source).collect(),
        memories,
        knowledge_id,
    }))
}

async fn store_knowledge_handler(
    State(state): State<SharedState>,
    Json(payload): Json<StoreRequest>,
) -> Result<(StatusCode, Json<StoreResponse>), ApiError> {
    if payload.content.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "content must not be empty"));
    }

    let tier = state
        .engine
        .policy()
        .route(payload.importance, payload.is_context_specific);
    let id = state
        .engine
        .store_knowledge(payload)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(StoreResponse { id, tier })))
}

async fn search_knowledge_handler(
    State(state): State<SharedState>,
    Json(payload): Json<RetrieveRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let results = state
        .engine
        .retrieve_knowledge(payload)
        .await
        .map_err(error_response)?;
    let count = results.len();
    Ok(Json(SearchResponse { results, count }))
}

fn parse_tier(tier: &str) -> Result<Tier, ApiError> {
    tier.parse().map_err(error_response)
}

fn item_not_found(id: &str, tier: Tier) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        format!("knowledge item '{id}' not found in {tier}"),
    )
}

async fn get_knowledge_handler(
    State(state): State<SharedState>,
    Path((tier, id)): Path<(String, String)>,
) -> Result<Json<KnowledgeItem>, ApiError> {
    let tier = parse_tier(&tier)?;
    state
        .engine
        .get_knowledge(&id, tier)
        .await
        .map_err(error_response)?
        .map(Json)
        .ok_or_else(|| item_not_found(&id, tier))
}

async fn delete_knowledge_handler(
    State(state): State<SharedState>,
    Path((tier, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let tier = parse_tier(&tier)?;
    let deleted = state
        .engine
        .delete_knowledge(&id, tier)
        .await
        .map_err(error_response)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(item_not_found(&id, tier))
    }
}

async fn retier_handler(
    State(state): State<SharedState>,
    Path((tier, id)): Path<(String, String)>,
    Json(payload): Json<RetierRequest>,
) -> Result<Json<RetierResponse>, ApiError> {
    let from = parse_tier(&tier)?;
    let moved = state
        .engine
        .retier(&id, from, payload.to)
        .await
        .map_err(error_response)?;
    if !moved {
        return Err(item_not_found(&id, from));
    }
    Ok(Json(RetierResponse {
        id,
        from,
        to: payload.to,
    }))
}

async fn manage_memory_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ManageMemoryRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let updated = state
        .engine
        .update_importance(&payload.entry_id, payload.importance, &payload.memory_type)
        .await
        .map_err(error_response)?;
    if !updated {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!(
                "memory '{}' not found in {}",
                payload.entry_id, payload.memory_type
            ),
        ));
    }
    Ok(Json(StatusResponse {
        status: "success".into(),
        message: "Memory updated successfully".into(),
    }))
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools: Vec<ToolDto> = state
        .tools
        .names()
        .into_iter()
        .filter_map(|name| state.tools.get(name))
        .map(|tool| ToolDto {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
        })
        .collect();
    let count = tools.len();
    Json(ToolListResponse { tools, count })
}

async fn invoke_tool_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<ToolOutput>, ApiError> {
    if name.parse::<ToolName>().is_err() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("tool '{name}' not found"),
        ));
    }
    let output = state
        .tools
        .invoke_by_name(&name, params)
        .await
        .map_err(error_response)?;
    Ok(Json(output))
}
