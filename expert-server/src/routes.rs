//! HTTP surface over the session API and the rule-base admin surface.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use inference_engine::{AnswerOutcome, RuleEdit};
use rule_schema::CanonicalRuleV1;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;
use crate::wire::rule_from_wire;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sessions", post(start_session))
        .route("/sessions/:id/answer", post(answer))
        .route("/sessions/:id/undo", post(undo))
        .route("/sessions/:id/rules", get(rules_view))
        .route("/sessions/:id/memory", get(memory_view))
        .route("/admin/rules", post(create_rule))
        .route("/admin/rules/:id", put(update_rule).delete(delete_rule))
        .route("/admin/rules/:id/enabled", patch(set_enabled))
        .route("/admin/rules/:id/test-modification", post(test_modification))
        .route("/admin/validate", post(validate))
        .with_state(state)
}

#[derive(Serialize)]
struct StartSessionResponse {
    session_id: String,
    next_question: Option<String>,
}

async fn start_session(State(state): State<Arc<AppState>>) -> Json<StartSessionResponse> {
    let base = {
        let guard = state.rule_base.lock().expect("rule base mutex poisoned");
        Arc::new(guard.clone())
    };
    let (session_id, next_question) = state.sessions.start(base, state.goals.clone());
    tracing::info!(session = %session_id, "session started");
    Json(StartSessionResponse { session_id, next_question })
}

#[derive(Deserialize)]
struct AnswerRequest {
    fact: String,
    answer: String,
}

async fn answer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerOutcome>, ApiError> {
    let (outcome, _events) = state.sessions.answer(&id, &req.fact, &req.answer)?;
    Ok(Json(outcome))
}

#[derive(Serialize)]
struct UndoResponse {
    next_question: Option<String>,
    could_undo: bool,
}

async fn undo(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<UndoResponse>, ApiError> {
    let (next_question, could_undo) = state.sessions.undo(&id)?;
    Ok(Json(UndoResponse { next_question, could_undo }))
}

async fn rules_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<std::collections::BTreeMap<u32, inference_engine::RuleStatus>>, ApiError> {
    Ok(Json(state.sessions.rules_view(&id)?))
}

async fn memory_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<inference_engine::WorkingMemoryState>, ApiError> {
    Ok(Json(state.sessions.working_memory_view(&id)?))
}

#[derive(Deserialize)]
struct VersionQuery {
    #[serde(default)]
    expected_version: u32,
}

#[derive(Serialize)]
struct EditResponse {
    version: u32,
}

async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(wire): Json<CanonicalRuleV1>,
) -> Result<Json<EditResponse>, ApiError> {
    let rule = rule_from_wire(wire)?;
    let mut base = state.rule_base.lock().expect("rule base mutex poisoned");
    let version = base.apply_edit(RuleEdit::Create(rule), 0)?;
    tracing::info!(version, "rule created");
    Ok(Json(EditResponse { version }))
}

async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Query(q): Query<VersionQuery>,
    Json(wire): Json<CanonicalRuleV1>,
) -> Result<Json<EditResponse>, ApiError> {
    let mut rule = rule_from_wire(wire)?;
    rule.id = id;
    let mut base = state.rule_base.lock().expect("rule base mutex poisoned");
    let version = base.apply_edit(RuleEdit::Update(rule), q.expected_version)?;
    tracing::info!(rule = id, version, "rule updated");
    Ok(Json(EditResponse { version }))
}

async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Query(q): Query<VersionQuery>,
) -> Result<Json<EditResponse>, ApiError> {
    let mut base = state.rule_base.lock().expect("rule base mutex poisoned");
    let version = base.apply_edit(RuleEdit::Delete(id), q.expected_version)?;
    tracing::info!(rule = id, "rule deleted");
    Ok(Json(EditResponse { version }))
}

#[derive(Deserialize)]
struct SetEnabledRequest {
    enabled: bool,
    expected_version: u32,
}

async fn set_enabled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(req): Json<SetEnabledRequest>,
) -> Result<Json<EditResponse>, ApiError> {
    let mut base = state.rule_base.lock().expect("rule base mutex poisoned");
    let version = base.apply_edit(
        RuleEdit::SetEnabled { id, enabled: req.enabled },
        req.expected_version,
    )?;
    tracing::info!(rule = id, enabled = req.enabled, "rule enabled flag changed");
    Ok(Json(EditResponse { version }))
}

async fn validate(State(state): State<Arc<AppState>>) -> Json<inference_engine::ValidationReport> {
    Json(state.validate_current())
}

async fn test_modification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(wire): Json<CanonicalRuleV1>,
) -> Result<Json<inference_engine::ValidationReport>, ApiError> {
    let mut rule = rule_from_wire(wire)?;
    rule.id = id;
    let base = state.rule_base.lock().expect("rule base mutex poisoned");
    let goal_facts: Vec<String> = state.goals.iter().map(|g| g.fact.clone()).collect();
    Ok(Json(inference_engine::validator::test_rule_modification(&base, rule, &goal_facts)))
}
