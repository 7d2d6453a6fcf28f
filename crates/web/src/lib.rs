//! HTTP surface of the session engine.
//!
//! Thin handlers: parse the request, call the [`SessionStore`], map the
//! result. Every non-2xx response carries an [`ErrorBody`].

use airlock_core::{GameError, JoinCode, OwnerId, PlayerSlot, PlayerToken, SessionId};
use airlock_puzzle::PuzzleOverrides;
use airlock_server::{PlayerPatch, SessionStore};
use airlock_types::{
    ClueAnswerRequest, CombatAction, CombatAdminAction, CreateSessionRequest,
    CreateSessionResponse, ErrorBody, JoinRequest, ListSessionsResult, SubmitAnswerRequest,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

type AppState = Arc<SessionStore>;

pub fn router(store: Arc<SessionStore>) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route(
            "/api/sessions/{id}",
            get(session_by_id).delete(delete_session),
        )
        .route("/api/sessions/{id}/end", post(end_session))
        .route("/api/sessions/{id}/config", put(update_config))
        .route("/api/sessions/{id}/combat", post(combat_admin))
        .route("/api/sessions/{id}/players/{slot}", patch(patch_player))
        .route("/api/codes/{code}", get(session_by_code))
        .route("/api/join", post(join))
        .route("/api/players/{token}", get(player_status))
        .route("/api/players/{token}/answer", post(submit_answer))
        .route("/api/players/{token}/combat", post(combat_action))
        .route("/api/players/{token}/clue", post(submit_clue))
        .route("/api/players/{token}/events", get(poll_events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(store)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub struct ApiError(GameError);

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &GameError) -> StatusCode {
    match err {
        GameError::NotFound(_) => StatusCode::NOT_FOUND,
        GameError::Unauthorized => StatusCode::FORBIDDEN,
        GameError::Conflict(_) => StatusCode::CONFLICT,
        GameError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GameError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            kind: self.0.kind().to_string(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn not_found(what: &'static str) -> ApiError {
    ApiError(GameError::NotFound(what))
}

/// Malformed codes cannot name a session.
fn parse_code(input: &str) -> Result<JoinCode, ApiError> {
    JoinCode::parse(input).map_err(|_| not_found("session"))
}

// ---------------------------------------------------------------------------
// Request bodies local to the HTTP layer
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    owner_id: String,
}

#[derive(Debug, Deserialize)]
struct OwnerBody {
    owner_id: String,
}

#[derive(Debug, Deserialize)]
struct ConfigBody {
    owner_id: String,
    #[serde(default)]
    overrides: PuzzleOverrides,
}

#[derive(Debug, Deserialize)]
struct CombatAdminBody {
    owner_id: String,
    #[serde(flatten)]
    action: CombatAdminAction,
}

#[derive(Debug, Deserialize)]
struct PlayerPatchBody {
    owner_id: String,
    #[serde(flatten)]
    patch: PlayerPatch,
}

#[derive(Debug, Deserialize)]
struct CursorQuery {
    #[serde(default)]
    cursor: u64,
}

// ---------------------------------------------------------------------------
// Administrator routes
// ---------------------------------------------------------------------------

async fn create_session(
    State(store): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<CreateSessionResponse> {
    let session = store
        .create_session(&OwnerId::new(req.owner_id), req.mode)
        .await?;
    Ok(Json(CreateSessionResponse {
        id: session.id,
        join_code: session.join_code,
        status: session.status,
    }))
}

async fn list_sessions(
    State(store): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<ListSessionsResult> {
    let sessions = store.list_sessions(&OwnerId::new(query.owner_id)).await;
    Ok(Json(ListSessionsResult { sessions }))
}

async fn session_by_id(
    State(store): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = store
        .session_by_id(&SessionId(id))
        .await
        .ok_or_else(|| not_found("session"))?;
    Ok(Json(session))
}

async fn session_by_code(
    State(store): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let code = parse_code(&code)?;
    let session = store
        .session_by_code(&code)
        .await
        .ok_or_else(|| not_found("session"))?;
    Ok(Json(session))
}

async fn delete_session(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = store
        .delete_session(&SessionId(id), &OwnerId::new(query.owner_id))
        .await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

async fn end_session(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<OwnerBody>,
) -> Result<impl IntoResponse, ApiError> {
    let session = store
        .end_session(&SessionId(id), &OwnerId::new(body.owner_id))
        .await?;
    Ok(Json(session))
}

async fn update_config(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ConfigBody>,
) -> Result<impl IntoResponse, ApiError> {
    let session = store
        .update_config(&SessionId(id), &OwnerId::new(body.owner_id), body.overrides)
        .await?;
    Ok(Json(session))
}

async fn combat_admin(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CombatAdminBody>,
) -> Result<impl IntoResponse, ApiError> {
    let session = store
        .combat_admin(&SessionId(id), &OwnerId::new(body.owner_id), body.action)
        .await?;
    Ok(Json(session))
}

async fn patch_player(
    State(store): State<AppState>,
    Path((id, slot)): Path<(String, PlayerSlot)>,
    Json(body): Json<PlayerPatchBody>,
) -> Result<impl IntoResponse, ApiError> {
    let player = store
        .mutate_player(
            &SessionId(id),
            &OwnerId::new(body.owner_id),
            slot,
            body.patch,
        )
        .await?;
    Ok(Json(player))
}

// ---------------------------------------------------------------------------
// Player routes
// ---------------------------------------------------------------------------

async fn join(
    State(store): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let code = parse_code(&req.join_code)?;
    let joined = store.join_session(&code, &req.name).await?;
    Ok((StatusCode::CREATED, Json(joined)))
}

async fn player_status(
    State(store): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = store
        .player_by_token(&PlayerToken(token))
        .await
        .ok_or_else(|| not_found("player"))?;
    Ok(Json(status))
}

async fn submit_answer(
    State(store): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = store
        .submit_answer(&PlayerToken(token), req.stage, &req.answer)
        .await?;
    Ok(Json(result))
}

async fn combat_action(
    State(store): State<AppState>,
    Path(token): Path<String>,
    Json(action): Json<CombatAction>,
) -> Result<impl IntoResponse, ApiError> {
    let response = store.combat_action(&PlayerToken(token), action).await?;
    Ok(Json(response))
}

async fn submit_clue(
    State(store): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ClueAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = store.submit_clue(&PlayerToken(token), &req.answer).await?;
    Ok(Json(result))
}

async fn poll_events(
    State(store): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<CursorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let events = store
        .poll_events(&PlayerToken(token), query.cursor)
        .await?;
    Ok(Json(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlock_core::Conflict;

    #[test]
    fn errors_map_to_http_statuses() {
        assert_eq!(
            status_for(&GameError::NotFound("session")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(&GameError::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&Conflict::GameFull.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&GameError::Validation("bad".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&GameError::Persistence("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn combat_admin_body_flattens_the_action() {
        let body: CombatAdminBody = serde_json::from_str(
            r#"{"owner_id":"o","action":"adjust_oxygen","seconds":30}"#,
        )
        .unwrap();
        assert_eq!(body.owner_id, "o");
        assert_eq!(body.action, CombatAdminAction::AdjustOxygen { seconds: 30 });
    }

    #[test]
    fn player_patch_body_flattens_the_patch() {
        let body: PlayerPatchBody =
            serde_json::from_str(r#"{"owner_id":"o","name":"Grace"}"#).unwrap();
        assert_eq!(body.owner_id, "o");
        assert_eq!(body.patch.name.as_deref(), Some("Grace"));
        assert!(body.patch.stage.is_none());
    }
}
