//! HTTP API over the session engine.

use crate::engine::{EngineError, SessionEngine};
use arena_board::{Mark, Position, RawSnapshot};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, body::Body};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tracing::{error, info, instrument};

/// Error returned by a handler.
#[derive(Debug, derive_more::Display)]
pub enum ApiError {
    /// Error from the engine.
    #[display("{}", _0)]
    Engine(EngineError),
    /// Malformed request.
    #[display("{}", _0)]
    BadRequest(String),
}

impl std::error::Error for ApiError {}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid input: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!("Invalid input: {}", rejection.body_text()))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(EngineError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Engine(EngineError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Engine(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

/// Body of the stateless evaluate and suggest endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    /// The board to inspect.
    #[serde(default)]
    pub game_state: RawSnapshot,
}

/// Body of the start endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Must be `"ai"` when present.
    #[serde(default)]
    pub mode: Option<String>,
    /// Mark for the human; `X` if absent.
    #[serde(default)]
    pub player_symbol: Option<Mark>,
    /// Board side length.
    pub grid_size: i64,
}

/// Body of the move endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MoveRequest {
    /// Row index.
    pub row: i64,
    /// Column index.
    pub col: i64,
}

/// Query string of the completed-games endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CompletedQuery {
    /// Maximum number of games.
    pub limit: Option<usize>,
}

/// Builds the router with request logging.
pub fn router(engine: SessionEngine) -> Router {
    let api = Router::new()
        .route("/evaluate", post(evaluate_game))
        .route("/ai-move", post(ai_move))
        .route("/completed", get(completed_games))
        .route("/start", post(start_game))
        .route("/{game_id}", get(get_game))
        .route("/{game_id}/move", post(player_move));

    Router::new()
        .nest("/api/game", api)
        .route("/health", get(health))
        .with_state(engine)
        .layer(
            ServiceBuilder::new()
                .map_request(|req: Request<Body>| {
                    info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
                    req
                })
                .map_response(|res: Response| {
                    info!(status = %res.status(), "Response sent");
                    res
                }),
        )
}

#[instrument(skip_all)]
async fn evaluate_game(
    State(engine): State<SessionEngine>,
    payload: Result<Json<SnapshotRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let evaluation = engine.evaluate_snapshot(&request.game_state).await?;
    Ok(Json(evaluation))
}

#[instrument(skip_all)]
async fn ai_move(
    State(engine): State<SessionEngine>,
    payload: Result<Json<SnapshotRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let suggestion = engine.suggest_for_snapshot(&request.game_state).await?;
    Ok(Json(suggestion))
}

#[instrument(skip_all)]
async fn completed_games(
    State(engine): State<SessionEngine>,
    query: Result<Query<CompletedQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let games = engine.list_completed(query.limit).await?;
    Ok(Json(json!({ "games": games })))
}

#[instrument(skip_all)]
async fn start_game(
    State(engine): State<SessionEngine>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    if let Some(mode) = request.mode.as_deref().filter(|m| *m != "ai") {
        return Err(ApiError::BadRequest(format!(
            "Invalid input: unsupported mode '{}'",
            mode
        )));
    }
    let view = engine.create(request.player_symbol, request.grid_size)?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(engine))]
async fn get_game(
    State(engine): State<SessionEngine>,
    Path(game_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(engine.get_session(&game_id).await?))
}

#[instrument(skip(engine, payload))]
async fn player_move(
    State(engine): State<SessionEngine>,
    Path(game_id): Path<String>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    // Negative coordinates are off every board.
    let coord = |v: i64| usize::try_from(v).unwrap_or(usize::MAX);
    let position = Position::new(coord(request.row), coord(request.col));
    Ok(Json(engine.apply_human_move(&game_id, position).await?))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
