use crate::api::openai_api::OpenAiClient;
use crate::auth::{verify_token, AuthError};
use crate::betslip::{generate_betslip, BetslipError};
use crate::config::Config;
use crate::pipeline::{JobRunner, RunError, RunOutcome};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Everything the handlers need
pub struct AppState {
    pub runner: Arc<JobRunner>,
    pub llm: Option<OpenAiClient>,
    pub data_dir: PathBuf,
    pub jwt_secret: Option<String>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(runner: Arc<JobRunner>, config: &Config) -> Self {
        Self {
            runner,
            llm: config
                .llm
                .api_key
                .clone()
                .map(|key| OpenAiClient::new(key, &config.llm)),
            data_dir: config.pipeline.data_dir.clone(),
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/fetch-data", get(fetch_data))
        .route("/betslip", post(betslip))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::NotConfigured => {
                error!("JWT_SECRET not set, rejecting authenticated request");
                message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
            AuthError::MissingToken => message(StatusCode::UNAUTHORIZED, "No token provided"),
            AuthError::InvalidToken(e) => {
                warn!(error = %e, "Rejected bearer token");
                message(StatusCode::UNAUTHORIZED, "Invalid token")
            }
        }
    }
}

impl IntoResponse for BetslipError {
    fn into_response(self) -> Response {
        match &self {
            BetslipError::MissingFixtureIds => message(StatusCode::BAD_REQUEST, &self.to_string()),
            BetslipError::FixturesNotFound(missing) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Some fixtures not found", "missing": missing })),
            )
                .into_response(),
            BetslipError::NoFixtureData => message(StatusCode::NOT_FOUND, &self.to_string()),
            BetslipError::NotConfigured => {
                message(StatusCode::SERVICE_UNAVAILABLE, &self.to_string())
            }
            BetslipError::InvalidResponse(_) | BetslipError::Other(_) => {
                error!(error = %self, "Error generating betslip");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Error generating betslip", "error": self.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Run the fetch job now and report how it went. The run happens on its own
/// task and finishes even if the client goes away.
async fn fetch_data(State(state): State<SharedState>) -> Response {
    info!("Manual data fetch triggered");

    let runner = Arc::clone(&state.runner);
    let today = Utc::now().date_naive();
    let result = match tokio::spawn(async move { runner.try_run(today).await }).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Data fetch task failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Error fetching data", "error": e.to_string() })),
            )
                .into_response();
        }
    };

    match result {
        Ok(RunOutcome::NoFixtures) => message(StatusCode::OK, "No fixtures found for the fetch window"),
        Ok(RunOutcome::Completed {
            fixtures,
            domestic,
            international,
            ..
        }) => Json(json!({
            "message": "Data fetched successfully",
            "fixtures": fixtures,
            "domestic": domestic,
            "international": international,
        }))
        .into_response(),
        Err(RunError::AlreadyRunning) => {
            message(StatusCode::CONFLICT, "A data fetch is already running")
        }
        Err(RunError::Failed(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Error fetching data", "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// `fixtureIds` as a list of non-negative integers
fn fixture_ids(body: &Value) -> Option<Vec<u64>> {
    body.get("fixtureIds")?
        .as_array()?
        .iter()
        .map(Value::as_u64)
        .collect()
}

async fn betslip(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let auth_header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let claims = match verify_token(auth_header, state.jwt_secret.as_deref()) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    let ids = match body.ok().and_then(|Json(body)| fixture_ids(&body)) {
        Some(ids) if !ids.is_empty() => ids,
        _ => return BetslipError::MissingFixtureIds.into_response(),
    };

    let Some(llm) = state.llm.as_ref() else {
        return BetslipError::NotConfigured.into_response();
    };

    info!(user = claims.id, fixtures = ?ids, "Generating betslip");
    match generate_betslip(llm, &state.data_dir, &ids).await {
        Ok(betslip) => Json(betslip).into_response(),
        Err(e) => e.into_response(),
    }
}
