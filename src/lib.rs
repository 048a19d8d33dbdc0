pub mod benchmark;
pub mod config;
pub mod fetcher;
pub mod github;
pub mod metrics;
pub mod preferences;
pub mod session;
pub mod types;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use config::AppConfig;
use fetcher::DashboardResponse;
use github::{FetchError, GitHubClient};
use preferences::{NotificationSettings, Preferences, PreferencesSnapshot};
use serde::{Deserialize, Serialize};
use session::{CredentialResolver, HeaderCredentialResolver};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Shared application state accessible to all request handlers.
///
/// Nothing here is specific to a caller: every dashboard request builds its own GitHub
/// client from its own credential.
pub struct AppState {
    /// Application configuration loaded from environment variables.
    pub config: AppConfig,
    /// Locates the caller's GitHub credential in a request.
    pub credentials: Arc<dyn CredentialResolver>,
    /// Dashboard UI preferences.
    pub preferences: Preferences,
}

impl AppState {
    /// Initializes the state with header/cookie credential lookup and in-memory preferences.
    pub fn new(config: AppConfig) -> Self {
        let credentials = Arc::new(HeaderCredentialResolver::new(
            config.session_cookie_name.clone(),
        ));
        Self {
            config,
            credentials,
            preferences: Preferences::in_memory(),
        }
    }

    pub fn with_credential_resolver(mut self, resolver: Arc<dyn CredentialResolver>) -> Self {
        self.credentials = resolver;
        self
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let static_dir = Path::new(&state.config.static_dir);
    let serve_dir = ServeDir::new(static_dir)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/github", get(get_dashboard))
        .route("/api/preferences", get(get_preferences))
        .route("/api/preferences/selected-repos", put(put_selected_repos))
        .route("/api/preferences/notifications", put(put_notifications))
        .fallback_service(serve_dir)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error returned to the dashboard as `{"error": ..., "details": ...}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Internal {
        message: String,
        details: Option<String>,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<FetchError> for ApiError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Auth { status } => {
                ApiError::Unauthorized(format!("GitHub rejected the access token ({status})"))
            }
            other => ApiError::Internal {
                message: "Failed to fetch GitHub data".to_string(),
                details: Some(other.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(error) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error,
                    details: None,
                },
            ),
            ApiError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: message,
                    details,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "techpulse",
        version: env!("CARGO_PKG_VERSION"),
    })
}

const DEFAULT_DAYS: u32 = 30;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Lookback window selected on the dashboard. Advisory only, so anything that is not a
    /// number falls back to the default instead of rejecting the request.
    #[serde(default = "default_days", deserialize_with = "deserialize_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    DEFAULT_DAYS
}

fn deserialize_days<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(parse_days(&s))
}

/// Reads the leading digits of `s`, so `"14"` and `"14d"` are both 14.
fn parse_days(s: &str) -> u32 {
    let trimmed = s.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..digits_end].parse().unwrap_or(DEFAULT_DAYS)
}

pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, ApiError> {
    let Some(credential) = state.credentials.resolve(&headers) else {
        tracing::debug!("Rejecting dashboard request without credential");
        return Err(ApiError::Unauthorized("No session credential found".to_string()));
    };

    let client = GitHubClient::new(&state.config, &credential).map_err(|e| {
        tracing::error!(error = ?e, "Failed to build GitHub client");
        ApiError::from(e)
    })?;

    match fetcher::fetch_dashboard(&client, query.days).await {
        Ok(dashboard) => {
            tracing::debug!(
                repos = dashboard.repos.len(),
                commits = dashboard.metrics.total_commits,
                prs = dashboard.metrics.total_prs,
                "Returning dashboard metrics"
            );
            Ok(Json(dashboard))
        }
        Err(e) => {
            tracing::error!(error = ?e, "Failed to fetch GitHub data");
            Err(e.into())
        }
    }
}

pub async fn get_preferences(State(state): State<Arc<AppState>>) -> Json<PreferencesSnapshot> {
    Json(state.preferences.snapshot())
}

pub async fn put_selected_repos(
    State(state): State<Arc<AppState>>,
    Json(repo_ids): Json<Vec<u64>>,
) -> Result<Json<PreferencesSnapshot>, ApiError> {
    state
        .preferences
        .set_selected_repos(repo_ids)
        .map_err(preference_error)?;
    Ok(Json(state.preferences.snapshot()))
}

pub async fn put_notifications(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<NotificationSettings>,
) -> Result<Json<PreferencesSnapshot>, ApiError> {
    state
        .preferences
        .set_notifications(settings)
        .map_err(preference_error)?;
    Ok(Json(state.preferences.snapshot()))
}

fn preference_error(error: serde_json::Error) -> ApiError {
    tracing::error!(error = %error, "Failed to store preference");
    ApiError::Internal {
        message: "Failed to save preferences".to_string(),
        details: Some(error.to_string()),
    }
}
