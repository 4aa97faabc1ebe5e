// Costume Contest - REST API with Axum
//
// Thin HTTP layer over `Contest`. Every failure answers with
// `{ "success": false, "error": "..." }` and a matching status code.

use anyhow::{Context, Result};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Form, FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::category::parse_category_tags;
use crate::config::Config;
use crate::contest::{Contest, Submission};
use crate::db::{open_database, Entry, EntrySummary, VoteCounts};
use crate::error::{ContestError, ContestResult};
use crate::phase::SystemClock;
use crate::photo::{PhotoUpload, UploadStager};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    contest: Contest,
    max_upload_bytes: usize,
}

/// Entry as shown on the voting page
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryResponse {
    id: i64,
    name: String,
    costume_name: String,
    categories: Vec<String>,
    image: Option<String>,
    /// Total across all categories
    votes: i64,
    vote_counts: VoteCounts,
    created_at: DateTime<Utc>,
}

impl From<Entry> for EntryResponse {
    fn from(entry: Entry) -> Self {
        Self {
            id: entry.id,
            votes: entry.total_votes(),
            name: entry.submitter_name,
            costume_name: entry.costume_name,
            categories: entry.categories,
            image: entry.photo,
            vote_counts: entry.vote_counts,
            created_at: entry.created_at,
        }
    }
}

#[derive(Deserialize)]
struct VoteRequest {
    category: String,
}

/// Run a store call on the blocking pool so SQLite never stalls the runtime
async fn blocking<T, F>(contest: &Contest, call: F) -> ContestResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Contest) -> ContestResult<T> + Send + 'static,
{
    let contest = contest.clone();
    tokio::task::spawn_blocking(move || call(&contest))
        .await
        .map_err(|e| {
            error!("Store task failed: {}", e);
            ContestError::StoreUnavailable
        })?
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "success": true, "data": "OK" }))
}

/// GET /api/status - Current phase; `open` is true while submissions are accepted
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.contest.status())
}

/// POST /api/submit - Multipart costume submission
async fn submit_entry(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ContestError> {
    let limit = state.max_upload_bytes;
    let form_error = |e: MultipartError| malformed_form(e, limit);
    let mut submission = Submission::default();
    let mut raw_categories: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "name" => submission.name = field.text().await.map_err(form_error)?,
            "costumeName" => submission.costume_name = field.text().await.map_err(form_error)?,
            // the JSON-encoded list is appended last, after any checkbox values
            "categories" => raw_categories = Some(field.text().await.map_err(form_error)?),
            "photo" => {
                let file_name = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let bytes = field.bytes().await.map_err(form_error)?;
                submission.photo = Some(PhotoUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    submission.categories = parse_category_tags(raw_categories.as_deref());

    let id = blocking(&state.contest, move |contest| contest.submit(submission)).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

fn malformed_form(err: MultipartError, limit: usize) -> ContestError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ContestError::UploadTooLarge { limit };
    }
    ContestError::validation("form", &err.body_text())
}

/// GET /api/entries - All entries, most votes first
async fn get_entries(State(state): State<AppState>) -> Result<Json<Vec<EntryResponse>>, ContestError> {
    let entries = blocking(&state.contest, |contest| contest.entries()).await?;
    Ok(Json(entries.into_iter().map(EntryResponse::from).collect()))
}

/// POST /api/vote/:id - One vote in one category (JSON or form body)
async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Value>, ContestError> {
    let id: i64 = id
        .parse()
        .map_err(|_| ContestError::validation("id", "must be a number"))?;
    let VoteRequest { category } = read_vote(request).await?;

    let votes = blocking(&state.contest, move |contest| contest.vote(id, &category)).await?;
    Ok(Json(json!({ "success": true, "votes": votes })))
}

async fn read_vote(request: Request) -> ContestResult<VoteRequest> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(vote) = Form::<VoteRequest>::from_request(request, &())
            .await
            .map_err(|e| ContestError::validation("body", &e.body_text()))?;
        Ok(vote)
    } else {
        let Json(vote) = Json::<VoteRequest>::from_request(request, &())
            .await
            .map_err(|e| ContestError::validation("body", &e.body_text()))?;
        Ok(vote)
    }
}

/// GET /api/results - Top three entries per category
async fn get_results(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<&'static str, Vec<EntrySummary>>>, ContestError> {
    let results = blocking(&state.contest, |contest| contest.results())
        .await?
        .into_iter()
        .map(|board| (board.category.label(), board.entries))
        .collect();

    Ok(Json(results))
}

/// POST /api/clear - Administrative reset (only when ALLOW_RESET is on)
async fn clear_entries(State(state): State<AppState>) -> Result<Json<Value>, ContestError> {
    let removed = blocking(&state.contest, |contest| contest.reset()).await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}

// ============================================================================
// Router & Server
// ============================================================================

pub fn router(contest: Contest, static_dir: impl AsRef<std::path::Path>, max_upload_bytes: usize) -> Router {
    let state = AppState {
        contest,
        max_upload_bytes,
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/submit", post(submit_entry))
        .route("/entries", get(get_entries))
        .route("/vote/:id", post(cast_vote))
        .route("/results", get(get_results))
        .route("/clear", post(clear_entries))
        .with_state(state);

    // Everything else comes from the static front-end
    Router::new()
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
}

/// Open the store and serve until Ctrl+C / SIGTERM
pub async fn serve(config: Config) -> Result<()> {
    let conn = open_database(&config.database_path)?;
    info!("✓ Database opened: {:?}", config.database_path);

    let stager = UploadStager::new(&config.upload_dir)?;
    let contest = Contest::new(
        conn,
        config.schedule,
        Arc::new(SystemClock),
        stager,
        config.contest_options(),
    );

    info!(
        "Submissions close {}, voting closes {} (now: {})",
        config.schedule.submission_end(),
        config.schedule.voting_end(),
        contest.phase().as_str()
    );

    let app = router(contest, &config.static_dir, config.max_upload_bytes);

    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {address}"))?;
    info!("🎃 Server running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
