use std::sync::Arc;

use axum::extract::{Extension, Multipart};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AppState, SESSION_HEADER};
use crate::downloader::tools::{probe_tool, ToolInfo};
use crate::downloader::DownloadProgress;
use crate::session::{Event, SessionHandle, SessionView};

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Multipart field carrying the cookie file
const COOKIE_FIELD: &str = "cookie";

#[derive(Debug)]
pub(crate) enum ApiError {
    NoSession,
    BadRequest(String),
    NotFound(&'static str),
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::NoSession => (
                StatusCode::UNAUTHORIZED,
                format!("missing or unknown {} header", SESSION_HEADER),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, what.to_string()),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct SessionCreated {
    pub(crate) session_id: String,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ParseRequest {
    pub(crate) url: String,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct SelectionRequest {
    pub(crate) rows: Vec<usize>,
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn session(state: &AppState, headers: &HeaderMap) -> Result<Arc<SessionHandle>, ApiError> {
    session_id(headers)
        .and_then(|id| state.sessions.get(id))
        .ok_or(ApiError::NoSession)
}

pub(crate) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub(crate) async fn create_session(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let session_id = state.sessions.create();
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

pub(crate) async fn end_session(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let id = session_id(&headers).ok_or(ApiError::NoSession)?;
    if state.sessions.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NoSession)
    }
}

pub(crate) async fn get_state(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionView>, ApiError> {
    let handle = session(&state, &headers)?;
    let session = handle.state.lock().await;
    Ok(Json(session.view()))
}

pub(crate) async fn upload_cookie(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, ApiError> {
    let handle = session(&state, &headers)?;

    let mut bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some(COOKIE_FIELD) {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            bytes = Some(data);
            break;
        }
    }
    let bytes = bytes.ok_or_else(|| {
        ApiError::BadRequest(format!("multipart field '{}' is required", COOKIE_FIELD))
    })?;

    let mut session = handle.state.lock().await;
    session.upload_credential(&state.work_dir, &bytes);
    info!(bytes = bytes.len(), "Cookie file uploaded");
    Ok(Json(session.view()))
}

pub(crate) async fn clear_cookie(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionView>, ApiError> {
    let handle = session(&state, &headers)?;
    let mut session = handle.state.lock().await;
    session.dispatch(Event::CredentialCleared);
    Ok(Json(session.view()))
}

pub(crate) async fn parse(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(request): Json<ParseRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = session(&state, &headers)?;
    let mut session = handle.state.lock().await;
    session
        .discover(
            &request.url,
            state.downloader.backend().as_ref(),
            state.extract_timeout,
        )
        .await;
    Ok(Json(session.view()))
}

pub(crate) async fn select(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = session(&state, &headers)?;
    let mut session = handle.state.lock().await;
    session.dispatch(Event::SelectionChanged(request.rows));
    debug!(specifier = %session.specifier(), "Selection changed");
    Ok(Json(session.view()))
}

pub(crate) async fn download(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionView>, ApiError> {
    let handle = session(&state, &headers)?;
    let mut session = handle.state.lock().await;
    session.fetch(&state.downloader, &handle.progress).await;
    Ok(Json(session.view()))
}

pub(crate) async fn progress(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Json<DownloadProgress>, ApiError> {
    let handle = session(&state, &headers)?;
    Ok(Json(handle.progress.snapshot()))
}

pub(crate) async fn file(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let handle = session(&state, &headers)?;
    let output = handle
        .state
        .lock()
        .await
        .output
        .clone()
        .ok_or(ApiError::NotFound("no merged file yet"))?;

    let disposition = HeaderValue::from_str(&content_disposition(&output.file_name))
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(output.media_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.bytes,
    )
        .into_response())
}

pub(crate) async fn tools(Extension(state): Extension<AppState>) -> Json<Vec<ToolInfo>> {
    Json(vec![probe_tool("yt-dlp", &state.ytdlp_path).await])
}

/// `attachment` header with an ASCII fallback name plus the RFC 5987 form
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::new();
    for b in file_name.bytes() {
        if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{:02X}", b));
        }
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}
