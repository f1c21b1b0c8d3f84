//! Visitor action handlers
//!
//! One handler per action. Each reads the visitor's context from the
//! session, runs the matching workflow action, writes the resulting context
//! back (or flushes the session once the visitor is anonymous again) and
//! renders the returned view.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use facerate_common::{Error, SessionContext, Step};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::error;

use super::render;
use crate::sessions::{remember, visitor_context};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RateForm {
    /// Image the form was rendered for
    pub image: Option<String>,
    /// Kept as text so a malformed score reaches the workflow
    #[serde(default)]
    pub score: String,
}

/// HTTP status reported alongside the rendered page
pub fn status_for(error: Option<&Error>) -> StatusCode {
    match error {
        None => StatusCode::OK,
        Some(Error::InvalidCredentials | Error::NotAuthenticated) => StatusCode::UNAUTHORIZED,
        Some(Error::UsernameTaken | Error::DuplicateUser(_) | Error::StaleSubmission { .. }) => {
            StatusCode::CONFLICT
        }
        Some(Error::EmptyUsername | Error::InvalidScore(_) | Error::NothingToRate) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Some(Error::StoreUnavailable(_) | Error::CatalogUnavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        Some(Error::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Write the step's session back and pick the response status.
///
/// A session that could not be saved is reported on the page itself.
async fn settle(session: &Session, before: &SessionContext, step: &mut Step) -> StatusCode {
    match remember(session, before, &step.session).await {
        Ok(()) => status_for(step.error.as_ref()),
        Err(e) => {
            error!("Failed to save session: {}", e);
            step.view.error = Some(format!("Your session could not be saved: {}", e));
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn respond(session: &Session, before: SessionContext, mut step: Step) -> Response {
    let status = settle(session, &before, &mut step).await;
    (status, Html(render::page(&step.view))).into_response()
}

/// GET /
pub async fn index(State(state): State<AppState>, session: Session) -> Response {
    let context = visitor_context(&session).await;
    let step = state.workflow.show(context.clone()).await;
    respond(&session, context, step).await
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let context = visitor_context(&session).await;
    let step = state
        .workflow
        .login(context.clone(), &form.username, &form.password)
        .await;
    respond(&session, context, step).await
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let context = visitor_context(&session).await;
    let step = state
        .workflow
        .register(context.clone(), &form.username, &form.password)
        .await;
    respond(&session, context, step).await
}

/// POST /rate
pub async fn rate(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RateForm>,
) -> Response {
    let context = visitor_context(&session).await;
    let step = state
        .workflow
        .rate(context.clone(), form.image.as_deref(), &form.score)
        .await;
    respond(&session, context, step).await
}

/// POST /skip
pub async fn skip(State(state): State<AppState>, session: Session) -> Response {
    let context = visitor_context(&session).await;
    let step = state.workflow.skip(context.clone()).await;
    respond(&session, context, step).await
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    let context = visitor_context(&session).await;
    let step = state.workflow.logout(context.clone()).await;
    respond(&session, context, step).await
}

/// GET /api/state
///
/// The caller's current view as JSON (same presentation as `GET /`).
pub async fn get_state(State(state): State<AppState>, session: Session) -> Response {
    let context = visitor_context(&session).await;
    let mut step = state.workflow.show(context.clone()).await;
    let status = settle(&session, &context, &mut step).await;

    (status, Json(step.view)).into_response()
}
