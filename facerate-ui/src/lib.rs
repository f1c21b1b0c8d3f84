//! facerate-ui library - web surface of the face rating service
//!
//! Two screens (auth, rating) driven by plain HTML forms, a JSON view of the
//! visitor's state, the image files themselves, and health/build endpoints.

use axum::Router;
use facerate_common::RatingWorkflow;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cli;
pub mod sessions;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<RatingWorkflow>,
    /// Visitor sessions expire after this long without a request
    pub session_idle_timeout: Duration,
}

impl AppState {
    /// Create new application state
    pub fn new(workflow: RatingWorkflow, session_idle_timeout: Duration) -> Self {
        Self {
            workflow: Arc::new(workflow),
            session_idle_timeout,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let images = ServeDir::new(state.workflow.catalog().dir().to_path_buf());
    let sessions = sessions::session_layer(state.session_idle_timeout);

    Router::new()
        // Visitor actions
        .route("/", get(api::index))
        .route("/login", post(api::login))
        .route("/register", post(api::register))
        .route("/rate", post(api::rate))
        .route("/skip", post(api::skip))
        .route("/logout", post(api::logout))
        .route("/api/state", get(api::get_state))
        // Static content
        .route("/static/style.css", get(api::serve_style_css))
        .nest_service("/images", images)
        // Diagnostics
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .with_state(state)
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
}
