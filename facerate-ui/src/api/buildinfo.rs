//! Build information API endpoint
//!
//! Version and build metadata captured by build.rs, plus the rating scale
//! this build accepts.

use axum::response::Json;
use facerate_common::Score;
use serde::Serialize;

/// Build information response
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
    /// Lowest and highest accepted score
    pub score_range: [u8; 2],
}

/// GET /api/buildinfo
pub async fn get_build_info() -> Json<BuildInfo> {
    Json(BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        score_range: [Score::MIN, Score::MAX],
    })
}
