//! Fortune generation endpoint.
//!
//! `POST /fortune` with `{"keywords": ["a", "b", "c"]}` returns
//! `{"status": "success", "fortune": "..."}`.

use axum::Json;
use axum::extract::State;
use tracing::{info, instrument};

use crate::error::AppResult;
use crate::models::{FortuneRequest, FortuneResponse};
use crate::state::AppState;
use crate::validation::validate_keywords;

/// Generate a fortune from exactly three keywords.
///
/// # Errors
///
/// - 400 if the keyword count or any keyword is invalid
/// - 500 if no upstream API key is configured
/// - 502 / 504 if the provider fails or times out
#[instrument(skip(state, payload))]
pub async fn get_fortune(
    State(state): State<AppState>,
    Json(payload): Json<FortuneRequest>,
) -> AppResult<Json<FortuneResponse>> {
    let keywords = validate_keywords(&payload.keywords)?;
    info!(keywords = ?keywords, "Generating fortune");

    let fortune = state.fortune_teller.tell(&keywords).await?;

    Ok(Json(FortuneResponse::success(fortune)))
}
