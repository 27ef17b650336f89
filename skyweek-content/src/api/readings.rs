//! Personal readings
//!
//! POST /readings/personal, POST /readings/personal/refresh

use axum::{extract::State, routing::post, Json, Router};

use crate::error::ApiResult;
use crate::models::{Person, WeeklyReading};
use crate::resolver::Resolved;
use crate::AppState;

/// POST /readings/personal
///
/// Degrades to the sign reading, then static content, when the person
/// lacks data or generation fails.
pub async fn personal_reading(
    State(state): State<AppState>,
    Json(person): Json<Person>,
) -> ApiResult<Json<Resolved<WeeklyReading>>> {
    tracing::debug!(person = %person.id, level = ?person.completeness(), "Personal reading requested");
    Ok(Json(state.resolver.personal_reading(&person).await?))
}

/// POST /readings/personal/refresh
///
/// 422 when the person cannot have a personal reading, 502 when generation fails.
pub async fn refresh_personal_reading(
    State(state): State<AppState>,
    Json(person): Json<Person>,
) -> ApiResult<Json<Resolved<WeeklyReading>>> {
    tracing::info!(person = %person.id, "Personal refresh requested");
    Ok(Json(state.resolver.refresh_personal_reading(&person).await?))
}

/// Build personal reading routes
pub fn reading_routes() -> Router<AppState> {
    Router::new()
        .route("/readings/personal", post(personal_reading))
        .route("/readings/personal/refresh", post(refresh_personal_reading))
}
