//! Compatibility endpoints
//!
//! POST /compatibility, GET /compatibility/score?a=..&b=..

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::signs::parse_sign;
use crate::error::{ApiError, ApiResult};
use crate::models::{CompatibilityRecord, Person};
use crate::resolver::Resolved;
use crate::scoring::{score_pair, ElementOutcome, HarmonyLevel, ModalityDynamic};
use crate::zodiac::ZodiacSign;
use crate::AppState;

/// POST /compatibility request
#[derive(Debug, Deserialize)]
pub struct CompatibilityRequest {
    pub person_a: Person,
    pub person_b: Person,
}

/// GET /compatibility/score query
#[derive(Debug, Deserialize)]
pub struct ScoreQuery {
    pub a: String,
    pub b: String,
}

/// GET /compatibility/score response
#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub a: ZodiacSign,
    pub b: ZodiacSign,
    pub score: u8,
    pub harmony: HarmonyLevel,
    pub element_outcome: ElementOutcome,
    pub modality_dynamic: ModalityDynamic,
    pub traditional_match: bool,
    pub opposite_signs: bool,
    pub description: &'static str,
    pub advice: &'static str,
}

/// POST /compatibility
pub async fn compatibility(
    State(state): State<AppState>,
    Json(request): Json<CompatibilityRequest>,
) -> ApiResult<Json<Resolved<CompatibilityRecord>>> {
    if request.person_a.id == request.person_b.id {
        return Err(ApiError::BadRequest(
            "compatibility needs two different people".to_string(),
        ));
    }
    Ok(Json(
        state
            .resolver
            .compatibility(&request.person_a, &request.person_b)
            .await?,
    ))
}

/// GET /compatibility/score
///
/// Pure sign-pair score; no I/O.
pub async fn sign_score(Query(query): Query<ScoreQuery>) -> ApiResult<Json<ScoreResponse>> {
    let a = parse_sign(&query.a)
        .map_err(|_| ApiError::BadRequest(format!("Unknown sign: {}", query.a)))?;
    let b = parse_sign(&query.b)
        .map_err(|_| ApiError::BadRequest(format!("Unknown sign: {}", query.b)))?;
    let pair = score_pair(a, b);

    Ok(Json(ScoreResponse {
        a,
        b,
        score: pair.score,
        harmony: HarmonyLevel::from_score(pair.score),
        element_outcome: pair.element_outcome,
        modality_dynamic: pair.modality_dynamic,
        traditional_match: pair.traditional_match,
        opposite_signs: pair.opposite_signs,
        description: pair.element_outcome.description(),
        advice: pair.element_outcome.advice(),
    }))
}

/// Build compatibility routes
pub fn compatibility_routes() -> Router<AppState> {
    Router::new()
        .route("/compatibility", post(compatibility))
        .route("/compatibility/score", get(sign_score))
}
