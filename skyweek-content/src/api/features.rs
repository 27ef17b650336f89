//! Feature unlock queries
//!
//! GET /features?level=.. for a completeness level, POST /features for a person

use axum::{extract::Query, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ApiError, ApiResult};
use crate::models::{DataCompletenessLevel, Person};
use crate::unlock::{missing_for, next_unlocks, unlocked_features, Feature, MissingData};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeaturesQuery {
    pub level: String,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub level: DataCompletenessLevel,
    pub unlocked: Vec<Feature>,
    pub next_unlocks: Vec<Feature>,
    /// Per locked feature, what the person still has to provide
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub missing: BTreeMap<Feature, Vec<MissingData>>,
}

fn parse_level(raw: &str) -> ApiResult<DataCompletenessLevel> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase()))
        .map_err(|_| ApiError::BadRequest(format!("Unknown completeness level: {}", raw)))
}

fn features_for(level: DataCompletenessLevel) -> FeaturesResponse {
    FeaturesResponse {
        level,
        unlocked: unlocked_features(level).into_iter().collect(),
        next_unlocks: next_unlocks(level),
        missing: BTreeMap::new(),
    }
}

/// GET /features?level=basic
pub async fn features_for_level(
    Query(query): Query<FeaturesQuery>,
) -> ApiResult<Json<FeaturesResponse>> {
    Ok(Json(features_for(parse_level(&query.level)?)))
}

/// POST /features
pub async fn features_for_person(Json(person): Json<Person>) -> Json<FeaturesResponse> {
    let mut response = features_for(person.completeness());
    response.missing = Feature::ALL
        .into_iter()
        .map(|feature| (feature, missing_for(feature, &person)))
        .filter(|(_, missing)| !missing.is_empty())
        .collect();
    Json(response)
}

/// Build feature routes
pub fn feature_routes() -> Router<AppState> {
    Router::new().route("/features", get(features_for_level).post(features_for_person))
}
