//! Sign catalogue and shared weekly readings
//!
//! GET /signs, GET /signs/:sign/weekly, POST /signs/:sign/weekly/refresh, GET /weekly

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::models::WeeklyReading;
use crate::resolver::Resolved;
use crate::zodiac::{Element, Modality, ZodiacSign};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SignInfo {
    pub sign: ZodiacSign,
    pub name: &'static str,
    pub element: Element,
    pub modality: Modality,
    /// Inclusive "MM-DD" bounds
    pub starts: String,
    pub ends: String,
}

impl From<ZodiacSign> for SignInfo {
    fn from(sign: ZodiacSign) -> Self {
        let ((start_month, start_day), (end_month, end_day)) = sign.date_range();
        Self {
            sign,
            name: sign.name(),
            element: sign.element(),
            modality: sign.modality(),
            starts: format!("{:02}-{:02}", start_month, start_day),
            ends: format!("{:02}-{:02}", end_month, end_day),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnavailableSign {
    pub sign: ZodiacSign,
    pub code: &'static str,
    pub message: String,
}

/// GET /weekly response
#[derive(Debug, Serialize)]
pub struct WeeklyOverview {
    pub week_start: NaiveDate,
    pub readings: Vec<Resolved<WeeklyReading>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<UnavailableSign>,
}

pub(crate) fn parse_sign(raw: &str) -> ApiResult<ZodiacSign> {
    raw.parse::<ZodiacSign>()
        .map_err(|_| ApiError::NotFound(format!("Unknown sign: {}", raw)))
}

/// GET /signs
pub async fn list_signs() -> Json<Vec<SignInfo>> {
    Json(ZodiacSign::ALL.into_iter().map(SignInfo::from).collect())
}

/// GET /signs/:sign/weekly
pub async fn sign_weekly(
    State(state): State<AppState>,
    Path(sign): Path<String>,
) -> ApiResult<Json<Resolved<WeeklyReading>>> {
    let sign = parse_sign(&sign)?;
    Ok(Json(state.resolver.weekly_sign_reading(sign).await?))
}

/// POST /signs/:sign/weekly/refresh
pub async fn refresh_sign_weekly(
    State(state): State<AppState>,
    Path(sign): Path<String>,
) -> ApiResult<Json<Resolved<WeeklyReading>>> {
    let sign = parse_sign(&sign)?;
    tracing::info!(sign = %sign, "Refresh requested");
    Ok(Json(state.resolver.refresh_sign_reading(sign).await?))
}

/// GET /weekly
///
/// A sign whose tiers are all exhausted is listed under `unavailable`;
/// the others still come back.
pub async fn all_weekly(State(state): State<AppState>) -> Json<WeeklyOverview> {
    let mut readings = Vec::new();
    let mut unavailable = Vec::new();

    for (sign, result) in state.resolver.all_sign_readings().await {
        match result {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                error!(sign = %sign, error = %e, "Sign reading unavailable");
                unavailable.push(UnavailableSign {
                    sign,
                    code: e.code(),
                    message: e.to_string(),
                });
            }
        }
    }

    Json(WeeklyOverview {
        week_start: state.resolver.current_week(),
        readings,
        unavailable,
    })
}

/// Build sign routes
pub fn sign_routes() -> Router<AppState> {
    Router::new()
        .route("/signs", get(list_signs))
        .route("/signs/:sign/weekly", get(sign_weekly))
        .route("/signs/:sign/weekly/refresh", post(refresh_sign_weekly))
        .route("/weekly", get(all_weekly))
}
