//! Chart computation and geocoding clients
//!
//! Both are consulted only for people with full birth data. The chart
//! service reply is normalized like generation output, so `sunSign`,
//! `sun_sign` and longitude-only answers are all accepted.

use crate::generation::normalize::normalize_keys;
use crate::zodiac::ZodiacSign;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("skyweek-content/", env!("CARGO_PKG_VERSION"));

/// Chart and geocoding client errors
#[derive(Debug, Clone, Error)]
pub enum ChartError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Chart API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Geocoding failed: {0}")]
    Geocoding(String),
}

/// Input to a chart computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRequest {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
}

/// Chart points returned by the chart service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedChart {
    pub sun_sign: ZodiacSign,
    pub moon_sign: Option<ZodiacSign>,
    pub rising_sign: Option<ZodiacSign>,
}

/// Resolved coordinates for a place name
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[async_trait]
pub trait ChartClient: Send + Sync {
    async fn compute_chart(&self, request: &ChartRequest) -> Result<ComputedChart, ChartError>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, place: &str) -> Result<GeoPoint, ChartError>;
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, ChartError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ChartError::Network(e.to_string()))
}

async fn read_json(response: reqwest::Response) -> Result<Value, ChartError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ChartError::Api(status.as_u16(), error_text));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| ChartError::Parse(e.to_string()))
}

/// HTTP chart computation client (`POST {base}/chart`)
pub struct HttpChartClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpChartClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChartError> {
        Ok(Self {
            http_client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawChart {
    sun_sign: Option<String>,
    moon_sign: Option<String>,
    rising_sign: Option<String>,
    ascendant: Option<String>,
    sun_longitude: Option<f64>,
    moon_longitude: Option<f64>,
    ascendant_longitude: Option<f64>,
}

fn point(name: Option<&str>, longitude: Option<f64>) -> Result<Option<ZodiacSign>, ChartError> {
    match (name, longitude) {
        (Some(name), _) => name
            .parse::<ZodiacSign>()
            .map(Some)
            .map_err(|_| ChartError::Parse(format!("unknown sign '{}'", name))),
        (None, Some(degrees)) => Ok(Some(ZodiacSign::from_longitude(degrees))),
        (None, None) => Ok(None),
    }
}

/// Turn a chart service reply into chart points
pub fn parse_chart(value: Value) -> Result<ComputedChart, ChartError> {
    let raw: RawChart =
        serde_json::from_value(normalize_keys(value)).map_err(|e| ChartError::Parse(e.to_string()))?;

    let sun_sign = point(raw.sun_sign.as_deref(), raw.sun_longitude)?
        .ok_or_else(|| ChartError::Parse("chart has no sun sign".to_string()))?;
    let rising_name = raw.rising_sign.as_deref().or(raw.ascendant.as_deref());

    Ok(ComputedChart {
        sun_sign,
        moon_sign: point(raw.moon_sign.as_deref(), raw.moon_longitude)?,
        rising_sign: point(rising_name, raw.ascendant_longitude)?,
    })
}

#[async_trait]
impl ChartClient for HttpChartClient {
    async fn compute_chart(&self, request: &ChartRequest) -> Result<ComputedChart, ChartError> {
        let url = format!("{}/chart", self.base_url);
        debug!(url = %url, "Requesting chart computation");

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChartError::Network(e.to_string()))?;

        parse_chart(read_json(response).await?)
    }
}

/// Open-Meteo geocoding search client
pub struct OpenMeteoGeocoder {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoGeocoder {
    pub const DEFAULT_BASE_URL: &'static str = "https://geocoding-api.open-meteo.com/v1";

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChartError> {
        Ok(Self {
            http_client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Best match from an Open-Meteo search reply
pub fn parse_geocoding(value: Value, place: &str) -> Result<GeoPoint, ChartError> {
    let first = value
        .get("results")
        .and_then(|results| results.get(0))
        .cloned()
        .ok_or_else(|| ChartError::Geocoding(format!("no match for '{}'", place)))?;
    serde_json::from_value(first).map_err(|e| ChartError::Parse(e.to_string()))
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    async fn geocode(&self, place: &str) -> Result<GeoPoint, ChartError> {
        let url = format!("{}/search", self.base_url);
        debug!(url = %url, "Geocoding birth place");

        let response = self
            .http_client
            .get(&url)
            .query(&[("name", place), ("count", "1"), ("format", "json")])
            .send()
            .await
            .map_err(|e| ChartError::Network(e.to_string()))?;

        parse_geocoding(read_json(response).await?, place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_chart_accepts_camel_case_names() {
        let chart = parse_chart(json!({
            "sunSign": "Leo",
            "moonSign": "pisces",
            "risingSign": "ARIES"
        }))
        .unwrap();
        assert_eq!(chart.sun_sign, ZodiacSign::Leo);
        assert_eq!(chart.moon_sign, Some(ZodiacSign::Pisces));
        assert_eq!(chart.rising_sign, Some(ZodiacSign::Aries));
    }

    #[test]
    fn test_parse_chart_from_longitudes() {
        let chart = parse_chart(json!({
            "sun_longitude": 125.0,
            "moon_longitude": 5.5,
            "ascendant": "Virgo"
        }))
        .unwrap();
        assert_eq!(chart.sun_sign, ZodiacSign::Leo);
        assert_eq!(chart.moon_sign, Some(ZodiacSign::Aries));
        assert_eq!(chart.rising_sign, Some(ZodiacSign::Virgo));
    }

    #[test]
    fn test_parse_chart_requires_sun() {
        assert!(matches!(
            parse_chart(json!({ "moonSign": "Leo" })),
            Err(ChartError::Parse(_))
        ));
        assert!(matches!(
            parse_chart(json!({ "sunSign": "Ophiuchus" })),
            Err(ChartError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_geocoding_takes_first_result() {
        let point = parse_geocoding(
            json!({
                "results": [
                    { "name": "Lisbon", "latitude": 38.72, "longitude": -9.13, "timezone": "Europe/Lisbon" }
                ]
            }),
            "Lisbon",
        )
        .unwrap();
        assert_eq!(point.timezone.as_deref(), Some("Europe/Lisbon"));
        assert!((point.latitude - 38.72).abs() < 1e-9);
    }

    #[test]
    fn test_parse_geocoding_without_results() {
        assert!(matches!(
            parse_geocoding(json!({ "generationtime_ms": 0.5 }), "Nowhere"),
            Err(ChartError::Geocoding(_))
        ));
    }
}
