//! Normalization of generated payloads
//!
//! Applied once, right after the raw text arrives:
//! 1. pull the JSON object out of surrounding prose or code fences
//! 2. rewrite every key to snake_case (an original snake_case key wins)
//! 3. deserialize into a lenient raw schema and fill defaults

use crate::error::ContentError;
use crate::models::{PairSynopsis, SubjectKey, WeeklyCompatibility, WeeklyReading};
use crate::zodiac::{Element, ZodiacSign};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_MOOD: &str = "Reflective";

/// Lucky color when the payload names none
pub fn default_lucky_color(element: Element) -> &'static str {
    match element {
        Element::Fire => "Red",
        Element::Earth => "Green",
        Element::Air => "Yellow",
        Element::Water => "Blue",
    }
}

/// Lucky number when the payload names none or an out-of-range one
pub fn default_lucky_number(sign: ZodiacSign) -> u8 {
    sign.index() as u8 + 1
}

/// Locate one JSON object in model output
///
/// Tries a ```json fence, then any fence, then the first complete object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let after_marker = &text[start + 7..];
        if let Some(end) = after_marker.find("```") {
            let content = after_marker[..end].trim();
            if content.starts_with('{') && content.ends_with('}') {
                return Some(content);
            }
        }
    }

    if let Some(start) = text.find("```") {
        let after_marker = &text[start + 3..];
        let content_start = after_marker.find('\n').map(|i| i + 1).unwrap_or(0);
        let after_lang = &after_marker[content_start..];
        if let Some(end) = after_lang.find("```") {
            let content = after_lang[..end].trim();
            if content.starts_with('{') && content.ends_with('}') {
                return Some(content);
            }
        }
    }

    first_object(text)
}

/// First brace that opens a complete JSON object; braces in prose are skipped
fn first_object(text: &str) -> Option<&str> {
    text.match_indices('{').find_map(|(start, _)| {
        let rest = &text[start..];
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(_))) => Some(&rest[..stream.byte_offset()]),
            _ => None,
        }
    })
}

/// `luckyNumber`, `LuckyNumber`, `lucky-number` and `lucky number` all become `lucky_number`
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower_or_digit = false;

    for ch in key.trim().chars() {
        if ch == '-' || ch == ' ' || ch == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower_or_digit = false;
        } else if ch.is_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// Recursively rewrite object keys to snake_case
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut converted: Vec<(String, Value)> = Vec::new();
            let mut out = Map::new();
            for (key, value) in map {
                let snake = to_snake_case(&key);
                if snake == key {
                    out.insert(key, normalize_keys(value));
                } else {
                    converted.push((snake, normalize_keys(value)));
                }
            }
            for (key, value) in converted {
                out.entry(key).or_insert(value);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Extract, normalize and deserialize a payload
pub fn parse_payload<T: DeserializeOwned>(raw: &str) -> Result<T, ContentError> {
    let json = extract_json_object(raw).ok_or_else(|| {
        ContentError::MalformedResponse("no JSON object in generated text".to_string())
    })?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ContentError::MalformedResponse(format!("invalid JSON: {}", e)))?;
    serde_json::from_value(normalize_keys(value))
        .map_err(|e| ContentError::MalformedResponse(format!("schema mismatch: {}", e)))
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| text(Some(v))).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn first_text(fields: &[&Option<Value>]) -> Option<String> {
    fields.iter().find_map(|field| text(field.as_ref()))
}

#[derive(Debug, Default, Deserialize)]
struct RawReading {
    reading: Option<Value>,
    horoscope: Option<Value>,
    text: Option<Value>,
    mood: Option<Value>,
    lucky_number: Option<Value>,
    lucky_color: Option<Value>,
    #[serde(alias = "key_themes")]
    highlights: Option<Value>,
    advice: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSynopsis {
    summary: Option<Value>,
    synopsis: Option<Value>,
    description: Option<Value>,
    strengths: Option<Value>,
    challenges: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWeeklyCompatibility {
    this_week_score: Option<Value>,
    score: Option<Value>,
    #[serde(alias = "moods")]
    mood_descriptors: Option<Value>,
    narrative: Option<Value>,
    summary: Option<Value>,
}

/// Weekly reading from generated text; the reading body is required
pub fn normalize_reading(
    raw: &str,
    subject: SubjectKey,
    week_start: NaiveDate,
    sun: ZodiacSign,
) -> Result<WeeklyReading, ContentError> {
    let payload: RawReading = parse_payload(raw)?;

    let reading = first_text(&[&payload.reading, &payload.horoscope, &payload.text])
        .ok_or_else(|| ContentError::MalformedResponse("reading text missing".to_string()))?;

    let lucky_number = number(payload.lucky_number.as_ref())
        .filter(|n| (1..=99).contains(n))
        .map(|n| n as u8)
        .unwrap_or_else(|| default_lucky_number(sun));

    Ok(WeeklyReading {
        subject,
        week_start,
        reading,
        mood: text(payload.mood.as_ref()).unwrap_or_else(|| DEFAULT_MOOD.to_string()),
        lucky_number,
        lucky_color: text(payload.lucky_color.as_ref())
            .unwrap_or_else(|| default_lucky_color(sun.element()).to_string()),
        highlights: list(payload.highlights.as_ref()),
        advice: text(payload.advice.as_ref()),
        is_generated: true,
    })
}

/// Pair synopsis from generated text; the summary is required
pub fn normalize_synopsis(raw: &str) -> Result<PairSynopsis, ContentError> {
    let payload: RawSynopsis = parse_payload(raw)?;

    let summary = first_text(&[&payload.summary, &payload.synopsis, &payload.description])
        .ok_or_else(|| ContentError::MalformedResponse("synopsis summary missing".to_string()))?;

    Ok(PairSynopsis {
        summary,
        strengths: list(payload.strengths.as_ref()),
        challenges: list(payload.challenges.as_ref()),
    })
}

/// Weekly compatibility layer from generated text; the narrative is required
///
/// A missing score falls back to `base_score`; any score is clamped to 0..=100.
pub fn normalize_weekly_compatibility(
    raw: &str,
    week_start: NaiveDate,
    base_score: u8,
) -> Result<WeeklyCompatibility, ContentError> {
    let payload: RawWeeklyCompatibility = parse_payload(raw)?;

    let narrative = first_text(&[&payload.narrative, &payload.summary]).ok_or_else(|| {
        ContentError::MalformedResponse("weekly compatibility narrative missing".to_string())
    })?;

    let this_week_score = number(payload.this_week_score.as_ref())
        .or_else(|| number(payload.score.as_ref()))
        .map(|n| n.clamp(0, 100) as u8)
        .unwrap_or(base_score);

    Ok(WeeklyCompatibility {
        week_start,
        this_week_score,
        mood_descriptors: list(payload.mood_descriptors.as_ref()),
        narrative,
        is_generated: true,
    })
}
