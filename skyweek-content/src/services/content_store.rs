//! Typed natural-key operations over a document store backend

use super::store_client::{scalar_text, Collection, Document, DocumentStore, Filter, StoreError};
use crate::models::{
    CompatibilityRecord, PairKey, PairSynopsis, SkyContext, SubjectKey, WeeklyCompatibility,
    WeeklyReading,
};
use crate::scoring::{ElementOutcome, HarmonyLevel};
use crate::zodiac::ZodiacSign;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skyweek_common::time::week_key_string;
use std::sync::Arc;

/// Stored form of a weekly reading; exactly one of `sign`/`person_id` is set
#[derive(Debug, Serialize, Deserialize)]
struct ReadingDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sign: Option<ZodiacSign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    person_id: Option<String>,
    week_start: NaiveDate,
    reading: String,
    mood: String,
    lucky_number: u8,
    lucky_color: String,
    #[serde(default)]
    highlights: Vec<String>,
    #[serde(default)]
    advice: Option<String>,
    #[serde(default)]
    is_generated: bool,
}

impl ReadingDocument {
    fn from_reading(reading: &WeeklyReading) -> Self {
        let (sign, person_id) = match &reading.subject {
            SubjectKey::Sign(sign) => (Some(*sign), None),
            SubjectKey::Person(id) => (None, Some(id.clone())),
        };
        Self {
            sign,
            person_id,
            week_start: reading.week_start,
            reading: reading.reading.clone(),
            mood: reading.mood.clone(),
            lucky_number: reading.lucky_number,
            lucky_color: reading.lucky_color.clone(),
            highlights: reading.highlights.clone(),
            advice: reading.advice.clone(),
            is_generated: reading.is_generated,
        }
    }

    fn into_reading(self) -> Result<WeeklyReading, StoreError> {
        let subject = match (self.sign, self.person_id) {
            (Some(sign), None) => SubjectKey::Sign(sign),
            (None, Some(id)) => SubjectKey::Person(id),
            _ => {
                return Err(StoreError::Parse(
                    "reading must name exactly one of sign or person_id".to_string(),
                ))
            }
        };
        Ok(WeeklyReading {
            subject,
            week_start: self.week_start,
            reading: self.reading,
            mood: self.mood,
            lucky_number: self.lucky_number,
            lucky_color: self.lucky_color,
            highlights: self.highlights,
            advice: self.advice,
            is_generated: self.is_generated,
        })
    }
}

/// Stored base layer of a compatibility pair
#[derive(Debug, Serialize, Deserialize)]
struct PairDocument {
    person_a: String,
    person_b: String,
    base_score: u8,
    harmony: HarmonyLevel,
    element_outcome: ElementOutcome,
    description: String,
    advice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    synopsis: Option<PairSynopsis>,
}

/// Stored weekly layer of a compatibility pair
#[derive(Debug, Serialize, Deserialize)]
struct PairWeekDocument {
    person_a: String,
    person_b: String,
    #[serde(flatten)]
    weekly: WeeklyCompatibility,
}

fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Parse("record did not serialize to an object".to_string())),
        Err(e) => Err(StoreError::Parse(e.to_string())),
    }
}

fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(document)).map_err(|e| StoreError::Parse(e.to_string()))
}

/// Filter text for a serde-encoded value (e.g. a sign as `"leo"`)
fn encoded<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_value(value)
        .ok()
        .as_ref()
        .and_then(scalar_text)
        .ok_or_else(|| StoreError::Parse("filter value is not a scalar".to_string()))
}

/// Content records by natural key
///
/// Pairs are written in canonical (sorted) order and read in either order.
#[derive(Clone)]
pub struct ContentStore {
    backend: Arc<dyn DocumentStore>,
}

impl ContentStore {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self { backend }
    }

    async fn fetch_first<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: Filter,
    ) -> Result<Option<T>, StoreError> {
        match self.backend.get(collection, &filter).await?.into_iter().next() {
            Some(document) => from_document(document).map(Some),
            None => Ok(None),
        }
    }

    async fn save<T: Serialize>(&self, collection: Collection, value: &T) -> Result<(), StoreError> {
        let document = to_document(value)?;
        self.backend
            .upsert(collection, document, collection.conflict_key())
            .await?;
        Ok(())
    }

    pub async fn fetch_weekly_reading(
        &self,
        subject: &SubjectKey,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyReading>, StoreError> {
        let (collection, filter) = match subject {
            SubjectKey::Sign(sign) => (
                Collection::WeeklySignReadings,
                Filter::new().eq("sign", encoded(sign)?),
            ),
            SubjectKey::Person(id) => (
                Collection::WeeklyPersonReadings,
                Filter::new().eq("person_id", id.as_str()),
            ),
        };
        let filter = filter.eq("week_start", week_key_string(week_start));

        match self.fetch_first::<ReadingDocument>(collection, filter).await? {
            Some(document) => document.into_reading().map(Some),
            None => Ok(None),
        }
    }

    pub async fn save_weekly_reading(&self, reading: &WeeklyReading) -> Result<(), StoreError> {
        let collection = match reading.subject {
            SubjectKey::Sign(_) => Collection::WeeklySignReadings,
            SubjectKey::Person(_) => Collection::WeeklyPersonReadings,
        };
        self.save(collection, &ReadingDocument::from_reading(reading))
            .await
    }

    pub async fn fetch_sky_context(
        &self,
        week_start: NaiveDate,
    ) -> Result<Option<SkyContext>, StoreError> {
        self.fetch_first(
            Collection::SkyContexts,
            Filter::new().eq("week_start", week_key_string(week_start)),
        )
        .await
    }

    pub async fn save_sky_context(&self, sky: &SkyContext) -> Result<(), StoreError> {
        self.save(Collection::SkyContexts, sky).await
    }

    /// Base layer of a pair, trying (a, b) then (b, a); the weekly layer is left empty
    pub async fn fetch_compatibility(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<CompatibilityRecord>, StoreError> {
        for (first, second) in [(a, b), (b, a)] {
            let filter = Filter::new().eq("person_a", first).eq("person_b", second);
            if let Some(document) = self
                .fetch_first::<PairDocument>(Collection::CompatibilityPairs, filter)
                .await?
            {
                return Ok(Some(CompatibilityRecord {
                    person_a: document.person_a,
                    person_b: document.person_b,
                    base_score: document.base_score,
                    harmony: document.harmony,
                    element_outcome: document.element_outcome,
                    description: document.description,
                    advice: document.advice,
                    synopsis: document.synopsis,
                    weekly: None,
                }));
            }
            if a == b {
                break;
            }
        }
        Ok(None)
    }

    /// Persist the base layer (and synopsis, when present) under the canonical pair order
    pub async fn save_compatibility(&self, record: &CompatibilityRecord) -> Result<(), StoreError> {
        let key = record.pair_key();
        let document = PairDocument {
            person_a: key.first().to_string(),
            person_b: key.second().to_string(),
            base_score: record.base_score,
            harmony: record.harmony,
            element_outcome: record.element_outcome,
            description: record.description.clone(),
            advice: record.advice.clone(),
            synopsis: record.synopsis.clone(),
        };
        self.save(Collection::CompatibilityPairs, &document).await
    }

    pub async fn fetch_weekly_compatibility(
        &self,
        a: &str,
        b: &str,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyCompatibility>, StoreError> {
        let week = week_key_string(week_start);
        for (first, second) in [(a, b), (b, a)] {
            let filter = Filter::new()
                .eq("person_a", first)
                .eq("person_b", second)
                .eq("week_start", week.as_str());
            if let Some(document) = self
                .fetch_first::<PairWeekDocument>(Collection::WeeklyCompatibility, filter)
                .await?
            {
                return Ok(Some(document.weekly));
            }
            if a == b {
                break;
            }
        }
        Ok(None)
    }

    pub async fn save_weekly_compatibility(
        &self,
        pair: &PairKey,
        weekly: &WeeklyCompatibility,
    ) -> Result<(), StoreError> {
        let document = PairWeekDocument {
            person_a: pair.first().to_string(),
            person_b: pair.second().to_string(),
            weekly: weekly.clone(),
        };
        self.save(Collection::WeeklyCompatibility, &document).await
    }
}
