//! Weekly content and compatibility records

use crate::scoring::{ElementOutcome, HarmonyLevel};
use crate::zodiac::ZodiacSign;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a weekly record is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKey {
    /// Shared tier: one record per sign per week
    Sign(ZodiacSign),
    /// Personal tier: one record per person per week
    Person(String),
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKey::Sign(sign) => write!(f, "sign:{}", sign),
            SubjectKey::Person(id) => write!(f, "person:{}", id),
        }
    }
}

/// Weekly reading, keyed by (subject, week_start)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReading {
    pub subject: SubjectKey,
    pub week_start: NaiveDate,
    pub reading: String,
    pub mood: String,
    pub lucky_number: u8,
    pub lucky_color: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub advice: Option<String>,
    /// AI-sourced (true) or static fallback (false)
    pub is_generated: bool,
}

/// Unordered pair of person identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self {
                first: a.to_string(),
                second: b.to_string(),
            }
        } else {
            Self {
                first: b.to_string(),
                second: a.to_string(),
            }
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }
}

/// Long-lived AI description of a pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSynopsis {
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
}

/// Time-varying layer of a compatibility record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCompatibility {
    pub week_start: NaiveDate,
    pub this_week_score: u8,
    #[serde(default)]
    pub mood_descriptors: Vec<String>,
    pub narrative: String,
    pub is_generated: bool,
}

/// Compatibility between two people
///
/// The base layer never expires; the weekly layer belongs to one week only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityRecord {
    pub person_a: String,
    pub person_b: String,
    pub base_score: u8,
    pub harmony: HarmonyLevel,
    pub element_outcome: ElementOutcome,
    pub description: String,
    pub advice: String,
    #[serde(default)]
    pub synopsis: Option<PairSynopsis>,
    #[serde(default)]
    pub weekly: Option<WeeklyCompatibility>,
}

impl CompatibilityRecord {
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.person_a, &self.person_b)
    }

    /// True when any layer came from the generation service
    pub fn is_generated(&self) -> bool {
        self.synopsis.is_some() || self.weekly.as_ref().is_some_and(|w| w.is_generated)
    }

    /// Weekly layer missing or from another week
    pub fn weekly_is_stale(&self, week_start: NaiveDate) -> bool {
        self.weekly
            .as_ref()
            .map_or(true, |w| w.week_start != week_start)
    }
}
