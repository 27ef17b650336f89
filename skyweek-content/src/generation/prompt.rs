//! Structured prompt context
//!
//! Only categorical astrological attributes cross into a prompt. Names,
//! identifiers, birth dates and places stay on this side.

use super::profile::{AstroProfile, ProfilePrecision};
use crate::models::{DataCompletenessLevel, SkyContext};
use crate::scoring::{ElementOutcome, HarmonyLevel};
use crate::zodiac::{Element, Modality, ZodiacSign};
use chrono::NaiveDate;
use serde::Serialize;

/// Output schema requested from the generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSchema {
    WeeklySign,
    PersonalReading,
    PairCompatibility,
    WeeklyCompatibility,
}

impl ContentSchema {
    pub fn instructions(self) -> &'static str {
        match self {
            ContentSchema::WeeklySign | ContentSchema::PersonalReading => {
                "Return JSON with fields: reading (string), mood (string), lucky_number (1-99), \
                 lucky_color (string), highlights (array of strings), advice (string)."
            }
            ContentSchema::PairCompatibility => {
                "Return JSON with fields: summary (string), strengths (array of strings), \
                 challenges (array of strings)."
            }
            ContentSchema::WeeklyCompatibility => {
                "Return JSON with fields: this_week_score (0-100), mood_descriptors \
                 (array of strings), narrative (string)."
            }
        }
    }
}

/// Anonymous astrological description of one subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectProfile {
    pub sun_sign: ZodiacSign,
    pub element: Element,
    pub modality: Modality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moon_sign: Option<ZodiacSign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rising_sign: Option<ZodiacSign>,
    pub completeness: DataCompletenessLevel,
    pub precision: ProfilePrecision,
}

impl SubjectProfile {
    pub fn new(profile: &AstroProfile, completeness: DataCompletenessLevel) -> Self {
        Self {
            sun_sign: profile.sun,
            element: profile.sun.element(),
            modality: profile.sun.modality(),
            moon_sign: profile.moon,
            rising_sign: profile.rising,
            completeness,
            precision: profile.precision,
        }
    }

    /// Shared-tier subject: a sign with nothing else known
    pub fn for_sign(sign: ZodiacSign) -> Self {
        Self::new(&AstroProfile::for_sign(sign), DataCompletenessLevel::Basic)
    }
}

/// Deterministic facts about a pair, included so prose agrees with the score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairFacts {
    pub base_score: u8,
    pub harmony: HarmonyLevel,
    pub element_outcome: ElementOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptContext {
    pub schema: ContentSchema,
    pub week_start: NaiveDate,
    pub sky: SkyContext,
    pub subjects: Vec<SubjectProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair: Option<PairFacts>,
}

impl PromptContext {
    pub fn single(schema: ContentSchema, sky: SkyContext, subject: SubjectProfile) -> Self {
        Self {
            schema,
            week_start: sky.week_start,
            sky,
            subjects: vec![subject],
            pair: None,
        }
    }

    pub fn pair(
        schema: ContentSchema,
        sky: SkyContext,
        a: SubjectProfile,
        b: SubjectProfile,
        facts: PairFacts,
    ) -> Self {
        Self {
            schema,
            week_start: sky.week_start,
            sky,
            subjects: vec![a, b],
            pair: Some(facts),
        }
    }
}
