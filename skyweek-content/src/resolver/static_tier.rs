//! Static content library
//!
//! The last tier: local, no network. The built-in library covers every
//! sign, the generic reading and every harmony level. A custom library
//! loaded from TOML replaces it wholesale, so a gap there surfaces as
//! `Exhausted`.

use crate::error::ContentError;
use crate::generation::normalize::{default_lucky_color, default_lucky_number};
use crate::models::{SubjectKey, WeeklyCompatibility, WeeklyReading};
use crate::scoring::HarmonyLevel;
use crate::zodiac::ZodiacSign;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

const GENERAL_READING: &str = "A week for small, steady steps. Notice what already works, \
give your attention to one thing at a time, and let the rest wait its turn.";

const SIGN_READINGS: [(ZodiacSign, &str, &str); 12] = [
    (ZodiacSign::Aries, "Energetic", "Your drive is high this week. Start the thing you have been circling, and leave room to adjust once it is moving."),
    (ZodiacSign::Taurus, "Grounded", "Comfort and consistency carry you. Tend to what you have built and resist the pull to rush a slow decision."),
    (ZodiacSign::Gemini, "Curious", "Conversations open doors. Follow the idea that keeps returning, and write it down before the next one arrives."),
    (ZodiacSign::Cancer, "Nurturing", "Home and close ties ask for attention. A quiet gesture of care lands further than you expect."),
    (ZodiacSign::Leo, "Radiant", "You are easy to notice this week. Share the spotlight generously and your warmth comes back doubled."),
    (ZodiacSign::Virgo, "Focused", "Details fall into place. Clear one lingering task early and the rest of the week feels lighter."),
    (ZodiacSign::Libra, "Harmonious", "Balance is your theme. Weigh both sides, then commit; an honest choice beats a perfect one."),
    (ZodiacSign::Scorpio, "Intense", "Depth over breadth. One meaningful conversation this week is worth more than many light ones."),
    (ZodiacSign::Sagittarius, "Adventurous", "Wander a little, in plans or in place. A fresh perspective shows you the shortcut you missed."),
    (ZodiacSign::Capricorn, "Determined", "Steady effort pays off. Keep your pace and let results arrive on their own schedule."),
    (ZodiacSign::Aquarius, "Inventive", "An unusual idea deserves a test run. Share it with someone who will push back kindly."),
    (ZodiacSign::Pisces, "Dreamy", "Intuition is loud this week. Give it some quiet time, then act on what stays with you."),
];

const PAIR_NARRATIVES: [(HarmonyLevel, &str); 5] = [
    (HarmonyLevel::Soulmates, "You move in step this week. Make time for something new together."),
    (HarmonyLevel::KindredSpirits, "Easy understanding carries you both. Say the appreciative thing out loud."),
    (HarmonyLevel::Harmonious, "A pleasant week together. Small shared plans keep the rhythm going."),
    (HarmonyLevel::Growth, "Different paces this week. Patience turns friction into learning."),
    (HarmonyLevel::DynamicTension, "Sparks may fly. Pick your moments and keep conversations kind."),
];

/// One static reading
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StaticEntry {
    pub reading: String,
    pub mood: String,
    #[serde(default)]
    pub lucky_number: Option<u8>,
    #[serde(default)]
    pub lucky_color: Option<String>,
    #[serde(default)]
    pub advice: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LibraryFile {
    general: Option<StaticEntry>,
    #[serde(default)]
    signs: BTreeMap<String, StaticEntry>,
    #[serde(default)]
    pairs: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct StaticLibrary {
    general: Option<StaticEntry>,
    signs: HashMap<ZodiacSign, StaticEntry>,
    pairs: HashMap<HarmonyLevel, String>,
}

fn harmony_from_key(key: &str) -> Option<HarmonyLevel> {
    serde_json::from_value(serde_json::Value::String(key.trim().to_lowercase())).ok()
}

impl StaticLibrary {
    pub fn builtin() -> Self {
        let signs = SIGN_READINGS
            .iter()
            .map(|(sign, mood, reading)| {
                (
                    *sign,
                    StaticEntry {
                        reading: reading.to_string(),
                        mood: mood.to_string(),
                        lucky_number: None,
                        lucky_color: None,
                        advice: None,
                    },
                )
            })
            .collect();

        let pairs = PAIR_NARRATIVES
            .iter()
            .map(|(level, text)| (*level, text.to_string()))
            .collect();

        Self {
            general: Some(StaticEntry {
                reading: GENERAL_READING.to_string(),
                mood: "Reflective".to_string(),
                lucky_number: Some(7),
                lucky_color: Some("White".to_string()),
                advice: None,
            }),
            signs,
            pairs,
        }
    }

    /// Parse a custom library; unknown sign or harmony keys are rejected
    pub fn from_toml_str(content: &str) -> Result<Self, ContentError> {
        let file: LibraryFile = toml::from_str(content)
            .map_err(|e| ContentError::Internal(format!("invalid static library: {}", e)))?;

        let mut signs = HashMap::new();
        for (key, entry) in file.signs {
            let sign = key
                .parse::<ZodiacSign>()
                .map_err(|e| ContentError::Internal(format!("invalid static library: {}", e)))?;
            signs.insert(sign, entry);
        }

        let mut pairs = HashMap::new();
        for (key, text) in file.pairs {
            let level = harmony_from_key(&key).ok_or_else(|| {
                ContentError::Internal(format!("invalid static library: unknown harmony '{}'", key))
            })?;
            pairs.insert(level, text);
        }

        Ok(Self {
            general: file.general,
            signs,
            pairs,
        })
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ContentError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ContentError::Internal(format!("cannot read static library {}: {}", path.display(), e))
        })?;
        let library = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            signs = library.signs.len(),
            "Loaded custom static library"
        );
        Ok(library)
    }

    fn to_reading(
        entry: &StaticEntry,
        subject: SubjectKey,
        week_start: NaiveDate,
        sign: Option<ZodiacSign>,
    ) -> WeeklyReading {
        WeeklyReading {
            subject,
            week_start,
            reading: entry.reading.clone(),
            mood: entry.mood.clone(),
            lucky_number: entry
                .lucky_number
                .or_else(|| sign.map(default_lucky_number))
                .unwrap_or(7),
            lucky_color: entry
                .lucky_color
                .clone()
                .or_else(|| sign.map(|s| default_lucky_color(s.element()).to_string()))
                .unwrap_or_else(|| "White".to_string()),
            highlights: Vec::new(),
            advice: entry.advice.clone(),
            is_generated: false,
        }
    }

    /// Static reading for a sign
    pub fn sign_reading(
        &self,
        sign: ZodiacSign,
        week_start: NaiveDate,
    ) -> Result<WeeklyReading, ContentError> {
        let entry = self
            .signs
            .get(&sign)
            .ok_or_else(|| ContentError::Exhausted(format!("no static reading for {}", sign)))?;
        Ok(Self::to_reading(entry, SubjectKey::Sign(sign), week_start, Some(sign)))
    }

    /// Generic reading for a subject whose sign is unknown
    pub fn general_reading(
        &self,
        subject: SubjectKey,
        week_start: NaiveDate,
    ) -> Result<WeeklyReading, ContentError> {
        let entry = self
            .general
            .as_ref()
            .ok_or_else(|| ContentError::Exhausted("no general static reading".to_string()))?;
        Ok(Self::to_reading(entry, subject, week_start, None))
    }

    /// Static weekly layer for a pair: the base score with a canned narrative
    pub fn weekly_compatibility(
        &self,
        harmony: HarmonyLevel,
        base_score: u8,
        week_start: NaiveDate,
    ) -> Result<WeeklyCompatibility, ContentError> {
        let narrative = self.pairs.get(&harmony).ok_or_else(|| {
            ContentError::Exhausted(format!("no static pair narrative for {}", harmony.label()))
        })?;
        Ok(WeeklyCompatibility {
            week_start,
            this_week_score: base_score,
            mood_descriptors: Vec::new(),
            narrative: narrative.clone(),
            is_generated: false,
        })
    }
}

impl Default for StaticLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}
