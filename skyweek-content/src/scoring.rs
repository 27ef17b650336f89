//! Compatibility scoring engine
//!
//! Pure and deterministic: identical inputs always produce identical output,
//! and every pair of signs yields a result.
//!
//! Pair score = 50 base
//! + 25 same sign
//! + element bonus (same 15, complementary 10, grounding 5, challenging 0)
//! + modality bonus (flowing 10, shared 5, steadying 5, clashing 0)
//! + 15 traditional match
//! + 10 opposite signs
//! clamped to [0, 100].

use crate::zodiac::{Element, Modality, ZodiacSign};
use serde::{Deserialize, Serialize};

const BASE_SCORE: i32 = 50;
const SAME_SIGN_BONUS: i32 = 25;
const TRADITIONAL_MATCH_BONUS: i32 = 15;
const OPPOSITE_SIGN_BONUS: i32 = 10;

const SUN_WEIGHT: u32 = 3;
const MOON_WEIGHT: u32 = 2;
const RISING_WEIGHT: u32 = 1;

/// Symmetric pairs considered classic matches (same-element trines)
const TRADITIONAL_MATCHES: [(ZodiacSign, ZodiacSign); 12] = [
    (ZodiacSign::Aries, ZodiacSign::Leo),
    (ZodiacSign::Aries, ZodiacSign::Sagittarius),
    (ZodiacSign::Leo, ZodiacSign::Sagittarius),
    (ZodiacSign::Taurus, ZodiacSign::Virgo),
    (ZodiacSign::Taurus, ZodiacSign::Capricorn),
    (ZodiacSign::Virgo, ZodiacSign::Capricorn),
    (ZodiacSign::Gemini, ZodiacSign::Libra),
    (ZodiacSign::Gemini, ZodiacSign::Aquarius),
    (ZodiacSign::Libra, ZodiacSign::Aquarius),
    (ZodiacSign::Cancer, ZodiacSign::Scorpio),
    (ZodiacSign::Cancer, ZodiacSign::Pisces),
    (ZodiacSign::Scorpio, ZodiacSign::Pisces),
];

const OPPOSITE_PAIRS: [(ZodiacSign, ZodiacSign); 6] = [
    (ZodiacSign::Aries, ZodiacSign::Libra),
    (ZodiacSign::Taurus, ZodiacSign::Scorpio),
    (ZodiacSign::Gemini, ZodiacSign::Sagittarius),
    (ZodiacSign::Cancer, ZodiacSign::Capricorn),
    (ZodiacSign::Leo, ZodiacSign::Aquarius),
    (ZodiacSign::Virgo, ZodiacSign::Pisces),
];

fn pair_listed(table: &[(ZodiacSign, ZodiacSign)], a: ZodiacSign, b: ZodiacSign) -> bool {
    table
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

/// Qualitative outcome of an element pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementOutcome {
    SameElement,
    Complementary,
    Challenging,
    Grounding,
}

impl ElementOutcome {
    pub fn between(a: Element, b: Element) -> ElementOutcome {
        use Element::*;

        if a == b {
            return ElementOutcome::SameElement;
        }
        match (a, b) {
            (Fire, Air) | (Air, Fire) | (Earth, Water) | (Water, Earth) => {
                ElementOutcome::Complementary
            }
            (Fire, Water) | (Water, Fire) | (Fire, Earth) | (Earth, Fire) | (Air, Earth)
            | (Earth, Air) | (Air, Water) | (Water, Air) => ElementOutcome::Challenging,
            _ => ElementOutcome::Grounding,
        }
    }

    pub fn bonus(self) -> i32 {
        match self {
            ElementOutcome::SameElement => 15,
            ElementOutcome::Complementary => 10,
            ElementOutcome::Grounding => 5,
            ElementOutcome::Challenging => 0,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ElementOutcome::SameElement => {
                "You share the same elemental nature, so you understand each other's rhythms instinctively."
            }
            ElementOutcome::Complementary => {
                "Your elements feed each other: one supplies what the other needs to thrive."
            }
            ElementOutcome::Challenging => {
                "Your elements pull in different directions, which creates friction and a lot of room to grow."
            }
            ElementOutcome::Grounding => {
                "One of you steadies the other, giving the connection a calm and reliable base."
            }
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            ElementOutcome::SameElement => {
                "Seek out new experiences together so familiarity never turns into routine."
            }
            ElementOutcome::Complementary => {
                "Name what you admire in each other out loud; appreciation keeps the exchange flowing."
            }
            ElementOutcome::Challenging => {
                "Slow down before reacting and ask what the other person actually needs."
            }
            ElementOutcome::Grounding => {
                "Share the steadying role so neither of you carries all the weight."
            }
        }
    }
}

/// How two modalities interact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalityDynamic {
    /// Same modality
    Shared,
    /// Cardinal with Mutable: one starts, the other adapts
    Flowing,
    /// Fixed with Mutable: one holds steady, the other bends
    Steadying,
    /// Cardinal with Fixed: both want to lead
    Clashing,
}

impl ModalityDynamic {
    pub fn between(a: Modality, b: Modality) -> ModalityDynamic {
        use Modality::*;

        if a == b {
            return ModalityDynamic::Shared;
        }
        match (a, b) {
            (Cardinal, Mutable) | (Mutable, Cardinal) => ModalityDynamic::Flowing,
            (Fixed, Mutable) | (Mutable, Fixed) => ModalityDynamic::Steadying,
            _ => ModalityDynamic::Clashing,
        }
    }

    pub fn bonus(self) -> i32 {
        match self {
            ModalityDynamic::Flowing => 10,
            ModalityDynamic::Shared | ModalityDynamic::Steadying => 5,
            ModalityDynamic::Clashing => 0,
        }
    }
}

/// Five fixed bands over [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonyLevel {
    /// 0..=39
    DynamicTension,
    /// 40..=54
    Growth,
    /// 55..=69
    Harmonious,
    /// 70..=84
    KindredSpirits,
    /// 85..=100
    Soulmates,
}

impl HarmonyLevel {
    pub fn from_score(score: u8) -> HarmonyLevel {
        match score {
            85..=u8::MAX => HarmonyLevel::Soulmates,
            70..=84 => HarmonyLevel::KindredSpirits,
            55..=69 => HarmonyLevel::Harmonious,
            40..=54 => HarmonyLevel::Growth,
            _ => HarmonyLevel::DynamicTension,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HarmonyLevel::Soulmates => "Soulmates",
            HarmonyLevel::KindredSpirits => "Kindred spirits",
            HarmonyLevel::Harmonious => "Harmonious",
            HarmonyLevel::Growth => "Growth partners",
            HarmonyLevel::DynamicTension => "Dynamic tension",
        }
    }
}

/// Score and trace for one sign pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairScore {
    pub score: u8,
    pub element_outcome: ElementOutcome,
    pub modality_dynamic: ModalityDynamic,
    pub same_sign: bool,
    pub traditional_match: bool,
    pub opposite_signs: bool,
}

/// Score a single sign pair with its full trace
pub fn score_pair(a: ZodiacSign, b: ZodiacSign) -> PairScore {
    let element_outcome = ElementOutcome::between(a.element(), b.element());
    let modality_dynamic = ModalityDynamic::between(a.modality(), b.modality());
    let same_sign = a == b;
    let traditional_match = pair_listed(&TRADITIONAL_MATCHES, a, b);
    let opposite_signs = pair_listed(&OPPOSITE_PAIRS, a, b);

    let mut total = BASE_SCORE + element_outcome.bonus() + modality_dynamic.bonus();
    if same_sign {
        total += SAME_SIGN_BONUS;
    }
    if traditional_match {
        total += TRADITIONAL_MATCH_BONUS;
    }
    if opposite_signs {
        total += OPPOSITE_SIGN_BONUS;
    }

    PairScore {
        score: total.clamp(0, 100) as u8,
        element_outcome,
        modality_dynamic,
        same_sign,
        traditional_match,
        opposite_signs,
    }
}

/// Overall compatibility of two signs, in [0, 100]
pub fn overall_score(a: ZodiacSign, b: ZodiacSign) -> u8 {
    score_pair(a, b).score
}

/// Sun sign plus whichever secondary points are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoints {
    pub sun: ZodiacSign,
    pub moon: Option<ZodiacSign>,
    pub rising: Option<ZodiacSign>,
}

impl ChartPoints {
    pub fn sun_only(sun: ZodiacSign) -> Self {
        Self {
            sun,
            moon: None,
            rising: None,
        }
    }
}

/// Weighted synastry result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullResult {
    pub score: u8,
    pub harmony: HarmonyLevel,
    pub sun: PairScore,
    pub moon: Option<PairScore>,
    pub rising: Option<PairScore>,
    /// Sun/sun element outcome drives the descriptive text
    pub element_outcome: ElementOutcome,
    pub description: String,
    pub advice: String,
}

/// Weighted score over sun (×3), moon (×2) and rising (×1)
///
/// Moon and rising only count when both sides know them; the divisor is the
/// sum of the weights actually used, so a partial chart is not diluted.
pub fn full_score(a: &ChartPoints, b: &ChartPoints) -> FullResult {
    let sun = score_pair(a.sun, b.sun);
    let moon = a.moon.zip(b.moon).map(|(x, y)| score_pair(x, y));
    let rising = a.rising.zip(b.rising).map(|(x, y)| score_pair(x, y));

    let mut weighted = u32::from(sun.score) * SUN_WEIGHT;
    let mut weights = SUN_WEIGHT;
    if let Some(moon) = &moon {
        weighted += u32::from(moon.score) * MOON_WEIGHT;
        weights += MOON_WEIGHT;
    }
    if let Some(rising) = &rising {
        weighted += u32::from(rising.score) * RISING_WEIGHT;
        weights += RISING_WEIGHT;
    }

    // Round half up
    let score = ((weighted + weights / 2) / weights).min(100) as u8;

    FullResult {
        score,
        harmony: HarmonyLevel::from_score(score),
        sun,
        moon,
        rising,
        element_outcome: sun.element_outcome,
        description: sun.element_outcome.description().to_string(),
        advice: sun.element_outcome.advice().to_string(),
    }
}
