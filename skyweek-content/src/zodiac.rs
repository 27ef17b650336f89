//! Zodiac signs and their fixed attributes
//!
//! Signs, elements, modalities and date ranges are compile-time tables.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classical element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Earth,
    Air,
    Water,
}

/// Modality (quality)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Cardinal,
    Fixed,
    Mutable,
}

/// One of the twelve signs, in zodiac order starting at Aries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

/// Sun sign date ranges as ((start month, start day), (end month, end day)), inclusive
const DATE_RANGES: [((u32, u32), (u32, u32)); 12] = [
    ((3, 21), (4, 19)),
    ((4, 20), (5, 20)),
    ((5, 21), (6, 20)),
    ((6, 21), (7, 22)),
    ((7, 23), (8, 22)),
    ((8, 23), (9, 22)),
    ((9, 23), (10, 22)),
    ((10, 23), (11, 21)),
    ((11, 22), (12, 21)),
    ((12, 22), (1, 19)),
    ((1, 20), (2, 18)),
    ((2, 19), (3, 20)),
];

impl ZodiacSign {
    pub const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    /// Position in zodiac order (Aries = 0)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Sign at `index` modulo 12
    pub fn from_index(index: usize) -> ZodiacSign {
        Self::ALL[index % 12]
    }

    /// Sign occupying an ecliptic longitude in degrees
    pub fn from_longitude(degrees: f64) -> ZodiacSign {
        let normalized = degrees.rem_euclid(360.0);
        Self::from_index((normalized / 30.0).floor() as usize)
    }

    pub fn name(self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }

    pub fn element(self) -> Element {
        match self.index() % 4 {
            0 => Element::Fire,
            1 => Element::Earth,
            2 => Element::Air,
            _ => Element::Water,
        }
    }

    pub fn modality(self) -> Modality {
        match self.index() % 3 {
            0 => Modality::Cardinal,
            1 => Modality::Fixed,
            _ => Modality::Mutable,
        }
    }

    /// Inclusive (month, day) bounds of the sun sign period
    pub fn date_range(self) -> ((u32, u32), (u32, u32)) {
        DATE_RANGES[self.index()]
    }

    /// Sun sign for a calendar date
    pub fn from_date(date: NaiveDate) -> ZodiacSign {
        let md = (date.month(), date.day());
        Self::ALL
            .into_iter()
            .find(|sign| {
                let (start, end) = sign.date_range();
                if start <= end {
                    start <= md && md <= end
                } else {
                    md >= start || md <= end
                }
            })
            // Unreachable: the ranges cover every calendar day
            .unwrap_or(ZodiacSign::Capricorn)
    }

    /// Sign directly across the zodiac
    pub fn opposite(self) -> ZodiacSign {
        Self::from_index(self.index() + 6)
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ZodiacSign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|sign| sign.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("Unknown zodiac sign: {}", s))
    }
}
