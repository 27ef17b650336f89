//! Shared weekly sky state

use crate::zodiac::ZodiacSign;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Eight-way lunar phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    pub fn label(self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "New Moon",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::FullMoon => "Full Moon",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkyEventKind {
    NewMoon,
    FirstQuarter,
    FullMoon,
    LastQuarter,
    SunIngress,
}

/// Notable event falling inside the week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkyEvent {
    pub date: NaiveDate,
    pub kind: SkyEventKind,
    pub sign: ZodiacSign,
    pub description: String,
}

/// Celestial context for one week, shared by every subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkyContext {
    pub week_start: NaiveDate,
    pub moon_phase: MoonPhase,
    /// Whole days since the last new moon at week start
    pub lunar_day: u8,
    pub moon_sign: ZodiacSign,
    pub sun_sign: ZodiacSign,
    #[serde(default)]
    pub events: Vec<SkyEvent>,
}
