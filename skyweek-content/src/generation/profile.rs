//! Astrological profile of a subject
//!
//! Full birth data goes to the chart service. Anything less is handled
//! locally: the sun sign from the date table, the moon from its mean
//! motion, and the rising sign from the birth hour.

use crate::error::ContentError;
use crate::models::{DataCompletenessLevel, Person};
use crate::scoring::ChartPoints;
use crate::zodiac::ZodiacSign;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Mean lunar longitude at J2000.0, degrees
const MOON_LONGITUDE_J2000: f64 = 218.316;
/// Mean lunar motion, degrees per day
const MOON_DEGREES_PER_DAY: f64 = 13.176396;
/// Birth hour at which the rising sign equals the sun sign
const SUNRISE_HOUR: i64 = 6;
/// Hours per rising sign step
const HOURS_PER_SIGN: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfilePrecision {
    /// From the chart service, or points the person already carried
    Computed,
    /// Local approximation
    Approximate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstroProfile {
    pub sun: ZodiacSign,
    pub moon: Option<ZodiacSign>,
    pub rising: Option<ZodiacSign>,
    pub precision: ProfilePrecision,
}

impl AstroProfile {
    pub fn for_sign(sun: ZodiacSign) -> Self {
        Self {
            sun,
            moon: None,
            rising: None,
            precision: ProfilePrecision::Approximate,
        }
    }

    pub fn chart_points(&self) -> ChartPoints {
        ChartPoints {
            sun: self.sun,
            moon: self.moon,
            rising: self.rising,
        }
    }
}

fn j2000() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or_default()
}

/// Moon sign from the mean-motion approximation (accurate to a sign or so)
pub fn approximate_moon_sign(instant: NaiveDateTime) -> ZodiacSign {
    let days = (instant - j2000()).num_seconds() as f64 / 86_400.0;
    ZodiacSign::from_longitude(MOON_LONGITUDE_J2000 + MOON_DEGREES_PER_DAY * days)
}

/// Rising sign: the sun sign at 06:00, one sign further every two hours
pub fn approximate_rising_sign(sun: ZodiacSign, birth_time: NaiveTime) -> ZodiacSign {
    let offset = (i64::from(birth_time.hour()) - SUNRISE_HOUR).div_euclid(HOURS_PER_SIGN);
    ZodiacSign::from_index((sun.index() as i64 + offset).rem_euclid(12) as usize)
}

/// Profile computed without any remote call
///
/// The moon is estimated once time or place is known (noon when the time
/// is missing); the rising sign needs a birth time. Points the person
/// already carries are kept as-is.
pub fn approximate_profile(person: &Person) -> Result<AstroProfile, ContentError> {
    let birth_date = person.birth_date.ok_or_else(|| {
        ContentError::MissingInput(format!("person {} has no birth date", person.id))
    })?;
    let sun = ZodiacSign::from_date(birth_date);

    let moon = person.moon_sign.or_else(|| {
        if person.completeness() < DataCompletenessLevel::Extended {
            return None;
        }
        let instant = match person.birth_time {
            Some(time) => Some(birth_date.and_time(time)),
            None => birth_date.and_hms_opt(12, 0, 0),
        };
        instant.map(approximate_moon_sign)
    });

    let rising = person
        .rising_sign
        .or_else(|| person.birth_time.map(|time| approximate_rising_sign(sun, time)));

    Ok(AstroProfile {
        sun,
        moon,
        rising,
        precision: ProfilePrecision::Approximate,
    })
}
