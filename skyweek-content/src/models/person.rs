//! People and how much birth data is known about them

use crate::scoring::ChartPoints;
use crate::zodiac::ZodiacSign;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Where someone was born
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthPlace {
    /// Free-form place name, used for geocoding when coordinates are absent
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// IANA time zone name
    #[serde(default)]
    pub timezone: Option<String>,
}

impl BirthPlace {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// How much birth data is known, in lattice order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataCompletenessLevel {
    /// No birthday
    None,
    /// Birthday only (sun sign)
    Basic,
    /// Birthday plus time or place
    Extended,
    /// Birthday, time and place
    Full,
}

impl DataCompletenessLevel {
    pub const ALL: [DataCompletenessLevel; 4] = [
        DataCompletenessLevel::None,
        DataCompletenessLevel::Basic,
        DataCompletenessLevel::Extended,
        DataCompletenessLevel::Full,
    ];

    pub fn next(self) -> Option<DataCompletenessLevel> {
        match self {
            DataCompletenessLevel::None => Some(DataCompletenessLevel::Basic),
            DataCompletenessLevel::Basic => Some(DataCompletenessLevel::Extended),
            DataCompletenessLevel::Extended => Some(DataCompletenessLevel::Full),
            DataCompletenessLevel::Full => None,
        }
    }
}

/// A person content can be personalized for
///
/// Completeness is never stored; it is recomputed from the birth fields on
/// every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Stable opaque identifier
    pub id: String,
    /// Shown in the UI only; never sent to the generation service
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub birth_time: Option<NaiveTime>,
    #[serde(default)]
    pub birth_place: Option<BirthPlace>,
    /// Previously computed chart points, if any
    #[serde(default)]
    pub moon_sign: Option<ZodiacSign>,
    #[serde(default)]
    pub rising_sign: Option<ZodiacSign>,
}

impl Person {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            birth_date: None,
            birth_time: None,
            birth_place: None,
            moon_sign: None,
            rising_sign: None,
        }
    }

    pub fn with_birth_date(mut self, date: NaiveDate) -> Self {
        self.birth_date = Some(date);
        self
    }

    pub fn with_birth_time(mut self, time: NaiveTime) -> Self {
        self.birth_time = Some(time);
        self
    }

    pub fn with_birth_place(mut self, place: BirthPlace) -> Self {
        self.birth_place = Some(place);
        self
    }

    /// Sun sign, unknown without a birthday
    pub fn sun_sign(&self) -> Option<ZodiacSign> {
        self.birth_date.map(ZodiacSign::from_date)
    }

    pub fn completeness(&self) -> DataCompletenessLevel {
        if self.birth_date.is_none() {
            return DataCompletenessLevel::None;
        }
        match (self.birth_time.is_some(), self.birth_place.is_some()) {
            (true, true) => DataCompletenessLevel::Full,
            (true, false) | (false, true) => DataCompletenessLevel::Extended,
            (false, false) => DataCompletenessLevel::Basic,
        }
    }

    /// Chart points known without any computation
    pub fn known_points(&self) -> Option<ChartPoints> {
        self.sun_sign().map(|sun| ChartPoints {
            sun,
            moon: self.moon_sign,
            rising: self.rising_sign,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place() -> BirthPlace {
        BirthPlace {
            name: "Lisbon".to_string(),
            latitude: Some(38.72),
            longitude: Some(-9.14),
            timezone: Some("Europe/Lisbon".to_string()),
        }
    }

    #[test]
    fn test_completeness_lattice() {
        let date = NaiveDate::from_ymd_opt(1990, 8, 1).unwrap();
        let time = NaiveTime::from_hms_opt(14, 30, 0).unwrap();

        let person = Person::new("p1");
        assert_eq!(person.completeness(), DataCompletenessLevel::None);

        let person = person.with_birth_date(date);
        assert_eq!(person.completeness(), DataCompletenessLevel::Basic);

        let with_time = person.clone().with_birth_time(time);
        assert_eq!(with_time.completeness(), DataCompletenessLevel::Extended);

        let with_place = person.clone().with_birth_place(place());
        assert_eq!(with_place.completeness(), DataCompletenessLevel::Extended);

        let full = with_time.with_birth_place(place());
        assert_eq!(full.completeness(), DataCompletenessLevel::Full);
    }

    #[test]
    fn test_completeness_tracks_field_changes() {
        let mut person = Person::new("p2")
            .with_birth_date(NaiveDate::from_ymd_opt(1985, 1, 2).unwrap())
            .with_birth_place(place());
        assert_eq!(person.completeness(), DataCompletenessLevel::Extended);

        person.birth_place = None;
        assert_eq!(person.completeness(), DataCompletenessLevel::Basic);

        person.birth_date = None;
        assert_eq!(person.completeness(), DataCompletenessLevel::None);
    }

    #[test]
    fn test_time_without_date_is_none() {
        let person = Person::new("p3").with_birth_time(NaiveTime::from_hms_opt(1, 0, 0).unwrap());
        assert_eq!(person.completeness(), DataCompletenessLevel::None);
        assert!(person.sun_sign().is_none());
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(DataCompletenessLevel::None < DataCompletenessLevel::Basic);
        assert!(DataCompletenessLevel::Basic < DataCompletenessLevel::Extended);
        assert!(DataCompletenessLevel::Extended < DataCompletenessLevel::Full);
        assert_eq!(DataCompletenessLevel::Full.next(), None);
    }

    #[test]
    fn test_sun_sign_from_birthday() {
        let person = Person::new("p4").with_birth_date(NaiveDate::from_ymd_opt(1992, 11, 3).unwrap());
        assert_eq!(person.sun_sign(), Some(ZodiacSign::Scorpio));
    }
}
