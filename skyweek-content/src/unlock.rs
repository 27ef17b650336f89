//! Feature unlock gate
//!
//! Maps how much birth data is known about a person to the features that
//! may be requested for them. Pure; checked before the resolver is asked for
//! shared or personal content so no generation call is spent on a subject
//! that cannot use it.

use crate::models::{DataCompletenessLevel, Person};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Generic static reading, available to everyone
    GeneralReading,
    /// Weekly shared reading for the person's sun sign
    SignReading,
    /// Sun-sign compatibility score
    SunCompatibility,
    /// Weekly compatibility layer
    WeeklyCompatibility,
    /// AI reading generated for this person
    PersonalReading,
    /// Moon sign interpretation
    MoonInsights,
    /// Rising sign interpretation
    RisingInsights,
    /// Compatibility weighted over sun, moon and rising
    FullSynastry,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::GeneralReading,
        Feature::SignReading,
        Feature::SunCompatibility,
        Feature::WeeklyCompatibility,
        Feature::PersonalReading,
        Feature::MoonInsights,
        Feature::RisingInsights,
        Feature::FullSynastry,
    ];

    pub fn required_level(self) -> DataCompletenessLevel {
        match self {
            Feature::GeneralReading => DataCompletenessLevel::None,
            Feature::SignReading | Feature::SunCompatibility | Feature::WeeklyCompatibility => {
                DataCompletenessLevel::Basic
            }
            Feature::PersonalReading | Feature::MoonInsights => DataCompletenessLevel::Extended,
            Feature::RisingInsights | Feature::FullSynastry => DataCompletenessLevel::Full,
        }
    }
}

/// Data a person still has to provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingData {
    BirthDate,
    /// Either one is enough
    BirthTimeOrPlace,
    BirthTime,
    BirthPlace,
}

pub fn can_access(feature: Feature, level: DataCompletenessLevel) -> bool {
    level >= feature.required_level()
}

pub fn unlocked_features(level: DataCompletenessLevel) -> BTreeSet<Feature> {
    Feature::ALL
        .into_iter()
        .filter(|f| can_access(*f, level))
        .collect()
}

/// Features the next completeness level would add
pub fn next_unlocks(level: DataCompletenessLevel) -> Vec<Feature> {
    match level.next() {
        Some(next) => Feature::ALL
            .into_iter()
            .filter(|f| f.required_level() == next)
            .collect(),
        None => Vec::new(),
    }
}

/// What `person` is missing before `feature` unlocks
pub fn missing_for(feature: Feature, person: &Person) -> Vec<MissingData> {
    let mut missing = Vec::new();
    let required = feature.required_level();
    if person.completeness() >= required {
        return missing;
    }

    if person.birth_date.is_none() {
        missing.push(MissingData::BirthDate);
    }
    match required {
        DataCompletenessLevel::Extended => {
            if person.birth_time.is_none() && person.birth_place.is_none() {
                missing.push(MissingData::BirthTimeOrPlace);
            }
        }
        DataCompletenessLevel::Full => {
            if person.birth_time.is_none() {
                missing.push(MissingData::BirthTime);
            }
            if person.birth_place.is_none() {
                missing.push(MissingData::BirthPlace);
            }
        }
        DataCompletenessLevel::None | DataCompletenessLevel::Basic => {}
    }
    missing
}
