//! Domain records shared by the store, the pipeline and the resolver

pub mod content;
pub mod person;
pub mod sky;

pub use content::{
    CompatibilityRecord, PairKey, PairSynopsis, SubjectKey, WeeklyCompatibility, WeeklyReading,
};
pub use person::{BirthPlace, DataCompletenessLevel, Person};
pub use sky::{MoonPhase, SkyContext, SkyEvent, SkyEventKind};
