//! Tiered content resolver
//!
//! Every weekly request walks the same chain:
//! in-process cache -> document store -> generation pipeline -> static library.
//! A higher tier's failure is logged and downgraded, never returned; only
//! `Exhausted` (a static library gap) and explicit refreshes surface errors.
//! Concurrent misses for one key share a single attempt.

pub mod cache;
pub mod inflight;
pub mod static_tier;

pub use cache::TtlCache;
pub use inflight::InFlight;
pub use static_tier::StaticLibrary;

use crate::error::ContentError;
use crate::generation::{with_timeout, GenerationPipeline};
use crate::models::{CompatibilityRecord, PairKey, Person, SubjectKey, WeeklyReading};
use crate::services::{ContentStore, StoreError};
use crate::unlock::{can_access, missing_for, Feature};
use crate::zodiac::ZodiacSign;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use skyweek_common::time::{Clock, WeekStart};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub week_start: WeekStart,
    pub cache_ttl: chrono::Duration,
    /// Upper bound for each store, chart and generation call
    pub remote_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            week_start: WeekStart::Monday,
            cache_ttl: chrono::Duration::days(7),
            remote_timeout: Duration::from_secs(20),
        }
    }
}

/// Tier a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Cache,
    Store,
    Generated,
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved<T> {
    #[serde(flatten)]
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Resolved<T> {
    fn new(value: T, provenance: Provenance) -> Self {
        Self { value, provenance }
    }
}

/// Outcome of a store lookup
///
/// `Failed` and `Miss` both fall through to generation: a first-ever
/// request has nothing stored either, and content must still render.
#[derive(Debug)]
pub enum Lookup<T> {
    Hit(T),
    Miss,
    Failed(ContentError),
}

impl<T> From<Result<Option<T>, ContentError>> for Lookup<T> {
    fn from(result: Result<Option<T>, ContentError>) -> Self {
        match result {
            Ok(Some(value)) => Lookup::Hit(value),
            Ok(None) => Lookup::Miss,
            Err(e) => Lookup::Failed(e),
        }
    }
}

type ReadingKey = (SubjectKey, NaiveDate);
type PairWeekKey = (PairKey, NaiveDate);

/// Resolver handle; clones share caches and in-flight attempts
#[derive(Clone)]
pub struct ContentResolver {
    store: ContentStore,
    pipeline: Arc<GenerationPipeline>,
    library: Arc<StaticLibrary>,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
    readings: Arc<TtlCache<ReadingKey, WeeklyReading>>,
    pairs: Arc<TtlCache<PairWeekKey, CompatibilityRecord>>,
    reading_attempts: Arc<InFlight<ReadingKey, Resolved<WeeklyReading>>>,
    pair_attempts: Arc<InFlight<PairWeekKey, Resolved<CompatibilityRecord>>>,
}

impl ContentResolver {
    pub fn new(
        store: ContentStore,
        pipeline: Arc<GenerationPipeline>,
        library: Arc<StaticLibrary>,
        clock: Arc<dyn Clock>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            pipeline,
            library,
            clock,
            config,
            readings: Arc::new(TtlCache::new(config.cache_ttl)),
            pairs: Arc::new(TtlCache::new(config.cache_ttl)),
            reading_attempts: Arc::new(InFlight::new()),
            pair_attempts: Arc::new(InFlight::new()),
        }
    }

    /// Canonical week key for the current instant
    pub fn current_week(&self) -> NaiveDate {
        self.config.week_start.week_key(self.clock.now())
    }

    async fn store_lookup<T, F>(&self, what: &str, fetch: F) -> Lookup<T>
    where
        F: Future<Output = Result<Option<T>, StoreError>>,
    {
        let lookup = Lookup::from(with_timeout(self.config.remote_timeout, what, fetch).await);
        match &lookup {
            Lookup::Hit(_) => debug!(what = %what, "Store hit"),
            Lookup::Miss => debug!(what = %what, "Store miss"),
            Lookup::Failed(e) => {
                warn!(what = %what, error = %e, "Store lookup failed, treating as miss")
            }
        }
        lookup
    }

    /// Best-effort write; failures are logged and swallowed
    async fn persist<F>(&self, what: &str, save: F)
    where
        F: Future<Output = Result<(), StoreError>>,
    {
        match with_timeout(self.config.remote_timeout, what, save).await {
            Ok(()) => info!(what = %what, "Persisted to store"),
            Err(e) => warn!(what = %what, error = %e, "Persist failed, result kept"),
        }
    }

    async fn cache_reading(&self, reading: &WeeklyReading) {
        let key = (reading.subject.clone(), reading.week_start);
        self.readings
            .insert(key, reading.clone(), reading.week_start, self.clock.now())
            .await;
    }

    fn static_sign_reading(
        &self,
        sign: ZodiacSign,
        week: NaiveDate,
    ) -> Result<Resolved<WeeklyReading>, ContentError> {
        self.library
            .sign_reading(sign, week)
            .map(|reading| Resolved::new(reading, Provenance::Static))
            .map_err(|e| {
                error!(sign = %sign, error = %e, "Static tier exhausted");
                e
            })
    }

    /// Shared weekly reading for a sign; never fails short of `Exhausted`
    pub async fn weekly_sign_reading(
        &self,
        sign: ZodiacSign,
    ) -> Result<Resolved<WeeklyReading>, ContentError> {
        let week = self.current_week();
        let key = (SubjectKey::Sign(sign), week);

        if let Some(reading) = self.readings.get(&key, self.clock.now()).await {
            debug!(sign = %sign, week = %week, "Cache hit");
            return Ok(Resolved::new(reading, Provenance::Cache));
        }

        let this = self.clone();
        self.reading_attempts
            .run(key, move || async move { this.load_sign_reading(sign, week).await })
            .await
    }

    async fn load_sign_reading(
        &self,
        sign: ZodiacSign,
        week: NaiveDate,
    ) -> Result<Resolved<WeeklyReading>, ContentError> {
        let subject = SubjectKey::Sign(sign);
        if let Some(reading) = self.readings.get(&(subject.clone(), week), self.clock.now()).await {
            return Ok(Resolved::new(reading, Provenance::Cache));
        }

        if let Lookup::Hit(reading) = self
            .store_lookup("sign reading", self.store.fetch_weekly_reading(&subject, week))
            .await
        {
            self.cache_reading(&reading).await;
            return Ok(Resolved::new(reading, Provenance::Store));
        }

        match self.pipeline.generate_sign_reading(sign, week).await {
            Ok(reading) => {
                self.persist("sign reading", self.store.save_weekly_reading(&reading))
                    .await;
                self.cache_reading(&reading).await;
                Ok(Resolved::new(reading, Provenance::Generated))
            }
            Err(e) if e.triggers_fallback() => {
                warn!(sign = %sign, error = %e, "Sign reading generation failed, using static tier");
                self.static_sign_reading(sign, week)
            }
            Err(e) => Err(e),
        }
    }

    /// All twelve sign readings; each sign resolves independently
    pub async fn all_sign_readings(
        &self,
    ) -> Vec<(ZodiacSign, Result<Resolved<WeeklyReading>, ContentError>)> {
        join_all(
            ZodiacSign::ALL
                .into_iter()
                .map(|sign| async move { (sign, self.weekly_sign_reading(sign).await) }),
        )
        .await
    }

    /// Reading for a person below the personal tier: their sign, else generic
    async fn degraded_personal(
        &self,
        person: &Person,
        week: NaiveDate,
    ) -> Result<Resolved<WeeklyReading>, ContentError> {
        match person.sun_sign() {
            Some(sun) => self.weekly_sign_reading(sun).await,
            None => self
                .library
                .general_reading(SubjectKey::Person(person.id.clone()), week)
                .map(|reading| Resolved::new(reading, Provenance::Static))
                .map_err(|e| {
                    error!(person = %person.id, error = %e, "Static tier exhausted");
                    e
                }),
        }
    }

    /// Personal reading, degrading to the sign reading and then static
    pub async fn personal_reading(
        &self,
        person: &Person,
    ) -> Result<Resolved<WeeklyReading>, ContentError> {
        let week = self.current_week();
        if !can_access(Feature::PersonalReading, person.completeness()) {
            debug!(person = %person.id, level = ?person.completeness(), "Personal tier locked");
            return self.degraded_personal(person, week).await;
        }

        let key = (SubjectKey::Person(person.id.clone()), week);
        if let Some(reading) = self.readings.get(&key, self.clock.now()).await {
            debug!(person = %person.id, week = %week, "Cache hit");
            return Ok(Resolved::new(reading, Provenance::Cache));
        }

        let this = self.clone();
        let person = person.clone();
        self.reading_attempts
            .run(key, move || async move {
                this.load_personal_reading(&person, week).await
            })
            .await
    }

    async fn load_personal_reading(
        &self,
        person: &Person,
        week: NaiveDate,
    ) -> Result<Resolved<WeeklyReading>, ContentError> {
        let subject = SubjectKey::Person(person.id.clone());
        if let Some(reading) = self.readings.get(&(subject.clone(), week), self.clock.now()).await {
            return Ok(Resolved::new(reading, Provenance::Cache));
        }

        if let Lookup::Hit(reading) = self
            .store_lookup("personal reading", self.store.fetch_weekly_reading(&subject, week))
            .await
        {
            self.cache_reading(&reading).await;
            return Ok(Resolved::new(reading, Provenance::Store));
        }

        match self.pipeline.generate_personal_reading(person, week).await {
            Ok(reading) => {
                self.persist("personal reading", self.store.save_weekly_reading(&reading))
                    .await;
                self.cache_reading(&reading).await;
                Ok(Resolved::new(reading, Provenance::Generated))
            }
            Err(e) if e.triggers_fallback() => {
                warn!(person = %person.id, error = %e, "Personal generation failed, degrading");
                self.degraded_personal(person, week).await
            }
            Err(e) => Err(e),
        }
    }

    /// Compatibility between two people
    ///
    /// Both need a birth date. The base layer is computed once and kept;
    /// the weekly layer is per week and falls back to static text.
    pub async fn compatibility(
        &self,
        a: &Person,
        b: &Person,
    ) -> Result<Resolved<CompatibilityRecord>, ContentError> {
        for person in [a, b] {
            if !can_access(Feature::SunCompatibility, person.completeness()) {
                return Err(ContentError::MissingInput(format!(
                    "person {} needs a birth date for compatibility",
                    person.id
                )));
            }
        }

        let week = self.current_week();
        let key = (PairKey::new(&a.id, &b.id), week);
        if let Some(record) = self.pairs.get(&key, self.clock.now()).await {
            debug!(week = %week, "Compatibility cache hit");
            return Ok(Resolved::new(record, Provenance::Cache));
        }

        let this = self.clone();
        let (a, b) = (a.clone(), b.clone());
        self.pair_attempts
            .run(key, move || async move { this.load_compatibility(&a, &b, week).await })
            .await
    }

    async fn load_compatibility(
        &self,
        a: &Person,
        b: &Person,
        week: NaiveDate,
    ) -> Result<Resolved<CompatibilityRecord>, ContentError> {
        let mut generated = false;
        let mut from_store = true;

        let mut record = match self
            .store_lookup("compatibility", self.store.fetch_compatibility(&a.id, &b.id))
            .await
        {
            Lookup::Hit(record) => record,
            Lookup::Miss | Lookup::Failed(_) => {
                from_store = false;
                let mut record = self.pipeline.base_compatibility(a, b).await?;
                let pair = record.pair_key();
                record.person_a = pair.first().to_string();
                record.person_b = pair.second().to_string();
                self.persist("compatibility base", self.store.save_compatibility(&record))
                    .await;
                record
            }
        };

        if record.synopsis.is_none() {
            match self
                .pipeline
                .generate_pair_synopsis(a, b, &record, week)
                .await
            {
                Ok(synopsis) => {
                    record.synopsis = Some(synopsis);
                    generated = true;
                    self.persist("pair synopsis", self.store.save_compatibility(&record))
                        .await;
                }
                Err(e) => warn!(error = %e, "Pair synopsis generation failed, omitting"),
            }
        }

        let stored_weekly = match self
            .store_lookup(
                "weekly compatibility",
                self.store.fetch_weekly_compatibility(&a.id, &b.id, week),
            )
            .await
        {
            Lookup::Hit(weekly) => Some(weekly),
            Lookup::Miss | Lookup::Failed(_) => None,
        };

        let weekly = match stored_weekly {
            Some(weekly) => weekly,
            None => {
                from_store = false;
                match self
                    .pipeline
                    .generate_weekly_compatibility(a, b, &record, week)
                    .await
                {
                    Ok(weekly) => {
                        generated = true;
                        self.persist(
                            "weekly compatibility",
                            self.store.save_weekly_compatibility(&record.pair_key(), &weekly),
                        )
                        .await;
                        weekly
                    }
                    Err(e) if !e.triggers_fallback() => return Err(e),
                    Err(e) => {
                        warn!(error = %e, "Weekly compatibility generation failed, using static tier");
                        self.library
                            .weekly_compatibility(record.harmony, record.base_score, week)
                            .map_err(|e| {
                                error!(error = %e, "Static tier exhausted");
                                e
                            })?
                    }
                }
            }
        };

        let degraded = !weekly.is_generated;
        record.weekly = Some(weekly);

        let provenance = if degraded {
            Provenance::Static
        } else if generated || !from_store {
            Provenance::Generated
        } else {
            Provenance::Store
        };

        if !degraded {
            self.pairs
                .insert((record.pair_key(), week), record.clone(), week, self.clock.now())
                .await;
        }
        Ok(Resolved::new(record, provenance))
    }

    /// Regenerate a sign reading, bypassing cache and store
    ///
    /// The one path besides `Exhausted` that reports generation failures.
    pub async fn refresh_sign_reading(
        &self,
        sign: ZodiacSign,
    ) -> Result<Resolved<WeeklyReading>, ContentError> {
        let week = self.current_week();
        let reading = self
            .pipeline
            .generate_sign_reading(sign, week)
            .await
            .map_err(|e| {
                warn!(sign = %sign, error = %e, "Refresh failed");
                e
            })?;

        self.persist("sign reading", self.store.save_weekly_reading(&reading))
            .await;
        self.cache_reading(&reading).await;
        Ok(Resolved::new(reading, Provenance::Generated))
    }

    /// Regenerate a personal reading, bypassing cache and store
    pub async fn refresh_personal_reading(
        &self,
        person: &Person,
    ) -> Result<Resolved<WeeklyReading>, ContentError> {
        let missing = missing_for(Feature::PersonalReading, person);
        if !missing.is_empty() {
            return Err(ContentError::MissingInput(format!(
                "personal reading needs {:?}",
                missing
            )));
        }

        let week = self.current_week();
        let reading = self
            .pipeline
            .generate_personal_reading(person, week)
            .await
            .map_err(|e| {
                warn!(person = %person.id, error = %e, "Refresh failed");
                e
            })?;

        self.persist("personal reading", self.store.save_weekly_reading(&reading))
            .await;
        self.cache_reading(&reading).await;
        Ok(Resolved::new(reading, Provenance::Generated))
    }

    /// Drop expired cache entries and abandoned attempts, counting the former
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let purged = self.readings.purge_expired(now).await + self.pairs.purge_expired(now).await;
        let abandoned =
            self.reading_attempts.sweep_finished().await + self.pair_attempts.sweep_finished().await;
        if purged > 0 || abandoned > 0 {
            debug!(purged, abandoned, "Purged expired cache entries");
        }
        purged
    }
}
