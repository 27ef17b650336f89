//! Generation pipeline: profile + sky -> prompt -> generation -> record

use super::normalize::{normalize_reading, normalize_synopsis, normalize_weekly_compatibility};
use super::profile::{approximate_profile, AstroProfile, ProfilePrecision};
use super::prompt::{ContentSchema, PairFacts, PromptContext, SubjectProfile};
use super::sky::SkyContextSource;
use super::with_timeout;
use crate::error::ContentError;
use crate::models::{
    CompatibilityRecord, DataCompletenessLevel, PairSynopsis, Person, SkyContext, SubjectKey,
    WeeklyCompatibility, WeeklyReading,
};
use crate::scoring::{full_score, ChartPoints};
use crate::services::chart_client::{ChartClient, ChartRequest, Geocoder};
use crate::services::ai_client::GenerationClient;
use crate::zodiac::ZodiacSign;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct GenerationPipeline {
    ai: Arc<dyn GenerationClient>,
    chart: Option<Arc<dyn ChartClient>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    sky: Arc<SkyContextSource>,
    remote_timeout: Duration,
}

impl GenerationPipeline {
    pub fn new(
        ai: Arc<dyn GenerationClient>,
        sky: Arc<SkyContextSource>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            ai,
            chart: None,
            geocoder: None,
            sky,
            remote_timeout,
        }
    }

    pub fn with_chart_service(
        mut self,
        chart: Arc<dyn ChartClient>,
        geocoder: Option<Arc<dyn Geocoder>>,
    ) -> Self {
        self.chart = Some(chart);
        self.geocoder = geocoder;
        self
    }

    pub async fn sky_context(&self, week_start: NaiveDate) -> SkyContext {
        self.sky.context_for(week_start).await
    }

    /// Sun/moon/rising for a person
    ///
    /// Full birth data goes to the chart service; a chart or geocoding
    /// failure degrades to the local approximation.
    pub async fn resolve_profile(&self, person: &Person) -> Result<AstroProfile, ContentError> {
        if let Some(ChartPoints {
            sun,
            moon: Some(moon),
            rising: Some(rising),
        }) = person.known_points()
        {
            return Ok(AstroProfile {
                sun,
                moon: Some(moon),
                rising: Some(rising),
                precision: ProfilePrecision::Computed,
            });
        }

        let approximate = approximate_profile(person)?;

        let Some(chart) = &self.chart else {
            return Ok(approximate);
        };
        if person.completeness() < DataCompletenessLevel::Full {
            return Ok(approximate);
        }

        match self.computed_profile(chart.as_ref(), person).await {
            Ok(profile) => Ok(profile),
            Err(e) => {
                warn!(error = %e, "Chart computation failed, using approximate profile");
                Ok(approximate)
            }
        }
    }

    async fn computed_profile(
        &self,
        chart: &dyn ChartClient,
        person: &Person,
    ) -> Result<AstroProfile, ContentError> {
        let (Some(date), Some(place)) = (person.birth_date, person.birth_place.as_ref()) else {
            return Err(ContentError::MissingInput("birth date and place required".to_string()));
        };

        let (latitude, longitude, timezone) = match place.coordinates() {
            Some((lat, lon)) => (lat, lon, place.timezone.clone()),
            None => {
                let geocoder = self.geocoder.as_ref().ok_or_else(|| {
                    ContentError::MissingInput("birth place has no coordinates".to_string())
                })?;
                let point =
                    with_timeout(self.remote_timeout, "geocoding", geocoder.geocode(&place.name))
                        .await?;
                (
                    point.latitude,
                    point.longitude,
                    place.timezone.clone().or(point.timezone),
                )
            }
        };

        let request = ChartRequest {
            date,
            time: person.birth_time,
            latitude,
            longitude,
            timezone,
        };
        let computed =
            with_timeout(self.remote_timeout, "chart computation", chart.compute_chart(&request))
                .await?;
        debug!(sun = %computed.sun_sign, "Chart computed");

        Ok(AstroProfile {
            sun: computed.sun_sign,
            moon: person.moon_sign.or(computed.moon_sign),
            rising: person.rising_sign.or(computed.rising_sign),
            precision: ProfilePrecision::Computed,
        })
    }

    async fn call_generation(&self, prompt: &PromptContext) -> Result<String, ContentError> {
        with_timeout(self.remote_timeout, "generation", self.ai.generate(prompt)).await
    }

    /// Shared-tier reading for a sign
    pub async fn generate_sign_reading(
        &self,
        sign: ZodiacSign,
        week_start: NaiveDate,
    ) -> Result<WeeklyReading, ContentError> {
        let sky = self.sky_context(week_start).await;
        let prompt =
            PromptContext::single(ContentSchema::WeeklySign, sky, SubjectProfile::for_sign(sign));

        let raw = self.call_generation(&prompt).await?;
        let reading = normalize_reading(&raw, SubjectKey::Sign(sign), week_start, sign)?;
        info!(sign = %sign, week = %week_start, "Generated sign reading");
        Ok(reading)
    }

    /// Personal-tier reading; needs at least a birth date
    pub async fn generate_personal_reading(
        &self,
        person: &Person,
        week_start: NaiveDate,
    ) -> Result<WeeklyReading, ContentError> {
        let profile = self.resolve_profile(person).await?;
        let sky = self.sky_context(week_start).await;
        let prompt = PromptContext::single(
            ContentSchema::PersonalReading,
            sky,
            SubjectProfile::new(&profile, person.completeness()),
        );

        let raw = self.call_generation(&prompt).await?;
        let reading = normalize_reading(
            &raw,
            SubjectKey::Person(person.id.clone()),
            week_start,
            profile.sun,
        )?;
        info!(person = %person.id, week = %week_start, "Generated personal reading");
        Ok(reading)
    }

    async fn pair_prompt(
        &self,
        schema: ContentSchema,
        a: &Person,
        b: &Person,
        base: &CompatibilityRecord,
        week_start: NaiveDate,
    ) -> Result<PromptContext, ContentError> {
        let profile_a = self.resolve_profile(a).await?;
        let profile_b = self.resolve_profile(b).await?;
        let sky = self.sky_context(week_start).await;

        Ok(PromptContext::pair(
            schema,
            sky,
            SubjectProfile::new(&profile_a, a.completeness()),
            SubjectProfile::new(&profile_b, b.completeness()),
            PairFacts {
                base_score: base.base_score,
                harmony: base.harmony,
                element_outcome: base.element_outcome,
            },
        ))
    }

    /// Long-lived narrative for a pair
    pub async fn generate_pair_synopsis(
        &self,
        a: &Person,
        b: &Person,
        base: &CompatibilityRecord,
        week_start: NaiveDate,
    ) -> Result<PairSynopsis, ContentError> {
        let prompt = self
            .pair_prompt(ContentSchema::PairCompatibility, a, b, base, week_start)
            .await?;
        let raw = self.call_generation(&prompt).await?;
        normalize_synopsis(&raw)
    }

    /// Deterministic base layer of a pair, scored from the same profiles
    /// the pair prompts describe
    pub async fn base_compatibility(
        &self,
        a: &Person,
        b: &Person,
    ) -> Result<CompatibilityRecord, ContentError> {
        let profile_a = self.resolve_profile(a).await?;
        let profile_b = self.resolve_profile(b).await?;
        Ok(score_profiles(a, &profile_a, b, &profile_b))
    }

    /// This week's layer for a pair
    pub async fn generate_weekly_compatibility(
        &self,
        a: &Person,
        b: &Person,
        base: &CompatibilityRecord,
        week_start: NaiveDate,
    ) -> Result<WeeklyCompatibility, ContentError> {
        let prompt = self
            .pair_prompt(ContentSchema::WeeklyCompatibility, a, b, base, week_start)
            .await?;
        let raw = self.call_generation(&prompt).await?;
        normalize_weekly_compatibility(&raw, week_start, base.base_score)
    }
}

/// Score two resolved profiles
///
/// Moon points count only when both people are at least Extended, rising
/// points only when both are Full.
pub fn score_profiles(
    a: &Person,
    profile_a: &AstroProfile,
    b: &Person,
    profile_b: &AstroProfile,
) -> CompatibilityRecord {
    let shared_level = a.completeness().min(b.completeness());

    let mut points_a = profile_a.chart_points();
    let mut points_b = profile_b.chart_points();
    if shared_level < DataCompletenessLevel::Extended {
        points_a.moon = None;
        points_b.moon = None;
    }
    if shared_level < DataCompletenessLevel::Full {
        points_a.rising = None;
        points_b.rising = None;
    }

    let result = full_score(&points_a, &points_b);
    CompatibilityRecord {
        person_a: a.id.clone(),
        person_b: b.id.clone(),
        base_score: result.score,
        harmony: result.harmony,
        element_outcome: result.element_outcome,
        description: result.description,
        advice: result.advice,
        synopsis: None,
        weekly: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BirthPlace;
    use crate::scoring::overall_score;
    use crate::services::chart_client::{ChartError, ComputedChart, GeoPoint};
    use crate::services::ai_client::GenerationError;
    use crate::services::{ContentStore, SqliteDocumentStore};
    use async_trait::async_trait;
    use chrono::NaiveTime;
    use std::sync::Mutex;

    struct CannedClient {
        reply: String,
        prompts: Mutex<Vec<PromptContext>>,
    }

    #[async_trait]
    impl GenerationClient for CannedClient {
        async fn generate(&self, prompt: &PromptContext) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            Ok(self.reply.clone())
        }
    }

    struct FailingChart;

    #[async_trait]
    impl ChartClient for FailingChart {
        async fn compute_chart(&self, _request: &ChartRequest) -> Result<ComputedChart, ChartError> {
            Err(ChartError::Network("refused".to_string()))
        }
    }

    struct FixedChart;

    #[async_trait]
    impl ChartClient for FixedChart {
        async fn compute_chart(&self, request: &ChartRequest) -> Result<ComputedChart, ChartError> {
            assert!((request.latitude - 1.5).abs() < 1e-9);
            Ok(ComputedChart {
                sun_sign: ZodiacSign::Leo,
                moon_sign: Some(ZodiacSign::Taurus),
                rising_sign: Some(ZodiacSign::Scorpio),
            })
        }
    }

    struct FixedGeocoder;

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, _place: &str) -> Result<GeoPoint, ChartError> {
            Ok(GeoPoint {
                latitude: 1.5,
                longitude: 2.5,
                timezone: None,
            })
        }
    }

    async fn pipeline(reply: &str) -> (GenerationPipeline, Arc<CannedClient>) {
        let store = ContentStore::new(Arc::new(SqliteDocumentStore::in_memory().await.unwrap()));
        let sky = Arc::new(SkyContextSource::new(store, Duration::from_secs(5)));
        let client = Arc::new(CannedClient {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        (
            GenerationPipeline::new(client.clone(), sky, Duration::from_secs(5)),
            client,
        )
    }

    fn week() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
    }

    fn full_person(id: &str) -> Person {
        Person::new(id)
            .with_birth_date(NaiveDate::from_ymd_opt(1990, 8, 1).unwrap())
            .with_birth_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap())
            .with_birth_place(BirthPlace {
                name: "Somewhere".to_string(),
                latitude: None,
                longitude: None,
                timezone: None,
            })
    }

    #[tokio::test]
    async fn test_personal_reading_without_birth_date_fails_fast() {
        let (pipeline, client) = pipeline(r#"{"reading": "x"}"#).await;
        let result = pipeline
            .generate_personal_reading(&Person::new("p"), week())
            .await;
        assert!(matches!(result, Err(ContentError::MissingInput(_))));
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_reading_is_normalized() {
        let (pipeline, client) =
            pipeline(r#"Here: {"Reading": "Bright week", "luckyColor": "Gold"}"#).await;
        let reading = pipeline
            .generate_sign_reading(ZodiacSign::Leo, week())
            .await
            .unwrap();
        assert_eq!(reading.reading, "Bright week");
        assert_eq!(reading.lucky_color, "Gold");
        assert_eq!(reading.subject, SubjectKey::Sign(ZodiacSign::Leo));

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts[0].schema, ContentSchema::WeeklySign);
        assert_eq!(prompts[0].sky.week_start, week());
    }

    #[tokio::test]
    async fn test_chart_failure_degrades_to_approximation() {
        let (pipeline, _) = pipeline("{}").await;
        let pipeline = pipeline.with_chart_service(
            Arc::new(FailingChart),
            Some(Arc::new(FixedGeocoder) as Arc<dyn Geocoder>),
        );

        let profile = pipeline.resolve_profile(&full_person("p")).await.unwrap();
        assert_eq!(profile.precision, ProfilePrecision::Approximate);
        assert_eq!(profile.sun, ZodiacSign::Leo);
    }

    #[tokio::test]
    async fn test_chart_service_used_for_full_data() {
        let (pipeline, _) = pipeline("{}").await;
        let pipeline = pipeline.with_chart_service(
            Arc::new(FixedChart),
            Some(Arc::new(FixedGeocoder) as Arc<dyn Geocoder>),
        );

        let profile = pipeline.resolve_profile(&full_person("p")).await.unwrap();
        assert_eq!(profile.precision, ProfilePrecision::Computed);
        assert_eq!(profile.moon, Some(ZodiacSign::Taurus));
        assert_eq!(profile.rising, Some(ZodiacSign::Scorpio));
    }

    #[tokio::test]
    async fn test_chart_service_skipped_for_partial_data() {
        let (pipeline, _) = pipeline("{}").await;
        let pipeline = pipeline.with_chart_service(Arc::new(FailingChart), None);
        let person = Person::new("p").with_birth_date(NaiveDate::from_ymd_opt(1990, 8, 1).unwrap());

        let profile = pipeline.resolve_profile(&person).await.unwrap();
        assert_eq!(profile.precision, ProfilePrecision::Approximate);
        assert_eq!(profile.moon, None);
    }

    #[tokio::test]
    async fn test_base_compatibility_sun_only_matches_overall_score() {
        let (pipeline, _) = pipeline("{}").await;
        let a = Person::new("a").with_birth_date(NaiveDate::from_ymd_opt(1990, 4, 1).unwrap());
        let b = full_person("b");
        let record = pipeline.base_compatibility(&a, &b).await.unwrap();
        assert_eq!(record.base_score, overall_score(ZodiacSign::Aries, ZodiacSign::Leo));
        assert!(record.synopsis.is_none());
    }

    #[tokio::test]
    async fn test_base_compatibility_requires_both_birthdays() {
        let (pipeline, _) = pipeline("{}").await;
        let a = Person::new("a");
        let b = full_person("b");
        assert!(matches!(
            pipeline.base_compatibility(&a, &b).await,
            Err(ContentError::MissingInput(_))
        ));
    }

    #[tokio::test]
    async fn test_base_compatibility_scores_chart_profiles() {
        let (pipeline, client) = pipeline("{}").await;
        let pipeline = pipeline.with_chart_service(
            Arc::new(FixedChart),
            Some(Arc::new(FixedGeocoder) as Arc<dyn Geocoder>),
        );
        let a = full_person("a");
        let b = full_person("b");

        let record = pipeline.base_compatibility(&a, &b).await.unwrap();
        let charted = ChartPoints {
            sun: ZodiacSign::Leo,
            moon: Some(ZodiacSign::Taurus),
            rising: Some(ZodiacSign::Scorpio),
        };
        assert_eq!(record.base_score, full_score(&charted, &charted).score);
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_base_compatibility_masks_points_below_shared_level() {
        let (pipeline, _) = pipeline("{}").await;
        let pipeline = pipeline.with_chart_service(
            Arc::new(FixedChart),
            Some(Arc::new(FixedGeocoder) as Arc<dyn Geocoder>),
        );
        let a = full_person("a");
        let b = Person::new("b").with_birth_date(NaiveDate::from_ymd_opt(1990, 8, 1).unwrap());

        let record = pipeline.base_compatibility(&a, &b).await.unwrap();
        assert_eq!(record.base_score, overall_score(ZodiacSign::Leo, ZodiacSign::Leo));
    }

    #[tokio::test]
    async fn test_known_moon_and_rising_skip_chart_service() {
        let (pipeline, _) = pipeline("{}").await;
        let pipeline = pipeline.with_chart_service(Arc::new(FailingChart), None);
        let mut person = full_person("p");
        person.moon_sign = Some(ZodiacSign::Pisces);
        person.rising_sign = Some(ZodiacSign::Gemini);

        let profile = pipeline.resolve_profile(&person).await.unwrap();
        assert_eq!(profile.precision, ProfilePrecision::Computed);
        assert_eq!(profile.sun, ZodiacSign::Leo);
        assert_eq!(profile.moon, Some(ZodiacSign::Pisces));
        assert_eq!(profile.rising, Some(ZodiacSign::Gemini));
    }
}
