//! Tier chain behaviour of the content resolver

mod helpers;

use chrono::{Duration as ChronoDuration, NaiveDate};
use helpers::*;
use skyweek_common::time::ManualClock;
use skyweek_content::models::{Person, SubjectKey, WeeklyReading};
use skyweek_content::resolver::{Provenance, ResolverConfig, StaticLibrary};
use skyweek_content::services::ContentStore;
use skyweek_content::zodiac::ZodiacSign;
use skyweek_content::ContentError;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn leo_birthday() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 8, 1).unwrap()
}

fn aries_birthday() -> NaiveDate {
    NaiveDate::from_ymd_opt(1992, 4, 10).unwrap()
}

#[tokio::test]
async fn test_stored_reading_skips_generation() {
    let store = memory_store().await;
    store
        .save_weekly_reading(&WeeklyReading {
            subject: SubjectKey::Sign(ZodiacSign::Leo),
            week_start: this_week(),
            reading: "Stored ahead of time.".to_string(),
            mood: "Calm".to_string(),
            lucky_number: 5,
            lucky_color: "Red".to_string(),
            highlights: Vec::new(),
            advice: None,
            is_generated: true,
        })
        .await
        .unwrap();

    let spy = SpyClient::working();
    let clock = Arc::new(ManualClock::new(wednesday()));
    let resolver = build_resolver(store, spy.clone(), StaticLibrary::builtin(), clock);

    let first = resolver.weekly_sign_reading(ZodiacSign::Leo).await.unwrap();
    assert_eq!(first.provenance, Provenance::Store);
    assert_eq!(first.value.reading, "Stored ahead of time.");

    let second = resolver.weekly_sign_reading(ZodiacSign::Leo).await.unwrap();
    assert_eq!(second.provenance, Provenance::Cache);
    assert_eq!(spy.calls(), 0);
}

#[tokio::test]
async fn test_generated_reading_is_persisted() {
    let store = memory_store().await;
    let spy = SpyClient::working();
    let clock = Arc::new(ManualClock::new(wednesday()));
    let resolver = build_resolver(store.clone(), spy.clone(), StaticLibrary::builtin(), clock);

    let reading = resolver.weekly_sign_reading(ZodiacSign::Virgo).await.unwrap();
    assert_eq!(reading.provenance, Provenance::Generated);
    assert!(reading.value.is_generated);
    assert_eq!(reading.value.lucky_number, 9);
    assert_eq!(reading.value.highlights, vec!["focus", "courage"]);

    let stored = store
        .fetch_weekly_reading(&SubjectKey::Sign(ZodiacSign::Virgo), this_week())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, reading.value);
}

#[tokio::test]
async fn test_all_tiers_down_serves_static() {
    let store = ContentStore::new(Arc::new(UnreachableStore));
    let spy = SpyClient::failing();
    let clock = Arc::new(ManualClock::new(wednesday()));
    let resolver = build_resolver(store, spy.clone(), StaticLibrary::builtin(), clock);

    let reading = resolver.weekly_sign_reading(ZodiacSign::Pisces).await.unwrap();
    assert_eq!(reading.provenance, Provenance::Static);
    assert!(!reading.value.is_generated);
    assert_eq!(reading.value.week_start, this_week());
    assert!(!reading.value.reading.is_empty());

    // Degraded content is not cached; the next request tries generation again
    resolver.weekly_sign_reading(ZodiacSign::Pisces).await.unwrap();
    assert_eq!(spy.calls(), 2);
}

#[tokio::test]
async fn test_library_gap_is_exhausted() {
    let library = StaticLibrary::from_toml_str(
        r#"
        [signs.aries]
        reading = "Only Aries has a fallback."
        mood = "Eager"
        "#,
    )
    .unwrap();
    let clock = Arc::new(ManualClock::new(wednesday()));
    let resolver = build_resolver(
        ContentStore::new(Arc::new(UnreachableStore)),
        SpyClient::failing(),
        library,
        clock,
    );

    let aries = resolver.weekly_sign_reading(ZodiacSign::Aries).await.unwrap();
    assert_eq!(aries.provenance, Provenance::Static);

    let taurus = resolver.weekly_sign_reading(ZodiacSign::Taurus).await;
    assert!(matches!(taurus, Err(ContentError::Exhausted(_))));
}

#[tokio::test]
async fn test_library_gap_fails_only_that_sign() {
    let covered = [
        "aries",
        "gemini",
        "cancer",
        "leo",
        "virgo",
        "libra",
        "scorpio",
        "sagittarius",
        "capricorn",
        "aquarius",
        "pisces",
    ];
    let toml: String = covered
        .iter()
        .map(|name| format!("[signs.{}]\nreading = \"A steady week.\"\nmood = \"Even\"\n\n", name))
        .collect();
    let library = StaticLibrary::from_toml_str(&toml).unwrap();
    let clock = Arc::new(ManualClock::new(wednesday()));
    let resolver = build_resolver(
        ContentStore::new(Arc::new(UnreachableStore)),
        SpyClient::failing(),
        library,
        clock,
    );

    let results = resolver.all_sign_readings().await;
    assert_eq!(results.len(), 12);

    let mut exhausted = Vec::new();
    for (sign, result) in &results {
        match result {
            Ok(resolved) => {
                assert_eq!(resolved.provenance, Provenance::Static);
                assert_eq!(resolved.value.subject, SubjectKey::Sign(*sign));
            }
            Err(ContentError::Exhausted(_)) => exhausted.push(*sign),
            Err(other) => panic!("{} failed with {:?}", sign, other),
        }
    }
    assert_eq!(exhausted, vec![ZodiacSign::Taurus]);
}

fn tight_timeout() -> ResolverConfig {
    ResolverConfig {
        remote_timeout: Duration::from_millis(100),
        ..ResolverConfig::default()
    }
}

#[tokio::test]
async fn test_timed_out_remotes_fall_back_to_static() {
    let spy = SpyClient::slow(Duration::from_secs(10));
    let clock = Arc::new(ManualClock::new(wednesday()));
    let resolver = build_resolver_with(
        ContentStore::new(Arc::new(SlowStore {
            delay: Duration::from_secs(10),
        })),
        spy.clone(),
        StaticLibrary::builtin(),
        clock,
        tight_timeout(),
    );

    let started = Instant::now();
    let reading = resolver.weekly_sign_reading(ZodiacSign::Gemini).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
    assert_eq!(reading.provenance, Provenance::Static);
    assert_eq!(spy.calls(), 1);
}

#[tokio::test]
async fn test_timed_out_store_still_generates() {
    let spy = SpyClient::working();
    let clock = Arc::new(ManualClock::new(wednesday()));
    let resolver = build_resolver_with(
        ContentStore::new(Arc::new(SlowStore {
            delay: Duration::from_secs(10),
        })),
        spy.clone(),
        StaticLibrary::builtin(),
        clock,
        tight_timeout(),
    );

    let started = Instant::now();
    let reading = resolver.weekly_sign_reading(ZodiacSign::Cancer).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
    assert_eq!(reading.provenance, Provenance::Generated);
    assert_eq!(spy.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_misses_share_one_generation() {
    let spy = SpyClient::slow(Duration::from_millis(100));
    let (resolver, _clock) = test_resolver(spy.clone()).await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let resolver = resolver.clone();
        tasks.spawn(async move { resolver.weekly_sign_reading(ZodiacSign::Gemini).await });
    }

    let mut readings = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        readings.push(joined.unwrap().unwrap().value);
    }

    assert_eq!(readings.len(), 8);
    assert!(readings.iter().all(|r| r == &readings[0]));
    assert_eq!(spy.calls(), 1);
}

#[tokio::test]
async fn test_week_rollover_generates_fresh_content() {
    let spy = SpyClient::working();
    let (resolver, clock) = test_resolver(spy.clone()).await;

    let first = resolver.weekly_sign_reading(ZodiacSign::Leo).await.unwrap();
    assert_eq!(first.value.week_start, this_week());
    let cached = resolver.weekly_sign_reading(ZodiacSign::Leo).await.unwrap();
    assert_eq!(cached.provenance, Provenance::Cache);
    assert_eq!(spy.calls(), 1);

    // Wednesday -> following Monday
    clock.advance(ChronoDuration::days(5));
    assert_eq!(resolver.purge_expired().await, 1);

    let next = resolver.weekly_sign_reading(ZodiacSign::Leo).await.unwrap();
    assert_eq!(next.provenance, Provenance::Generated);
    assert_eq!(next.value.week_start, this_week() + ChronoDuration::days(7));
    assert_eq!(spy.calls(), 2);
}

#[tokio::test]
async fn test_personal_reading_respects_unlock_level() {
    let spy = SpyClient::working();
    let (resolver, _clock) = test_resolver(spy.clone()).await;

    let basic = Person::new("basic").with_birth_date(leo_birthday());
    let reading = resolver.personal_reading(&basic).await.unwrap();
    assert_eq!(reading.value.subject, SubjectKey::Sign(ZodiacSign::Leo));

    let extended = Person::new("extended")
        .with_birth_date(leo_birthday())
        .with_birth_time(chrono::NaiveTime::from_hms_opt(7, 30, 0).unwrap());
    let reading = resolver.personal_reading(&extended).await.unwrap();
    assert_eq!(reading.provenance, Provenance::Generated);
    assert_eq!(reading.value.subject, SubjectKey::Person("extended".to_string()));

    let anonymous = resolver.personal_reading(&Person::new("anon")).await.unwrap();
    assert_eq!(anonymous.provenance, Provenance::Static);
    assert_eq!(anonymous.value.subject, SubjectKey::Person("anon".to_string()));
}

#[tokio::test]
async fn test_refresh_requires_personal_data() {
    let (resolver, _clock) = test_resolver(SpyClient::working()).await;
    let basic = Person::new("basic").with_birth_date(leo_birthday());

    let result = resolver.refresh_personal_reading(&basic).await;
    assert!(matches!(result, Err(ContentError::MissingInput(_))));
}

#[tokio::test]
async fn test_refresh_surfaces_generation_failure() {
    let (resolver, _clock) = test_resolver(SpyClient::failing()).await;

    let result = resolver.refresh_sign_reading(ZodiacSign::Libra).await;
    assert!(matches!(result, Err(ContentError::RemoteUnavailable(_))));
}

#[tokio::test]
async fn test_compatibility_is_order_independent() {
    let spy = SpyClient::working();
    let (resolver, _clock) = test_resolver(spy.clone()).await;
    let a = Person::new("alice").with_birth_date(leo_birthday());
    let b = Person::new("bruno").with_birth_date(aries_birthday());

    let forward = resolver.compatibility(&a, &b).await.unwrap();
    let backward = resolver.compatibility(&b, &a).await.unwrap();

    assert_eq!(forward.provenance, Provenance::Generated);
    assert_eq!(backward.provenance, Provenance::Cache);
    assert_eq!(forward.value, backward.value);
    assert_eq!(forward.value.person_a, "alice");
    assert_eq!(forward.value.person_b, "bruno");

    let weekly = forward.value.weekly.as_ref().unwrap();
    assert_eq!(weekly.week_start, this_week());
    assert_eq!(weekly.this_week_score, 81);
    assert_eq!(forward.value.synopsis.as_ref().unwrap().summary, "A lively pairing.");
}

#[tokio::test]
async fn test_compatibility_requires_birth_dates() {
    let (resolver, _clock) = test_resolver(SpyClient::working()).await;
    let a = Person::new("alice").with_birth_date(leo_birthday());

    let result = resolver.compatibility(&a, &Person::new("ghost")).await;
    assert!(matches!(result, Err(ContentError::MissingInput(_))));
}

#[tokio::test]
async fn test_compatibility_degrades_to_static_weekly_layer() {
    let clock = Arc::new(ManualClock::new(wednesday()));
    let resolver = build_resolver(
        ContentStore::new(Arc::new(UnreachableStore)),
        SpyClient::failing(),
        StaticLibrary::builtin(),
        clock,
    );
    let a = Person::new("alice").with_birth_date(leo_birthday());
    let b = Person::new("bruno").with_birth_date(aries_birthday());

    let record = resolver.compatibility(&a, &b).await.unwrap();
    assert_eq!(record.provenance, Provenance::Static);
    assert!(record.value.synopsis.is_none());

    let weekly = record.value.weekly.unwrap();
    assert!(!weekly.is_generated);
    assert_eq!(weekly.this_week_score, record.value.base_score);
}
