//! Shared fixtures for skyweek-content integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use skyweek_common::time::ManualClock;
use skyweek_content::generation::{GenerationPipeline, PromptContext, SkyContextSource};
use skyweek_content::resolver::{ResolverConfig, StaticLibrary};
use skyweek_content::services::{
    Collection, ContentStore, Document, DocumentStore, Filter, GenerationClient, GenerationError,
    SqliteDocumentStore, StoreError,
};
use skyweek_content::ContentResolver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One reply that satisfies every content schema
pub const GENERATED_REPLY: &str = r#"```json
{
  "reading": "A generated week of momentum.",
  "mood": "Bold",
  "luckyNumber": 9,
  "luckyColor": "Gold",
  "keyThemes": ["focus", "courage"],
  "summary": "A lively pairing.",
  "strengths": ["humor"],
  "challenges": ["pace"],
  "thisWeekScore": 81,
  "moodDescriptors": ["playful"],
  "narrative": "Plans come together this week."
}
```"#;

/// Generation client that counts calls and can be slowed or broken
pub struct SpyClient {
    calls: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl SpyClient {
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: false,
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for SpyClient {
    async fn generate(&self, _prompt: &PromptContext) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(GenerationError::Network("connection refused".to_string()));
        }
        Ok(GENERATED_REPLY.to_string())
    }
}

/// Document store that is always down
pub struct UnreachableStore;

#[async_trait]
impl DocumentStore for UnreachableStore {
    async fn get(&self, _collection: Collection, _filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Network("store offline".to_string()))
    }

    async fn upsert(
        &self,
        _collection: Collection,
        _record: Document,
        _conflict_key: &[&str],
    ) -> Result<Document, StoreError> {
        Err(StoreError::Network("store offline".to_string()))
    }
}

/// Document store that answers only after `delay`, always with nothing stored
pub struct SlowStore {
    pub delay: Duration,
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn get(&self, _collection: Collection, _filter: &Filter) -> Result<Vec<Document>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn upsert(
        &self,
        _collection: Collection,
        record: Document,
        _conflict_key: &[&str],
    ) -> Result<Document, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(record)
    }
}

/// Wednesday of the week starting 2026-10-12
pub fn wednesday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
}

pub fn this_week() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
}

pub async fn memory_store() -> ContentStore {
    ContentStore::new(Arc::new(SqliteDocumentStore::in_memory().await.unwrap()))
}

pub fn build_resolver(
    store: ContentStore,
    client: Arc<dyn GenerationClient>,
    library: StaticLibrary,
    clock: Arc<ManualClock>,
) -> ContentResolver {
    build_resolver_with(store, client, library, clock, ResolverConfig::default())
}

pub fn build_resolver_with(
    store: ContentStore,
    client: Arc<dyn GenerationClient>,
    library: StaticLibrary,
    clock: Arc<ManualClock>,
    config: ResolverConfig,
) -> ContentResolver {
    let sky = Arc::new(SkyContextSource::new(store.clone(), config.remote_timeout));
    let pipeline = GenerationPipeline::new(client, sky, config.remote_timeout);
    ContentResolver::new(store, Arc::new(pipeline), Arc::new(library), clock, config)
}

/// Resolver over an in-memory store and the builtin library
pub async fn test_resolver(client: Arc<dyn GenerationClient>) -> (ContentResolver, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(wednesday()));
    let resolver = build_resolver(
        memory_store().await,
        client,
        StaticLibrary::builtin(),
        clock.clone(),
    );
    (resolver, clock)
}
