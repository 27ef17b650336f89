//! Component wiring for skyweek-content
//!
//! Turns the bootstrap TOML (plus environment overrides for API keys) into
//! one resolver with its store, generation, chart and static tiers.

use crate::generation::{GenerationPipeline, SkyContextSource};
use crate::resolver::{ContentResolver, ResolverConfig, StaticLibrary};
use crate::services::{
    ChartClient, ContentStore, DisabledGenerationClient, DocumentStore, GenerationClient,
    Geocoder, HttpChartClient, HttpDocumentStore, HttpGenerationClient, OpenMeteoGeocoder,
    SqliteDocumentStore,
};
use skyweek_common::config::{resolve_api_key, ContentConfig, StoreBackend, TomlConfig};
use skyweek_common::time::Clock;
use skyweek_common::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const ROOT_FOLDER_ENV: &str = "SKYWEEK_ROOT_FOLDER";
pub const STORE_API_KEY_ENV: &str = "SKYWEEK_STORE_API_KEY";
pub const AI_API_KEY_ENV: &str = "SKYWEEK_AI_API_KEY";

/// SQLite store file inside the root folder
pub const STORE_FILE_NAME: &str = "skyweek.db";

pub fn resolver_config(content: &ContentConfig) -> ResolverConfig {
    ResolverConfig {
        week_start: content.week_starts_on,
        cache_ttl: chrono::Duration::days(i64::from(content.cache_ttl_days.max(1))),
        remote_timeout: remote_timeout(content),
    }
}

fn remote_timeout(content: &ContentConfig) -> Duration {
    Duration::from_secs(content.remote_timeout_secs.max(1))
}

/// Document store backend selected by `[store] backend`
pub async fn build_document_store(
    config: &TomlConfig,
    root_folder: &Path,
) -> Result<Arc<dyn DocumentStore>> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let db_path = root_folder.join(STORE_FILE_NAME);
            info!("Document store: SQLite at {}", db_path.display());
            let store = SqliteDocumentStore::connect(&db_path)
                .await
                .map_err(|e| Error::Config(format!("Cannot open document store: {}", e)))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Http => {
            let base_url = config.store.base_url.as_deref().ok_or_else(|| {
                Error::Config("store.base_url is required for the http backend".to_string())
            })?;
            let api_key =
                resolve_api_key("Store", STORE_API_KEY_ENV, config.store.api_key.as_deref())?;
            info!("Document store: REST at {}", base_url);
            let store = HttpDocumentStore::new(base_url, &api_key, remote_timeout(&config.content))
                .map_err(|e| Error::Config(format!("Cannot build store client: {}", e)))?;
            Ok(Arc::new(store))
        }
    }
}

/// Generation client; disabled (always failing over to static) without a base URL
pub fn build_generation_client(config: &TomlConfig) -> Result<Arc<dyn GenerationClient>> {
    let Some(base_url) = config.generation.base_url.as_deref() else {
        warn!("generation.base_url not set; readings will come from the static library");
        return Ok(Arc::new(DisabledGenerationClient));
    };

    let api_key = resolve_api_key(
        "Generation",
        AI_API_KEY_ENV,
        config.generation.api_key.as_deref(),
    )?;
    info!(
        "Generation service: {} (model {}, {} req/min)",
        base_url, config.generation.model, config.generation.requests_per_minute
    );
    let client = HttpGenerationClient::new(
        base_url,
        &api_key,
        &config.generation.model,
        config.generation.requests_per_minute,
        remote_timeout(&config.content),
    )
    .map_err(|e| Error::Config(format!("Cannot build generation client: {}", e)))?;
    Ok(Arc::new(client))
}

/// Chart client and geocoder, when a chart service is configured
pub fn build_chart_clients(
    config: &TomlConfig,
) -> Result<Option<(Arc<dyn ChartClient>, Arc<dyn Geocoder>)>> {
    let Some(chart_url) = config.chart.base_url.as_deref() else {
        return Ok(None);
    };
    let timeout = remote_timeout(&config.content);
    let geocoding_url = config
        .geocoding
        .base_url
        .as_deref()
        .unwrap_or(OpenMeteoGeocoder::DEFAULT_BASE_URL);

    info!("Chart service: {} (geocoding via {})", chart_url, geocoding_url);
    let chart = HttpChartClient::new(chart_url, timeout)
        .map_err(|e| Error::Config(format!("Cannot build chart client: {}", e)))?;
    let geocoder = OpenMeteoGeocoder::new(geocoding_url, timeout)
        .map_err(|e| Error::Config(format!("Cannot build geocoding client: {}", e)))?;
    let chart: Arc<dyn ChartClient> = Arc::new(chart);
    let geocoder: Arc<dyn Geocoder> = Arc::new(geocoder);
    Ok(Some((chart, geocoder)))
}

/// Built-in static library, or the configured replacement
pub fn load_static_library(content: &ContentConfig) -> Result<StaticLibrary> {
    match &content.static_library {
        Some(path) => {
            StaticLibrary::from_toml_file(path).map_err(|e| Error::Config(e.to_string()))
        }
        None => Ok(StaticLibrary::builtin()),
    }
}

/// Wire every tier into one resolver
pub async fn build_resolver(
    config: &TomlConfig,
    root_folder: &Path,
    clock: Arc<dyn Clock>,
) -> Result<ContentResolver> {
    let resolver_config = resolver_config(&config.content);

    let store = ContentStore::new(build_document_store(config, root_folder).await?);
    let sky = Arc::new(SkyContextSource::new(store.clone(), resolver_config.remote_timeout));

    let mut pipeline = GenerationPipeline::new(
        build_generation_client(config)?,
        sky,
        resolver_config.remote_timeout,
    );
    if let Some((chart, geocoder)) = build_chart_clients(config)? {
        pipeline = pipeline.with_chart_service(chart, Some(geocoder));
    }

    let library = load_static_library(&config.content)?;

    Ok(ContentResolver::new(
        store,
        Arc::new(pipeline),
        Arc::new(library),
        clock,
        resolver_config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_config_from_content_section() {
        let mut content = ContentConfig::default();
        content.cache_ttl_days = 3;
        content.remote_timeout_secs = 0;

        let config = resolver_config(&content);
        assert_eq!(config.cache_ttl, chrono::Duration::days(3));
        assert_eq!(config.remote_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_http_store_requires_base_url() {
        let mut config = TomlConfig::default();
        config.store.backend = StoreBackend::Http;
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(build_document_store(&config, Path::new("/tmp")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_generation_disabled_without_base_url() {
        assert!(build_generation_client(&TomlConfig::default()).is_ok());
        assert!(build_chart_clients(&TomlConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_missing_static_library_file_is_config_error() {
        let mut content = ContentConfig::default();
        content.static_library = Some("/nonexistent/library.toml".into());
        assert!(matches!(load_static_library(&content), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_sqlite_backend_creates_store_in_root_folder() {
        let dir = tempfile::tempdir().unwrap();
        let config = TomlConfig::default();
        build_document_store(&config, dir.path()).await.unwrap();
        assert!(dir.path().join(STORE_FILE_NAME).exists());
    }
}
