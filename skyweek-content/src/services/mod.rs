//! Remote collaborators: document store, generation service, chart service

pub mod ai_client;
pub mod chart_client;
pub mod content_store;
pub mod http_store;
pub mod sqlite_store;
pub mod store_client;

pub use ai_client::{DisabledGenerationClient, GenerationClient, GenerationError, HttpGenerationClient};
pub use chart_client::{ChartClient, ChartError, Geocoder, HttpChartClient, OpenMeteoGeocoder};
pub use content_store::ContentStore;
pub use http_store::HttpDocumentStore;
pub use sqlite_store::SqliteDocumentStore;
pub use store_client::{Collection, Document, DocumentStore, Filter, StoreError};
