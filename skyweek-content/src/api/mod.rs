//! HTTP API handlers for skyweek-content

pub mod compatibility;
pub mod features;
pub mod health;
pub mod readings;
pub mod signs;

pub use compatibility::compatibility_routes;
pub use features::feature_routes;
pub use health::health_routes;
pub use readings::reading_routes;
pub use signs::sign_routes;
