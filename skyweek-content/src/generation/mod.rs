//! Generation pipeline
//!
//! Profile resolution, sky context, prompt building, the generation call
//! and normalization. Failures propagate to the resolver, which owns every
//! fallback decision.

pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod prompt;
pub mod sky;

pub use pipeline::GenerationPipeline;
pub use profile::{approximate_profile, AstroProfile, ProfilePrecision};
pub use prompt::{ContentSchema, PairFacts, PromptContext, SubjectProfile};
pub use sky::{compute_sky_context, SkyContextSource};

use crate::error::ContentError;
use std::future::Future;
use std::time::Duration;

/// Bound a remote call; expiry is an ordinary `RemoteUnavailable`
pub async fn with_timeout<T, E, F>(limit: Duration, what: &str, call: F) -> Result<T, ContentError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ContentError>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(ContentError::RemoteUnavailable(format!(
            "{} timed out after {}s",
            what,
            limit.as_secs_f32()
        ))),
    }
}
