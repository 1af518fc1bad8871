//! Inference clients.
//!
//! `InferenceClient` is the seam between the annotation pipeline and the
//! remote detector. `HttpInferenceClient` is the production transport; tests
//! and embedders can substitute their own implementation.

mod http;

pub(crate) use http::DEFAULT_USER_AGENT;
pub use http::{HttpClientOptions, HttpInferenceClient};

use crate::detect::InferenceResult;
use crate::error::AnnotateResult;

/// Submits images to an object-detection service.
///
/// `predict` performs exactly one blocking round trip and never retries.
/// Implementations must be shareable across threads, but callers should
/// still serialise `predict` when the transport makes no ordering promise.
pub trait InferenceClient: Send + Sync {
    /// Replace the configured endpoint. `None` clears it. Reachability is
    /// not checked.
    fn set_endpoint(&mut self, url: Option<&str>);

    /// Currently configured endpoint, if any.
    fn endpoint(&self) -> Option<&str>;

    /// Submit raw image bytes and decode the detections in the reply.
    fn predict(&self, image: &[u8]) -> AnnotateResult<InferenceResult>;
}
