//! The generation-capability boundary.
//!
//! The pipeline only ever talks to [`GenerationCapability`]; concrete
//! providers (OpenRouter, test doubles) are swappable without touching
//! pipeline logic.

use async_trait::async_trait;

use docpilot_shared::{DocumentKind, Result};

/// A request to the external generation capability.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Which artifact kind this prompt targets.
    pub kind: DocumentKind,
    /// System prompt establishing the generator's role.
    pub system_prompt: String,
    /// Main prompt with the analysis context.
    pub prompt: String,
}

/// A raw response from the capability, prior to schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub model: String,
}

/// An external text-generation capability.
///
/// Implementations own transport and timeout; retry and fallback policy
/// live in the suggestion engine, not here.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Generate text for the given request. Errors are
    /// [`DocPilotError::Generation`] and treated as retryable.
    ///
    /// [`DocPilotError::Generation`]: docpilot_shared::DocPilotError::Generation
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse>;
}
