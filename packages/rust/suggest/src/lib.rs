//! Suggestion generation for DocPilot.
//!
//! Turns a [`RepositoryAnalysis`] into rendered [`SuggestionSet`]s, one
//! per document kind. The external capability sits behind the
//! [`GenerationCapability`] trait; responses cross a strict schema
//! boundary, failures are retried with backoff, and a deterministic
//! template fallback guarantees output.
//!
//! [`RepositoryAnalysis`]: docpilot_shared::RepositoryAnalysis
//! [`SuggestionSet`]: docpilot_shared::SuggestionSet

mod capability;
mod engine;
mod fallback;
mod openrouter;
mod parse;
mod prompts;
mod render;

pub use capability::{GenerationCapability, GenerationRequest, GenerationResponse};
pub use engine::SuggestionEngine;
pub use openrouter::OpenRouterCapability;
