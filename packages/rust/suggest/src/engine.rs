//! Suggestion engine: retry policy, schema boundary, template fallback.

use std::time::Duration;

use tracing::{info, instrument, warn};

use docpilot_shared::{
    DocumentKind, GenerationConfig, RepositoryAnalysis, Result, Scope, Suggestion, SuggestionSet,
};

use crate::capability::GenerationCapability;
use crate::{fallback, parse, prompts, render};

/// Drives generation for one document kind at a time.
///
/// Capability failures are retried with exponential backoff; once the
/// budget is exhausted the engine falls back to deterministic templates,
/// so [`SuggestionEngine::suggest`] always returns a non-empty set.
pub struct SuggestionEngine {
    capability: Box<dyn GenerationCapability>,
    max_retries: u32,
    retry_delay: Duration,
}

impl SuggestionEngine {
    pub fn new(capability: Box<dyn GenerationCapability>, generation: &GenerationConfig) -> Self {
        Self {
            capability,
            max_retries: generation.max_retries,
            retry_delay: Duration::from_millis(generation.retry_delay_ms),
        }
    }

    /// Produce rendered suggestions for `kind`.
    ///
    /// A `Scope::Full` run is authoritative for its kind; a feature-delta
    /// run only adds to what exists.
    #[instrument(skip_all, fields(kind = %kind, capability = self.capability.name()))]
    pub async fn suggest(
        &self,
        kind: DocumentKind,
        analysis: &RepositoryAnalysis,
        scope: &Scope,
    ) -> SuggestionSet {
        let items = match self.generate_with_retry(kind, analysis, scope).await {
            Ok(items) => items,
            Err(err) => {
                warn!(error = %err, "generation exhausted retries, using template fallback");
                self.fallback_items(kind, analysis, scope)
            }
        };

        SuggestionSet {
            kind,
            authoritative: matches!(scope, Scope::Full),
            items,
        }
    }

    async fn generate_with_retry(
        &self,
        kind: DocumentKind,
        analysis: &RepositoryAnalysis,
        scope: &Scope,
    ) -> Result<Vec<Suggestion>> {
        let request = prompts::build_request(kind, analysis, scope);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }

            match self.try_once(kind, &request).await {
                Ok(items) => {
                    info!(attempt, count = items.len(), "suggestions generated");
                    return Ok(items);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "generation attempt failed");
                    last_err = Some(err);
                }
            }
        }

        // max_retries + 1 attempts always run, so last_err is set here.
        Err(last_err.unwrap_or_else(|| {
            docpilot_shared::DocPilotError::Generation("no generation attempts ran".into())
        }))
    }

    /// One call through the capability plus the schema boundary. A response
    /// that fails validation counts as a failed attempt, same as a
    /// transport error.
    async fn try_once(
        &self,
        kind: DocumentKind,
        request: &crate::capability::GenerationRequest,
    ) -> Result<Vec<Suggestion>> {
        let response = self.capability.generate(request).await?;
        match kind {
            DocumentKind::Tasks => Ok(render::render_tasks(&parse::parse_tasks(&response.text)?)),
            DocumentKind::Faq => Ok(render::render_faqs(&parse::parse_faqs(&response.text)?)),
            DocumentKind::QuickStart => Ok(render::render_quick_start(&parse::parse_quick_start(
                &response.text,
            )?)),
        }
    }

    fn fallback_items(
        &self,
        kind: DocumentKind,
        analysis: &RepositoryAnalysis,
        scope: &Scope,
    ) -> Vec<Suggestion> {
        match kind {
            DocumentKind::Tasks => render::render_tasks(&fallback::tasks(analysis, scope)),
            DocumentKind::Faq => render::render_faqs(&fallback::faqs(analysis)),
            DocumentKind::QuickStart => render::render_quick_start(&fallback::quick_start(analysis)),
        }
    }
}
