//! Prompt builders for each document kind.
//!
//! Context is capped (top 10 concepts, top 5 setup steps) to stay inside
//! the capability's context window; feature-delta runs get an extra
//! section describing just the new feature.

use std::fmt::Write as _;

use docpilot_shared::{DocumentKind, RepositoryAnalysis, Scope};

use crate::capability::GenerationRequest;

/// Maximum concepts included in a prompt.
const MAX_CONCEPTS: usize = 10;

/// Maximum setup steps included in a prompt.
const MAX_SETUP_STEPS: usize = 5;

/// Build the full request for one kind + scope.
pub(crate) fn build_request(
    kind: DocumentKind,
    analysis: &RepositoryAnalysis,
    scope: &Scope,
) -> GenerationRequest {
    GenerationRequest {
        kind,
        system_prompt: system_prompt(kind),
        prompt: user_prompt(kind, analysis, scope),
    }
}

fn system_prompt(kind: DocumentKind) -> String {
    let role = match kind {
        DocumentKind::Tasks => {
            "You are an expert at creating onboarding tasks for software projects. \
             Generate structured learning tasks that help new developers understand \
             and contribute to the project. Focus on progressive difficulty, hands-on \
             exercises, clear acceptance criteria, and realistic time estimates."
        }
        DocumentKind::Faq => {
            "You are an expert at anticipating the questions new developers ask about \
             a software project. Generate clear, accurate question-answer pairs \
             grounded in the provided repository analysis."
        }
        DocumentKind::QuickStart => {
            "You are an expert at writing quick-start guides. Distill the provided \
             repository analysis into the minimal sequence a developer needs to get \
             the project running."
        }
    };
    format!("{role}\n\nRespond with a JSON value only, no surrounding prose.")
}

fn user_prompt(kind: DocumentKind, analysis: &RepositoryAnalysis, scope: &Scope) -> String {
    let mut prompt = String::new();

    writeln!(prompt, "Repository analysis:").ok();
    writeln!(prompt, "\nKey concepts:").ok();
    for concept in analysis.concepts.iter().take(MAX_CONCEPTS) {
        writeln!(
            prompt,
            "- {}: {} (importance: {})",
            concept.name, concept.description, concept.importance
        )
        .ok();
    }

    writeln!(prompt, "\nSetup steps:").ok();
    for step in analysis.setup_steps.iter().take(MAX_SETUP_STEPS) {
        writeln!(prompt, "- {}: {}", step.title, step.description).ok();
    }

    writeln!(
        prompt,
        "\nCode examples: {} found. Dependencies: {} found.",
        analysis.code_examples.len(),
        analysis.dependencies.len()
    )
    .ok();

    if let Scope::FeatureDelta(feature) = scope {
        writeln!(prompt, "\nScope: only the newly added feature below.").ok();
        writeln!(prompt, "Feature file: {}", feature.feature_path).ok();
        writeln!(prompt, "Functions: {}", feature.functions.join(", ")).ok();
        writeln!(prompt, "Types: {}", feature.types.join(", ")).ok();
        writeln!(prompt, "Tests: {}", feature.tests.join(", ")).ok();
        if !feature.documentation.is_empty() {
            writeln!(prompt, "Documentation: {}", feature.documentation).ok();
        }
    }

    prompt.push('\n');
    prompt.push_str(schema_instructions(kind));
    prompt
}

fn schema_instructions(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Tasks => {
            "Generate 5-8 onboarding task suggestions as a JSON array of objects with \
             fields: title, description, acceptance_criteria (array of strings), \
             prerequisites (array of task titles), estimated_minutes (integer), \
             difficulty (easy|medium|hard|expert), confidence (0.0-1.0), \
             source_files (array of paths)."
        }
        DocumentKind::Faq => {
            "Generate 5-10 FAQ pairs as a JSON array of objects with fields: \
             question, answer, category, confidence (0.0-1.0), \
             source_files (array of paths)."
        }
        DocumentKind::QuickStart => {
            "Generate a quick-start guide as a single JSON object with fields: \
             prerequisites, setup_steps, basic_usage, next_steps \
             (each an array of strings)."
        }
    }
}
