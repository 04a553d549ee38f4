//! Deterministic template fallback.
//!
//! Engaged when the generation capability stays unavailable past the
//! retry budget. Derived purely from the analysis, so the pipeline
//! always terminates with *some* output. Every function here returns a
//! non-empty set even for an empty analysis.

use docpilot_shared::{
    Difficulty, FAQPair, FeatureAnalysis, QuickStartGuide, RepositoryAnalysis, Scope,
    TaskSuggestion,
};

/// Confidence assigned to template output: deliberately below anything a
/// live generation would normally report.
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Template onboarding tasks from the analysis.
pub(crate) fn tasks(analysis: &RepositoryAnalysis, scope: &Scope) -> Vec<TaskSuggestion> {
    if let Scope::FeatureDelta(feature) = scope {
        return feature_tasks(feature);
    }

    let mut out = Vec::new();

    if !analysis.setup_steps.is_empty() {
        let commands: Vec<String> = analysis
            .setup_steps
            .iter()
            .flat_map(|s| s.commands.iter().cloned())
            .collect();
        out.push(TaskSuggestion {
            title: "Set up the development environment".into(),
            description: format!(
                "Work through the documented setup steps ({} in total) until the project builds locally.",
                analysis.setup_steps.len()
            ),
            acceptance_criteria: if commands.is_empty() {
                vec!["All documented setup steps completed".into()]
            } else {
                commands
                    .iter()
                    .take(5)
                    .map(|c| format!("`{c}` runs without errors"))
                    .collect()
            },
            prerequisites: vec![],
            estimated_minutes: 30,
            difficulty: Difficulty::Easy,
            confidence: FALLBACK_CONFIDENCE,
            source_files: vec![],
        });
    }

    // One study task per top concept, most important first.
    let mut ranked: Vec<_> = analysis.concepts.iter().collect();
    ranked.sort_by(|a, b| b.importance.cmp(&a.importance));
    for concept in ranked.into_iter().take(3) {
        out.push(TaskSuggestion {
            title: format!("Understand: {}", concept.name),
            description: concept.description.clone(),
            acceptance_criteria: vec![format!(
                "Can explain {} and where it lives in the codebase",
                concept.name
            )],
            prerequisites: vec![],
            estimated_minutes: 45,
            difficulty: Difficulty::Medium,
            confidence: FALLBACK_CONFIDENCE,
            source_files: concept.related_files.clone(),
        });
    }

    if !analysis.code_examples.is_empty() {
        out.push(TaskSuggestion {
            title: "Run the documented code examples".into(),
            description: format!(
                "Reproduce the {} code example(s) found in the documentation.",
                analysis.code_examples.len()
            ),
            acceptance_criteria: vec!["Each example runs as documented".into()],
            prerequisites: vec!["Set up the development environment".into()],
            estimated_minutes: 30,
            difficulty: Difficulty::Medium,
            confidence: FALLBACK_CONFIDENCE,
            source_files: analysis
                .code_examples
                .iter()
                .map(|e| e.file_path.clone())
                .filter(|p| !p.is_empty())
                .collect(),
        });
    }

    if out.is_empty() {
        out.push(TaskSuggestion {
            title: "Explore the repository structure".into(),
            description: "Read the top-level directories and identify the main components.".into(),
            acceptance_criteria: vec!["Can sketch the module layout from memory".into()],
            prerequisites: vec![],
            estimated_minutes: 30,
            difficulty: Difficulty::Easy,
            confidence: FALLBACK_CONFIDENCE,
            source_files: vec![],
        });
    }

    out
}

/// Template tasks for a single new feature.
fn feature_tasks(feature: &FeatureAnalysis) -> Vec<TaskSuggestion> {
    let name = feature
        .feature_path
        .rsplit('/')
        .next()
        .unwrap_or(&feature.feature_path);

    let mut out = vec![TaskSuggestion {
        title: format!("Review the new feature: {name}"),
        description: if feature.documentation.is_empty() {
            format!("Read {} and understand what it adds.", feature.feature_path)
        } else {
            feature.documentation.clone()
        },
        acceptance_criteria: vec![format!(
            "Can describe the purpose of {} public symbol(s)",
            feature.functions.len() + feature.types.len()
        )],
        prerequisites: vec![],
        estimated_minutes: 30,
        difficulty: feature.complexity,
        confidence: FALLBACK_CONFIDENCE,
        source_files: vec![feature.feature_path.clone()],
    }];

    if !feature.tests.is_empty() {
        out.push(TaskSuggestion {
            title: format!("Run the tests for {name}"),
            description: format!(
                "Execute the {} test(s) covering the feature and read what they assert.",
                feature.tests.len()
            ),
            acceptance_criteria: vec!["All feature tests pass locally".into()],
            prerequisites: vec![format!("Review the new feature: {name}")],
            estimated_minutes: 20,
            difficulty: Difficulty::Easy,
            confidence: FALLBACK_CONFIDENCE - 0.1,
            source_files: vec![feature.feature_path.clone()],
        });
    }

    out
}

/// Template FAQ pairs from the analysis.
pub(crate) fn faqs(analysis: &RepositoryAnalysis) -> Vec<FAQPair> {
    let mut out = Vec::new();

    if !analysis.setup_steps.is_empty() {
        let answer = analysis
            .setup_steps
            .iter()
            .take(5)
            .map(|s| format!("{}. {}", s.order + 1, s.description))
            .collect::<Vec<_>>()
            .join("\n");
        out.push(FAQPair {
            question: "How do I set up the project?".into(),
            answer,
            category: "setup".into(),
            confidence: FALLBACK_CONFIDENCE,
            source_files: vec![],
        });
    }

    let mut ranked: Vec<_> = analysis.concepts.iter().collect();
    ranked.sort_by(|a, b| b.importance.cmp(&a.importance));
    for concept in ranked.into_iter().take(3) {
        out.push(FAQPair {
            question: format!("What is {}?", concept.name),
            answer: concept.description.clone(),
            category: "concepts".into(),
            confidence: FALLBACK_CONFIDENCE,
            source_files: concept.related_files.clone(),
        });
    }

    if !analysis.dependencies.is_empty() {
        let answer = analysis
            .dependencies
            .iter()
            .map(|d| match &d.version {
                Some(v) => format!("- {} ({v})", d.name),
                None => format!("- {}", d.name),
            })
            .collect::<Vec<_>>()
            .join("\n");
        out.push(FAQPair {
            question: "What dependencies does the project use?".into(),
            answer,
            category: "dependencies".into(),
            confidence: FALLBACK_CONFIDENCE,
            source_files: vec![],
        });
    }

    if out.is_empty() {
        out.push(FAQPair {
            question: "Where do I start?".into(),
            answer: "Start with the repository README and the module-level documentation.".into(),
            category: "general".into(),
            confidence: FALLBACK_CONFIDENCE,
            source_files: vec![],
        });
    }

    out
}

/// Template quick-start guide from the analysis.
pub(crate) fn quick_start(analysis: &RepositoryAnalysis) -> QuickStartGuide {
    let prerequisites: Vec<String> = analysis
        .setup_steps
        .iter()
        .flat_map(|s| s.prerequisites.iter().cloned())
        .chain(
            analysis
                .concepts
                .iter()
                .flat_map(|c| c.prerequisites.iter().cloned()),
        )
        .take(5)
        .collect();

    let setup_steps: Vec<String> = analysis
        .setup_steps
        .iter()
        .take(6)
        .map(|s| s.description.clone())
        .collect();

    let basic_usage: Vec<String> = analysis
        .code_examples
        .iter()
        .take(3)
        .map(|e| format!("{}:\n```{}\n{}\n```", e.title, e.language, e.code))
        .collect();

    let guide = QuickStartGuide {
        prerequisites,
        setup_steps,
        basic_usage,
        next_steps: vec![
            "Read the onboarding tasks document".into(),
            "Browse the FAQ for common questions".into(),
        ],
    };

    debug_assert!(!guide.is_empty());
    guide
}
