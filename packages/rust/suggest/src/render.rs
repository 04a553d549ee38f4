//! Render typed suggestions into the kind-agnostic merge input.
//!
//! Bodies are finished markdown. Titles carry through unchanged; the
//! merge engine derives block keys from them.

use std::fmt::Write as _;

use docpilot_shared::{FAQPair, QuickStartGuide, Suggestion, TaskSuggestion};

/// Render onboarding tasks as checklist blocks.
pub(crate) fn render_tasks(tasks: &[TaskSuggestion]) -> Vec<Suggestion> {
    tasks
        .iter()
        .map(|task| {
            let mut body = String::new();
            writeln!(body, "{}", task.description.trim()).ok();
            writeln!(body).ok();
            writeln!(
                body,
                "**Difficulty:** {} · **Estimate:** {} min",
                task.difficulty.as_str(),
                task.estimated_minutes
            )
            .ok();

            if !task.prerequisites.is_empty() {
                writeln!(body, "\n**Prerequisites:** {}", task.prerequisites.join(", ")).ok();
            }

            if !task.acceptance_criteria.is_empty() {
                writeln!(body, "\nAcceptance criteria:").ok();
                for criterion in &task.acceptance_criteria {
                    writeln!(body, "- [ ] {criterion}").ok();
                }
            }

            Suggestion {
                title: task.title.clone(),
                body: body.trim_end().to_string(),
                confidence: task.confidence,
                source_files: task.source_files.clone(),
            }
        })
        .collect()
}

/// Render FAQ pairs: one block per question.
pub(crate) fn render_faqs(faqs: &[FAQPair]) -> Vec<Suggestion> {
    faqs.iter()
        .map(|faq| {
            let mut body = String::new();
            writeln!(body, "{}", faq.answer.trim()).ok();
            if !faq.category.is_empty() {
                writeln!(body, "\n*Category: {}*", faq.category).ok();
            }
            Suggestion {
                title: faq.question.clone(),
                body: body.trim_end().to_string(),
                confidence: faq.confidence,
                source_files: faq.source_files.clone(),
            }
        })
        .collect()
}

/// Render a quick-start guide as four section blocks. Empty sections are
/// omitted so the merge never produces blank blocks.
pub(crate) fn render_quick_start(guide: &QuickStartGuide) -> Vec<Suggestion> {
    let sections: [(&str, &[String], bool); 4] = [
        ("Prerequisites", &guide.prerequisites, true),
        ("Setup", &guide.setup_steps, false),
        ("Basic Usage", &guide.basic_usage, true),
        ("Next Steps", &guide.next_steps, true),
    ];

    sections
        .iter()
        .filter(|(_, items, _)| !items.is_empty())
        .map(|(title, items, bulleted)| {
            let body = if *bulleted {
                items
                    .iter()
                    .map(|item| format!("- {item}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                // Setup is an ordered sequence.
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| format!("{}. {item}", i + 1))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            Suggestion {
                title: (*title).to_string(),
                body,
                confidence: 1.0,
                source_files: vec![],
            }
        })
        .collect()
}
