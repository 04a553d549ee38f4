//! Strict schema validation for capability responses.
//!
//! Raw response text is parsed into typed suggestions immediately after
//! the generation call. Anything malformed becomes a
//! [`DocPilotError::Generation`] (a single retryable failure) — untyped
//! data never reaches the merge engine.
//!
//! [`DocPilotError::Generation`]: docpilot_shared::DocPilotError::Generation

use serde::Deserialize;

use docpilot_shared::{
    DocPilotError, Difficulty, FAQPair, QuickStartGuide, Result, TaskSuggestion,
};

// ---------------------------------------------------------------------------
// Wire shapes (lenient field defaults, strict post-validation)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireTask {
    title: String,
    description: String,
    #[serde(default)]
    acceptance_criteria: Vec<String>,
    #[serde(default)]
    prerequisites: Vec<String>,
    #[serde(default = "default_estimate")]
    estimated_minutes: u32,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    source_files: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireFaq {
    question: String,
    answer: String,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    source_files: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireQuickStart {
    #[serde(default)]
    prerequisites: Vec<String>,
    #[serde(default)]
    setup_steps: Vec<String>,
    #[serde(default)]
    basic_usage: Vec<String>,
    #[serde(default)]
    next_steps: Vec<String>,
}

fn default_estimate() -> u32 {
    30
}
fn default_confidence() -> f64 {
    0.8
}
fn default_category() -> String {
    "general".into()
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// Parse a task-suggestion response.
pub(crate) fn parse_tasks(text: &str) -> Result<Vec<TaskSuggestion>> {
    let wire: Vec<WireTask> = parse_json(text)?;
    if wire.is_empty() {
        return Err(DocPilotError::Generation("empty task array".into()));
    }

    wire.into_iter()
        .map(|task| {
            require_nonempty("title", &task.title)?;
            require_nonempty("description", &task.description)?;
            Ok(TaskSuggestion {
                title: task.title,
                description: task.description,
                acceptance_criteria: task.acceptance_criteria,
                prerequisites: task.prerequisites,
                estimated_minutes: task.estimated_minutes.max(1),
                difficulty: parse_difficulty(task.difficulty.as_deref())?,
                confidence: check_confidence(task.confidence)?,
                source_files: task.source_files,
            })
        })
        .collect()
}

/// Parse an FAQ response. Questions are normalized to end with `?`.
pub(crate) fn parse_faqs(text: &str) -> Result<Vec<FAQPair>> {
    let wire: Vec<WireFaq> = parse_json(text)?;
    if wire.is_empty() {
        return Err(DocPilotError::Generation("empty FAQ array".into()));
    }

    wire.into_iter()
        .map(|faq| {
            require_nonempty("question", &faq.question)?;
            require_nonempty("answer", &faq.answer)?;
            let mut question = faq.question.trim().to_string();
            if !question.ends_with('?') {
                question.push('?');
            }
            Ok(FAQPair {
                question,
                answer: faq.answer,
                category: faq.category,
                confidence: check_confidence(faq.confidence)?,
                source_files: faq.source_files,
            })
        })
        .collect()
}

/// Parse a quick-start response.
pub(crate) fn parse_quick_start(text: &str) -> Result<QuickStartGuide> {
    let wire: WireQuickStart = parse_json(text)?;
    let guide = QuickStartGuide {
        prerequisites: wire.prerequisites,
        setup_steps: wire.setup_steps,
        basic_usage: wire.basic_usage,
        next_steps: wire.next_steps,
    };
    if guide.is_empty() {
        return Err(DocPilotError::Generation("empty quick-start guide".into()));
    }
    Ok(guide)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Deserialize, tolerating a ```json fence around the payload.
fn parse_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    let stripped = strip_fence(text.trim());
    serde_json::from_str(stripped)
        .map_err(|e| DocPilotError::Generation(format!("schema validation failed: {e}")))
}

/// Remove a surrounding markdown code fence, if present.
fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the info string ("json", "JSON", or empty).
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn require_nonempty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DocPilotError::Generation(format!("empty {field}")));
    }
    Ok(())
}

fn check_confidence(value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DocPilotError::Generation(format!(
            "confidence {value} out of range"
        )))
    }
}

fn parse_difficulty(value: Option<&str>) -> Result<Difficulty> {
    match value {
        None => Ok(Difficulty::Medium),
        Some("easy") => Ok(Difficulty::Easy),
        Some("medium") => Ok(Difficulty::Medium),
        Some("hard") => Ok(Difficulty::Hard),
        Some("expert") => Ok(Difficulty::Expert),
        Some(other) => Err(DocPilotError::Generation(format!(
            "unknown difficulty: {other}"
        ))),
    }
}
