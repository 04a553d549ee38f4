//! Style conformance filter.
//!
//! A pure text transform applied to generated content after the
//! suggestion engine and before the merge, so that conflict detection
//! compares already-style-conformant content against existing blocks.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use docpilot_shared::{DocPilotError, Result, StyleSection};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Writing tone for generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Technical,
    Friendly,
    Neutral,
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "technical" => Ok(Self::Technical),
            "friendly" => Ok(Self::Friendly),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!("unknown tone: {other}")),
        }
    }
}

/// Validated style rules. Built from the raw config section; the pipeline
/// only ever sees this typed form.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRules {
    /// Deepest heading level allowed; deeper headings are demoted.
    pub max_heading_depth: u8,
    pub tone: Tone,
    /// Disallowed term → preferred term, in stable iteration order.
    pub terminology: BTreeMap<String, String>,
}

impl Default for StyleRules {
    fn default() -> Self {
        Self {
            max_heading_depth: 3,
            tone: Tone::Neutral,
            terminology: BTreeMap::new(),
        }
    }
}

impl StyleRules {
    /// Validate a raw config section into typed rules.
    pub fn from_section(section: &StyleSection) -> Result<Self> {
        if !(1..=6).contains(&section.heading_depth) {
            return Err(DocPilotError::validation(format!(
                "style.heading_depth must be 1..=6, got {}",
                section.heading_depth
            )));
        }
        let tone: Tone = section
            .tone
            .parse()
            .map_err(DocPilotError::validation)?;

        Ok(Self {
            max_heading_depth: section.heading_depth,
            tone,
            terminology: section.terminology.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Apply all style rules to a piece of generated markdown.
pub fn apply(text: &str, rules: &StyleRules) -> String {
    let text = clamp_heading_depth(text, rules.max_heading_depth);
    let text = rewrite_terminology(&text, &rules.terminology);
    apply_tone(&text, rules.tone)
}

/// Demote headings deeper than `max` to exactly `max` levels.
fn clamp_heading_depth(text: &str, max: u8) -> String {
    let max = max as usize;
    let mut out = String::with_capacity(text.len());
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let hashes = line.chars().take_while(|&c| c == '#').count();
        if !in_fence && hashes > max && line.chars().nth(hashes) == Some(' ') {
            out.push_str(&"#".repeat(max));
            out.push_str(&line[hashes..]);
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    // Preserve the absence of a trailing newline.
    if !text.ends_with('\n') {
        out.pop();
    }
    out
}

/// Replace disallowed terms with their preferred forms, whole words only,
/// case-insensitively, preserving a leading capital.
fn rewrite_terminology(text: &str, terminology: &BTreeMap<String, String>) -> String {
    let mut result = text.to_string();
    for (from, to) in terminology {
        let Ok(re) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(from))) else {
            continue;
        };
        result = re
            .replace_all(&result, |caps: &regex::Captures<'_>| {
                let matched = caps.get(0).expect("match").as_str();
                if matched.chars().next().is_some_and(char::is_uppercase) {
                    capitalize(to)
                } else {
                    to.clone()
                }
            })
            .into_owned();
    }
    result
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Tone pass. Neutral is the identity; friendly softens imperatives;
/// technical strips exclamations.
fn apply_tone(text: &str, tone: Tone) -> String {
    match tone {
        Tone::Neutral => text.to_string(),
        Tone::Friendly => {
            let mut result = text.to_string();
            for (from, to) in [
                ("You must ", "You'll want to "),
                ("you must ", "you'll want to "),
                ("Execute ", "Run "),
                ("It is required to ", "You'll need to "),
                ("it is required to ", "you'll need to "),
            ] {
                result = result.replace(from, to);
            }
            result
        }
        Tone::Technical => text.replace('!', "."),
    }
}
