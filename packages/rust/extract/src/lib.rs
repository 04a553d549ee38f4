//! Source extractor: raw documentation text → [`RepositoryAnalysis`].
//!
//! Deterministic by construction: collections are built in input-scan
//! order and dedup keeps the first occurrence, so an identical input set
//! always yields a byte-identical serialized analysis. A malformed or
//! binary-looking file is skipped and recorded, never fatal to the run.

mod parser;

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, warn};

use docpilot_shared::{
    Concept, Dependency, Difficulty, FeatureAnalysis, RepositoryAnalysis, SetupStep,
};

// ---------------------------------------------------------------------------
// Input & output types
// ---------------------------------------------------------------------------

/// One documentation source handed to the extractor. The extractor does no
/// I/O itself; callers read files and pass `(path, text)` pairs.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

/// A source that was skipped, with the reason. Skipped files never
/// contribute to the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of one extraction run.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub analysis: RepositoryAnalysis,
    pub skipped: Vec<SkippedSource>,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract a structured analysis from the given sources.
pub fn extract(sources: &[SourceFile]) -> Extraction {
    let mut concepts: Vec<Concept> = Vec::new();
    let mut setup_steps: Vec<SetupStep> = Vec::new();
    let mut code_examples = Vec::new();
    let mut dependencies: Vec<Dependency> = Vec::new();
    let mut skipped = Vec::new();

    for source in sources {
        if let Some(reason) = rejection_reason(&source.text) {
            warn!(path = %source.path.display(), %reason, "skipping source");
            skipped.push(SkippedSource {
                path: source.path.clone(),
                reason,
            });
            continue;
        }

        let path_str = source.path.to_string_lossy();
        let sections = parser::split_sections(&source.text);

        for section in &sections {
            if parser::is_concept_heading(&section.heading) {
                concepts.push(parser::concept_from_section(section, &path_str));
            }
            if parser::is_setup_heading(&section.heading) {
                setup_steps.extend(parser::setup_steps_from_section(
                    section,
                    setup_steps.len(),
                ));
            }
        }

        code_examples.extend(parser::find_code_examples(&source.text, &path_str));
        dependencies.extend(parser::extract_dependencies(&source.text, &path_str));

        debug!(
            path = %source.path.display(),
            sections = sections.len(),
            "extracted source"
        );
    }

    Extraction {
        analysis: RepositoryAnalysis {
            concepts: dedup_concepts(concepts),
            setup_steps: renumber_steps(setup_steps),
            code_examples,
            dependencies: dedup_dependencies(dependencies),
        },
        skipped,
    }
}

/// Reason to skip a source, or `None` when it is extractable text.
fn rejection_reason(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return Some("empty file".to_string());
    }
    if text.contains('\0') {
        return Some("binary content (NUL byte)".to_string());
    }
    // A high ratio of non-printable characters means this is not prose.
    let control = text
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        .count();
    if control * 10 > text.chars().count() {
        return Some("binary-looking content".to_string());
    }
    None
}

/// Keep the first concept per lowercased name, merging in later
/// occurrences' related files.
fn dedup_concepts(concepts: Vec<Concept>) -> Vec<Concept> {
    let mut out: Vec<Concept> = Vec::new();
    for concept in concepts {
        let key = concept.name.to_lowercase();
        match out.iter_mut().find(|c| c.name.to_lowercase() == key) {
            Some(existing) => {
                for file in concept.related_files {
                    if !existing.related_files.contains(&file) {
                        existing.related_files.push(file);
                    }
                }
            }
            None => out.push(concept),
        }
    }
    out
}

/// Reassign contiguous order indices after cross-file concatenation.
fn renumber_steps(mut steps: Vec<SetupStep>) -> Vec<SetupStep> {
    steps.sort_by_key(|s| s.order); // stable: preserves scan order on ties
    for (i, step) in steps.iter_mut().enumerate() {
        step.order = i;
    }
    steps
}

/// Keep the first dependency per name.
fn dedup_dependencies(dependencies: Vec<Dependency>) -> Vec<Dependency> {
    let mut seen = HashSet::new();
    dependencies
        .into_iter()
        .filter(|d| seen.insert(d.name.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Feature analysis
// ---------------------------------------------------------------------------

/// Heuristic symbol scan of one newly added feature file, feeding the
/// feature-delta suggestion scope.
pub fn analyze_feature(path: &str, text: &str) -> FeatureAnalysis {
    use regex::Regex;
    use std::sync::OnceLock;

    static FN_RE: OnceLock<Regex> = OnceLock::new();
    static TYPE_RE: OnceLock<Regex> = OnceLock::new();
    let fn_re = FN_RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:pub(?:\([a-z]+\))?\s+)?(?:async\s+)?(?:fn|def|function)\s+([A-Za-z_][A-Za-z0-9_]*)")
            .expect("fn regex")
    });
    let type_re = TYPE_RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:pub(?:\([a-z]+\))?\s+)?(?:struct|enum|trait|class|interface)\s+([A-Za-z_][A-Za-z0-9_]*)")
            .expect("type regex")
    });

    let mut functions = Vec::new();
    let mut tests = Vec::new();
    for caps in fn_re.captures_iter(text) {
        let name = caps[1].to_string();
        if name.starts_with("test_") || name.starts_with("tests") {
            tests.push(name);
        } else {
            functions.push(name);
        }
    }

    let types: Vec<String> = type_re
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();

    let documentation: String = text
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("///")
                .or_else(|| line.strip_prefix("//!"))
                .or_else(|| line.strip_prefix("#"))
                .map(str::trim)
        })
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let symbol_count = functions.len() + types.len();
    let complexity = match symbol_count {
        0..=3 => Difficulty::Easy,
        4..=10 => Difficulty::Medium,
        11..=20 => Difficulty::Hard,
        _ => Difficulty::Expert,
    };

    FeatureAnalysis {
        feature_path: path.to_string(),
        functions,
        types,
        tests,
        documentation: parser::truncate(&documentation, 500),
        complexity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str, text: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(path),
            text: text.to_string(),
        }
    }

    const README: &str = "\
# Widget Engine Overview

The widget engine schedules units of rendering work.

## Installation

1. Clone with `git clone https://example.com/widget.git`
2. Run `cargo build --release`

## Architecture

Requires: an async runtime.

The engine is split into a scheduler and a renderer.

```rust
fn main() { let engine = Engine::new(); }
```
";

    #[test]
    fn extracts_all_categories() {
        let extraction = extract(&[source("README.md", README)]);
        let analysis = &extraction.analysis;

        assert!(extraction.skipped.is_empty());
        assert_eq!(analysis.concepts.len(), 2); // Overview + Architecture
        assert_eq!(analysis.concepts[0].name, "Widget Engine Overview");
        assert_eq!(analysis.setup_steps.len(), 2);
        assert_eq!(analysis.setup_steps[1].commands, vec!["cargo build --release"]);
        assert_eq!(analysis.code_examples.len(), 1);
        assert_eq!(analysis.code_examples[0].language, "rust");
        assert_eq!(
            analysis.concepts[1].prerequisites,
            vec!["an async runtime"]
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let sources = vec![source("README.md", README), source("docs/guide.md", README)];
        let a = serde_json::to_string(&extract(&sources).analysis).expect("serialize");
        let b = serde_json::to_string(&extract(&sources).analysis).expect("serialize");
        assert_eq!(a, b);
    }

    #[test]
    fn bad_files_are_skipped_not_fatal() {
        let sources = vec![
            source("README.md", README),
            source("assets/logo.bin", "PNG\0\0\0binary junk"),
            source("empty.md", "   \n"),
        ];
        let extraction = extract(&sources);
        assert_eq!(extraction.skipped.len(), 2);
        assert!(extraction.skipped[0].reason.contains("NUL"));
        assert_eq!(extraction.skipped[1].reason, "empty file");
        // The good file still contributed.
        assert!(!extraction.analysis.concepts.is_empty());
    }

    #[test]
    fn concepts_deduplicated_across_files() {
        let md = "## Architecture\n\nSame heading in both files.\n";
        let extraction = extract(&[source("a.md", md), source("b.md", md)]);
        assert_eq!(extraction.analysis.concepts.len(), 1);
        assert_eq!(
            extraction.analysis.concepts[0].related_files,
            vec!["a.md", "b.md"]
        );
    }

    #[test]
    fn setup_steps_renumbered_across_files() {
        let md = "## Setup\n\n1. step one\n2. step two\n";
        let extraction = extract(&[source("a.md", md), source("b.md", md)]);
        let orders: Vec<usize> = extraction
            .analysis
            .setup_steps
            .iter()
            .map(|s| s.order)
            .collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn feature_analysis_finds_symbols() {
        let code = "\
/// Spawns widgets on demand.
pub struct Spawner;

pub fn spawn_widget() {}

fn helper() {}

#[test]
fn test_spawn_widget() {}
";
        let analysis = analyze_feature("src/spawner.rs", code);
        assert_eq!(analysis.types, vec!["Spawner"]);
        assert_eq!(analysis.functions, vec!["spawn_widget", "helper"]);
        assert_eq!(analysis.tests, vec!["test_spawn_widget"]);
        assert!(analysis.documentation.contains("Spawns widgets"));
        assert_eq!(analysis.complexity, Difficulty::Easy);
    }

    #[test]
    fn test_prefix_must_be_explicit() {
        let code = "\
fn testament() {}
fn tests_all_pass() {}
fn test_real() {}
";
        let analysis = analyze_feature("src/vocab.rs", code);
        assert_eq!(analysis.functions, vec!["testament"]);
        assert_eq!(analysis.tests, vec!["tests_all_pass", "test_real"]);
    }
}
