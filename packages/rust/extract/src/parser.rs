//! Markdown parsing helpers for the source extractor.
//!
//! Everything here is pure text analysis over a single file: heading
//! sectioning, concept/setup classification, command harvesting, code
//! fence extraction, and dependency mentions.

use std::sync::OnceLock;

use regex::Regex;

use docpilot_shared::{
    CodeExample, Concept, Dependency, DependencyKind, SetupStep,
};

/// Heading keywords that mark a section as describing a concept.
const CONCEPT_KEYWORDS: &[&str] = &[
    "concept", "architecture", "overview", "design", "introduction",
    "how it works", "component", "module", "data model", "internals",
];

/// Heading keywords that mark a section as setup instructions.
const SETUP_KEYWORDS: &[&str] = &[
    "setup", "set up", "install", "installation", "getting started",
    "quick start", "configuration", "configure", "prerequisites",
    "requirements", "environment", "building", "build from source",
];

/// Command prefixes that qualify backticked text as a shell command.
const COMMAND_INDICATORS: &[&str] = &[
    "cargo ", "rustup ", "pip install", "npm install", "pnpm ", "yarn ",
    "git clone", "cd ", "mkdir", "python ", "node ", "make", "cmake",
    "docker", "apt-get", "yum install", "brew install", "curl ", "just ",
];

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(#{1,6})[ \t]+(.+?)[ \t]*$").expect("heading regex"))
}

fn code_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?ms)^```([A-Za-z0-9_+#.-]*)[ \t]*\n(.*?)^```[ \t]*$")
            .expect("code fence regex")
    })
}

// ---------------------------------------------------------------------------
// Sectioning
// ---------------------------------------------------------------------------

/// A heading-delimited section of a markdown file.
#[derive(Debug, Clone)]
pub(crate) struct Section {
    /// Heading level (number of `#` markers).
    pub level: usize,
    pub heading: String,
    /// Body text up to the next heading.
    pub body: String,
}

/// Split markdown into heading-delimited sections, in document order.
pub(crate) fn split_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let matches: Vec<_> = heading_re().captures_iter(content).collect();

    for (i, caps) in matches.iter().enumerate() {
        let whole = caps.get(0).expect("match");
        let body_start = whole.end();
        let body_end = matches
            .get(i + 1)
            .map(|next| next.get(0).expect("match").start())
            .unwrap_or(content.len());

        sections.push(Section {
            level: caps[1].len(),
            heading: caps[2].trim().to_string(),
            body: content[body_start..body_end].trim().to_string(),
        });
    }

    sections
}

pub(crate) fn is_concept_heading(heading: &str) -> bool {
    let lower = heading.to_lowercase();
    CONCEPT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

pub(crate) fn is_setup_heading(heading: &str) -> bool {
    let lower = heading.to_lowercase();
    SETUP_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

// ---------------------------------------------------------------------------
// Concepts
// ---------------------------------------------------------------------------

/// Importance 1..=10 from heading level plus content signals.
pub(crate) fn concept_importance(level: usize, heading: &str, body: &str) -> u8 {
    let mut importance = 7_i32.saturating_sub(level as i32).max(1);

    let lower = heading.to_lowercase();
    if ["architecture", "overview", "getting started", "introduction"]
        .iter()
        .any(|term| lower.contains(term))
    {
        importance += 2;
    }
    if body.len() > 500 {
        importance += 1;
    }

    importance.clamp(1, 10) as u8
}

/// First paragraph of the body with inline markup stripped, capped at 200 chars.
pub(crate) fn concept_description(body: &str) -> String {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    let link_re =
        LINK_RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("link regex"));

    let first_paragraph = body
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with("```"));

    let Some(paragraph) = first_paragraph else {
        return "No description available".to_string();
    };

    let text = link_re.replace_all(paragraph, "$1");
    let text: String = text.chars().filter(|c| !matches!(c, '*' | '_' | '`')).collect();
    let text = text.trim();

    if text.chars().count() > 200 {
        let truncated: String = text.chars().take(197).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

/// Prerequisite phrases pulled from "requires ...", "make sure ..." patterns.
/// First occurrence wins so the result is deterministic for identical input.
pub(crate) fn extract_prerequisites(body: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)(?:prerequisite|requirement|require)s?:?\s+(.+)")
            .expect("prerequisite regex")
    });

    let mut out: Vec<String> = Vec::new();
    for caps in re.captures_iter(body) {
        for item in caps[1].split([',', ';']).flat_map(|s| s.split(" and ")) {
            let item = item.trim().trim_end_matches('.').to_string();
            if !item.is_empty()
                && item.len() < 100
                && !out.iter().any(|existing| existing == &item)
            {
                out.push(item);
            }
        }
    }
    out
}

/// Build a concept from a concept-classified section.
pub(crate) fn concept_from_section(section: &Section, file_path: &str) -> Concept {
    Concept {
        name: section.heading.clone(),
        description: concept_description(&section.body),
        importance: concept_importance(section.level, &section.heading, &section.body),
        related_files: if file_path.is_empty() {
            Vec::new()
        } else {
            vec![file_path.to_string()]
        },
        prerequisites: extract_prerequisites(&section.body),
    }
}

// ---------------------------------------------------------------------------
// Setup steps
// ---------------------------------------------------------------------------

/// Extract setup steps from a setup-classified section.
///
/// Numbered, bulleted, and `Step N:` lines each open a step; plain lines
/// extend the open step's description. A section with no list items at all
/// becomes a single coarse step.
pub(crate) fn setup_steps_from_section(
    section: &Section,
    start_order: usize,
) -> Vec<SetupStep> {
    static ITEM_RE: OnceLock<Regex> = OnceLock::new();
    let item_re = ITEM_RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:\d+\.\s+|[-*]\s+|step\s+\d+:?\s+)(.+)$").expect("item regex")
    });

    let mut steps: Vec<SetupStep> = Vec::new();
    let mut current: Option<SetupStep> = None;
    let mut order = start_order;

    for line in section.body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = item_re.captures(line) {
            if let Some(step) = current.take() {
                steps.push(step);
            }
            let text = caps[1].trim().to_string();
            current = Some(SetupStep {
                title: truncate(&text, 50),
                description: text.clone(),
                commands: extract_commands(&text),
                prerequisites: Vec::new(),
                order,
            });
            order += 1;
        } else if let Some(step) = current.as_mut() {
            step.description.push(' ');
            step.description.push_str(line);
            step.commands.extend(extract_commands(line));
        }
    }

    if let Some(step) = current.take() {
        steps.push(step);
    }

    if steps.is_empty() && !section.body.trim().is_empty() {
        steps.push(SetupStep {
            title: section.heading.clone(),
            description: truncate(section.body.trim(), 200),
            commands: extract_commands(&section.body),
            prerequisites: Vec::new(),
            order: start_order,
        });
    }

    steps
}

/// Harvest shell commands from backticks and `$ `/`run:` prefixes.
pub(crate) fn extract_commands(text: &str) -> Vec<String> {
    static TICK_RE: OnceLock<Regex> = OnceLock::new();
    static PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    let tick_re = TICK_RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("tick regex"));
    let prefix_re = PREFIX_RE.get_or_init(|| {
        Regex::new(r"(?im)^(?:\$\s+|>\s+|(?:run|execute|type):\s*)(.+)$").expect("prefix regex")
    });

    let mut commands = Vec::new();
    for caps in tick_re.captures_iter(text) {
        let candidate = caps[1].trim();
        if looks_like_command(candidate) {
            commands.push(candidate.to_string());
        }
    }
    for caps in prefix_re.captures_iter(text) {
        let candidate = caps[1].trim();
        if looks_like_command(candidate) && !commands.iter().any(|c| c == candidate) {
            commands.push(candidate.to_string());
        }
    }
    commands
}

pub(crate) fn looks_like_command(text: &str) -> bool {
    let lower = text.to_lowercase();
    COMMAND_INDICATORS.iter().any(|ind| lower.starts_with(ind) || lower.contains(ind))
}

// ---------------------------------------------------------------------------
// Code examples
// ---------------------------------------------------------------------------

/// Extract fenced code blocks with context from the surrounding prose.
pub(crate) fn find_code_examples(content: &str, file_path: &str) -> Vec<CodeExample> {
    let mut examples = Vec::new();

    for caps in code_fence_re().captures_iter(content) {
        let code = caps[2].trim();
        if code.is_empty() {
            continue;
        }
        let language = if caps[1].is_empty() {
            detect_language(code).to_string()
        } else {
            caps[1].to_lowercase()
        };
        let fence_start = caps.get(0).expect("match").start();
        let (title, description) = code_context(&content[..fence_start]);

        examples.push(CodeExample {
            title,
            code: code.to_string(),
            language,
            description,
            file_path: file_path.to_string(),
        });
    }

    examples
}

/// Title and description from the nearest heading or short line above a fence.
fn code_context(before: &str) -> (String, String) {
    let mut title = "Code Example".to_string();
    let mut description = "Code example from documentation".to_string();

    for line in before.lines().rev() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = heading_re().captures(line) {
            title = caps[2].to_string();
            break;
        }
        if line.len() < 100 && !line.starts_with("```") {
            description = line.to_string();
            title = truncate(line, 50);
            break;
        }
        break;
    }

    (title, description)
}

/// Best-effort language inference for unlabelled fences.
pub(crate) fn detect_language(code: &str) -> &'static str {
    let upper = code.to_uppercase();
    if code.contains("fn ") && (code.contains("let ") || code.contains("use ")) {
        "rust"
    } else if code.contains("def ") && code.contains("import ") {
        "python"
    } else if code.contains("function ") || code.contains("const ") || code.contains("let ") {
        "javascript"
    } else if code.contains("#include") || code.contains("int main(") {
        "c"
    } else if upper.contains("SELECT ") && upper.contains("FROM ") {
        "sql"
    } else if code.lines().any(|l| looks_like_command(l.trim())) {
        "bash"
    } else {
        "text"
    }
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

/// Dependency mentions from install commands in the text.
pub(crate) fn extract_dependencies(content: &str, _file_path: &str) -> Vec<Dependency> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"(?m)(?:cargo (?:add|install)|pip install|npm install(?: -g)?|brew install|apt-get install(?: -y)?)\s+([A-Za-z0-9@/_.=^~-]+)",
        )
        .expect("dependency regex")
    });

    let mut deps = Vec::new();
    for caps in re.captures_iter(content) {
        let raw = caps[1].trim();
        if raw.starts_with('-') {
            continue; // flag, not a package name
        }
        let (name, version) = split_name_version(raw);
        if !deps.iter().any(|d: &Dependency| d.name == name) {
            let command = caps.get(0).expect("match").as_str();
            deps.push(Dependency {
                name,
                version,
                kind: DependencyKind::Runtime,
                description: format!("mentioned via `{}`", command.trim()),
            });
        }
    }
    deps
}

/// Split `name@1.2`, `name==1.2`, or `name=1.2` into name + version.
fn split_name_version(raw: &str) -> (String, Option<String>) {
    for sep in ["==", "@", "="] {
        if let Some((name, version)) = raw.split_once(sep) {
            if !name.is_empty() && !version.is_empty() {
                return (name.to_string(), Some(version.to_string()));
            }
        }
    }
    (raw.to_string(), None)
}

/// Truncate to `max` chars, appending `...` when shortened.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}
