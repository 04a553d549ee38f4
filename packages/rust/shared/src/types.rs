//! Core domain types for the DocPilot synchronization pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Document kinds
// ---------------------------------------------------------------------------

/// The three onboarding artifacts DocPilot keeps synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Tasks,
    Faq,
    QuickStart,
}

impl DocumentKind {
    /// Stable string form, used in document headers and the execution log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Faq => "faq",
            Self::QuickStart => "quick-start",
        }
    }

    /// Default title for a freshly synthesized document of this kind.
    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Tasks => "Onboarding Tasks",
            Self::Faq => "Frequently Asked Questions",
            Self::QuickStart => "Quick Start",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tasks" => Ok(Self::Tasks),
            "faq" => Ok(Self::Faq),
            "quick-start" | "quickstart" => Ok(Self::QuickStart),
            other => Err(format!("unknown document kind: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Repository analysis
// ---------------------------------------------------------------------------

/// Structured analysis extracted from repository documentation.
///
/// Immutable once produced; one instance per extraction run. Field and
/// collection order is deterministic (input-scan order) so identical
/// inputs serialize byte-identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryAnalysis {
    pub concepts: Vec<Concept>,
    pub setup_steps: Vec<SetupStep>,
    pub code_examples: Vec<CodeExample>,
    pub dependencies: Vec<Dependency>,
}

/// A key concept identified in repository content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Unique within an analysis (first occurrence wins on dedup).
    pub name: String,
    pub description: String,
    /// Importance rank, 1 (low) to 10 (high).
    pub importance: u8,
    /// Source locations that mention this concept.
    pub related_files: Vec<String>,
    /// Prerequisite concept names. Advisory edges only: they may reference
    /// concepts that were never extracted, and cycles are tolerated.
    pub prerequisites: Vec<String>,
}

/// A setup or installation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupStep {
    pub title: String,
    pub description: String,
    pub commands: Vec<String>,
    pub prerequisites: Vec<String>,
    pub order: usize,
}

/// A code example found in documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeExample {
    pub title: String,
    pub code: String,
    pub language: String,
    pub description: String,
    pub file_path: String,
}

/// Dependency classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Runtime,
    Dev,
    Build,
    Optional,
}

/// A project dependency mentioned in documentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub kind: DependencyKind,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Generated suggestions
// ---------------------------------------------------------------------------

/// Difficulty rating for an onboarding task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Expert => "expert",
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

/// A generated onboarding task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSuggestion {
    pub title: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    pub prerequisites: Vec<String>,
    pub estimated_minutes: u32,
    pub difficulty: Difficulty,
    /// Generation confidence, 0.0..=1.0. Drives merge append order.
    pub confidence: f64,
    /// Source locations used to justify the suggestion.
    pub source_files: Vec<String>,
}

/// A generated question-answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FAQPair {
    pub question: String,
    pub answer: String,
    pub category: String,
    pub confidence: f64,
    pub source_files: Vec<String>,
}

/// A generated quick-start guide, section by section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickStartGuide {
    pub prerequisites: Vec<String>,
    pub setup_steps: Vec<String>,
    pub basic_usage: Vec<String>,
    pub next_steps: Vec<String>,
}

impl QuickStartGuide {
    /// True when no section has any content.
    pub fn is_empty(&self) -> bool {
        self.prerequisites.is_empty()
            && self.setup_steps.is_empty()
            && self.basic_usage.is_empty()
            && self.next_steps.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Suggestion sets (merge engine input)
// ---------------------------------------------------------------------------

/// A single rendered suggestion: the kind-agnostic unit the merge engine
/// consumes. `title` derives the block key; `body` is finished markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub body: String,
    pub confidence: f64,
    pub source_files: Vec<String>,
}

/// The output of one generation call for one document kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub kind: DocumentKind,
    /// True when this set is exhaustive for its kind: stale `generated`
    /// blocks with no matching suggestion may then be dropped by the merge.
    pub authoritative: bool,
    pub items: Vec<Suggestion>,
}

// ---------------------------------------------------------------------------
// Feature analysis and scope
// ---------------------------------------------------------------------------

/// Heuristic analysis of a single newly added feature file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureAnalysis {
    pub feature_path: String,
    pub functions: Vec<String>,
    pub types: Vec<String>,
    pub tests: Vec<String>,
    pub documentation: String,
    pub complexity: Difficulty,
}

/// What a suggestion run covers: the whole repository, or the delta
/// introduced by one new feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scope {
    Full,
    FeatureDelta(FeatureAnalysis),
}

// ---------------------------------------------------------------------------
// Hook execution records
// ---------------------------------------------------------------------------

/// What fired a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    FeatureCreated,
    DocumentSaved,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeatureCreated => "feature-created",
            Self::DocumentSaved => "document-saved",
        }
    }
}

impl std::str::FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "feature-created" => Ok(Self::FeatureCreated),
            "document-saved" => Ok(Self::DocumentSaved),
            other => Err(format!("unknown trigger kind: {other}")),
        }
    }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionOutcome {
    Succeeded,
    Failed,
    SkippedInFlight,
}

impl ExecutionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::SkippedInFlight => "skipped-in-flight",
        }
    }
}

impl std::str::FromStr for ExecutionOutcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "skipped-in-flight" => Ok(Self::SkippedInFlight),
            other => Err(format!("unknown execution outcome: {other}")),
        }
    }
}

/// One row of the append-only execution log. Never mutated after
/// finalization; a record with no `finished_at` marks an in-flight run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookExecutionRecord {
    /// UUID v7, time-sortable.
    pub id: String,
    /// Document key the run targeted.
    pub doc_key: String,
    pub trigger: TriggerKind,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ExecutionOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
