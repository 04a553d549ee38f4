//! Shared types, error model, and configuration for DocPilot.
//!
//! This crate is the foundation depended on by all other DocPilot crates.
//! It provides:
//! - [`DocPilotError`] — the unified error type
//! - Domain types ([`RepositoryAnalysis`], [`SuggestionSet`], [`HookExecutionRecord`], ...)
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, GenerationConfig, HooksConfig, OpenRouterConfig, StyleSection,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{DocPilotError, Result};
pub use types::{
    CodeExample, Concept, Dependency, DependencyKind, Difficulty, DocumentKind,
    ExecutionOutcome, FAQPair, FeatureAnalysis, HookExecutionRecord, QuickStartGuide,
    RepositoryAnalysis, Scope, SetupStep, Suggestion, SuggestionSet, TaskSuggestion, TriggerKind,
};
