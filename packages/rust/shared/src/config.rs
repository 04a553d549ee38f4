//! Application configuration for DocPilot.
//!
//! User config lives at `~/.docpilot/docpilot.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! The pipeline crates never read this file themselves; the CLI loads it
//! and passes typed values in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocPilotError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docpilot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docpilot";

// ---------------------------------------------------------------------------
// Config structs (matching docpilot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Generation retry policy.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Style conformance rules.
    #[serde(default)]
    pub style: StyleSection,

    /// Hook enablement flags.
    #[serde(default)]
    pub hooks: HooksConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory scanned for markdown sources.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: String,

    /// Generated tasks document path, relative to the workspace root.
    #[serde(default = "default_tasks_file")]
    pub tasks_file: String,

    /// Generated FAQ document path.
    #[serde(default = "default_faq_file")]
    pub faq_file: String,

    /// Generated quick-start document path.
    #[serde(default = "default_quick_start_file")]
    pub quick_start_file: String,

    /// How many execution records `status` shows by default.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            tasks_file: default_tasks_file(),
            faq_file: default_faq_file(),
            quick_start_file: default_quick_start_file(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_docs_dir() -> String {
    "docs".into()
}
fn default_tasks_file() -> String {
    "onboarding/tasks.md".into()
}
fn default_faq_file() -> String {
    "onboarding/faq.md".into()
}
fn default_quick_start_file() -> String {
    "onboarding/quick-start.md".into()
}
fn default_history_limit() -> usize {
    10
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Default model to use for generation.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[generation]` section — retry policy for the generation capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum retry attempts before the template fallback engages.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries in ms (doubled per attempt).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1_000
}

/// `[style]` section — raw style rules, validated into typed rules by the
/// style crate before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSection {
    /// Maximum heading nesting depth allowed in generated content (1-6).
    #[serde(default = "default_heading_depth")]
    pub heading_depth: u8,

    /// Tone: "technical", "friendly", or "neutral".
    #[serde(default = "default_tone")]
    pub tone: String,

    /// Disallowed term → preferred term (BTreeMap keeps rewrite order stable).
    #[serde(default)]
    pub terminology: BTreeMap<String, String>,
}

impl Default for StyleSection {
    fn default() -> Self {
        Self {
            heading_depth: default_heading_depth(),
            tone: default_tone(),
            terminology: BTreeMap::new(),
        }
    }
}

fn default_heading_depth() -> u8 {
    3
}
fn default_tone() -> String {
    "neutral".into()
}

/// `[hooks]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    /// React to feature-created events.
    #[serde(default = "default_true")]
    pub feature_created_enabled: bool,

    /// React to document-saved events.
    #[serde(default = "default_true")]
    pub document_saved_enabled: bool,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            feature_created_enabled: true,
            document_saved_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docpilot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocPilotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docpilot/docpilot.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocPilotError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocPilotError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocPilotError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocPilotError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocPilotError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the OpenRouter API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(DocPilotError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("docs_dir"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.generation.max_retries, 3);
        assert_eq!(parsed.openrouter.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(parsed.style.heading_depth, 3);
    }

    #[test]
    fn config_with_terminology() {
        let toml_str = r#"
[style]
tone = "friendly"

[style.terminology]
"repo" = "repository"
"config" = "configuration"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.style.tone, "friendly");
        assert_eq!(
            config.style.terminology.get("repo").map(String::as_str),
            Some("repository")
        );
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
docs_dir = "documentation"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.docs_dir, "documentation");
        assert_eq!(config.defaults.tasks_file, "onboarding/tasks.md");
        assert!(config.hooks.feature_created_enabled);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openrouter.api_key_env = "DP_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
