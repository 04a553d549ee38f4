//! The synchronization pipeline: sources → analysis → suggestions →
//! style → merge → disk.
//!
//! One run targets one artifact. The run re-reads every documentation
//! source each time, so a rerun after a coalesced trigger always sees
//! the latest content.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use docpilot_extract::{SourceFile, extract};
use docpilot_merge::{Conflict, Document, MergeOptions, merge};
use docpilot_shared::{AppConfig, DocPilotError, DocumentKind, Result, Scope};
use docpilot_style::StyleRules;
use docpilot_suggest::SuggestionEngine;

/// One artifact the pipeline keeps synchronized.
#[derive(Debug, Clone)]
pub struct DocumentTarget {
    /// Stable key used in the execution log (`tasks`, `faq`, `quick-start`).
    pub key: String,
    pub kind: DocumentKind,
    pub path: PathBuf,
}

/// Everything a pipeline run needs. Shared across concurrent runs.
pub struct PipelineContext {
    pub docs_dir: PathBuf,
    pub targets: Vec<DocumentTarget>,
    pub engine: Arc<SuggestionEngine>,
    pub style: StyleRules,
    pub merge_options: MergeOptions,
}

impl PipelineContext {
    /// Build a context from the app config, with one target per kind.
    pub fn from_config(config: &AppConfig, engine: Arc<SuggestionEngine>) -> Result<Self> {
        let docs_dir = PathBuf::from(&config.defaults.docs_dir);
        let targets = vec![
            target(&docs_dir, DocumentKind::Tasks, &config.defaults.tasks_file),
            target(&docs_dir, DocumentKind::Faq, &config.defaults.faq_file),
            target(
                &docs_dir,
                DocumentKind::QuickStart,
                &config.defaults.quick_start_file,
            ),
        ];

        Ok(Self {
            docs_dir,
            targets,
            engine,
            style: StyleRules::from_section(&config.style)?,
            merge_options: MergeOptions::default(),
        })
    }

    pub fn target_for(&self, kind: DocumentKind) -> Option<&DocumentTarget> {
        self.targets.iter().find(|t| t.kind == kind)
    }
}

fn target(docs_dir: &Path, kind: DocumentKind, relative: &str) -> DocumentTarget {
    DocumentTarget {
        key: kind.as_str().to_string(),
        kind,
        path: docs_dir.join(relative),
    }
}

/// What one run did.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub key: String,
    pub sources_read: usize,
    pub sources_skipped: usize,
    pub added: usize,
    pub updated: usize,
    pub dropped: usize,
    pub conflicts: Vec<Conflict>,
    /// True when the artifact file was rewritten.
    pub wrote: bool,
}

/// Run the full pipeline for one target.
#[instrument(skip_all, fields(key = %target.key))]
pub async fn run_pipeline(
    ctx: &PipelineContext,
    target: &DocumentTarget,
    scope: &Scope,
) -> Result<PipelineReport> {
    let sources = collect_sources(ctx)?;
    debug!(count = sources.len(), "sources collected");

    let extraction = extract(&sources);
    let set = ctx.engine.suggest(target.kind, &extraction.analysis, scope).await;

    // Style conformance is applied to every body before it can reach disk.
    let mut styled = set;
    for item in &mut styled.items {
        item.body = docpilot_style::apply(&item.body, &ctx.style);
    }

    let mut document =
        Document::load(target.kind, &target.path)?.unwrap_or_else(|| Document::new(target.kind));
    let outcome = merge(&mut document, &styled, ctx.merge_options);

    let wrote = outcome.changed();
    if wrote {
        document.store(&target.path)?;
        info!(
            added = outcome.added,
            updated = outcome.updated,
            dropped = outcome.dropped,
            "artifact updated"
        );
    } else {
        debug!("artifact unchanged");
    }

    Ok(PipelineReport {
        key: target.key.clone(),
        sources_read: sources.len(),
        sources_skipped: extraction.skipped.len(),
        added: outcome.added,
        updated: outcome.updated,
        dropped: outcome.dropped,
        conflicts: outcome.conflicts,
        wrote,
    })
}

/// Gather `.md` sources under the docs dir, excluding the generated
/// artifacts themselves so a run never feeds on its own output.
fn collect_sources(ctx: &PipelineContext) -> Result<Vec<SourceFile>> {
    let mut paths = Vec::new();
    walk_markdown(&ctx.docs_dir, &mut paths)?;
    paths.retain(|p| !ctx.targets.iter().any(|t| t.path == *p));
    paths.sort();

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path).map_err(|e| DocPilotError::io(&path, e))?;
        sources.push(SourceFile { path, text });
    }
    Ok(sources)
}

fn walk_markdown(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        // A missing docs dir is an empty source set, not a failure.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(DocPilotError::io(dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| DocPilotError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            walk_markdown(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}
