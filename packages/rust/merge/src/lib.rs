//! Merge engine for DocPilot artifacts.
//!
//! Merging a [`SuggestionSet`] into a [`Document`] is the only way
//! generated content reaches disk. The engine never overwrites human
//! work: `manual` blocks are untouchable, `mixed` blocks stay as edited
//! unless explicitly reverted, and each preserved block is reported as a
//! [`Conflict`]. Merging the same set twice is a no-op.
//!
//! [`SuggestionSet`]: docpilot_shared::SuggestionSet

mod document;

use std::collections::HashSet;

use tracing::{debug, instrument};

use docpilot_shared::{Suggestion, SuggestionSet};

pub use document::{Block, Document, Origin, block_key, content_hash};

// ---------------------------------------------------------------------------
// Options and outcome
// ---------------------------------------------------------------------------

/// Policy knobs for a merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// When true, a fresh suggestion overwrites a `mixed` block and the
    /// block reverts to `generated`. Off by default: human edits win.
    pub mixed_reverts: bool,
}

/// Why a suggestion was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The target block is `manual`; generated content never touches it.
    ManualOverrideSkipped,
    /// The target block is `mixed` (edited since generation) and the
    /// revert option is off.
    EditedSinceGeneration,
}

/// A suggestion preserved-over, recorded for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub key: String,
    pub kind: ConflictKind,
}

/// Counters describing what a merge changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub added: usize,
    pub updated: usize,
    /// Stale `generated` blocks removed by an authoritative set.
    pub dropped: usize,
    pub conflicts: Vec<Conflict>,
}

impl MergeOutcome {
    /// True when the document content changed and should be rewritten.
    pub fn changed(&self) -> bool {
        self.added + self.updated + self.dropped > 0
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge a suggestion set into a document in place.
///
/// Suggestions update the block sharing their key; new blocks are
/// appended in descending confidence order. When the set is
/// authoritative, `generated` blocks with no surviving suggestion are
/// dropped (manual and mixed blocks always stay).
#[instrument(skip_all, fields(kind = %document.kind, incoming = set.items.len()))]
pub fn merge(document: &mut Document, set: &SuggestionSet, options: MergeOptions) -> MergeOutcome {
    debug_assert_eq!(document.kind, set.kind);

    let mut outcome = MergeOutcome::default();
    let mut seen_keys: HashSet<String> = HashSet::new();

    // Highest confidence first; ties keep the generator's order.
    let mut incoming: Vec<&Suggestion> = set.items.iter().collect();
    incoming.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    for suggestion in incoming {
        let key = block_key(&suggestion.title);
        if !seen_keys.insert(key.clone()) {
            // Duplicate title in one set: the higher-confidence block won.
            continue;
        }

        let content = render_content(suggestion);
        match document.blocks.iter_mut().find(|b| b.key == key) {
            Some(block) => match block.origin {
                Origin::Manual => {
                    debug!(%key, "manual block preserved");
                    outcome.conflicts.push(Conflict {
                        key,
                        kind: ConflictKind::ManualOverrideSkipped,
                    });
                }
                Origin::Mixed if !options.mixed_reverts => {
                    debug!(%key, "edited block preserved");
                    outcome.conflicts.push(Conflict {
                        key,
                        kind: ConflictKind::EditedSinceGeneration,
                    });
                }
                Origin::Mixed | Origin::Generated => {
                    if block.content != content {
                        *block = Block::generated(key, suggestion.title.clone(), content);
                        outcome.updated += 1;
                    } else if block.origin == Origin::Mixed {
                        // Reverting to content that matches the suggestion.
                        block.origin = Origin::Generated;
                        block.generated_hash = content_hash(&block.content);
                        outcome.updated += 1;
                    }
                }
            },
            None => {
                document
                    .blocks
                    .push(Block::generated(key, suggestion.title.clone(), content));
                outcome.added += 1;
            }
        }
    }

    if set.authoritative {
        let before = document.blocks.len();
        document
            .blocks
            .retain(|b| b.origin != Origin::Generated || seen_keys.contains(&b.key));
        outcome.dropped = before - document.blocks.len();
    }

    outcome
}

/// Block content for a suggestion: a level-2 heading plus the body, with
/// any quoted delimiter text defused so comparisons against stored
/// blocks stay stable.
fn render_content(suggestion: &Suggestion) -> String {
    document::neutralize_markers(&format!(
        "## {}\n\n{}",
        suggestion.title.trim(),
        suggestion.body.trim()
    ))
}

#[cfg(test)]
mod tests {
    use docpilot_shared::DocumentKind;

    use super::*;

    fn suggestion(title: &str, body: &str, confidence: f64) -> Suggestion {
        Suggestion {
            title: title.into(),
            body: body.into(),
            confidence,
            source_files: vec![],
        }
    }

    fn set(kind: DocumentKind, authoritative: bool, items: Vec<Suggestion>) -> SuggestionSet {
        SuggestionSet {
            kind,
            authoritative,
            items,
        }
    }

    #[test]
    fn new_blocks_append_in_descending_confidence_order() {
        let mut doc = Document::new(DocumentKind::Tasks);
        let set = set(
            DocumentKind::Tasks,
            true,
            vec![
                suggestion("Low", "c", 0.3),
                suggestion("High", "a", 0.9),
                suggestion("Mid", "b", 0.6),
            ],
        );

        let outcome = merge(&mut doc, &set, MergeOptions::default());
        assert_eq!(outcome.added, 3);
        let keys: Vec<_> = doc.blocks.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["high", "mid", "low"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut doc = Document::new(DocumentKind::Faq);
        let set = set(
            DocumentKind::Faq,
            true,
            vec![suggestion("How do I build?", "Run cargo build.", 0.8)],
        );

        let first = merge(&mut doc, &set, MergeOptions::default());
        assert!(first.changed());
        let snapshot = doc.clone();

        let second = merge(&mut doc, &set, MergeOptions::default());
        assert!(!second.changed());
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn manual_block_is_never_overwritten() {
        let doc = Document::new(DocumentKind::Faq);
        // Simulate a hand-written answer occupying the same key.
        let text = format!(
            "{}\n<!-- docpilot:begin key=\"setup\" origin=\"manual\" hash=\"\" title=\"Setup\" -->\n## Setup\n\nMy own answer.\n<!-- docpilot:end -->\n",
            doc.preamble
        );
        let mut doc = Document::parse(DocumentKind::Faq, &text).expect("parse");

        let set = set(
            DocumentKind::Faq,
            true,
            vec![suggestion("Setup", "Generated answer.", 0.9)],
        );
        let outcome = merge(&mut doc, &set, MergeOptions::default());

        assert_eq!(outcome.added + outcome.updated, 0);
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].kind, ConflictKind::ManualOverrideSkipped);
        assert!(doc.blocks[0].content.contains("My own answer."));
        assert_eq!(doc.blocks[0].origin, Origin::Manual);
    }

    #[test]
    fn mixed_block_is_sticky_by_default() {
        let mut doc = Document::new(DocumentKind::Tasks);
        merge(
            &mut doc,
            &set(
                DocumentKind::Tasks,
                true,
                vec![suggestion("Build", "Run cargo build.", 0.8)],
            ),
            MergeOptions::default(),
        );

        // Human edit, detected on reload.
        let edited = doc.serialize().replace("Run cargo build.", "Run my wrapper script.");
        let mut doc = Document::parse(DocumentKind::Tasks, &edited).expect("parse");
        assert_eq!(doc.blocks[0].origin, Origin::Mixed);

        let regen = set(
            DocumentKind::Tasks,
            true,
            vec![suggestion("Build", "Run cargo build --release.", 0.9)],
        );
        let outcome = merge(&mut doc, &regen, MergeOptions::default());

        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].kind, ConflictKind::EditedSinceGeneration);
        assert!(doc.blocks[0].content.contains("Run my wrapper script."));
        assert_eq!(doc.blocks[0].origin, Origin::Mixed);
    }

    #[test]
    fn mixed_reverts_option_overwrites_edits() {
        let mut doc = Document::new(DocumentKind::Tasks);
        merge(
            &mut doc,
            &set(
                DocumentKind::Tasks,
                true,
                vec![suggestion("Build", "Run cargo build.", 0.8)],
            ),
            MergeOptions::default(),
        );
        let edited = doc.serialize().replace("Run cargo build.", "Edited.");
        let mut doc = Document::parse(DocumentKind::Tasks, &edited).expect("parse");

        let regen = set(
            DocumentKind::Tasks,
            true,
            vec![suggestion("Build", "Run cargo build --release.", 0.9)],
        );
        let outcome = merge(&mut doc, &regen, MergeOptions { mixed_reverts: true });

        assert_eq!(outcome.updated, 1);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(doc.blocks[0].origin, Origin::Generated);
        assert!(doc.blocks[0].content.contains("--release"));
    }

    #[test]
    fn authoritative_set_drops_stale_generated_blocks_only() {
        let mut doc = Document::new(DocumentKind::Faq);
        merge(
            &mut doc,
            &set(
                DocumentKind::Faq,
                true,
                vec![
                    suggestion("Old question?", "Old answer.", 0.8),
                    suggestion("Kept question?", "Kept answer.", 0.7),
                ],
            ),
            MergeOptions::default(),
        );

        // Human edits the old answer, making that block mixed.
        let edited = doc.serialize().replace("Old answer.", "My amended answer.");
        let mut doc = Document::parse(DocumentKind::Faq, &edited).expect("parse");

        let regen = set(
            DocumentKind::Faq,
            true,
            vec![suggestion("Kept question?", "Kept answer.", 0.7)],
        );
        let outcome = merge(&mut doc, &regen, MergeOptions::default());

        // The mixed block survives the authoritative drop.
        assert_eq!(outcome.dropped, 0);
        let keys: Vec<_> = doc.blocks.iter().map(|b| b.key.as_str()).collect();
        assert!(keys.contains(&"old-question"));
        assert!(keys.contains(&"kept-question"));
    }

    #[test]
    fn authoritative_set_drops_untouched_stale_blocks() {
        let mut doc = Document::new(DocumentKind::Faq);
        merge(
            &mut doc,
            &set(
                DocumentKind::Faq,
                true,
                vec![
                    suggestion("Stale?", "Gone soon.", 0.8),
                    suggestion("Fresh?", "Stays.", 0.7),
                ],
            ),
            MergeOptions::default(),
        );

        let regen = set(
            DocumentKind::Faq,
            true,
            vec![suggestion("Fresh?", "Stays.", 0.7)],
        );
        let outcome = merge(&mut doc, &regen, MergeOptions::default());

        assert_eq!(outcome.dropped, 1);
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].key, "fresh");
    }

    #[test]
    fn non_authoritative_set_keeps_unrelated_generated_blocks() {
        let mut doc = Document::new(DocumentKind::Tasks);
        merge(
            &mut doc,
            &set(
                DocumentKind::Tasks,
                true,
                vec![suggestion("Existing task", "Body.", 0.8)],
            ),
            MergeOptions::default(),
        );

        let delta = set(
            DocumentKind::Tasks,
            false,
            vec![suggestion("New feature task", "Body.", 0.9)],
        );
        let outcome = merge(&mut doc, &delta, MergeOptions::default());

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.dropped, 0);
        assert_eq!(doc.blocks.len(), 2);
    }

    #[test]
    fn duplicate_titles_keep_highest_confidence() {
        let mut doc = Document::new(DocumentKind::Tasks);
        let set = set(
            DocumentKind::Tasks,
            true,
            vec![
                suggestion("Build", "Weak body.", 0.4),
                suggestion("Build", "Strong body.", 0.9),
            ],
        );
        let outcome = merge(&mut doc, &set, MergeOptions::default());

        assert_eq!(outcome.added, 1);
        assert!(doc.blocks[0].content.contains("Strong body."));
    }

    #[test]
    fn suggestion_quoting_delimiters_merges_idempotently() {
        let mut doc = Document::new(DocumentKind::Faq);
        let set = set(
            DocumentKind::Faq,
            true,
            vec![suggestion(
                "How are artifacts structured?",
                "Sections are wrapped in comments:\n\n\
<!-- docpilot:begin key=\"a\" origin=\"generated\" hash=\"\" title=\"A\" -->\n\
<!-- docpilot:end -->",
                0.9,
            )],
        );

        let first = merge(&mut doc, &set, MergeOptions::default());
        assert_eq!(first.added, 1);

        // The written file parses back as a single untouched block.
        let mut doc = Document::parse(DocumentKind::Faq, &doc.serialize()).expect("reparse");
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].origin, Origin::Generated);

        let second = merge(&mut doc, &set, MergeOptions::default());
        assert!(!second.changed());
    }

    #[test]
    fn preamble_untouched_by_merge() {
        let mut doc = Document::new(DocumentKind::QuickStart);
        doc.preamble = "# Quick Start\n\nCustom intro paragraph.".into();
        merge(
            &mut doc,
            &set(
                DocumentKind::QuickStart,
                true,
                vec![suggestion("Setup", "1. Clone the repo", 1.0)],
            ),
            MergeOptions::default(),
        );
        assert_eq!(doc.preamble, "# Quick Start\n\nCustom intro paragraph.");
    }
}
