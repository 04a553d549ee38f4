//! Block-structured markdown documents.
//!
//! Generated artifacts are markdown files whose sections are wrapped in
//! HTML-comment delimiters carrying a key, an origin, and the content
//! hash recorded at generation time:
//!
//! ```text
//! <!-- docpilot:begin key="set-up" origin="generated" hash="ab12…" title="Set up" -->
//! ## Set up
//! ...
//! <!-- docpilot:end -->
//! ```
//!
//! Text before the first block is the preamble and survives every merge
//! untouched. Freeform text between blocks (a human writing outside the
//! delimiters) is captured as `manual` blocks on load, so the merge
//! engine never deletes it.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;

use docpilot_shared::{DocPilotError, DocumentKind, Result};

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// Who owns a block's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Written by the pipeline and untouched since.
    Generated,
    /// Written by a human, never by the pipeline.
    Manual,
    /// Generated, then edited by a human. Sticky: stays mixed across
    /// regenerations unless the revert option is enabled.
    Mixed,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Manual => "manual",
            Self::Mixed => "mixed",
        }
    }
}

impl std::str::FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "generated" => Ok(Self::Generated),
            "manual" => Ok(Self::Manual),
            "mixed" => Ok(Self::Mixed),
            other => Err(format!("unknown block origin: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Block and document
// ---------------------------------------------------------------------------

/// One delimited section of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Slug key derived from the title; unique within a document.
    pub key: String,
    pub title: String,
    pub origin: Origin,
    /// Markdown between the delimiters, without surrounding blank lines.
    pub content: String,
    /// Hash of the content as generated. Empty for manual blocks.
    pub generated_hash: String,
}

impl Block {
    /// A freshly generated block with its hash recorded. Delimiter text
    /// quoted inside the content is defused first, so the hash always
    /// matches what `parse` reads back.
    pub fn generated(key: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let content = neutralize_markers(&content.into());
        let generated_hash = content_hash(&content);
        Self {
            key: key.into(),
            title: title.into(),
            origin: Origin::Generated,
            content,
            generated_hash,
        }
    }

    fn manual(key: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            origin: Origin::Manual,
            content: content.into(),
            generated_hash: String::new(),
        }
    }
}

/// A parsed artifact document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub kind: DocumentKind,
    /// Everything before the first block. Never touched by merges.
    pub preamble: String,
    pub blocks: Vec<Block>,
}

impl Document {
    /// A fresh document with the default title heading as preamble.
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            preamble: format!("# {}", kind.default_title()),
            blocks: Vec::new(),
        }
    }

    pub fn block(&self, key: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.key == key)
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    /// Parse document text.
    ///
    /// A `generated` block whose content no longer matches its recorded
    /// hash is reclassified as `mixed` here, so human edits are detected
    /// the moment the file is read back.
    pub fn parse(kind: DocumentKind, text: &str) -> Result<Self> {
        let begin = begin_marker_regex();
        let mut preamble = String::new();
        let mut blocks: Vec<Block> = Vec::new();
        let mut freeform: Vec<&str> = Vec::new();
        let mut current: Option<(Block, Vec<&str>)> = None;

        for line in text.lines() {
            if let Some(caps) = begin.captures(line.trim_end()) {
                if current.is_some() {
                    return Err(DocPilotError::DocumentFormat(
                        "nested begin marker without a closing end marker".into(),
                    ));
                }
                flush_freeform(&mut freeform, &mut preamble, &mut blocks);
                let block = Block {
                    key: caps["key"].to_string(),
                    title: unescape_attr(&caps["title"]),
                    origin: caps["origin"]
                        .parse()
                        .map_err(DocPilotError::DocumentFormat)?,
                    content: String::new(),
                    generated_hash: caps["hash"].to_string(),
                };
                current = Some((block, Vec::new()));
            } else if line.trim_end() == END_MARKER {
                let Some((mut block, lines)) = current.take() else {
                    return Err(DocPilotError::DocumentFormat(
                        "end marker without a matching begin marker".into(),
                    ));
                };
                block.content = lines.join("\n").trim_matches('\n').to_string();
                if block.origin == Origin::Generated
                    && content_hash(&block.content) != block.generated_hash
                {
                    debug!(key = %block.key, "content diverged from recorded hash, marking mixed");
                    block.origin = Origin::Mixed;
                }
                blocks.push(block);
            } else if let Some((_, lines)) = current.as_mut() {
                lines.push(line);
            } else {
                freeform.push(line);
            }
        }

        if current.is_some() {
            return Err(DocPilotError::DocumentFormat(
                "unterminated block at end of document".into(),
            ));
        }
        flush_freeform(&mut freeform, &mut preamble, &mut blocks);

        Ok(Self {
            kind,
            preamble,
            blocks,
        })
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Serialize back to markdown. Output is deterministic for a given
    /// document value.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        if !self.preamble.is_empty() {
            out.push_str(self.preamble.trim_end());
            out.push('\n');
        }
        for block in &self.blocks {
            out.push('\n');
            out.push_str(&format!(
                "<!-- docpilot:begin key=\"{}\" origin=\"{}\" hash=\"{}\" title=\"{}\" -->\n",
                block.key,
                block.origin.as_str(),
                block.generated_hash,
                escape_attr(&block.title),
            ));
            out.push_str(&block.content);
            out.push('\n');
            out.push_str(END_MARKER);
            out.push('\n');
        }
        out
    }

    // -----------------------------------------------------------------------
    // Filesystem
    // -----------------------------------------------------------------------

    /// Load a document from disk. `Ok(None)` when the file does not exist.
    pub fn load(kind: DocumentKind, path: &Path) -> Result<Option<Self>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DocPilotError::io(path, e)),
        };
        Self::parse(kind, &text).map(Some)
    }

    /// Write the document atomically: serialize to a sibling temp file,
    /// then rename over the target.
    pub fn store(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocPilotError::io(parent, e))?;
        }
        let tmp = path.with_extension("md.tmp");
        std::fs::write(&tmp, self.serialize()).map_err(|e| DocPilotError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| DocPilotError::io(path, e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const END_MARKER: &str = "<!-- docpilot:end -->";

fn begin_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^<!-- docpilot:begin key="(?P<key>[^"]*)" origin="(?P<origin>[^"]*)" hash="(?P<hash>[^"]*)" title="(?P<title>[^"]*)" -->$"#,
        )
        .unwrap()
    })
}

/// Hex SHA-256 of block content.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Derive a stable slug key from a block title.
pub fn block_key(title: &str) -> String {
    let mut key = String::with_capacity(title.len());
    let mut prev_dash = true;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            key.extend(ch.to_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            key.push('-');
            prev_dash = true;
        }
    }
    while key.ends_with('-') {
        key.pop();
    }
    key.truncate(64);
    if key.is_empty() {
        key.push_str("untitled");
    }
    key
}

/// Rewrite delimiter text quoted inside block content to a harmless
/// form. A literal marker line in a body would terminate the block early
/// on reparse. Idempotent: the rewritten text no longer contains the
/// marker prefix.
pub(crate) fn neutralize_markers(content: &str) -> String {
    content.replace("<!-- docpilot:", "<!-- docpilot&#58;")
}

fn escape_attr(value: &str) -> String {
    value.replace('"', "&quot;")
}

fn unescape_attr(value: &str) -> String {
    value.replace("&quot;", "\"")
}

/// Turn accumulated freeform lines into the preamble (before any block)
/// or a manual block (between blocks).
fn flush_freeform(freeform: &mut Vec<&str>, preamble: &mut String, blocks: &mut Vec<Block>) {
    let text = freeform.join("\n").trim_matches('\n').to_string();
    freeform.clear();
    if text.is_empty() {
        return;
    }
    if blocks.is_empty() && preamble.is_empty() {
        *preamble = text;
        return;
    }

    let title = text
        .lines()
        .find_map(|l| l.trim().strip_prefix('#').map(|h| h.trim_start_matches('#').trim()))
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "Note".to_string());
    let mut key = block_key(&title);
    if key == "untitled" || key == "note" {
        key = format!("note-{}", &content_hash(&text)[..8]);
    }
    blocks.push(Block::manual(key, title, text));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_slugs() {
        assert_eq!(block_key("Set up the environment"), "set-up-the-environment");
        assert_eq!(block_key("How do I run tests?"), "how-do-i-run-tests");
        assert_eq!(block_key("  !!  "), "untitled");
        assert_eq!(block_key("Crème Brûlée"), "crème-brûlée");
    }

    #[test]
    fn roundtrip_preserves_blocks() {
        let mut doc = Document::new(DocumentKind::Faq);
        doc.blocks.push(Block::generated(
            "how-do-i-build",
            "How do I build?",
            "## How do I build?\n\nRun `cargo build`.",
        ));

        let text = doc.serialize();
        let parsed = Document::parse(DocumentKind::Faq, &text).expect("parse");
        assert_eq!(parsed, doc);
    }

    #[test]
    fn edited_generated_block_becomes_mixed_on_load() {
        let mut doc = Document::new(DocumentKind::Tasks);
        doc.blocks
            .push(Block::generated("build", "Build", "## Build\n\nRun cargo build."));
        let mut text = doc.serialize();
        text = text.replace("Run cargo build.", "Run cargo build with my flags.");

        let parsed = Document::parse(DocumentKind::Tasks, &text).expect("parse");
        assert_eq!(parsed.blocks[0].origin, Origin::Mixed);
    }

    #[test]
    fn untouched_generated_block_stays_generated() {
        let mut doc = Document::new(DocumentKind::Tasks);
        doc.blocks
            .push(Block::generated("build", "Build", "## Build\n\nRun cargo build."));

        let parsed = Document::parse(DocumentKind::Tasks, &doc.serialize()).expect("parse");
        assert_eq!(parsed.blocks[0].origin, Origin::Generated);
    }

    #[test]
    fn freeform_between_blocks_becomes_manual_block() {
        let mut doc = Document::new(DocumentKind::Faq);
        doc.blocks
            .push(Block::generated("a", "A", "## A\n\nalpha"));
        let mut text = doc.serialize();
        text.push_str("\n## My own notes\n\nDo not lose this.\n");

        let parsed = Document::parse(DocumentKind::Faq, &text).expect("parse");
        assert_eq!(parsed.blocks.len(), 2);
        assert_eq!(parsed.blocks[1].origin, Origin::Manual);
        assert_eq!(parsed.blocks[1].key, "my-own-notes");
        assert!(parsed.blocks[1].content.contains("Do not lose this."));

        // Once serialized, the manual block is delimited and round-trips.
        let reparsed = Document::parse(DocumentKind::Faq, &parsed.serialize()).expect("reparse");
        assert_eq!(reparsed, parsed);
    }

    #[test]
    fn preamble_survives_roundtrip() {
        let text = "# Frequently Asked Questions\n\nHand-written intro.\n\n<!-- docpilot:begin key=\"a\" origin=\"manual\" hash=\"\" title=\"A\" -->\nbody\n<!-- docpilot:end -->\n";
        let doc = Document::parse(DocumentKind::Faq, text).expect("parse");
        assert_eq!(doc.preamble, "# Frequently Asked Questions\n\nHand-written intro.");
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let text = "<!-- docpilot:begin key=\"a\" origin=\"generated\" hash=\"x\" title=\"A\" -->\nbody\n";
        assert!(Document::parse(DocumentKind::Faq, text).is_err());
    }

    #[test]
    fn quoted_title_roundtrips() {
        let mut doc = Document::new(DocumentKind::Faq);
        doc.blocks.push(Block::generated(
            "what-is-the-engine",
            "What is the \"engine\"?",
            "## What is the \"engine\"?\n\nThe merge engine.",
        ));
        let parsed = Document::parse(DocumentKind::Faq, &doc.serialize()).expect("parse");
        assert_eq!(parsed.blocks[0].title, "What is the \"engine\"?");
    }

    #[test]
    fn quoted_delimiters_in_content_round_trip() {
        let body = "Sections are wrapped like this:\n\n\
<!-- docpilot:begin key=\"x\" origin=\"generated\" hash=\"h\" title=\"X\" -->\n\
body\n\
<!-- docpilot:end -->\n\n\
and the wrapper is rewritten on regeneration.";
        let mut doc = Document::new(DocumentKind::Faq);
        doc.blocks
            .push(Block::generated("layout", "Layout", body));

        let parsed = Document::parse(DocumentKind::Faq, &doc.serialize()).expect("parse");
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].origin, Origin::Generated);
        assert_eq!(parsed, doc);
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("faq.md");
        assert!(Document::load(DocumentKind::Faq, &path).expect("load").is_none());
    }

    #[test]
    fn store_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/tasks.md");

        let mut doc = Document::new(DocumentKind::Tasks);
        doc.blocks
            .push(Block::generated("build", "Build", "## Build\n\nRun cargo build."));
        doc.store(&path).expect("store");

        let loaded = Document::load(DocumentKind::Tasks, &path)
            .expect("load")
            .expect("exists");
        assert_eq!(loaded, doc);
    }
}
