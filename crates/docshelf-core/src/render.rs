//! View rendering
//!
//! A document is shown in one of three modes:
//!
//! - **rich**: structural nodes built from parsed blocks
//! - **source**: the raw content, verbatim
//! - **plain**: one line of text per source line with markup stripped
//!
//! Rendering is pure. `RenderCache` memoizes results per content and mode.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::content::{self, ContentBlock};
use crate::models::Document;
use crate::outline::{extract_outline, OutlineEntry};

static HEADING_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#+\s+").expect("static heading pattern")
});

static BOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*(.+?)\*\*").expect("static bold pattern")
});

/// Requested representation of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Rich,
    Source,
    Plain,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::Rich => "rich",
            ViewMode::Source => "source",
            ViewMode::Plain => "plain",
        })
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rich" => Ok(ViewMode::Rich),
            "source" => Ok(ViewMode::Source),
            "plain" => Ok(ViewMode::Plain),
            other => Err(format!("unknown view mode: '{}'", other)),
        }
    }
}

/// Structural node of the rich view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum RenderNode {
    Heading {
        level: u8,
        anchor_id: String,
        text: String,
    },
    ListItem {
        text: String,
    },
    Paragraph {
        text: String,
    },
    LineBreak,
}

/// Output of a render call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "body", rename_all = "lowercase")]
pub enum RenderedView {
    Rich(Vec<RenderNode>),
    /// Preformatted raw content
    Source(String),
    Plain(Vec<String>),
}

impl RenderedView {
    pub fn mode(&self) -> ViewMode {
        match self {
            RenderedView::Rich(_) => ViewMode::Rich,
            RenderedView::Source(_) => ViewMode::Source,
            RenderedView::Plain(_) => ViewMode::Plain,
        }
    }
}

/// Render content in the requested mode
pub fn render(content: &str, mode: ViewMode) -> RenderedView {
    match mode {
        ViewMode::Rich => RenderedView::Rich(rich_nodes(&content::parse(content))),
        ViewMode::Source => RenderedView::Source(content.to_string()),
        ViewMode::Plain => RenderedView::Plain(plain_lines(content)),
    }
}

/// Map parsed blocks to rich nodes
///
/// Fence markers produce no node. Bold markers are passed through.
pub fn rich_nodes(blocks: &[ContentBlock]) -> Vec<RenderNode> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Heading {
                level,
                text,
                source_line,
            } => Some(RenderNode::Heading {
                level: *level,
                anchor_id: content::anchor_for_line(*source_line),
                text: text.clone(),
            }),
            ContentBlock::ListItem { text } => Some(RenderNode::ListItem { text: text.clone() }),
            ContentBlock::Paragraph { text } => Some(RenderNode::Paragraph { text: text.clone() }),
            ContentBlock::Blank => Some(RenderNode::LineBreak),
            ContentBlock::CodeFenceMarker => None,
        })
        .collect()
}

/// Plain text, one output line per source line
pub fn plain_lines(content: &str) -> Vec<String> {
    content::lines(content).map(plain_line).collect()
}

fn plain_line(line: &str) -> String {
    let without_heading = HEADING_MARKER.replace(line, "");
    let text: &str = &without_heading;
    let text = text.strip_prefix("- ").unwrap_or(text);
    BOLD.replace_all(text, "$1").into_owned()
}

/// Everything a preview screen needs for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentView {
    pub document_id: String,
    pub view: RenderedView,
    pub outline: Vec<OutlineEntry>,
}

impl DocumentView {
    /// Render a document and derive its outline
    pub fn build(doc: &Document, mode: ViewMode) -> Self {
        Self {
            document_id: doc.id.clone(),
            view: render(&doc.content, mode),
            outline: extract_outline(&content::parse(&doc.content)),
        }
    }
}

/// Memo of rendered views keyed by content hash and mode
///
/// A hit is only served when the stored content equals the requested
/// content, so hash collisions never return a stale view.
#[derive(Debug)]
pub struct RenderCache {
    entries: HashMap<(u64, ViewMode), (String, RenderedView)>,
    capacity: usize,
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `capacity` views
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Return the cached view or render and remember it
    pub fn get_or_render(&mut self, content: &str, mode: ViewMode) -> RenderedView {
        let key = (content_hash(content), mode);
        if let Some((cached, view)) = self.entries.get(&key) {
            if cached == content {
                return view.clone();
            }
        }

        let view = render(content, mode);
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.entries.clear();
        }
        self.entries.insert(key, (content.to_string(), view.clone()));
        view
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn content_hash(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocType;

    const SAMPLE: &str = "Intro **bold**\n## Setup\n- step one\n```\nlet x = 1;\n```\n\n#### Notes";

    #[test]
    fn test_rich_nodes() {
        let RenderedView::Rich(nodes) = render(SAMPLE, ViewMode::Rich) else {
            panic!("expected rich view");
        };
        assert_eq!(
            nodes,
            vec![
                RenderNode::Paragraph {
                    text: "Intro **bold**".to_string()
                },
                RenderNode::Heading {
                    level: 2,
                    anchor_id: "heading-1".to_string(),
                    text: "Setup".to_string()
                },
                RenderNode::ListItem {
                    text: "step one".to_string()
                },
                RenderNode::Paragraph {
                    text: "let x = 1;".to_string()
                },
                RenderNode::LineBreak,
                RenderNode::Heading {
                    level: 4,
                    anchor_id: "heading-7".to_string(),
                    text: "Notes".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_source_is_verbatim() {
        for content in [SAMPLE, "", "a\r\nb\n", "\n\n"] {
            assert_eq!(
                render(content, ViewMode::Source),
                RenderedView::Source(content.to_string())
            );
        }
    }

    #[test]
    fn test_plain_list_items() {
        assert_eq!(
            render("- item1\n- item2", ViewMode::Plain),
            RenderedView::Plain(vec!["item1".to_string(), "item2".to_string()])
        );
    }

    #[test]
    fn test_plain_strips_markup() {
        let lines = plain_lines(SAMPLE);
        assert_eq!(lines[0], "Intro bold");
        assert_eq!(lines[1], "Setup");
        assert_eq!(lines[3], "```");
        assert_eq!(lines[6], "");
        assert_eq!(lines[7], "Notes");
        assert_eq!(lines.len(), SAMPLE.split('\n').count());
    }

    #[test]
    fn test_plain_single_hash_is_stripped() {
        // plain view strips any run of hashes, unlike the parser
        assert_eq!(plain_lines("# Title"), vec!["Title"]);
    }

    #[test]
    fn test_plain_unmatched_bold_is_kept() {
        assert_eq!(plain_lines("a ** b"), vec!["a ** b"]);
        assert_eq!(plain_lines("**a** and **b**"), vec!["a and b"]);
    }

    #[test]
    fn test_empty_content() {
        assert_eq!(
            render("", ViewMode::Rich),
            RenderedView::Rich(vec![RenderNode::LineBreak])
        );
        assert_eq!(
            render("", ViewMode::Plain),
            RenderedView::Plain(vec![String::new()])
        );
    }

    #[test]
    fn test_view_mode_parse() {
        assert_eq!("Plain".parse::<ViewMode>().unwrap(), ViewMode::Plain);
        assert!("html".parse::<ViewMode>().is_err());
        assert_eq!(ViewMode::Source.to_string(), "source");
    }

    #[test]
    fn test_document_view() {
        let doc = Document::new("1", "Guide", DocType::Doc).with_content(SAMPLE);
        let view = DocumentView::build(&doc, ViewMode::Plain);
        assert_eq!(view.document_id, "1");
        assert_eq!(view.view.mode(), ViewMode::Plain);
        assert_eq!(view.outline.len(), 2);
    }

    #[test]
    fn test_cache_hit_and_invalidation() {
        let mut cache = RenderCache::new();
        let first = cache.get_or_render("## A", ViewMode::Rich);
        let again = cache.get_or_render("## A", ViewMode::Rich);
        assert_eq!(first, again);
        assert_eq!(cache.len(), 1);

        let changed = cache.get_or_render("## B", ViewMode::Rich);
        assert_ne!(first, changed);

        let plain = cache.get_or_render("## A", ViewMode::Plain);
        assert_eq!(plain, RenderedView::Plain(vec!["A".to_string()]));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_cache_capacity() {
        let mut cache = RenderCache::with_capacity(2);
        cache.get_or_render("a", ViewMode::Source);
        cache.get_or_render("b", ViewMode::Source);
        cache.get_or_render("c", ViewMode::Source);
        assert!(cache.len() <= 2);
        assert_eq!(
            cache.get_or_render("a", ViewMode::Source),
            RenderedView::Source("a".to_string())
        );
    }

    mod properties {
        use super::super::*;
        use crate::content::strategies::arb_content;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn source_view_reproduces_content(content in arb_content()) {
                prop_assert_eq!(
                    render(&content, ViewMode::Source),
                    RenderedView::Source(content.clone())
                );
            }

            #[test]
            fn plain_view_keeps_one_line_per_source_line(content in arb_content()) {
                prop_assert_eq!(plain_lines(&content).len(), content.split('\n').count());
            }
        }
    }
}
