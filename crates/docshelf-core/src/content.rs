//! Content parsing
//!
//! Turns a document's raw text into an ordered sequence of typed blocks.
//!
//! ## Rules
//!
//! Each line is classified on its own, first match wins:
//!
//! 1. `#### ` → heading level 4
//! 2. `### ` → heading level 3
//! 3. `## ` → heading level 2
//! 4. `- ` → list item
//! 5. line starting with a code fence → fence marker
//! 6. empty or whitespace-only → blank
//! 7. anything else → paragraph, raw line kept as is
//!
//! A single `#` is not a heading. Lines between fences are classified like
//! any other line; the fence marker itself carries no content.

use serde::Serialize;

/// Code fence delimiter
pub const FENCE: &str = "```";

/// Prefix of generated heading anchors
pub const ANCHOR_PREFIX: &str = "heading-";

const HEADING_RULES: [(&str, u8); 3] = [("#### ", 4), ("### ", 3), ("## ", 2)];

/// One classified line of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    Heading {
        level: u8,
        text: String,
        /// Zero-based line index in the source content
        source_line: usize,
    },
    ListItem {
        text: String,
    },
    CodeFenceMarker,
    Blank,
    Paragraph {
        text: String,
    },
}

impl ContentBlock {
    /// Anchor id for heading blocks
    pub fn anchor_id(&self) -> Option<String> {
        match self {
            ContentBlock::Heading { source_line, .. } => Some(anchor_for_line(*source_line)),
            _ => None,
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, ContentBlock::Heading { .. })
    }
}

/// Anchor id for the heading at `line`
pub fn anchor_for_line(line: usize) -> String {
    format!("{}{}", ANCHOR_PREFIX, line)
}

/// Split content into lines the same way for every view
///
/// Splits on `\n` only, so a trailing newline yields a final empty line.
/// A trailing `\r` is dropped from each line.
pub fn lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Parse content into blocks, one per line
pub fn parse(content: &str) -> Vec<ContentBlock> {
    lines(content)
        .enumerate()
        .map(|(index, line)| classify(index, line))
        .collect()
}

/// Classify a single line
pub fn classify(index: usize, line: &str) -> ContentBlock {
    for (prefix, level) in HEADING_RULES {
        if let Some(text) = line.strip_prefix(prefix) {
            return ContentBlock::Heading {
                level,
                text: text.to_string(),
                source_line: index,
            };
        }
    }

    if let Some(text) = line.strip_prefix("- ") {
        return ContentBlock::ListItem {
            text: text.to_string(),
        };
    }

    if line.starts_with(FENCE) {
        return ContentBlock::CodeFenceMarker;
    }

    if line.trim().is_empty() {
        return ContentBlock::Blank;
    }

    ContentBlock::Paragraph {
        text: line.to_string(),
    }
}
