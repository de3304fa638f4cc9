//! Heading outline for in-page navigation

use serde::Serialize;

use crate::content::{anchor_for_line, ContentBlock};

/// A navigable heading reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    pub anchor_id: String,
    pub text: String,
    pub level: u8,
}

/// Collect heading blocks in source order
pub fn extract_outline(blocks: &[ContentBlock]) -> Vec<OutlineEntry> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Heading {
                level,
                text,
                source_line,
            } => Some(OutlineEntry {
                anchor_id: anchor_for_line(*source_line),
                text: text.clone(),
                level: *level,
            }),
            _ => None,
        })
        .collect()
}
