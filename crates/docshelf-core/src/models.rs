//! Data models for docshelf
//!
//! Defines the core data structures: Document, DocType, RemoteResult and
//! DocumentPatch. A `Document` held by the library is its locally retained
//! copy; a `RemoteResult` is a search hit that has not been promoted yet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed classification of a document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Doc,
    Wiki,
    Sheet,
}

impl DocType {
    /// All document types, in display order
    pub const ALL: [DocType; 3] = [DocType::Doc, DocType::Wiki, DocType::Sheet];

    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Doc => "doc",
            DocType::Wiki => "wiki",
            DocType::Sheet => "sheet",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            DocType::Doc => "Document",
            DocType::Wiki => "Wiki",
            DocType::Sheet => "Sheet",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known document type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document type: '{0}'")]
pub struct UnknownDocType(pub String);

impl FromStr for DocType {
    type Err = UnknownDocType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doc" => Ok(DocType::Doc),
            "wiki" => Ok(DocType::Wiki),
            "sheet" => Ok(DocType::Sheet),
            _ => Err(UnknownDocType(s.to_string())),
        }
    }
}

/// Type restriction for a remote search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocTypeFilter {
    /// Every type matches
    #[default]
    All,
    /// Only the given type matches
    Only(DocType),
}

impl DocTypeFilter {
    /// Check whether a type passes this filter
    pub fn matches(&self, doc_type: DocType) -> bool {
        match self {
            DocTypeFilter::All => true,
            DocTypeFilter::Only(t) => *t == doc_type,
        }
    }
}

impl fmt::Display for DocTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocTypeFilter::All => f.write_str("all"),
            DocTypeFilter::Only(t) => fmt::Display::fmt(t, f),
        }
    }
}

impl FromStr for DocTypeFilter {
    type Err = UnknownDocType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(DocTypeFilter::All);
        }
        s.parse().map(DocTypeFilter::Only)
    }
}

/// A title+content+metadata unit
///
/// The `id` is assigned once and never changes, including across a refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Opaque stable identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Raw markdown-like text, possibly empty
    #[serde(default)]
    pub content: String,
    /// Classification
    pub doc_type: DocType,
    /// Display metadata, kept as opaque strings
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub update_time: String,
    /// External reference for documents that came from a remote search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Opaque size string for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Document {
    /// Create a document with empty content and metadata
    pub fn new(id: impl Into<String>, title: impl Into<String>, doc_type: DocType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            doc_type,
            creator: String::new(),
            create_time: String::new(),
            update_time: String::new(),
            source_url: None,
            size_label: None,
            tags: Vec::new(),
        }
    }

    /// Builder-style content setter
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Builder-style creator setter
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Builder-style source reference setter
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Add a tag, ignoring duplicates
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Apply a patch over this document; `id` is never touched
    pub fn apply(&mut self, patch: DocumentPatch) {
        let DocumentPatch {
            title,
            content,
            doc_type,
            creator,
            create_time,
            update_time,
            source_url,
            size_label,
            tags,
        } = patch;

        if let Some(v) = title {
            self.title = v;
        }
        if let Some(v) = content {
            self.content = v;
        }
        if let Some(v) = doc_type {
            self.doc_type = v;
        }
        if let Some(v) = creator {
            self.creator = v;
        }
        if let Some(v) = create_time {
            self.create_time = v;
        }
        if let Some(v) = update_time {
            self.update_time = v;
        }
        if let Some(v) = source_url {
            self.source_url = v;
        }
        if let Some(v) = size_label {
            self.size_label = v;
        }
        if let Some(v) = tags {
            self.tags = v;
        }
    }
}

/// Partial update for a library record
///
/// `None` leaves the field as it is. Optional fields use a nested `Option`
/// so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub doc_type: Option<DocType>,
    pub creator: Option<String>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
    pub source_url: Option<Option<String>>,
    pub size_label: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl DocumentPatch {
    /// Patch that replaces content and stamps a new update time
    pub fn content(content: impl Into<String>, update_time: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            update_time: Some(update_time.into()),
            ..Self::default()
        }
    }
}

/// A search hit from the remote corpus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteResult {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub source_url: String,
    pub doc_type: DocType,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub update_time: String,
}

impl From<RemoteResult> for Document {
    fn from(result: RemoteResult) -> Self {
        Self {
            id: result.id,
            title: result.title,
            content: result.content,
            doc_type: result.doc_type,
            creator: result.creator,
            create_time: result.create_time,
            update_time: result.update_time,
            source_url: Some(result.source_url),
            size_label: None,
            tags: Vec::new(),
        }
    }
}
