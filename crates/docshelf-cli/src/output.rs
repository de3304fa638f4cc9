//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use docshelf_core::{
    CredentialState, Document, DocumentView, OutlineEntry, RemoteResult, RenderNode,
    RenderedView,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single document with its metadata
    pub fn print_document(&self, doc: &Document) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", doc.id);
                println!("Title:    {}", doc.title);
                println!("Type:     {}", doc.doc_type.label());
                if !doc.creator.is_empty() {
                    println!("Creator:  {}", doc.creator);
                }
                if let Some(ref url) = doc.source_url {
                    println!("Source:   {}", url);
                }
                if let Some(ref size) = doc.size_label {
                    println!("Size:     {}", size);
                }
                if !doc.tags.is_empty() {
                    println!("Tags:     {}", doc.tags.join(", "));
                }
                println!("Created:  {}", doc.create_time);
                println!("Updated:  {}", doc.update_time);
            }
            OutputFormat::Json => print_json(doc),
            OutputFormat::Quiet => println!("{}", doc.id),
        }
    }

    /// Print a list of library documents
    pub fn print_documents(&self, docs: &[Document]) {
        match self.format {
            OutputFormat::Human => {
                if docs.is_empty() {
                    println!("No documents found.");
                    return;
                }
                for doc in docs {
                    println!(
                        "{} | {:<8} | {} | {}",
                        truncate(&doc.id, 12),
                        doc.doc_type.label(),
                        truncate(&doc.title, 40),
                        doc.update_time
                    );
                }
                println!("\n{} document(s)", docs.len());
            }
            OutputFormat::Json => print_json(docs),
            OutputFormat::Quiet => {
                for doc in docs {
                    println!("{}", doc.id);
                }
            }
        }
    }

    /// Print remote search results
    pub fn print_remote_results(&self, results: &[RemoteResult]) {
        match self.format {
            OutputFormat::Human => {
                if results.is_empty() {
                    println!("No remote results.");
                    return;
                }
                for result in results {
                    println!(
                        "{} | {:<8} | {} | {}",
                        truncate(&result.id, 12),
                        result.doc_type.label(),
                        truncate(&result.title, 35),
                        truncate(&result.source_url, 40)
                    );
                }
                println!("\n{} result(s)", results.len());
            }
            OutputFormat::Json => print_json(results),
            OutputFormat::Quiet => {
                for result in results {
                    println!("{}", result.id);
                }
            }
        }
    }

    /// Print a rendered document
    pub fn print_view(&self, view: &DocumentView) {
        match self.format {
            OutputFormat::Human => match &view.view {
                RenderedView::Rich(nodes) => {
                    for node in nodes {
                        match node {
                            RenderNode::Heading {
                                level,
                                anchor_id,
                                text,
                            } => println!(
                                "{} {}  [{}]",
                                "#".repeat(usize::from(*level)),
                                text,
                                anchor_id
                            ),
                            RenderNode::ListItem { text } => println!("  • {}", text),
                            RenderNode::Paragraph { text } => println!("{}", text),
                            RenderNode::LineBreak => println!(),
                        }
                    }
                }
                RenderedView::Source(source) => println!("{}", source),
                RenderedView::Plain(lines) => {
                    for line in lines {
                        println!("{}", line);
                    }
                }
            },
            OutputFormat::Json => print_json(view),
            OutputFormat::Quiet => println!("{}", view.document_id),
        }
    }

    /// Print a document outline
    pub fn print_outline(&self, outline: &[OutlineEntry]) {
        match self.format {
            OutputFormat::Human => {
                if outline.is_empty() {
                    println!("No headings.");
                    return;
                }
                for entry in outline {
                    let indent = "  ".repeat(usize::from(entry.level.saturating_sub(1)));
                    println!("{}{}  ({})", indent, entry.text, entry.anchor_id);
                }
            }
            OutputFormat::Json => print_json(outline),
            OutputFormat::Quiet => {
                for entry in outline {
                    println!("{}", entry.anchor_id);
                }
            }
        }
    }

    /// Print the credential status, never the full value
    pub fn print_credential(&self, state: &CredentialState) {
        let masked = mask(&state.value);
        match self.format {
            OutputFormat::Human => {
                println!("Credential: {}", masked);
                println!("Status:     {:?}", state.status);
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"credential": masked, "status": state.status})
                );
            }
            OutputFormat::Quiet => {
                println!("{}", serde_json::json!(state.status).as_str().unwrap_or(""));
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Show the first four characters of a credential
fn mask(value: &str) -> String {
    if value.is_empty() {
        return "(not set)".to_string();
    }
    let prefix: String = value.chars().take(4).collect();
    format!("{}****", prefix)
}
