//! Library document command handlers

use anyhow::{anyhow, Result};

use docshelf_core::content;
use docshelf_core::outline::extract_outline;
use docshelf_core::{DocType, Document, DocumentView, ViewMode};

use super::Shelf;
use crate::output::{Output, OutputFormat};

/// List library documents, optionally of one type
pub fn list(shelf: &Shelf, doc_type: Option<DocType>, output: &Output) -> Result<()> {
    let docs = match doc_type {
        Some(t) => shelf.library.filter_by_type(t),
        None => shelf.library.snapshot(),
    };
    output.print_documents(&docs);
    Ok(())
}

/// Search the local library
pub fn search(shelf: &Shelf, query: String, output: &Output) -> Result<()> {
    output.print_documents(&shelf.library.search(&query));
    Ok(())
}

/// Show a document in the requested view mode
pub fn show(shelf: &Shelf, id: String, mode: ViewMode, output: &Output) -> Result<()> {
    let doc = get(shelf, &id)?;
    if output.format == OutputFormat::Human && mode == ViewMode::Rich {
        output.print_document(&doc);
        println!();
    }
    output.print_view(&DocumentView::build(&doc, mode));
    Ok(())
}

/// Show the heading outline of a document
pub fn outline(shelf: &Shelf, id: String, output: &Output) -> Result<()> {
    let doc = get(shelf, &id)?;
    output.print_outline(&extract_outline(&content::parse(&doc.content)));
    Ok(())
}

/// Remove a document from the library
pub fn delete(shelf: &Shelf, id: String, output: &Output) -> Result<()> {
    if shelf.library.delete(&id) {
        shelf.save()?;
        output.success(&format!("Deleted document: {}", id));
    } else {
        output.message(&format!("Not in library: {}", id));
    }
    Ok(())
}

fn get(shelf: &Shelf, id: &str) -> Result<Document> {
    shelf
        .library
        .get(id)
        .ok_or_else(|| anyhow!("Document not found: {}", id))
}
