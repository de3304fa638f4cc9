//! Local document library
//!
//! The library is an insertion-ordered set of documents keyed by `id`.
//!
//! ## Layers
//!
//! - Pure transforms (`search`, `insert`, `update`, `delete`, `upsert`) take a
//!   record set and return a new one. They hold all the rules.
//! - `LibraryStore` owns the current record set and applies one transform per
//!   call under a single lock, so readers never see a half-applied mutation.
//!
//! ## Usage
//!
//! ```ignore
//! let store = LibraryStore::new();
//! store.insert(doc)?;
//! let hits = store.search("api");
//! store.delete("doc-1"); // absent ids are a no-op
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::error::LibraryError;
use crate::models::{DocType, Document, DocumentPatch};

/// Case-insensitive substring match over title, content and creator
///
/// An empty query returns every record. Input order is preserved.
pub fn search(records: &[Document], query: &str) -> Vec<Document> {
    if query.is_empty() {
        return records.to_vec();
    }

    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|doc| matches_query(doc, &needle))
        .cloned()
        .collect()
}

fn matches_query(doc: &Document, needle: &str) -> bool {
    [&doc.title, &doc.content, &doc.creator]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Append a record; its id must not be present yet
pub fn insert(mut records: Vec<Document>, doc: Document) -> Result<Vec<Document>, LibraryError> {
    if position(&records, &doc.id).is_some() {
        return Err(LibraryError::DuplicateId(doc.id));
    }
    records.push(doc);
    Ok(records)
}

/// Merge a patch over the record at `id`, keeping its id and position
pub fn update(
    mut records: Vec<Document>,
    id: &str,
    patch: DocumentPatch,
) -> Result<Vec<Document>, LibraryError> {
    let index = position(&records, id).ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
    records[index].apply(patch);
    Ok(records)
}

/// Remove the record at `id`; an absent id leaves the set unchanged
pub fn delete(mut records: Vec<Document>, id: &str) -> Vec<Document> {
    records.retain(|doc| doc.id != id);
    records
}

/// Insert, or overwrite in place when the id already exists
pub fn upsert(mut records: Vec<Document>, doc: Document) -> Vec<Document> {
    match position(&records, &doc.id) {
        Some(index) => records[index] = doc,
        None => records.push(doc),
    }
    records
}

fn position(records: &[Document], id: &str) -> Option<usize> {
    records.iter().position(|doc| doc.id == id)
}

/// Owner of the locally retained documents
///
/// All mutation goes through this type. Reads return snapshots.
#[derive(Debug, Default)]
pub struct LibraryStore {
    records: RwLock<Vec<Document>>,
}

impl LibraryStore {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library from existing records
    ///
    /// Fails on the first duplicate id.
    pub fn from_records(records: Vec<Document>) -> Result<Self, LibraryError> {
        let records = records.into_iter().try_fold(Vec::new(), insert)?;
        Ok(Self {
            records: RwLock::new(records),
        })
    }

    /// Load a library snapshot from a JSON file
    ///
    /// A missing file yields an empty library.
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No library snapshot at {:?}", path);
            return Ok(Self::new());
        }

        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read library snapshot: {:?}", path))?;
        let records: Vec<Document> = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse library snapshot: {:?}", path))?;
        let store = Self::from_records(records).context("Library snapshot has duplicate ids")?;
        info!("Loaded {} documents from {:?}", store.len(), path);
        Ok(store)
    }

    /// Write the current records to a JSON file
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let json =
            serde_json::to_string_pretty(&*self.read()).context("Failed to serialize library")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write library snapshot: {:?}", path))?;
        Ok(())
    }

    // ==================== Reads ====================

    /// Copy of all records in insertion order
    pub fn snapshot(&self) -> Vec<Document> {
        self.read().clone()
    }

    /// Filter records by query (see [`search`])
    pub fn search(&self, query: &str) -> Vec<Document> {
        search(&self.read(), query)
    }

    /// Get a record by id
    pub fn get(&self, id: &str) -> Option<Document> {
        self.read().iter().find(|doc| doc.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().iter().any(|doc| doc.id == id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Records of a single type, in insertion order
    pub fn filter_by_type(&self, doc_type: DocType) -> Vec<Document> {
        self.read()
            .iter()
            .filter(|doc| doc.doc_type == doc_type)
            .cloned()
            .collect()
    }

    /// All distinct tags, sorted
    pub fn all_tags(&self) -> Vec<String> {
        self.read()
            .iter()
            .flat_map(|doc| doc.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    // ==================== Mutations ====================

    /// Add a new record
    pub fn insert(&self, doc: Document) -> Result<(), LibraryError> {
        let id = doc.id.clone();
        self.mutate(|records| insert(records, doc))?;
        info!("Added document {} to library", id);
        Ok(())
    }

    /// Patch an existing record and return its new state
    pub fn update(&self, id: &str, patch: DocumentPatch) -> Result<Document, LibraryError> {
        let mut guard = self.write();
        let next = update(guard.clone(), id, patch)?;
        *guard = next;
        debug!("Updated document {}", id);
        guard
            .iter()
            .find(|doc| doc.id == id)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))
    }

    /// Patch a record only while `still_matches` holds for it
    ///
    /// Returns `Ok(None)` and leaves the record untouched when the check
    /// fails. The check and the write happen under one lock.
    pub fn update_if<F>(
        &self,
        id: &str,
        patch: DocumentPatch,
        still_matches: F,
    ) -> Result<Option<Document>, LibraryError>
    where
        F: FnOnce(&Document) -> bool,
    {
        let mut guard = self.write();
        let index = position(&guard, id).ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
        if !still_matches(&guard[index]) {
            debug!("Skipped update of {}: record changed", id);
            return Ok(None);
        }
        guard[index].apply(patch);
        debug!("Updated document {}", id);
        Ok(Some(guard[index].clone()))
    }

    /// Insert or overwrite, returning true when a record was replaced
    pub fn upsert(&self, doc: Document) -> bool {
        let id = doc.id.clone();
        let mut guard = self.write();
        let replaced = position(&guard, &id).is_some();
        let records = std::mem::take(&mut *guard);
        *guard = upsert(records, doc);
        debug!("Upserted document {} (replaced={})", id, replaced);
        replaced
    }

    /// Remove a record; returns whether anything was removed
    pub fn delete(&self, id: &str) -> bool {
        let mut guard = self.write();
        let before = guard.len();
        let records = std::mem::take(&mut *guard);
        *guard = delete(records, id);
        let removed = guard.len() < before;
        if removed {
            info!("Deleted document {} from library", id);
        } else {
            debug!("Delete of absent document {} ignored", id);
        }
        removed
    }

    /// Apply a fallible transform atomically; on error the set is unchanged
    fn mutate<F>(&self, transform: F) -> Result<(), LibraryError>
    where
        F: FnOnce(Vec<Document>) -> Result<Vec<Document>, LibraryError>,
    {
        let mut guard = self.write();
        let next = transform(guard.clone())?;
        *guard = next;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Document>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Document>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}
