//! Remote collaborators
//!
//! The core never talks to the network itself. It consumes three
//! collaborators through these traits:
//!
//! - [`SearchProvider`]: full-text search over the remote corpus
//! - [`FetchProvider`]: latest content for a document being refreshed
//! - [`CredentialValidator`]: checks a credential string
//!
//! [`MemoryCatalog`] serves a fixed set of results from memory and
//! [`Timeout`] bounds any collaborator with a deadline.

use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::models::{DocTypeFilter, RemoteResult};

/// Key used to fetch the latest version of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKey<'a> {
    /// Fetch by the record's source reference
    Url(&'a str),
    /// Fetch by document id when no source reference is known
    Id(&'a str),
}

impl FetchKey<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            FetchKey::Url(s) | FetchKey::Id(s) => s,
        }
    }
}

/// Latest content returned by a fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestContent {
    pub content: String,
    /// Update time reported by the remote side, informational only
    #[serde(default)]
    pub update_time: String,
}

/// Remote search collaborator
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        doc_type: DocTypeFilter,
    ) -> Result<Vec<RemoteResult>, RemoteError>;
}

/// Collaborator that fetches the latest content of a document
#[async_trait]
pub trait FetchProvider: Send + Sync {
    async fn fetch_latest(&self, key: FetchKey<'_>) -> Result<LatestContent, RemoteError>;
}

/// Collaborator that checks whether a credential is accepted
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate_credential(&self, value: &str) -> Result<bool, RemoteError>;
}

#[async_trait]
impl<T: SearchProvider + ?Sized> SearchProvider for Arc<T> {
    async fn search(
        &self,
        query: &str,
        doc_type: DocTypeFilter,
    ) -> Result<Vec<RemoteResult>, RemoteError> {
        (**self).search(query, doc_type).await
    }
}

#[async_trait]
impl<T: FetchProvider + ?Sized> FetchProvider for Arc<T> {
    async fn fetch_latest(&self, key: FetchKey<'_>) -> Result<LatestContent, RemoteError> {
        (**self).fetch_latest(key).await
    }
}

#[async_trait]
impl<T: CredentialValidator + ?Sized> CredentialValidator for Arc<T> {
    async fn validate_credential(&self, value: &str) -> Result<bool, RemoteError> {
        (**self).validate_credential(value).await
    }
}

/// Offline validator that only checks a credential's shape
///
/// Accepts a credential whose trimmed length exceeds `min_len` characters.
#[derive(Debug, Clone, Copy)]
pub struct FormatValidator {
    min_len: usize,
}

impl FormatValidator {
    pub const DEFAULT_MIN_LEN: usize = 10;

    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }
}

impl Default for FormatValidator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_LEN)
    }
}

#[async_trait]
impl CredentialValidator for FormatValidator {
    async fn validate_credential(&self, value: &str) -> Result<bool, RemoteError> {
        Ok(value.trim().chars().count() > self.min_len)
    }
}

/// In-memory remote corpus
///
/// Search matches the query case-insensitively against title and content
/// and keeps catalog order.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: RwLock<Vec<RemoteResult>>,
}

impl MemoryCatalog {
    pub fn new(entries: Vec<RemoteResult>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Load catalog entries from a JSON array file
    pub fn load_json(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog: {:?}", path))?;
        let entries: Vec<RemoteResult> = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse catalog: {:?}", path))?;
        debug!("Loaded {} catalog entries from {:?}", entries.len(), path);
        Ok(Self::new(entries))
    }

    /// Find an entry by id
    pub fn get(&self, id: &str) -> Option<RemoteResult> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Replace the remote content of an entry, as an upstream edit would
    pub fn set_content(&self, id: &str, content: impl Into<String>, update_time: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.content = content.into();
                entry.update_time = update_time.to_string();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SearchProvider for MemoryCatalog {
    async fn search(
        &self,
        query: &str,
        doc_type: DocTypeFilter,
    ) -> Result<Vec<RemoteResult>, RemoteError> {
        let needle = query.to_lowercase();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .filter(|e| doc_type.matches(e.doc_type))
            .filter(|e| {
                e.title.to_lowercase().contains(&needle)
                    || e.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FetchProvider for MemoryCatalog {
    async fn fetch_latest(&self, key: FetchKey<'_>) -> Result<LatestContent, RemoteError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .find(|e| match key {
                FetchKey::Url(url) => e.source_url == url,
                FetchKey::Id(id) => e.id == id,
            })
            .map(|e| LatestContent {
                content: e.content.clone(),
                update_time: e.update_time.clone(),
            })
            .ok_or_else(|| RemoteError::Missing(key.as_str().to_string()))
    }
}

/// Deadline adapter for any collaborator
///
/// A call that does not settle within the duration fails with
/// [`RemoteError::Timeout`].
#[derive(Debug, Clone)]
pub struct Timeout<R> {
    inner: R,
    duration: Duration,
}

impl<R> Timeout<R> {
    pub fn new(inner: R, duration: Duration) -> Self {
        Self { inner, duration }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: std::future::Future<Output = Result<T, RemoteError>>,
    {
        match tokio::time::timeout(self.duration, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Remote call exceeded {:?}", self.duration);
                Err(RemoteError::Timeout {
                    secs: self.duration.as_secs(),
                })
            }
        }
    }
}

#[async_trait]
impl<R: SearchProvider> SearchProvider for Timeout<R> {
    async fn search(
        &self,
        query: &str,
        doc_type: DocTypeFilter,
    ) -> Result<Vec<RemoteResult>, RemoteError> {
        self.bounded(self.inner.search(query, doc_type)).await
    }
}

#[async_trait]
impl<R: FetchProvider> FetchProvider for Timeout<R> {
    async fn fetch_latest(&self, key: FetchKey<'_>) -> Result<LatestContent, RemoteError> {
        self.bounded(self.inner.fetch_latest(key)).await
    }
}

#[async_trait]
impl<R: CredentialValidator> CredentialValidator for Timeout<R> {
    async fn validate_credential(&self, value: &str) -> Result<bool, RemoteError> {
        self.bounded(self.inner.validate_credential(value)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocType;

    fn entry(id: &str, title: &str, doc_type: DocType) -> RemoteResult {
        RemoteResult {
            id: id.to_string(),
            title: title.to_string(),
            content: format!("About {}", title),
            source_url: format!("https://example.com/{}", id),
            doc_type,
            creator: "team".to_string(),
            create_time: "2024-01-18".to_string(),
            update_time: "2024-01-23".to_string(),
        }
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new(vec![
            entry("search-1", "Deploy guide", DocType::Doc),
            entry("search-2", "Deploy FAQ", DocType::Wiki),
            entry("search-3", "Budget", DocType::Sheet),
        ])
    }

    struct Never;

    #[async_trait]
    impl SearchProvider for Never {
        async fn search(
            &self,
            _query: &str,
            _doc_type: DocTypeFilter,
        ) -> Result<Vec<RemoteResult>, RemoteError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_catalog_search_filters_type() {
        let catalog = catalog();
        let all = catalog.search("deploy", DocTypeFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "search-1");

        let wiki = catalog
            .search("DEPLOY", DocTypeFilter::Only(DocType::Wiki))
            .await
            .unwrap();
        assert_eq!(wiki.len(), 1);
        assert_eq!(wiki[0].id, "search-2");
    }

    #[tokio::test]
    async fn test_catalog_fetch_by_url_and_id() {
        let catalog = catalog();
        let by_url = catalog
            .fetch_latest(FetchKey::Url("https://example.com/search-3"))
            .await
            .unwrap();
        assert_eq!(by_url.content, "About Budget");

        assert!(catalog.set_content("search-3", "Q2 numbers", "2024-04-01"));
        let by_id = catalog.fetch_latest(FetchKey::Id("search-3")).await.unwrap();
        assert_eq!(by_id.content, "Q2 numbers");
        assert_eq!(by_id.update_time, "2024-04-01");

        let missing = catalog.fetch_latest(FetchKey::Id("nope")).await.unwrap_err();
        assert_eq!(missing, RemoteError::Missing("nope".to_string()));
    }

    #[tokio::test]
    async fn test_format_validator() {
        let validator = FormatValidator::default();
        assert!(!validator.validate_credential("short").await.unwrap());
        assert!(!validator.validate_credential("   0123456789   ").await.unwrap());
        assert!(validator.validate_credential("u-0123456789abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_timeout_adapter() {
        let bounded = Timeout::new(Never, Duration::from_millis(20));
        let err = bounded.search("x", DocTypeFilter::All).await.unwrap_err();
        assert!(matches!(err, RemoteError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_timeout_passes_through() {
        let bounded = Timeout::new(catalog(), Duration::from_secs(3));
        let hits = bounded.search("budget", DocTypeFilter::All).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_load_catalog_json() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");
        let json = serde_json::to_string(&vec![entry("a", "Alpha", DocType::Doc)]).unwrap();
        fs::write(&path, json).unwrap();

        let catalog = MemoryCatalog::load_json(&path).unwrap();
        assert_eq!(catalog.get("a").unwrap().title, "Alpha");
    }
}
