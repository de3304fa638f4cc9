//! Docshelf Core Library
//!
//! This crate provides the core functionality for Docshelf, a personal
//! document library that mirrors documents found in a remote corpus.
//!
//! # Architecture
//!
//! - **Library**: the local collection of saved documents, held in memory
//!   and snapshotted to JSON
//! - **Content pipeline**: line-based classification of document text,
//!   outline extraction and three view modes
//! - **Sync**: remote search, promotion and refresh, with stale search
//!   results dropped by session token
//!
//! The network is never touched directly; remote search, fetch and
//! credential checks are collaborators behind the traits in [`remote`].
//!
//! # Quick Start
//!
//! ```text
//! let library = Arc::new(LibraryStore::load_json(&config.library_path())?);
//! let catalog = Arc::new(MemoryCatalog::load_json(&catalog_path)?);
//! let sync = SyncController::new(library, catalog.clone(), catalog);
//!
//! if let Some(hits) = sync.search_remote("deploy", "all").await?.applied() {
//!     sync.promote(hits[0].clone());
//! }
//! ```
//!
//! # Modules
//!
//! - `models`: Documents, document types and remote results
//! - `content`: Content block classification
//! - `outline`: Heading outline extraction
//! - `render`: Rich, source and plain views
//! - `library`: Local library operations and store
//! - `credential`: Credential gate and persistence
//! - `remote`: Collaborator traits and adapters
//! - `sync`: Search sessions, promotion and refresh
//! - `config`: Application configuration

pub mod config;
pub mod content;
pub mod credential;
pub mod error;
pub mod library;
pub mod models;
pub mod outline;
pub mod remote;
pub mod render;
pub mod sync;

pub use config::Config;
pub use content::ContentBlock;
pub use credential::{
    CredentialGate, CredentialState, CredentialStatus, CredentialStore, FileCredentialStore,
    MemoryCredentialStore,
};
pub use error::{CredentialError, LibraryError, RemoteError, SyncError};
pub use library::LibraryStore;
pub use models::{DocType, DocTypeFilter, Document, DocumentPatch, RemoteResult};
pub use outline::OutlineEntry;
pub use remote::{
    CredentialValidator, FetchKey, FetchProvider, FormatValidator, LatestContent, MemoryCatalog,
    SearchProvider, Timeout,
};
pub use render::{DocumentView, RenderCache, RenderNode, RenderedView, ViewMode};
pub use sync::{SearchOutcome, SearchState, SyncController, SyncEvent};
