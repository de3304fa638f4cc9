//! Command handlers
//!
//! Every handler receives a [`Shelf`], which owns the loaded configuration
//! and library and builds the remote collaborators on demand.

pub mod config;
pub mod credential;
pub mod document;
pub mod remote;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use docshelf_core::{
    Config, CredentialGate, CredentialValidator, FetchProvider, FileCredentialStore,
    FormatValidator, LibraryStore, MemoryCatalog, SearchProvider, SyncController, Timeout,
};

/// Loaded configuration and library for one invocation
pub struct Shelf {
    pub config: Config,
    pub library: Arc<LibraryStore>,
    catalog_path: Option<PathBuf>,
}

impl Shelf {
    /// Load the library snapshot named by the configuration
    pub fn open(config: Config, catalog_path: Option<PathBuf>) -> Result<Self> {
        let library = LibraryStore::load_json(&config.library_path())?;
        Ok(Self {
            config,
            library: Arc::new(library),
            catalog_path,
        })
    }

    /// Write the library snapshot back to disk
    pub fn save(&self) -> Result<()> {
        self.config.ensure_data_dir()?;
        self.library
            .save_json(&self.config.library_path())
            .context("Failed to save library")
    }

    /// Credential gate restored from the saved credential
    pub fn credential_gate(&self) -> Result<Arc<CredentialGate>> {
        let validator: Arc<dyn CredentialValidator> = match self.config.request_timeout() {
            Some(limit) => Arc::new(Timeout::new(FormatValidator::default(), limit)),
            None => Arc::new(FormatValidator::default()),
        };
        let store = Arc::new(FileCredentialStore::new(self.config.credential_path()));
        Ok(Arc::new(CredentialGate::restore(validator, store)?))
    }

    /// Remote catalog given with --catalog
    pub fn catalog(&self) -> Result<Arc<MemoryCatalog>> {
        let Some(path) = &self.catalog_path else {
            bail!("No remote catalog. Pass --catalog FILE with a JSON array of results.");
        };
        Ok(Arc::new(MemoryCatalog::load_json(path)?))
    }

    /// Sync controller over the library and the remote catalog
    ///
    /// When the configuration requires a valid credential, the saved one
    /// is validated first and attached as the gate.
    pub async fn sync_controller(&self) -> Result<(SyncController, Arc<MemoryCatalog>)> {
        let catalog = self.catalog()?;
        let (search, fetch) = match self.config.request_timeout() {
            Some(limit) => {
                let bounded = Arc::new(Timeout::new(catalog.clone(), limit));
                (
                    bounded.clone() as Arc<dyn SearchProvider>,
                    bounded as Arc<dyn FetchProvider>,
                )
            }
            None => (
                catalog.clone() as Arc<dyn SearchProvider>,
                catalog.clone() as Arc<dyn FetchProvider>,
            ),
        };

        let mut sync = SyncController::new(self.library.clone(), search, fetch);
        if self.config.require_valid_credential {
            let gate = self.credential_gate()?;
            let valid = gate
                .validate_current()
                .await
                .context("Failed to validate saved credential")?;
            debug!("Saved credential valid: {}", valid);
            sync = sync.with_credential_gate(gate);
        }
        Ok((sync, catalog))
    }
}
