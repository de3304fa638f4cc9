//! Credential validity tracking
//!
//! `CredentialGate` owns an opaque credential string and its validity
//! status:
//!
//! ```text
//! idle ──validate──▶ validating ──▶ valid | invalid
//!                        ▲                 │
//!                        └────validate─────┘
//! ```
//!
//! Only `validate` moves the status. Each call takes a generation number
//! when it starts; when it settles, the result is applied only if no newer
//! call has started since, so the last issued validation wins.
//!
//! `save` replaces the value. The status falls back to `idle` unless the
//! saved value is the one that was last validated. Saving a different value
//! while a validation is in flight also drops that validation's result.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::CredentialError;
use crate::remote::CredentialValidator;

/// Validity of the current credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Idle,
    Validating,
    Valid,
    Invalid,
}

/// Snapshot of the gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialState {
    pub value: String,
    pub status: CredentialStatus,
}

/// Key/value persistence for the credential, at most one stored value
pub trait CredentialStore: Send + Sync {
    fn load_credential(&self) -> Result<Option<String>>;
    fn save_credential(&self, value: &str) -> Result<()>;
}

/// Credential kept in a single file
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load_credential(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let value = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credential file: {:?}", self.path))?;
        let value = value.trim_end_matches(['\r', '\n']);
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn save_credential(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        write_private(&self.path, value)
            .with_context(|| format!("Failed to write credential file: {:?}", self.path))?;
        Ok(())
    }
}

/// Write a file readable only by its owner
#[cfg(unix)]
fn write_private(path: &Path, value: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode only applies on create
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    file.write_all(value.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, value: &str) -> std::io::Result<()> {
    fs::write(path, value)
}

/// Credential kept in memory only
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load_credential(&self) -> Result<Option<String>> {
        Ok(self
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_credential(&self, value: &str) -> Result<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }
}

#[derive(Debug)]
struct GateState {
    value: String,
    status: CredentialStatus,
    /// Bumped by every validate call and by saves that supersede one
    generation: u64,
    /// Value being checked by the latest validate call
    in_flight: Option<String>,
    /// Value and outcome of the last applied validation
    last_validated: Option<(String, bool)>,
}

/// State machine around an opaque credential string
pub struct CredentialGate {
    state: Mutex<GateState>,
    validator: Arc<dyn CredentialValidator>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl CredentialGate {
    /// Create a gate holding an empty credential
    pub fn new(validator: Arc<dyn CredentialValidator>) -> Self {
        Self {
            state: Mutex::new(GateState {
                value: String::new(),
                status: CredentialStatus::Idle,
                generation: 0,
                in_flight: None,
                last_validated: None,
            }),
            validator,
            store: None,
        }
    }

    /// Create a gate that persists saved values
    pub fn with_store(validator: Arc<dyn CredentialValidator>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new(validator)
        }
    }

    /// Create a gate from the persisted value, with `idle` status
    pub fn restore(
        validator: Arc<dyn CredentialValidator>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let saved = store
            .load_credential()
            .context("Failed to load saved credential")?;
        let gate = Self::with_store(validator, store);
        if let Some(value) = saved {
            debug!("Restored saved credential");
            gate.lock().value = value;
        }
        Ok(gate)
    }

    /// Current value and status
    pub fn state(&self) -> CredentialState {
        let state = self.lock();
        CredentialState {
            value: state.value.clone(),
            status: state.status,
        }
    }

    pub fn status(&self) -> CredentialStatus {
        self.lock().status
    }

    pub fn is_valid(&self) -> bool {
        self.status() == CredentialStatus::Valid
    }

    /// Replace and persist the credential value
    ///
    /// The status is kept only when `value` is the last validated value;
    /// otherwise it returns to `idle`.
    pub fn save(&self, value: &str) -> Result<()> {
        if let Some(store) = &self.store {
            store
                .save_credential(value)
                .context("Failed to persist credential")?;
        }

        let mut state = self.lock();
        state.value = value.to_string();
        let keeps_in_flight = state.status == CredentialStatus::Validating
            && state.in_flight.as_deref() == Some(value);
        if !keeps_in_flight {
            if state.status == CredentialStatus::Validating {
                // the pending result belongs to another value
                state.generation += 1;
                state.in_flight = None;
                debug!("Save superseded validation in flight");
            }
            state.status = match &state.last_validated {
                Some((validated, ok)) if validated == value => status_for(*ok),
                _ => CredentialStatus::Idle,
            };
        }
        info!("Credential saved (status={:?})", state.status);
        Ok(())
    }

    /// Validate the currently held value
    pub async fn validate_current(&self) -> Result<bool, CredentialError> {
        let value = self.lock().value.clone();
        self.validate(&value).await
    }

    /// Validate a credential through the external validator
    ///
    /// Blank values are rejected without calling the validator. A failed
    /// call leaves the status `invalid` and returns the transport error.
    pub async fn validate(&self, value: &str) -> Result<bool, CredentialError> {
        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.status = CredentialStatus::Validating;
            state.in_flight = Some(value.to_string());
            state.generation
        };
        debug!("Validating credential (generation {})", generation);

        let outcome = if value.trim().is_empty() {
            Ok(false)
        } else {
            self.validator.validate_credential(value).await
        };

        let mut state = self.lock();
        let current = state.generation == generation;
        if current {
            state.in_flight = None;
        }
        match &outcome {
            Ok(ok) if current => {
                state.status = status_for(*ok);
                state.last_validated = Some((value.to_string(), *ok));
                info!("Credential validation finished: {:?}", state.status);
            }
            Err(e) if current => {
                state.status = CredentialStatus::Invalid;
                state.last_validated = None;
                warn!("Credential validation failed: {}", e);
            }
            _ => debug!(
                "Dropping stale validation result (generation {} < {})",
                generation, state.generation
            ),
        }

        outcome.map_err(CredentialError::ValidationTransport)
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn status_for(valid: bool) -> CredentialStatus {
    if valid {
        CredentialStatus::Valid
    } else {
        CredentialStatus::Invalid
    }
}
