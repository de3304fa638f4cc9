//! Library synchronization
//!
//! Reconciles remote search results, the local library and the credential
//! status under asynchronous operations.
//!
//! ## Ordering
//!
//! Every remote search takes a session token when issued. When it settles,
//! its result is applied only if no newer search was issued in between;
//! otherwise it is dropped and reported as superseded.
//!
//! ## Usage
//!
//! ```ignore
//! let sync = SyncController::new(library, search, fetch);
//! if let SearchOutcome::Applied(hits) = sync.search_remote("deploy", "all").await? {
//!     sync.promote(hits[0].clone());
//! }
//! sync.refresh(&id).await?;
//! ```

mod controller;
mod session;

pub use controller::{SearchOutcome, SearchState, SyncController, SyncEvent};
pub use session::{SessionCounter, SessionToken};
