//! Sync controller implementation
//!
//! Orchestrates remote search, promotion of results into the library,
//! refresh of local records and removal.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::session::{SessionCounter, SessionToken};
use crate::credential::CredentialGate;
use crate::error::{LibraryError, SyncError};
use crate::library::LibraryStore;
use crate::models::{DocTypeFilter, Document, DocumentPatch, RemoteResult, UnknownDocType};
use crate::remote::{FetchKey, FetchProvider, SearchProvider};

/// Format used to stamp refreshed records
const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Authoritative state of remote search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchState {
    /// Token of the latest issued search, 0 before the first one
    pub token: u64,
    pub query: String,
    /// Results of the latest search that settled successfully
    pub results: Vec<RemoteResult>,
    /// A search is in flight
    pub searching: bool,
}

/// What happened to a search once it settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// This search was the latest issued; its results are now current
    Applied(Vec<RemoteResult>),
    /// A newer search was issued first; the results were discarded
    Superseded(SessionToken),
}

impl SearchOutcome {
    /// Results if they were applied
    pub fn applied(self) -> Option<Vec<RemoteResult>> {
        match self {
            SearchOutcome::Applied(results) => Some(results),
            SearchOutcome::Superseded(_) => None,
        }
    }
}

/// Events emitted by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    SearchApplied { token: u64, count: usize },
    SearchDropped { token: u64 },
    Promoted { id: String, replaced: bool },
    Refreshed { id: String },
    Removed { id: String },
}

/// Coordinates the remote corpus with the local library
pub struct SyncController {
    library: Arc<LibraryStore>,
    search: Arc<dyn SearchProvider>,
    fetch: Arc<dyn FetchProvider>,
    /// When present, remote calls require a valid credential
    gate: Option<Arc<CredentialGate>>,
    sessions: SessionCounter,
    search_state: watch::Sender<SearchState>,
    /// Created by `take_events`; events are discarded until then
    event_tx: Option<mpsc::UnboundedSender<SyncEvent>>,
}

impl SyncController {
    /// Create a controller over a library and its remote collaborators
    pub fn new(
        library: Arc<LibraryStore>,
        search: Arc<dyn SearchProvider>,
        fetch: Arc<dyn FetchProvider>,
    ) -> Self {
        let (search_state, _) = watch::channel(SearchState::default());

        Self {
            library,
            search,
            fetch,
            gate: None,
            sessions: SessionCounter::new(),
            search_state,
            event_tx: None,
        }
    }

    /// Require a valid credential for remote calls
    pub fn with_credential_gate(mut self, gate: Arc<CredentialGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// The library this controller writes to
    pub fn library(&self) -> &Arc<LibraryStore> {
        &self.library
    }

    /// Current search state
    pub fn search_state(&self) -> SearchState {
        self.search_state.borrow().clone()
    }

    /// Subscribe to search state changes
    pub fn subscribe_search(&self) -> watch::Receiver<SearchState> {
        self.search_state.subscribe()
    }

    /// Take the event receiver (can only be called once)
    ///
    /// Only events emitted after this call are delivered.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SyncEvent>> {
        if self.event_tx.is_some() {
            return None;
        }
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_tx = Some(event_tx);
        Some(event_rx)
    }

    // ==================== Search ====================

    /// Search the remote corpus
    ///
    /// `doc_type` is `all` or a document type. A blank query is rejected
    /// without calling the collaborator. If another search is issued
    /// before this one settles, its result (or error) is discarded and
    /// `Superseded` is returned.
    pub async fn search_remote(
        &self,
        query: &str,
        doc_type: &str,
    ) -> Result<SearchOutcome, SyncError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SyncError::InvalidQuery("query is empty".to_string()));
        }
        let filter: DocTypeFilter = doc_type
            .parse()
            .map_err(|e: UnknownDocType| SyncError::InvalidQuery(e.to_string()))?;
        self.ensure_credential()?;

        let token = self.sessions.issue();
        self.search_state.send_modify(|state| {
            state.token = token.value();
            state.query = query.to_string();
            state.searching = true;
        });
        info!("Searching remote for '{}' ({}), session {}", query, filter, token.value());

        let result = self.search.search(query, filter).await;

        if !self.sessions.is_current(token) {
            debug!("Dropping result of superseded search session {}", token.value());
            self.emit(SyncEvent::SearchDropped {
                token: token.value(),
            });
            return Ok(SearchOutcome::Superseded(token));
        }

        match result {
            Ok(results) => {
                let count = results.len();
                self.search_state.send_modify(|state| {
                    state.results = results.clone();
                    state.searching = false;
                });
                info!("Search session {} returned {} results", token.value(), count);
                self.emit(SyncEvent::SearchApplied {
                    token: token.value(),
                    count,
                });
                Ok(SearchOutcome::Applied(results))
            }
            Err(e) => {
                self.search_state.send_modify(|state| {
                    state.results.clear();
                    state.searching = false;
                });
                warn!("Search session {} failed: {}", token.value(), e);
                Err(SyncError::Search(e))
            }
        }
    }

    /// Supersede any in-flight search so its result is discarded
    pub fn cancel_search(&self) {
        let token = self.sessions.issue();
        self.search_state.send_modify(|state| {
            state.token = token.value();
            state.searching = false;
        });
        debug!("Search cancelled, session now {}", token.value());
    }

    // ==================== Library ====================

    /// Copy a remote result into the library
    ///
    /// Promoting an id that is already present overwrites that record in
    /// place.
    pub fn promote(&self, result: RemoteResult) -> Document {
        let doc = Document::from(result);
        let replaced = self.library.upsert(doc.clone());
        info!("Promoted {} into library (replaced={})", doc.id, replaced);
        self.emit(SyncEvent::Promoted {
            id: doc.id.clone(),
            replaced,
        });
        doc
    }

    /// Replace a record's content with the latest remote version
    ///
    /// Fetches by the record's source reference, or by id when it has none.
    /// On fetch failure the record is left untouched. If the record's source
    /// changed while fetching (a newer promotion), nothing is written and
    /// `Replaced` is returned.
    pub async fn refresh(&self, id: &str) -> Result<Document, SyncError> {
        let record = self
            .library
            .get(id)
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
        self.ensure_credential()?;

        let key = match &record.source_url {
            Some(url) => FetchKey::Url(url),
            None => FetchKey::Id(&record.id),
        };
        debug!("Refreshing {} from {:?}", id, key);

        let latest = self
            .fetch
            .fetch_latest(key)
            .await
            .map_err(|source| SyncError::Fetch {
                id: id.to_string(),
                source,
            })?;
        debug!("Remote update time for {}: '{}'", id, latest.update_time);

        let stamp = Utc::now().format(UPDATE_TIME_FORMAT).to_string();
        let fetched_from = record.source_url.clone();
        let updated = self
            .library
            .update_if(id, DocumentPatch::content(latest.content, stamp), |current| {
                current.source_url == fetched_from
            })
            .map_err(|e| match e {
                LibraryError::NotFound(id) => SyncError::NotFound(id),
                other => SyncError::Library(other),
            })?
            .ok_or_else(|| {
                warn!("Discarding refresh of {}: source changed during fetch", id);
                SyncError::Replaced(id.to_string())
            })?;

        info!("Refreshed {}", id);
        self.emit(SyncEvent::Refreshed { id: id.to_string() });
        Ok(updated)
    }

    /// Refresh every record that came from the remote corpus
    ///
    /// Records are refreshed one at a time. Each outcome is reported; a
    /// failure does not stop the rest.
    pub async fn refresh_all(&self) -> Vec<(String, Result<Document, SyncError>)> {
        let ids: Vec<String> = self
            .library
            .snapshot()
            .into_iter()
            .filter(|doc| doc.source_url.is_some())
            .map(|doc| doc.id)
            .collect();

        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            let result = self.refresh(&id).await;
            outcomes.push((id, result));
        }
        outcomes
    }

    /// Remove a record; absent ids are a no-op
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.library.delete(id);
        if removed {
            self.emit(SyncEvent::Removed { id: id.to_string() });
        }
        removed
    }

    fn ensure_credential(&self) -> Result<(), SyncError> {
        match &self.gate {
            Some(gate) if !gate.is_valid() => Err(SyncError::CredentialNotValid),
            _ => Ok(()),
        }
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.event_tx {
            // receiver may have been dropped
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::models::DocType;
    use crate::remote::{FormatValidator, LatestContent, MemoryCatalog};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    type SearchReply = Result<Vec<RemoteResult>, RemoteError>;

    fn result(id: &str, title: &str) -> RemoteResult {
        RemoteResult {
            id: id.to_string(),
            title: title.to_string(),
            content: format!("## {}\nbody", title),
            source_url: format!("https://example.com/{}", id),
            doc_type: DocType::Doc,
            creator: "docs team".to_string(),
            create_time: "2024-01-20".to_string(),
            update_time: "2024-01-25".to_string(),
        }
    }

    fn catalog() -> Arc<MemoryCatalog> {
        Arc::new(MemoryCatalog::new(vec![
            result("search-1", "Deploy guide"),
            result("search-2", "Deploy FAQ"),
        ]))
    }

    fn controller(catalog: Arc<MemoryCatalog>) -> SyncController {
        SyncController::new(Arc::new(LibraryStore::new()), catalog.clone(), catalog)
    }

    /// Search collaborator whose replies are released by the test, per query
    #[derive(Default)]
    struct ManualSearch {
        pending: Mutex<HashMap<String, oneshot::Receiver<SearchReply>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ManualSearch {
        fn expect(&self, query: &str) -> oneshot::Sender<SearchReply> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().insert(query.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl SearchProvider for ManualSearch {
        async fn search(&self, query: &str, _doc_type: DocTypeFilter) -> SearchReply {
            self.calls.lock().unwrap().push(query.to_string());
            let rx = self.pending.lock().unwrap().remove(query);
            match rx {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(RemoteError::Transport("dropped".to_string()))),
                None => Ok(Vec::new()),
            }
        }
    }

    /// Fetch collaborator that waits for the test to release its reply
    struct ManualFetch {
        reply: Mutex<Option<oneshot::Receiver<LatestContent>>>,
    }

    impl ManualFetch {
        fn new() -> (Self, oneshot::Sender<LatestContent>) {
            let (tx, rx) = oneshot::channel();
            let fetch = Self {
                reply: Mutex::new(Some(rx)),
            };
            (fetch, tx)
        }
    }

    #[async_trait]
    impl FetchProvider for ManualFetch {
        async fn fetch_latest(&self, _key: FetchKey<'_>) -> Result<LatestContent, RemoteError> {
            let rx = self.reply.lock().unwrap().take();
            match rx {
                Some(rx) => rx
                    .await
                    .map_err(|_| RemoteError::Transport("dropped".to_string())),
                None => Err(RemoteError::Missing("no reply".to_string())),
            }
        }
    }

    struct FailingFetch;

    #[async_trait]
    impl FetchProvider for FailingFetch {
        async fn fetch_latest(&self, _key: FetchKey<'_>) -> Result<LatestContent, RemoteError> {
            Err(RemoteError::Transport("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected_locally() {
        let search = Arc::new(ManualSearch::default());
        let sync = SyncController::new(Arc::new(LibraryStore::new()), search.clone(), catalog());

        let err = sync.search_remote("   ", "all").await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidQuery(_)));
        assert!(search.calls.lock().unwrap().is_empty());
        assert_eq!(sync.search_state().token, 0);
    }

    #[tokio::test]
    async fn test_unknown_type_is_rejected() {
        let sync = controller(catalog());
        let err = sync.search_remote("deploy", "slides").await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_search_applies_results() {
        let sync = controller(catalog());
        let outcome = sync.search_remote("deploy", "all").await.unwrap();
        let results = outcome.applied().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "search-1");

        let state = sync.search_state();
        assert_eq!(state.results, results);
        assert_eq!(state.query, "deploy");
        assert!(!state.searching);
    }

    #[tokio::test]
    async fn test_later_issued_search_wins_when_it_settles_last() {
        let search = Arc::new(ManualSearch::default());
        let reply_a = search.expect("a");
        let reply_b = search.expect("b");
        let sync = SyncController::new(Arc::new(LibraryStore::new()), search, catalog());

        let release = async {
            tokio::task::yield_now().await;
            reply_a.send(Ok(vec![result("a-1", "A")])).unwrap();
            tokio::task::yield_now().await;
            reply_b.send(Ok(vec![result("b-1", "B")])).unwrap();
        };

        let (a, b, ()) = tokio::join!(
            sync.search_remote("a", "all"),
            sync.search_remote("b", "all"),
            release
        );

        assert!(matches!(a.unwrap(), SearchOutcome::Superseded(_)));
        assert_eq!(b.unwrap().applied().unwrap()[0].id, "b-1");
        assert_eq!(sync.search_state().results[0].id, "b-1");
        assert_eq!(sync.search_state().query, "b");
    }

    #[tokio::test]
    async fn test_later_issued_search_wins_when_it_settles_first() {
        let search = Arc::new(ManualSearch::default());
        let reply_a = search.expect("a");
        let reply_b = search.expect("b");
        let sync = SyncController::new(Arc::new(LibraryStore::new()), search, catalog());

        let release = async {
            tokio::task::yield_now().await;
            reply_b.send(Ok(vec![result("b-1", "B")])).unwrap();
            tokio::task::yield_now().await;
            reply_a.send(Ok(vec![result("a-1", "A")])).unwrap();
        };

        let (a, b, ()) = tokio::join!(
            sync.search_remote("a", "all"),
            sync.search_remote("b", "all"),
            release
        );

        assert!(matches!(a.unwrap(), SearchOutcome::Superseded(_)));
        assert!(b.unwrap().applied().is_some());
        let state = sync.search_state();
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].id, "b-1");
    }

    #[tokio::test]
    async fn test_superseded_failure_is_dropped() {
        let search = Arc::new(ManualSearch::default());
        let reply_a = search.expect("a");
        let reply_b = search.expect("b");
        let sync = SyncController::new(Arc::new(LibraryStore::new()), search, catalog());

        let release = async {
            tokio::task::yield_now().await;
            reply_b.send(Ok(vec![result("b-1", "B")])).unwrap();
            reply_a
                .send(Err(RemoteError::Transport("late failure".to_string())))
                .unwrap();
        };

        let (a, b, ()) = tokio::join!(
            sync.search_remote("a", "all"),
            sync.search_remote("b", "all"),
            release
        );

        assert!(matches!(a.unwrap(), SearchOutcome::Superseded(_)));
        assert!(b.is_ok());
        assert_eq!(sync.search_state().results[0].id, "b-1");
    }

    #[tokio::test]
    async fn test_search_failure_clears_results() {
        let search = Arc::new(ManualSearch::default());
        let first = search.expect("ok");
        let second = search.expect("boom");
        first.send(Ok(vec![result("x", "X")])).unwrap();
        second
            .send(Err(RemoteError::Transport("down".to_string())))
            .unwrap();
        let sync = SyncController::new(Arc::new(LibraryStore::new()), search, catalog());

        sync.search_remote("ok", "all").await.unwrap();
        assert_eq!(sync.search_state().results.len(), 1);

        let err = sync.search_remote("boom", "all").await.unwrap_err();
        assert!(matches!(err, SyncError::Search(RemoteError::Transport(_))));
        assert!(sync.search_state().results.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_search_discards_in_flight_result() {
        let search = Arc::new(ManualSearch::default());
        let reply = search.expect("slow");
        let sync = SyncController::new(Arc::new(LibraryStore::new()), search, catalog());

        let cancel = async {
            tokio::task::yield_now().await;
            sync.cancel_search();
            reply.send(Ok(vec![result("s", "S")])).unwrap();
        };

        let (outcome, ()) = tokio::join!(sync.search_remote("slow", "all"), cancel);
        assert!(matches!(outcome.unwrap(), SearchOutcome::Superseded(_)));
        assert!(sync.search_state().results.is_empty());
        assert!(!sync.search_state().searching);
    }

    #[tokio::test]
    async fn test_promote_twice_keeps_one_record() {
        let sync = controller(catalog());
        let first = result("search-1", "Deploy guide");
        let mut second = first.clone();
        second.title = "Deploy guide v2".to_string();

        let doc = sync.promote(first);
        assert_eq!(doc.source_url.as_deref(), Some("https://example.com/search-1"));
        sync.promote(second);

        let records = sync.library().snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Deploy guide v2");
    }

    #[tokio::test]
    async fn test_refresh_updates_content() {
        let catalog = catalog();
        let sync = controller(catalog.clone());
        sync.promote(result("search-1", "Deploy guide"));

        catalog.set_content("search-1", "## Deploy guide\nnew steps", "2024-03-01");
        let updated = sync.refresh("search-1").await.unwrap();

        assert_eq!(updated.id, "search-1");
        assert_eq!(updated.content, "## Deploy guide\nnew steps");
        assert_ne!(updated.update_time, "2024-01-25");
        assert_eq!(sync.library().get("search-1").unwrap(), updated);
    }

    #[tokio::test]
    async fn test_refresh_does_not_overwrite_newer_promotion() {
        let (fetch, reply) = ManualFetch::new();
        let sync = SyncController::new(Arc::new(LibraryStore::new()), catalog(), Arc::new(fetch));
        sync.promote(result("search-1", "Deploy guide"));

        let mut newer = result("search-1", "Deploy guide v2");
        newer.source_url = "https://example.com/moved/search-1".to_string();

        let promote_then_release = async {
            tokio::task::yield_now().await;
            sync.promote(newer.clone());
            reply
                .send(LatestContent {
                    content: "## Deploy guide\nstale".to_string(),
                    update_time: "2024-03-01".to_string(),
                })
                .unwrap();
        };

        let (refreshed, ()) = tokio::join!(sync.refresh("search-1"), promote_then_release);

        assert!(matches!(refreshed, Err(SyncError::Replaced(ref id)) if id == "search-1"));
        let kept = sync.library().get("search-1").unwrap();
        assert_eq!(kept.content, "## Deploy guide v2\nbody");
        assert_eq!(kept.source_url.as_deref(), Some("https://example.com/moved/search-1"));
    }

    #[tokio::test]
    async fn test_refresh_missing_record() {
        let sync = controller(catalog());
        sync.promote(result("search-1", "Deploy guide"));
        let before = sync.library().snapshot();

        let err = sync.refresh("nope").await.unwrap_err();
        assert_eq!(err, SyncError::NotFound("nope".to_string()));
        assert_eq!(sync.library().snapshot(), before);
    }

    #[tokio::test]
    async fn test_refresh_fetch_failure_leaves_record() {
        let library = Arc::new(LibraryStore::new());
        let sync = SyncController::new(library.clone(), catalog(), Arc::new(FailingFetch));
        let original = sync.promote(result("search-1", "Deploy guide"));

        let err = sync.refresh("search-1").await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch { ref id, .. } if id == "search-1"));
        assert!(err.is_retryable());
        assert_eq!(library.get("search-1").unwrap(), original);
    }

    #[tokio::test]
    async fn test_refresh_by_id_without_source() {
        let catalog = catalog();
        let library = Arc::new(LibraryStore::new());
        library
            .insert(Document::new("search-2", "Local copy", DocType::Wiki))
            .unwrap();
        let sync = SyncController::new(library, catalog.clone(), catalog);

        let updated = sync.refresh("search-2").await.unwrap();
        assert_eq!(updated.content, "## Deploy FAQ\nbody");
        assert_eq!(updated.title, "Local copy");
    }

    #[tokio::test]
    async fn test_refresh_all_reports_each_record() {
        let catalog = catalog();
        let sync = controller(catalog.clone());
        sync.promote(result("search-1", "Deploy guide"));
        sync.promote(result("gone", "Removed upstream"));
        sync.library()
            .insert(Document::new("local", "Local only", DocType::Sheet))
            .unwrap();

        let outcomes = sync.refresh_all().await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].1.is_ok());
        assert!(matches!(
            outcomes[1].1,
            Err(SyncError::Fetch {
                source: RemoteError::Missing(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let sync = controller(catalog());
        sync.promote(result("search-1", "Deploy guide"));
        assert!(sync.remove("search-1"));
        assert!(!sync.remove("search-1"));
        assert!(sync.library().is_empty());
    }

    #[tokio::test]
    async fn test_credential_gate_blocks_remote_calls() {
        let gate = Arc::new(CredentialGate::new(Arc::new(FormatValidator::default())));
        let sync = controller(catalog()).with_credential_gate(gate.clone());

        let err = sync.search_remote("deploy", "all").await.unwrap_err();
        assert_eq!(err, SyncError::CredentialNotValid);

        gate.validate("u-0123456789abcdef").await.unwrap();
        assert!(sync.search_remote("deploy", "all").await.is_ok());
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let mut sync = controller(catalog());
        let mut events = sync.take_events().unwrap();
        assert!(sync.take_events().is_none());

        sync.search_remote("deploy", "doc").await.unwrap();
        sync.promote(result("search-1", "Deploy guide"));
        sync.remove("search-1");

        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::SearchApplied { token: 1, count: 2 }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::Promoted {
                id: "search-1".to_string(),
                replaced: false
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::Removed {
                id: "search-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_events_before_take_are_not_queued() {
        let mut sync = controller(catalog());
        sync.promote(result("search-1", "Deploy guide"));
        sync.remove("search-1");

        let mut events = sync.take_events().unwrap();
        sync.promote(result("search-2", "Deploy FAQ"));

        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::Promoted {
                id: "search-2".to_string(),
                replaced: false
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribers_see_applied_results() {
        let sync = controller(catalog());
        let mut rx = sync.subscribe_search();
        sync.search_remote("faq", "all").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().results[0].id, "search-2");
    }
}
