//! Per-client browsing sessions
//!
//! A session starts from the full listing snapshot (`All`). A search
//! replaces the base set (`SearchApplied`); an attribute filter narrows the
//! current base set (`AttributeFiltered`). Filters always re-base on the most
//! recent search result, never on the original snapshot.
//!
//! Searches are asynchronous with respect to the session: the handler takes
//! a [`SearchTicket`] before fetching reservations and hands it back with the
//! result. Only the newest ticket may apply its result, so an older search
//! that finishes late cannot overwrite a newer one.
//!
//! The registry evicts sessions that stay idle longer than the configured
//! TTL and never holds more than a fixed number of them; when full, the
//! least recently used session makes room for the new one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rand::{distr::Alphanumeric, Rng};
use serde::Serialize;
use tracing::debug;

use crate::filter::AttributeFilter;
use crate::model::Listing;
use crate::search::{refine, SearchQuery, SearchResults};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    All,
    SearchApplied,
    AttributeFiltered,
}

/// Proof that a search was started; compared against the session's newest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCompletion {
    Applied,
    /// A newer search was started in the meantime; the result was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct BrowseSession {
    all: Arc<[Listing]>,
    base: Vec<Listing>,
    visible: Vec<Listing>,
    state: SessionState,
    query: Option<SearchQuery>,
    filter: Option<AttributeFilter>,
    latest_ticket: u64,
}

impl BrowseSession {
    pub fn new(all: Vec<Listing>) -> Self {
        Self {
            base: all.clone(),
            visible: all.clone(),
            all: all.into(),
            state: SessionState::All,
            query: None,
            filter: None,
            latest_ticket: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The full snapshot the session was opened with
    pub fn all(&self) -> &Arc<[Listing]> {
        &self.all
    }

    /// Latest search result, or the full snapshot before any search
    pub fn base(&self) -> &[Listing] {
        &self.base
    }

    pub fn visible(&self) -> &[Listing] {
        &self.visible
    }

    pub fn begin_search(&mut self) -> SearchTicket {
        self.latest_ticket += 1;
        SearchTicket(self.latest_ticket)
    }

    /// Applies a finished search if `ticket` is still the newest one.
    pub fn complete_search(
        &mut self,
        ticket: SearchTicket,
        query: SearchQuery,
        results: Vec<Listing>,
    ) -> SearchCompletion {
        if ticket.0 != self.latest_ticket {
            return SearchCompletion::Stale;
        }
        self.base = results.clone();
        self.visible = results;
        self.state = SessionState::SearchApplied;
        self.query = Some(query);
        self.filter = None;
        SearchCompletion::Applied
    }

    /// Narrows the current base set. Always succeeds.
    pub fn apply_filter(&mut self, filter: AttributeFilter) {
        self.visible = refine(&self.base, &filter);
        self.state = SessionState::AttributeFiltered;
        self.filter = Some(filter);
    }

    pub fn snapshot(&self, id: &str) -> SessionSnapshot {
        let searched = self.query.is_some();
        SessionSnapshot {
            id: id.to_string(),
            state: self.state,
            query: self.query.clone(),
            filter: self.filter.clone(),
            results: SearchResults::new(self.visible.clone(), searched),
        }
    }
}

/// Serialized view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<SearchQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<AttributeFilter>,
    pub results: SearchResults,
}

/// Idle time after which a session is dropped
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Upper bound on concurrently open sessions
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

struct Entry {
    session: BrowseSession,
    touched: Instant,
    /// Registry-wide use counter; the smallest value is the least recently used
    last_use: u64,
}

#[derive(Default)]
struct Sessions {
    entries: HashMap<String, Entry>,
    uses: u64,
}

impl Sessions {
    fn next_use(&mut self) -> u64 {
        self.uses += 1;
        self.uses
    }

    fn purge_expired(&mut self, ttl: Duration) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.touched.elapsed() < ttl);
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(purged, "expired sessions evicted");
        }
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_use)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            self.entries.remove(&id);
            debug!(session_id = %id, "session evicted, registry full");
        }
    }
}

/// Open sessions keyed by generated id
///
/// A session that has not been used for `ttl` is gone: lookups treat it as
/// missing. At most `max_sessions` are kept.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<Sessions>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(Sessions::default())),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a session over `all` and returns its initial view.
    ///
    /// Expired sessions are purged first; if the registry is still full the
    /// least recently used session is evicted.
    pub fn create(&self, all: Vec<Listing>) -> SessionSnapshot {
        let id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let session = BrowseSession::new(all);
        let snapshot = session.snapshot(&id);

        let mut sessions = self.lock();
        sessions.purge_expired(self.ttl);
        while sessions.entries.len() >= self.max_sessions {
            sessions.evict_least_recent();
        }
        let last_use = sessions.next_use();
        sessions.entries.insert(
            id,
            Entry {
                session,
                touched: Instant::now(),
                last_use,
            },
        );
        snapshot
    }

    /// Runs `f` on the session with `id`, if it exists and has not expired.
    ///
    /// Using a session resets its idle timer. The registry lock is held
    /// while `f` runs; keep `f` short and never fetch from the store inside it.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut BrowseSession) -> R) -> Option<R> {
        let mut sessions = self.lock();
        let expired = match sessions.entries.get(id) {
            Some(entry) => entry.touched.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            sessions.entries.remove(id);
            debug!(session_id = %id, "session expired");
            return None;
        }

        let last_use = sessions.next_use();
        let entry = sessions.entries.get_mut(id)?;
        entry.touched = Instant::now();
        entry.last_use = last_use;
        Some(f(&mut entry.session))
    }

    pub fn remove(&self, id: &str) -> bool {
        self.lock().entries.remove(id).is_some()
    }

    /// Number of stored sessions, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
