use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Records the cache can address by identifier.
pub trait Keyed {
    type Key: Copy + PartialEq + fmt::Display + Send + Sync;

    fn key(&self) -> Self::Key;
}

/// Issued when a fetch starts. Only the most recently issued ticket may land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer fetch was issued, or the cache was torn down, while this one was in flight.
    Discarded,
}

/// What a view reads: the cached rows plus the passive loading/error banner state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<T> {
    pub records: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
struct State<T> {
    records: Vec<T>,
    loading: bool,
    error: Option<String>,
    issued: u64,
}

/// Read-through cache of one table, newest first. The store stays authoritative: rows
/// only enter here after a successful round trip.
#[derive(Debug)]
pub struct RecordCache<T> {
    state: RwLock<State<T>>,
    live: AtomicBool,
}

impl<T> Default for RecordCache<T> {
    fn default() -> Self {
        Self {
            state: RwLock::new(State {
                records: Vec::new(),
                loading: false,
                error: None,
                issued: 0,
            }),
            live: AtomicBool::new(false),
        }
    }
}

impl<T: Keyed + Clone> RecordCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
        if !live {
            self.state.write().loading = false;
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn begin_fetch(&self) -> FetchTicket {
        let mut state = self.state.write();
        state.issued += 1;
        state.loading = true;
        FetchTicket(state.issued)
    }

    /// Lands a fetch result. Rows replace the cache wholesale; a failure keeps the previous
    /// rows and records the message.
    pub fn finish_fetch(&self, ticket: FetchTicket, result: Result<Vec<T>, String>) -> FetchOutcome {
        let mut state = self.state.write();
        if !self.is_live() || ticket.0 != state.issued {
            return FetchOutcome::Discarded;
        }
        state.loading = false;
        match result {
            Ok(records) => {
                state.records = records;
                state.error = None;
            }
            Err(message) => state.error = Some(message),
        }
        FetchOutcome::Applied
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        let state = self.state.read();
        Snapshot {
            records: state.records.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    pub fn records(&self) -> Vec<T> {
        self.state.read().records.clone()
    }

    pub fn get(&self, key: T::Key) -> Option<T> {
        self.state
            .read()
            .records
            .iter()
            .find(|record| record.key() == key)
            .cloned()
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.state.write().error = Some(message.into());
    }

    /// Puts a freshly created row at the front. If a refetch already brought it in, the
    /// existing copy is dropped so the row appears once.
    pub fn prepend(&self, record: T) {
        let mut state = self.state.write();
        let key = record.key();
        state.records.retain(|existing| existing.key() != key);
        state.records.insert(0, record);
    }

    /// Swaps in the store's copy of a row. Returns false if the row is not cached.
    pub fn replace(&self, record: T) -> bool {
        let mut state = self.state.write();
        let key = record.key();
        match state.records.iter_mut().find(|existing| existing.key() == key) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, key: T::Key) -> bool {
        let mut state = self.state.write();
        let before = state.records.len();
        state.records.retain(|existing| existing.key() != key);
        state.records.len() != before
    }
}
