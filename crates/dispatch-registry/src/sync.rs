use crate::cache::{FetchOutcome, Keyed, RecordCache, Snapshot};
use async_trait::async_trait;
use dispatch_core::{DispatchError, DispatchResult, Incident, IncidentId, Resource, ResourceId};
use dispatch_observability::{MUTATION_ERRORS_TOTAL, REFETCH_TOTAL, STALE_FETCH_DISCARDED_TOTAL};
use dispatch_storage::{DispatchStore, StoreError, Table};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A row type backed by one store table.
#[async_trait]
pub trait TableRecord: Keyed + Clone + Send + Sync + 'static {
    const TABLE: Table;

    async fn fetch_all(store: &dyn DispatchStore) -> Result<Vec<Self>, StoreError>;
}

impl Keyed for Resource {
    type Key = ResourceId;

    fn key(&self) -> ResourceId {
        self.id
    }
}

#[async_trait]
impl TableRecord for Resource {
    const TABLE: Table = Table::Resources;

    async fn fetch_all(store: &dyn DispatchStore) -> Result<Vec<Self>, StoreError> {
        store.fetch_resources().await
    }
}

impl Keyed for Incident {
    type Key = IncidentId;

    fn key(&self) -> IncidentId {
        self.id
    }
}

#[async_trait]
impl TableRecord for Incident {
    const TABLE: Table = Table::Incidents;

    async fn fetch_all(store: &dyn DispatchStore) -> Result<Vec<Self>, StoreError> {
        store.fetch_incidents().await
    }
}

/// Cache of one table kept fresh by the store's change feed: every notice triggers a
/// full refetch.
pub struct SyncedTable<T: TableRecord> {
    store: Arc<dyn DispatchStore>,
    cache: RecordCache<T>,
    feed: Mutex<Option<JoinHandle<()>>>,
}

impl<T: TableRecord> SyncedTable<T> {
    pub fn new(store: Arc<dyn DispatchStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            cache: RecordCache::new(),
            feed: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &dyn DispatchStore {
        self.store.as_ref()
    }

    pub fn cache(&self) -> &RecordCache<T> {
        &self.cache
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.cache.snapshot()
    }

    pub fn is_mounted(&self) -> bool {
        self.cache.is_live()
    }

    /// Opens the change feed and runs the initial fetch. The feed stays open even if that
    /// fetch fails, so the next change notice retries it.
    pub async fn mount(self: &Arc<Self>) -> DispatchResult<()> {
        {
            let mut feed = self.feed.lock();
            if feed.is_none() {
                self.cache.set_live(true);
                *feed = Some(self.spawn_feed());
                tracing::debug!(table = %T::TABLE, "registry mounted");
            }
        }
        self.refresh().await
    }

    /// Closes the change feed. Fetches still in flight land nowhere.
    pub fn teardown(&self) {
        self.cache.set_live(false);
        if let Some(task) = self.feed.lock().take() {
            task.abort();
            tracing::debug!(table = %T::TABLE, "registry torn down");
        }
    }

    pub async fn refresh(&self) -> DispatchResult<()> {
        let ticket = self.cache.begin_fetch();
        metrics::counter!(REFETCH_TOTAL, "table" => T::TABLE.as_str()).increment(1);

        let result = T::fetch_all(self.store.as_ref()).await;
        let (outcome, failure) = match result {
            Ok(rows) => {
                let count = rows.len();
                let outcome = self.cache.finish_fetch(ticket, Ok(rows));
                if outcome == FetchOutcome::Applied {
                    tracing::debug!(table = %T::TABLE, rows = count, "registry refetched");
                }
                (outcome, None)
            }
            Err(err) => {
                let err = DispatchError::from(err).context(&format!("loading {}", T::TABLE));
                let outcome = self.cache.finish_fetch(ticket, Err(err.message.clone()));
                if outcome == FetchOutcome::Applied {
                    tracing::warn!(table = %T::TABLE, error = %err.message, "registry fetch failed");
                }
                (outcome, Some(err))
            }
        };

        if outcome == FetchOutcome::Discarded {
            metrics::counter!(STALE_FETCH_DISCARDED_TOTAL, "table" => T::TABLE.as_str())
                .increment(1);
            tracing::warn!(table = %T::TABLE, "discarded stale fetch result");
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Records a failed write in the error banner and hands it back for the caller to raise.
    pub fn write_failed(
        &self,
        operation: &'static str,
        subject: impl fmt::Display,
        err: StoreError,
    ) -> DispatchError {
        let err = DispatchError::from(err).context(&format!("{operation} {subject}"));
        self.cache.set_error(err.message.clone());
        metrics::counter!(
            MUTATION_ERRORS_TOTAL,
            "table" => T::TABLE.as_str(),
            "operation" => operation
        )
        .increment(1);
        tracing::warn!(
            table = %T::TABLE,
            %subject,
            operation,
            error = %err.message,
            "registry write failed"
        );
        err
    }

    fn spawn_feed(self: &Arc<Self>) -> JoinHandle<()> {
        let mut subscription = self.store.subscribe(T::TABLE);
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(notice) = subscription.changed().await {
                let Some(table) = weak.upgrade() else {
                    break;
                };
                tracing::debug!(table = %notice.table, kind = ?notice.kind, "change notice");
                // Failures are already recorded on the cache.
                let _ = table.refresh().await;
            }
        })
    }
}

impl<T: TableRecord> Drop for SyncedTable<T> {
    fn drop(&mut self) {
        if let Some(task) = self.feed.get_mut().take() {
            task.abort();
        }
    }
}
