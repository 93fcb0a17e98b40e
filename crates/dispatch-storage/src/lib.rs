use async_trait::async_trait;
use dispatch_core::{
    DispatchError, Incident, IncidentId, IncidentPatch, NewIncident, NewResource, Resource,
    ResourceId, ResourcePatch,
};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

mod memory;
pub use memory::{MemoryStore, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    /// The backend refused the record (constraint, type or permission failure).
    Rejected,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Rejected, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unavailable, message)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for DispatchError {
    fn from(value: StoreError) -> Self {
        match value.kind {
            StoreErrorKind::NotFound => Self::not_found(value.message),
            StoreErrorKind::Rejected => Self::validation(value.message),
            StoreErrorKind::Unavailable => Self::store(value.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Resources,
    Incidents,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resources => "resources",
            Self::Incidents => "incidents",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// The feed knows something changed but not what (polling, lagged receiver).
    Unknown,
}

/// Cue that a table changed. Carries no row data; subscribers refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice {
    pub table: Table,
    pub kind: ChangeKind,
}

/// Live change feed for one table. Dropping it releases the feed and stops any background
/// task that was driving it.
#[derive(Debug)]
pub struct Subscription {
    table: Table,
    receiver: broadcast::Receiver<ChangeNotice>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(table: Table, receiver: broadcast::Receiver<ChangeNotice>) -> Self {
        Self {
            table,
            receiver,
            task: None,
        }
    }

    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Next change on this table, `None` once the feed has closed.
    pub async fn changed(&mut self) -> Option<ChangeNotice> {
        loop {
            match self.receiver.recv().await {
                Ok(notice) if notice.table == self.table => return Some(notice),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(table = %self.table, skipped, "change feed lagged");
                    return Some(ChangeNotice {
                        table: self.table,
                        kind: ChangeKind::Unknown,
                    });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Fan-out point for change notices shared by every subscriber of a store.
#[derive(Debug, Clone)]
pub struct ChangeHub {
    sender: broadcast::Sender<ChangeNotice>,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, notice: ChangeNotice) {
        // No receivers is fine: nobody is mounted.
        let _ = self.sender.send(notice);
    }

    pub fn subscribe(&self, table: Table) -> Subscription {
        Subscription::new(table, self.sender.subscribe())
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
pub trait ResourceGateway: Send + Sync {
    /// All rows, newest `created_at` first.
    async fn fetch_resources(&self) -> Result<Vec<Resource>, StoreError>;
    async fn insert_resource(&self, record: NewResource) -> Result<Resource, StoreError>;
    async fn update_resource(
        &self,
        id: ResourceId,
        patch: ResourcePatch,
    ) -> Result<Resource, StoreError>;
    async fn remove_resource(&self, id: ResourceId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait IncidentGateway: Send + Sync {
    /// All rows, newest `created_at` first.
    async fn fetch_incidents(&self) -> Result<Vec<Incident>, StoreError>;
    async fn insert_incident(&self, record: NewIncident) -> Result<Incident, StoreError>;
    async fn update_incident(
        &self,
        id: IncidentId,
        patch: IncidentPatch,
    ) -> Result<Incident, StoreError>;
    async fn remove_incident(&self, id: IncidentId) -> Result<(), StoreError>;
}

pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, table: Table) -> Subscription;
}

/// Everything the registries need from a backend.
pub trait DispatchStore: ResourceGateway + IncidentGateway + ChangeFeed {}

impl<T> DispatchStore for T where T: ResourceGateway + IncidentGateway + ChangeFeed {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_filters_by_table() {
        let hub = ChangeHub::default();
        let mut incidents = hub.subscribe(Table::Incidents);

        hub.publish(ChangeNotice {
            table: Table::Resources,
            kind: ChangeKind::Insert,
        });
        hub.publish(ChangeNotice {
            table: Table::Incidents,
            kind: ChangeKind::Update,
        });

        let notice = incidents.changed().await.unwrap();
        assert_eq!(notice.table, Table::Incidents);
        assert_eq!(notice.kind, ChangeKind::Update);
    }

    #[tokio::test]
    async fn lagged_receiver_still_gets_a_refetch_cue() {
        let hub = ChangeHub::new(1);
        let mut resources = hub.subscribe(Table::Resources);
        for _ in 0..3 {
            hub.publish(ChangeNotice {
                table: Table::Resources,
                kind: ChangeKind::Insert,
            });
        }
        let notice = resources.changed().await.unwrap();
        assert_eq!(notice.kind, ChangeKind::Unknown);
    }

    #[test]
    fn store_errors_map_onto_dispatch_codes() {
        use dispatch_core::ErrorCode;
        let err: DispatchError = StoreError::not_found("no such row").into();
        assert_eq!(err.code, ErrorCode::NotFound);
        let err: DispatchError = StoreError::rejected("violates check").into();
        assert_eq!(err.code, ErrorCode::Validation);
        let err: DispatchError = StoreError::unavailable("timeout").into();
        assert_eq!(err.code, ErrorCode::Store);
    }
}
