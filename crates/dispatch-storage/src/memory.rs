use crate::{
    ChangeFeed, ChangeHub, ChangeKind, ChangeNotice, IncidentGateway, ResourceGateway,
    StoreError, Subscription, Table,
};
use async_trait::async_trait;
use chrono::TimeDelta;
use dispatch_core::{
    now, Assignments, Incident, IncidentId, IncidentPatch, NewIncident, NewResource, Resource,
    ResourceId, ResourcePatch, Timestamp,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchAll,
    Insert,
    Update,
    Remove,
}

#[derive(Debug, Default)]
struct Tables {
    resources: Vec<Resource>,
    incidents: Vec<Incident>,
    /// Pending injected failures: (table, operation, matching calls still to let through).
    failures: Vec<(Table, Operation, usize)>,
    last_timestamp: Option<Timestamp>,
}

impl Tables {
    /// Strictly increasing so `created_at DESC` is a total order even within one clock tick.
    fn next_timestamp(&mut self) -> Timestamp {
        let current = now();
        let stamp = match self.last_timestamp {
            Some(last) if current <= last => last + TimeDelta::microseconds(1),
            _ => current,
        };
        self.last_timestamp = Some(stamp);
        stamp
    }

    fn take_failure(&mut self, table: Table, operation: Operation) -> Result<(), StoreError> {
        let Some(index) = self
            .failures
            .iter()
            .position(|(t, op, _)| *t == table && *op == operation)
        else {
            return Ok(());
        };
        if self.failures[index].2 > 0 {
            self.failures[index].2 -= 1;
            return Ok(());
        }
        self.failures.remove(index);
        Err(StoreError::unavailable(format!(
            "injected {operation:?} failure on {table}"
        )))
    }
}

/// In-process store with the same contract as the hosted backend: server-assigned ids
/// and timestamps, newest-first listing, full-record returns, change notices on every
/// write. No foreign keys are enforced, so deleting an assigned resource leaves the
/// incident pointing at it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    hub: ChangeHub,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `operation` on `table` fail with an unavailable error. Failures
    /// queue up and are consumed one per matching call.
    pub fn fail_next(&self, table: Table, operation: Operation) {
        self.fail_nth(table, operation, 0);
    }

    /// Lets `skip` matching calls through, then fails the one after.
    pub fn fail_nth(&self, table: Table, operation: Operation, skip: usize) {
        self.tables.lock().failures.push((table, operation, skip));
    }

    fn notify(&self, table: Table, kind: ChangeKind) {
        self.hub.publish(ChangeNotice { table, kind });
    }
}

#[async_trait]
impl ResourceGateway for MemoryStore {
    async fn fetch_resources(&self) -> Result<Vec<Resource>, StoreError> {
        let mut tables = self.tables.lock();
        tables.take_failure(Table::Resources, Operation::FetchAll)?;
        let mut rows = tables.resources.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_resource(&self, record: NewResource) -> Result<Resource, StoreError> {
        let resource = {
            let mut tables = self.tables.lock();
            tables.take_failure(Table::Resources, Operation::Insert)?;
            let stamp = tables.next_timestamp();
            let resource = Resource {
                id: ResourceId::new(),
                name: record.name,
                resource_type: record.resource_type,
                status: record.status,
                location: record.location,
                owner_id: record.owner_id,
                created_at: stamp,
                updated_at: stamp,
            };
            tables.resources.push(resource.clone());
            resource
        };
        self.notify(Table::Resources, ChangeKind::Insert);
        Ok(resource)
    }

    async fn update_resource(
        &self,
        id: ResourceId,
        patch: ResourcePatch,
    ) -> Result<Resource, StoreError> {
        let resource = {
            let mut tables = self.tables.lock();
            tables.take_failure(Table::Resources, Operation::Update)?;
            let row = tables
                .resources
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or_else(|| StoreError::not_found(format!("resource {id} not found")))?;
            patch.apply_to(row);
            row.clone()
        };
        self.notify(Table::Resources, ChangeKind::Update);
        Ok(resource)
    }

    async fn remove_resource(&self, id: ResourceId) -> Result<(), StoreError> {
        {
            let mut tables = self.tables.lock();
            tables.take_failure(Table::Resources, Operation::Remove)?;
            let before = tables.resources.len();
            tables.resources.retain(|row| row.id != id);
            if tables.resources.len() == before {
                return Err(StoreError::not_found(format!("resource {id} not found")));
            }
        }
        self.notify(Table::Resources, ChangeKind::Delete);
        Ok(())
    }
}

#[async_trait]
impl IncidentGateway for MemoryStore {
    async fn fetch_incidents(&self) -> Result<Vec<Incident>, StoreError> {
        let mut tables = self.tables.lock();
        tables.take_failure(Table::Incidents, Operation::FetchAll)?;
        let mut rows = tables.incidents.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_incident(&self, record: NewIncident) -> Result<Incident, StoreError> {
        let incident = {
            let mut tables = self.tables.lock();
            tables.take_failure(Table::Incidents, Operation::Insert)?;
            let stamp = tables.next_timestamp();
            let incident = Incident {
                id: IncidentId::new(),
                status: record.initial_status(),
                title: record.title,
                description: record.description,
                priority: record.priority,
                reported_by: record.reported_by,
                contact_number: record.contact_number,
                location: record.location,
                assignments: Assignments::default(),
                created_at: stamp,
                updated_at: stamp,
            };
            tables.incidents.push(incident.clone());
            incident
        };
        self.notify(Table::Incidents, ChangeKind::Insert);
        Ok(incident)
    }

    async fn update_incident(
        &self,
        id: IncidentId,
        patch: IncidentPatch,
    ) -> Result<Incident, StoreError> {
        let incident = {
            let mut tables = self.tables.lock();
            tables.take_failure(Table::Incidents, Operation::Update)?;
            let row = tables
                .incidents
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or_else(|| StoreError::not_found(format!("incident {id} not found")))?;
            patch.apply_to(row);
            row.clone()
        };
        self.notify(Table::Incidents, ChangeKind::Update);
        Ok(incident)
    }

    async fn remove_incident(&self, id: IncidentId) -> Result<(), StoreError> {
        {
            let mut tables = self.tables.lock();
            tables.take_failure(Table::Incidents, Operation::Remove)?;
            let before = tables.incidents.len();
            tables.incidents.retain(|row| row.id != id);
            if tables.incidents.len() == before {
                return Err(StoreError::not_found(format!("incident {id} not found")));
            }
        }
        self.notify(Table::Incidents, ChangeKind::Delete);
        Ok(())
    }
}

impl ChangeFeed for MemoryStore {
    fn subscribe(&self, table: Table) -> Subscription {
        self.hub.subscribe(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreErrorKind;
    use dispatch_core::{Location, ResourceStatus, ResourceType};

    fn unit(name: &str) -> NewResource {
        NewResource {
            name: name.to_string(),
            resource_type: ResourceType::Ambulance,
            status: ResourceStatus::Available,
            location: Location::new(37.7749, -122.4194, "101 Market St"),
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn fetch_lists_newest_first() {
        let store = MemoryStore::new();
        store.insert_resource(unit("Ambulance 101")).await.unwrap();
        store.insert_resource(unit("Ambulance 102")).await.unwrap();
        store.insert_resource(unit("Ambulance 103")).await.unwrap();

        let names: Vec<_> = store
            .fetch_resources()
            .await
            .unwrap()
            .into_iter()
            .map(|resource| resource.name)
            .collect();
        assert_eq!(names, ["Ambulance 103", "Ambulance 102", "Ambulance 101"]);
    }

    #[tokio::test]
    async fn insert_then_fetch_round_trips_fields() {
        let store = MemoryStore::new();
        let record = unit("Ambulance 101");
        let created = store.insert_resource(record.clone()).await.unwrap();
        let fetched = store.fetch_resources().await.unwrap();

        assert_eq!(fetched, vec![created.clone()]);
        assert_eq!(created.name, record.name);
        assert_eq!(created.location, record.location);
        assert_eq!(created.status, record.status);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_resource(ResourceId::new(), ResourcePatch::status(ResourceStatus::Offline))
            .await
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn writes_publish_change_notices() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe(Table::Resources);
        let created = store.insert_resource(unit("Ambulance 101")).await.unwrap();
        store.remove_resource(created.id).await.unwrap();

        assert_eq!(feed.changed().await.unwrap().kind, ChangeKind::Insert);
        assert_eq!(feed.changed().await.unwrap().kind, ChangeKind::Delete);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let store = MemoryStore::new();
        store.fail_next(Table::Resources, Operation::Insert);

        let err = store.insert_resource(unit("Ambulance 101")).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Unavailable);
        assert!(store.insert_resource(unit("Ambulance 101")).await.is_ok());
    }

    #[tokio::test]
    async fn nth_failure_lets_earlier_calls_through() {
        let store = MemoryStore::new();
        store.fail_nth(Table::Resources, Operation::Insert, 1);

        assert!(store.insert_resource(unit("Ambulance 101")).await.is_ok());
        assert!(store.insert_resource(unit("Ambulance 102")).await.is_err());
        assert!(store.insert_resource(unit("Ambulance 103")).await.is_ok());
    }
}
