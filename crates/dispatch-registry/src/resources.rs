use crate::cache::Snapshot;
use crate::sync::SyncedTable;
use dispatch_core::validation::{validate_new_resource, validate_resource_patch};
use dispatch_core::{
    now, DispatchError, DispatchResult, IncidentId, NewResource, Resource, ResourceId,
    ResourcePatch, ResourceStatus, ResourceType,
};
use dispatch_storage::DispatchStore;
use std::sync::Arc;

/// Fleet cache. Cheap to clone; clones share one cache and one change feed.
#[derive(Clone)]
pub struct ResourceRegistry {
    table: Arc<SyncedTable<Resource>>,
}

impl ResourceRegistry {
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        Self {
            table: SyncedTable::new(store),
        }
    }

    pub async fn mount(&self) -> DispatchResult<()> {
        self.table.mount().await
    }

    pub fn teardown(&self) {
        self.table.teardown();
    }

    pub fn is_mounted(&self) -> bool {
        self.table.is_mounted()
    }

    pub async fn refresh(&self) -> DispatchResult<()> {
        self.table.refresh().await
    }

    pub fn snapshot(&self) -> Snapshot<Resource> {
        self.table.snapshot()
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.table.cache().records()
    }

    pub fn get(&self, id: ResourceId) -> Option<Resource> {
        self.table.cache().get(id)
    }

    pub fn by_type(&self, resource_type: ResourceType) -> Vec<Resource> {
        self.resources()
            .into_iter()
            .filter(|resource| resource.resource_type == resource_type)
            .collect()
    }

    /// Validates locally, then inserts. Bad input never reaches the store.
    pub async fn add_resource(&self, record: NewResource) -> DispatchResult<Resource> {
        validate_new_resource(&record)?;
        let name = record.name.clone();
        let created = self
            .table
            .store()
            .insert_resource(record)
            .await
            .map_err(|err| self.table.write_failed("insert", &name, err))?;
        self.table.cache().prepend(created.clone());
        tracing::debug!(resource_id = %created.id, name = %created.name, "resource added");
        Ok(created)
    }

    /// Field edits. Always stamps `updated_at`; the change feed fingerprints on it.
    pub async fn update_resource(
        &self,
        id: ResourceId,
        patch: ResourcePatch,
    ) -> DispatchResult<Resource> {
        if patch.is_empty() {
            return Err(DispatchError::validation("resource update has no fields"));
        }
        validate_resource_patch(&patch)?;
        let updated = self
            .table
            .store()
            .update_resource(id, patch.touched(now()))
            .await
            .map_err(|err| self.table.write_failed("update", id, err))?;
        self.table.cache().replace(updated.clone());
        Ok(updated)
    }

    pub async fn delete_resource(&self, id: ResourceId) -> DispatchResult<()> {
        self.table
            .store()
            .remove_resource(id)
            .await
            .map_err(|err| self.table.write_failed("delete", id, err))?;
        self.table.cache().remove(id);
        tracing::debug!(resource_id = %id, "resource deleted");
        Ok(())
    }

    /// Status write with a fresh `updated_at`. The incident, if any, is only logged: the
    /// resource row carries no back-reference.
    pub async fn set_status(
        &self,
        id: ResourceId,
        status: ResourceStatus,
        assigned_incident: Option<IncidentId>,
    ) -> DispatchResult<Resource> {
        let patch = ResourcePatch::status(status).touched(now());
        let updated = self
            .table
            .store()
            .update_resource(id, patch)
            .await
            .map_err(|err| self.table.write_failed("set_status", id, err))?;
        self.table.cache().replace(updated.clone());
        match assigned_incident {
            Some(incident_id) => {
                tracing::debug!(resource_id = %id, %status, %incident_id, "resource status set")
            }
            None => tracing::debug!(resource_id = %id, %status, "resource status set"),
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::{ErrorCode, Location};
    use dispatch_storage::{MemoryStore, Operation, ResourceGateway, Table};

    fn registry() -> (Arc<MemoryStore>, ResourceRegistry) {
        let store = Arc::new(MemoryStore::new());
        let registry = ResourceRegistry::new(store.clone());
        (store, registry)
    }

    fn unit(name: &str, resource_type: ResourceType) -> NewResource {
        NewResource {
            name: name.to_string(),
            resource_type,
            status: ResourceStatus::Available,
            location: Location::new(40.7128, -74.006, "1 Centre St"),
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn added_resource_is_first_in_cache() {
        let (_, registry) = registry();
        registry.mount().await.unwrap();
        registry
            .add_resource(unit("Engine 7", ResourceType::FireTruck))
            .await
            .unwrap();
        let created = registry
            .add_resource(unit("Ambulance 101", ResourceType::Ambulance))
            .await
            .unwrap();

        assert_eq!(registry.resources()[0].id, created.id);
        assert_eq!(registry.resources().len(), 2);
    }

    #[tokio::test]
    async fn invalid_coordinates_never_reach_the_store() {
        let (store, registry) = registry();
        let mut record = unit("Ambulance 101", ResourceType::Ambulance);
        record.location.latitude = 95.0;
        // A queued failure would surface as a store error if the insert were attempted.
        store.fail_next(Table::Resources, Operation::Insert);

        let err = registry.add_resource(record).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert!(registry.snapshot().error.is_none());
        assert!(store.fetch_resources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_sets_error_and_is_returned() {
        let (store, registry) = registry();
        store.fail_next(Table::Resources, Operation::Insert);

        let err = registry
            .add_resource(unit("Ambulance 101", ResourceType::Ambulance))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Store);
        assert_eq!(registry.snapshot().error, Some(err.message));
        assert!(registry.resources().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_and_delete_removes() {
        let (_, registry) = registry();
        let created = registry
            .add_resource(unit("Ambulance 101", ResourceType::Ambulance))
            .await
            .unwrap();

        let patch = ResourcePatch {
            name: Some("Ambulance 102".to_string()),
            ..ResourcePatch::default()
        };
        registry.update_resource(created.id, patch).await.unwrap();
        assert_eq!(registry.get(created.id).unwrap().name, "Ambulance 102");

        registry.delete_resource(created.id).await.unwrap();
        assert!(registry.get(created.id).is_none());

        let err = registry.delete_resource(created.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn field_edit_stamps_updated_at() {
        let (store, registry) = registry();
        let created = registry
            .add_resource(unit("Ambulance 101", ResourceType::Ambulance))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let patch = ResourcePatch {
            name: Some("Medic 101".to_string()),
            ..ResourcePatch::default()
        };
        let updated = registry.update_resource(created.id, patch).await.unwrap();
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(store.fetch_resources().await.unwrap()[0].updated_at, updated.updated_at);
    }

    #[tokio::test]
    async fn set_status_stamps_updated_at() {
        let (_, registry) = registry();
        let created = registry
            .add_resource(unit("Ambulance 101", ResourceType::Ambulance))
            .await
            .unwrap();

        let updated = registry
            .set_status(created.id, ResourceStatus::Maintenance, None)
            .await
            .unwrap();
        assert_eq!(updated.status, ResourceStatus::Maintenance);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(registry.get(created.id).unwrap().status, ResourceStatus::Maintenance);
    }

    #[tokio::test]
    async fn out_of_band_change_triggers_refetch() {
        let (store, registry) = registry();
        registry.mount().await.unwrap();
        store
            .insert_resource(unit("Patrol 12", ResourceType::PoliceVehicle))
            .await
            .unwrap();

        for _ in 0..50 {
            if !registry.resources().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(registry.by_type(ResourceType::PoliceVehicle).len(), 1);
        registry.teardown();
        assert!(!registry.is_mounted());
    }
}
