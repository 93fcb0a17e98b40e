use crate::cache::Snapshot;
use crate::sync::SyncedTable;
use dispatch_core::validation::{validate_incident_patch, validate_new_incident};
use dispatch_core::{
    now, DispatchError, DispatchResult, Incident, IncidentId, IncidentPatch, IncidentStatus,
    NewIncident,
};
use dispatch_storage::DispatchStore;
use std::sync::Arc;

/// Incident cache with status transitions. Same lifecycle as
/// [`ResourceRegistry`](crate::ResourceRegistry): mount, refetch on every change notice,
/// teardown.
#[derive(Clone)]
pub struct IncidentRegistry {
    table: Arc<SyncedTable<Incident>>,
}

impl IncidentRegistry {
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

    pub fn snapshot(&self) -> Snapshot<Incident> {
        self.table.snapshot()
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.table.cache().records()
    }

    pub fn get(&self, id: IncidentId) -> Option<Incident> {
        self.table.cache().get(id)
    }

    pub fn require(&self, id: IncidentId) -> DispatchResult<Incident> {
        self.get(id)
            .ok_or_else(|| DispatchError::not_found(format!("incident {id} not found")))
    }

    /// Inserts a new report. It always starts out pending.
    pub async fn report_incident(&self, record: NewIncident) -> DispatchResult<Incident> {
        validate_new_incident(&record)?;
        let title = record.title.clone();
        let created = self
            .table
            .store()
            .insert_incident(record)
            .await
            .map_err(|err| self.table.write_failed("insert", &title, err))?;
        self.table.cache().prepend(created.clone());
        tracing::info!(
            incident_id = %created.id,
            priority = %created.priority,
            "incident reported"
        );
        Ok(created)
    }

    /// Checked transition: the move from the cached status must be an edge of the
    /// incident lifecycle.
    pub async fn update_status(
        &self,
        id: IncidentId,
        status: IncidentStatus,
    ) -> DispatchResult<Incident> {
        let current = self.require(id)?;
        if !current.status.can_transition_to(status) {
            return Err(DispatchError::invalid_transition(current.status, status));
        }
        self.write(id, "update_status", IncidentPatch::status(status).touched(now()))
            .await
    }

    /// Unchecked status write for administrative overrides.
    pub async fn set_status(
        &self,
        id: IncidentId,
        status: IncidentStatus,
    ) -> DispatchResult<Incident> {
        let incident = self
            .write(id, "set_status", IncidentPatch::status(status).touched(now()))
            .await?;
        tracing::debug!(incident_id = %id, %status, "incident status overridden");
        Ok(incident)
    }

    /// Field edits. A status in the patch goes through the same check as
    /// [`update_status`](Self::update_status).
    pub async fn update_incident(
        &self,
        id: IncidentId,
        patch: IncidentPatch,
    ) -> DispatchResult<Incident> {
        validate_incident_patch(&patch)?;
        if let Some(status) = patch.status {
            let current = self.require(id)?;
            if current.status != status && !current.status.can_transition_to(status) {
                return Err(DispatchError::invalid_transition(current.status, status));
            }
        }
        self.write(id, "update", patch.touched(now())).await
    }

    pub(crate) async fn write(
        &self,
        id: IncidentId,
        operation: &'static str,
        patch: IncidentPatch,
    ) -> DispatchResult<Incident> {
        let updated = self
            .table
            .store()
            .update_incident(id, patch)
            .await
            .map_err(|err| self.table.write_failed(operation, id, err))?;
        self.table.cache().replace(updated.clone());
        Ok(updated)
    }
}
