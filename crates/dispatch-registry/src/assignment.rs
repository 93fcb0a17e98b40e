use crate::dashboard::{self, DanglingAssignment, DashboardSummary, MapView};
use crate::incidents::IncidentRegistry;
use crate::resources::ResourceRegistry;
use dispatch_core::{
    now, DispatchError, DispatchResult, Incident, IncidentId, IncidentPatch, IncidentStatus,
    Resource, ResourceId, ResourceStatus, ResourceType,
};
use dispatch_observability::ASSIGNMENTS_TOTAL;
use dispatch_storage::DispatchStore;
use serde::Serialize;
use std::sync::Arc;

/// Both sides of a completed assignment, as the store returned them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentReceipt {
    pub incident: Incident,
    pub resource: Resource,
}

/// Coordinates the two registries. Binding a unit to an incident is the one operation
/// that writes both tables.
#[derive(Clone)]
pub struct Dispatcher {
    resources: ResourceRegistry,
    incidents: IncidentRegistry,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        Self {
            resources: ResourceRegistry::new(store.clone()),
            incidents: IncidentRegistry::new(store),
        }
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn incidents(&self) -> &IncidentRegistry {
        &self.incidents
    }

    /// Mounts both registries. Both are attempted; the first failure is returned.
    pub async fn mount(&self) -> DispatchResult<()> {
        let resources = self.resources.mount().await;
        let incidents = self.incidents.mount().await;
        resources.and(incidents)
    }

    pub fn teardown(&self) {
        self.resources.teardown();
        self.incidents.teardown();
    }

    /// Binds `resource_id` to `incident_id`: the incident moves to in_progress with the
    /// unit in its category slot, then the unit moves to in_use.
    ///
    /// The two writes are not atomic. If the unit write fails the incident write is
    /// reverted; if that revert also fails the error is [`Inconsistent`] and the pair
    /// needs an operator.
    ///
    /// [`Inconsistent`]: dispatch_core::ErrorCode::Inconsistent
    pub async fn assign(
        &self,
        incident_id: IncidentId,
        resource_id: ResourceId,
    ) -> DispatchResult<AssignmentReceipt> {
        let (incident, resource) = match self.check_assignable(incident_id, resource_id) {
            Ok(pair) => pair,
            Err(err) => {
                record_outcome("rejected");
                return Err(err);
            }
        };
        let category = resource.resource_type;

        let engaged = IncidentPatch::status(IncidentStatus::InProgress)
            .with_assignment(category, Some(resource.id))
            .touched(now());
        let updated_incident = match self.incidents.write(incident.id, "assign", engaged).await {
            Ok(updated) => updated,
            Err(err) => {
                record_outcome("rejected");
                return Err(err);
            }
        };

        match self
            .resources
            .set_status(resource.id, ResourceStatus::InUse, Some(incident.id))
            .await
        {
            Ok(updated_resource) => {
                record_outcome("completed");
                tracing::info!(
                    incident_id = %incident.id,
                    resource_id = %resource.id,
                    %category,
                    "resource assigned"
                );
                Ok(AssignmentReceipt {
                    incident: updated_incident,
                    resource: updated_resource,
                })
            }
            Err(err) => self.roll_back(&incident, category, err).await,
        }
    }

    fn check_assignable(
        &self,
        incident_id: IncidentId,
        resource_id: ResourceId,
    ) -> DispatchResult<(Incident, Resource)> {
        let incident = self.incidents.require(incident_id)?;
        let resource = self
            .resources
            .get(resource_id)
            .ok_or_else(|| DispatchError::not_found(format!("resource {resource_id} not found")))?;

        if !resource.is_available() {
            return Err(DispatchError::conflict(format!(
                "{} is {}, not available",
                resource.name, resource.status
            )));
        }
        if !incident.status.accepts_assignment() {
            return Err(DispatchError::invalid_transition(
                incident.status,
                IncidentStatus::InProgress,
            ));
        }
        Ok((incident, resource))
    }

    /// Restores the incident's previous status and slot after the unit write failed.
    async fn roll_back(
        &self,
        before: &Incident,
        category: ResourceType,
        cause: DispatchError,
    ) -> DispatchResult<AssignmentReceipt> {
        let restore = IncidentPatch::status(before.status)
            .with_assignment(category, before.assigned(category))
            .touched(now());

        match self.incidents.write(before.id, "assign_rollback", restore).await {
            Ok(_) => {
                record_outcome("rolled_back");
                tracing::warn!(
                    incident_id = %before.id,
                    error = %cause.message,
                    "assignment rolled back"
                );
                Err(cause.context("assignment rolled back"))
            }
            Err(rollback) => {
                record_outcome("inconsistent");
                tracing::error!(
                    incident_id = %before.id,
                    %category,
                    error = %cause.message,
                    rollback_error = %rollback.message,
                    "assignment left inconsistent"
                );
                Err(DispatchError::inconsistent(format!(
                    "incident {} lists a {category} that was never engaged ({}); reverting it \
                     also failed ({})",
                    before.id, cause.message, rollback.message
                )))
            }
        }
    }

    /// Puts a unit back in service after its incident is closed.
    pub async fn release(&self, resource_id: ResourceId) -> DispatchResult<Resource> {
        self.resources
            .set_status(resource_id, ResourceStatus::Available, None)
            .await
    }

    /// Sets resolved regardless of the current status. Already resolved is a no-op.
    /// Assigned units stay in_use until released.
    pub async fn mark_resolved(&self, incident_id: IncidentId) -> DispatchResult<Incident> {
        let incident = self.incidents.require(incident_id)?;
        if incident.status == IncidentStatus::Resolved {
            return Ok(incident);
        }
        self.incidents
            .set_status(incident_id, IncidentStatus::Resolved)
            .await
    }

    /// Sets cancelled once `confirm` agrees. Returns `None` when the operator declined.
    /// Already cancelled is a no-op and skips the confirmation.
    pub async fn cancel_incident(
        &self,
        incident_id: IncidentId,
        confirm: impl FnOnce(&Incident) -> bool,
    ) -> DispatchResult<Option<Incident>> {
        let incident = self.incidents.require(incident_id)?;
        if incident.status == IncidentStatus::Cancelled {
            return Ok(Some(incident));
        }
        if !confirm(&incident) {
            tracing::debug!(%incident_id, "cancellation declined");
            return Ok(None);
        }
        self.incidents
            .set_status(incident_id, IncidentStatus::Cancelled)
            .await
            .map(Some)
    }

    /// Available units of one category, in cache order.
    pub fn available_for(&self, category: ResourceType) -> Vec<Resource> {
        self.resources
            .by_type(category)
            .into_iter()
            .filter(Resource::is_available)
            .collect()
    }

    /// Closest available unit of `category` to the incident, by great-circle distance.
    pub fn nearest_available(
        &self,
        incident_id: IncidentId,
        category: ResourceType,
    ) -> DispatchResult<Option<Resource>> {
        let incident = self.incidents.require(incident_id)?;
        Ok(self.available_for(category).into_iter().min_by(|a, b| {
            a.location
                .distance_km(&incident.location)
                .total_cmp(&b.location.distance_km(&incident.location))
        }))
    }

    pub fn dashboard(&self, filter: Option<ResourceType>, recent: usize) -> DashboardSummary {
        dashboard::summarize(
            &self.resources.resources(),
            &self.incidents.incidents(),
            filter,
            recent,
        )
    }

    pub fn map_view(&self) -> MapView {
        dashboard::map_view(&self.resources.resources(), &self.incidents.incidents())
    }

    pub fn dangling_assignments(&self) -> Vec<DanglingAssignment> {
        dashboard::dangling_assignments(&self.incidents.incidents(), &self.resources.resources())
    }
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!(ASSIGNMENTS_TOTAL, "outcome" => outcome).increment(1);
}
