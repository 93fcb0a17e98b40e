//! Read-only projections over the registry caches, shaped for the dashboard and map.

use dispatch_core::{
    Incident, IncidentId, IncidentPriority, IncidentStatus, Location, Resource, ResourceId,
    ResourceStatus, ResourceType,
};
use dispatch_geo::BoundingBox;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub available: usize,
    pub in_use: usize,
    pub maintenance: usize,
    pub offline: usize,
}

impl StatusCounts {
    fn record(&mut self, status: ResourceStatus) {
        match status {
            ResourceStatus::Available => self.available += 1,
            ResourceStatus::InUse => self.in_use += 1,
            ResourceStatus::Maintenance => self.maintenance += 1,
            ResourceStatus::Offline => self.offline += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub filter: Option<ResourceType>,
    pub total_resources: usize,
    pub resources_by_status: StatusCounts,
    pub total_incidents: usize,
    pub active_incidents: usize,
    pub pending_incidents: usize,
    pub recent_incidents: Vec<Incident>,
}

/// With a filter, only resources of that type count, and only incidents holding a unit of
/// that type. `incidents` must already be newest first.
pub fn summarize(
    resources: &[Resource],
    incidents: &[Incident],
    filter: Option<ResourceType>,
    recent: usize,
) -> DashboardSummary {
    let mut resources_by_status = StatusCounts::default();
    let mut total_resources = 0;
    for resource in resources
        .iter()
        .filter(|resource| filter.is_none_or(|kind| resource.resource_type == kind))
    {
        total_resources += 1;
        resources_by_status.record(resource.status);
    }

    let matching: Vec<&Incident> = incidents
        .iter()
        .filter(|incident| filter.is_none_or(|kind| incident.assigned(kind).is_some()))
        .collect();

    DashboardSummary {
        filter,
        total_resources,
        resources_by_status,
        total_incidents: matching.len(),
        active_incidents: count_status(&matching, IncidentStatus::InProgress),
        pending_incidents: count_status(&matching, IncidentStatus::Pending),
        recent_incidents: matching.into_iter().take(recent).cloned().collect(),
    }
}

fn count_status(incidents: &[&Incident], status: IncidentStatus) -> usize {
    incidents
        .iter()
        .filter(|incident| incident.status == status)
        .count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapMarker {
    Resource {
        id: ResourceId,
        name: String,
        resource_type: ResourceType,
        status: ResourceStatus,
        location: Location,
    },
    Incident {
        id: IncidentId,
        title: String,
        priority: IncidentPriority,
        status: IncidentStatus,
        location: Location,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub markers: Vec<MapMarker>,
    /// Viewport that fits every available unit; `None` when nothing is available.
    pub available_bounds: Option<BoundingBox>,
}

/// Every resource plus every incident that is still open.
pub fn map_view(resources: &[Resource], incidents: &[Incident]) -> MapView {
    let resource_markers = resources.iter().map(|resource| MapMarker::Resource {
        id: resource.id,
        name: resource.name.clone(),
        resource_type: resource.resource_type,
        status: resource.status,
        location: resource.location.clone(),
    });
    let incident_markers = incidents
        .iter()
        .filter(|incident| !incident.status.is_terminal())
        .map(|incident| MapMarker::Incident {
            id: incident.id,
            title: incident.title.clone(),
            priority: incident.priority,
            status: incident.status,
            location: incident.location.clone(),
        });

    MapView {
        markers: resource_markers.chain(incident_markers).collect(),
        available_bounds: BoundingBox::enclosing(
            resources
                .iter()
                .filter(|resource| resource.is_available())
                .map(|resource| &resource.location),
        ),
    }
}

/// An incident slot naming a resource the registry no longer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DanglingAssignment {
    pub incident_id: IncidentId,
    pub category: ResourceType,
    pub resource_id: ResourceId,
}

pub fn dangling_assignments(incidents: &[Incident], resources: &[Resource]) -> Vec<DanglingAssignment> {
    incidents
        .iter()
        .flat_map(|incident| {
            incident.assignments.iter().map(move |assignment| DanglingAssignment {
                incident_id: incident.id,
                category: assignment.category,
                resource_id: assignment.resource_id,
            })
        })
        .filter(|slot| !resources.iter().any(|resource| resource.id == slot.resource_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::{now, Assignments};

    fn resource(name: &str, resource_type: ResourceType, status: ResourceStatus, lat: f64, lng: f64) -> Resource {
        let stamp = now();
        Resource {
            id: ResourceId::new(),
            name: name.to_string(),
            resource_type,
            status,
            location: Location::new(lat, lng, "Depot"),
            owner_id: None,
            created_at: stamp,
            updated_at: stamp,
        }
    }

    fn incident(title: &str, status: IncidentStatus, assignments: Assignments) -> Incident {
        let stamp = now();
        Incident {
            id: IncidentId::new(),
            title: title.to_string(),
            description: String::new(),
            status,
            priority: IncidentPriority::Low,
            reported_by: "Operator".to_string(),
            contact_number: String::new(),
            location: Location::new(10.0, 10.0, "Scene"),
            assignments,
            created_at: stamp,
            updated_at: stamp,
        }
    }

    fn holding(category: ResourceType, resource_id: ResourceId) -> Assignments {
        let mut assignments = Assignments::default();
        assignments.assign(category, resource_id);
        assignments
    }

    #[test]
    fn summary_counts_everything_without_filter() {
        let ambulance = resource("Ambulance 1", ResourceType::Ambulance, ResourceStatus::InUse, 0.0, 0.0);
        let resources = vec![
            ambulance.clone(),
            resource("Engine 2", ResourceType::FireTruck, ResourceStatus::Available, 0.0, 0.0),
            resource("Patrol 3", ResourceType::PoliceVehicle, ResourceStatus::Offline, 0.0, 0.0),
        ];
        let incidents = vec![
            incident("Newest", IncidentStatus::Pending, Assignments::default()),
            incident("Middle", IncidentStatus::InProgress, holding(ResourceType::Ambulance, ambulance.id)),
            incident("Oldest", IncidentStatus::Resolved, Assignments::default()),
        ];

        let summary = summarize(&resources, &incidents, None, 2);
        assert_eq!(summary.total_resources, 3);
        assert_eq!(summary.resources_by_status.available, 1);
        assert_eq!(summary.resources_by_status.in_use, 1);
        assert_eq!(summary.resources_by_status.offline, 1);
        assert_eq!(summary.total_incidents, 3);
        assert_eq!(summary.active_incidents, 1);
        assert_eq!(summary.pending_incidents, 1);
        let titles: Vec<_> = summary.recent_incidents.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Newest", "Middle"]);
    }

    #[test]
    fn type_filter_narrows_resources_and_incidents() {
        let ambulance = resource("Ambulance 1", ResourceType::Ambulance, ResourceStatus::InUse, 0.0, 0.0);
        let resources = vec![
            ambulance.clone(),
            resource("Engine 2", ResourceType::FireTruck, ResourceStatus::Available, 0.0, 0.0),
        ];
        let incidents = vec![
            incident("Unassigned", IncidentStatus::Pending, Assignments::default()),
            incident("Medical", IncidentStatus::InProgress, holding(ResourceType::Ambulance, ambulance.id)),
        ];

        let summary = summarize(&resources, &incidents, Some(ResourceType::Ambulance), 10);
        assert_eq!(summary.total_resources, 1);
        assert_eq!(summary.total_incidents, 1);
        assert_eq!(summary.pending_incidents, 0);
        assert_eq!(summary.recent_incidents[0].title, "Medical");
    }

    #[test]
    fn map_hides_closed_incidents_and_fits_available_units() {
        let resources = vec![
            resource("North", ResourceType::Ambulance, ResourceStatus::Available, 40.0, -74.0),
            resource("South", ResourceType::Ambulance, ResourceStatus::Available, 39.0, -75.0),
            resource("Busy", ResourceType::Ambulance, ResourceStatus::InUse, 60.0, 10.0),
        ];
        let incidents = vec![
            incident("Open", IncidentStatus::Pending, Assignments::default()),
            incident("Closed", IncidentStatus::Cancelled, Assignments::default()),
        ];

        let view = map_view(&resources, &incidents);
        assert_eq!(view.markers.len(), 4);
        let bounds = view.available_bounds.unwrap();
        assert_eq!((bounds.north, bounds.south), (40.0, 39.0));
        assert_eq!((bounds.east, bounds.west), (-74.0, -75.0));

        assert!(map_view(&resources[2..], &[]).available_bounds.is_none());
    }

    #[test]
    fn dangling_slots_are_reported_not_cleared() {
        let kept = resource("Ambulance 1", ResourceType::Ambulance, ResourceStatus::InUse, 0.0, 0.0);
        let gone = ResourceId::new();
        let mut assignments = holding(ResourceType::Ambulance, kept.id);
        assignments.assign(ResourceType::FireTruck, gone);
        let incidents = vec![incident("Fire", IncidentStatus::InProgress, assignments)];

        let dangling = dangling_assignments(&incidents, &[kept]);
        assert_eq!(
            dangling,
            vec![DanglingAssignment {
                incident_id: incidents[0].id,
                category: ResourceType::FireTruck,
                resource_id: gone,
            }]
        );
        assert_eq!(incidents[0].assigned(ResourceType::FireTruck), Some(gone));
    }
}
