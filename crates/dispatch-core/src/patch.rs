//! Partial updates sent to the store. Only the fields that are set are written.

use crate::domain::{
    Incident, IncidentPriority, IncidentStatus, Resource, ResourceStatus, ResourceType,
};
use crate::ids::{OwnerId, ResourceId};
use crate::time::Timestamp;
use dispatch_geo::Location;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResourceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<OwnerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl ResourcePatch {
    pub fn status(status: ResourceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn touched(mut self, at: Timestamp) -> Self {
        self.updated_at = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.resource_type.is_none()
            && self.status.is_none()
            && self.location.is_none()
            && self.owner_id.is_none()
            && self.updated_at.is_none()
    }

    pub fn apply_to(&self, resource: &mut Resource) {
        if let Some(name) = &self.name {
            resource.name = name.clone();
        }
        if let Some(resource_type) = self.resource_type {
            resource.resource_type = resource_type;
        }
        if let Some(status) = self.status {
            resource.status = status;
        }
        if let Some(location) = &self.location {
            resource.location = location.clone();
        }
        if let Some(owner_id) = self.owner_id {
            resource.owner_id = Some(owner_id);
        }
        if let Some(updated_at) = self.updated_at {
            resource.updated_at = updated_at;
        }
    }
}

/// Incident update. Assignment slots are tri-state: absent (untouched), `Some(None)`
/// (cleared, written as an explicit null) or `Some(Some(id))`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IncidentStatus>,
    pub priority: Option<IncidentPriority>,
    pub reported_by: Option<String>,
    pub contact_number: Option<String>,
    pub location: Option<Location>,
    pub assignments: BTreeMap<ResourceType, Option<ResourceId>>,
    pub updated_at: Option<Timestamp>,
}

impl IncidentPatch {
    pub fn status(status: IncidentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_assignment(mut self, category: ResourceType, resource_id: Option<ResourceId>) -> Self {
        self.assignments.insert(category, resource_id);
        self
    }

    pub fn touched(mut self, at: Timestamp) -> Self {
        self.updated_at = Some(at);
        self
    }

    pub fn apply_to(&self, incident: &mut Incident) {
        if let Some(title) = &self.title {
            incident.title = title.clone();
        }
        if let Some(description) = &self.description {
            incident.description = description.clone();
        }
        if let Some(status) = self.status {
            incident.status = status;
        }
        if let Some(priority) = self.priority {
            incident.priority = priority;
        }
        if let Some(reported_by) = &self.reported_by {
            incident.reported_by = reported_by.clone();
        }
        if let Some(contact_number) = &self.contact_number {
            incident.contact_number = contact_number.clone();
        }
        if let Some(location) = &self.location {
            incident.location = location.clone();
        }
        for (category, value) in &self.assignments {
            incident.assignments.set(*category, *value);
        }
        if let Some(updated_at) = self.updated_at {
            incident.updated_at = updated_at;
        }
    }
}

impl Serialize for IncidentPatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(title) = &self.title {
            map.serialize_entry("title", title)?;
        }
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        if let Some(status) = &self.status {
            map.serialize_entry("status", status)?;
        }
        if let Some(priority) = &self.priority {
            map.serialize_entry("priority", priority)?;
        }
        if let Some(reported_by) = &self.reported_by {
            map.serialize_entry("reported_by", reported_by)?;
        }
        if let Some(contact_number) = &self.contact_number {
            map.serialize_entry("contact_number", contact_number)?;
        }
        if let Some(location) = &self.location {
            map.serialize_entry("location", location)?;
        }
        for (category, value) in &self.assignments {
            map.serialize_entry(category.assignment_column(), value)?;
        }
        if let Some(updated_at) = &self.updated_at {
            map.serialize_entry("updated_at", updated_at)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incident_patch_writes_explicit_null_for_cleared_slot() {
        let patch = IncidentPatch::status(IncidentStatus::Pending)
            .with_assignment(ResourceType::Ambulance, None);
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"status": "pending", "assigned_ambulance_id": null})
        );
    }

    #[test]
    fn resource_patch_omits_unset_fields() {
        let value = serde_json::to_value(ResourcePatch::status(ResourceStatus::InUse)).unwrap();
        assert_eq!(value, serde_json::json!({"status": "in_use"}));
    }
}
