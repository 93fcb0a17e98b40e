use crate::domain::ResourceType;
use crate::ids::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub category: ResourceType,
    pub resource_id: ResourceId,
}

/// Units bound to an incident, at most one per category.
///
/// On the wire this is the three nullable `assigned_*_id` columns; in memory it is keyed
/// by category so there is one place that knows the category/column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AssignmentColumns", into = "AssignmentColumns")]
pub struct Assignments {
    slots: BTreeMap<ResourceType, ResourceId>,
}

impl Assignments {
    pub fn get(&self, category: ResourceType) -> Option<ResourceId> {
        self.slots.get(&category).copied()
    }

    /// Binds `resource_id` to the category slot, returning whatever was there before.
    pub fn assign(&mut self, category: ResourceType, resource_id: ResourceId) -> Option<ResourceId> {
        self.slots.insert(category, resource_id)
    }

    /// Sets the slot to `value`, clearing it on `None`.
    pub fn set(&mut self, category: ResourceType, value: Option<ResourceId>) {
        match value {
            Some(resource_id) => {
                self.slots.insert(category, resource_id);
            }
            None => {
                self.slots.remove(&category);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Assignment> + '_ {
        self.slots.iter().map(|(category, resource_id)| Assignment {
            category: *category,
            resource_id: *resource_id,
        })
    }
}

/// Column layout of the assignment slots in the `incidents` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentColumns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_ambulance_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_fire_truck_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_police_vehicle_id: Option<ResourceId>,
}

impl From<AssignmentColumns> for Assignments {
    fn from(value: AssignmentColumns) -> Self {
        let mut assignments = Self::default();
        assignments.set(ResourceType::Ambulance, value.assigned_ambulance_id);
        assignments.set(ResourceType::FireTruck, value.assigned_fire_truck_id);
        assignments.set(ResourceType::PoliceVehicle, value.assigned_police_vehicle_id);
        assignments
    }
}

impl From<Assignments> for AssignmentColumns {
    fn from(value: Assignments) -> Self {
        Self {
            assigned_ambulance_id: value.get(ResourceType::Ambulance),
            assigned_fire_truck_id: value.get(ResourceType::FireTruck),
            assigned_police_vehicle_id: value.get(ResourceType::PoliceVehicle),
        }
    }
}
