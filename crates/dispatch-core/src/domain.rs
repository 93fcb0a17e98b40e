use crate::assignment::Assignments;
use crate::ids::{IncidentId, OwnerId, ResourceId};
use crate::time::Timestamp;
use dispatch_geo::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Ambulance,
    FireTruck,
    PoliceVehicle,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ambulance => "ambulance",
            Self::FireTruck => "fire_truck",
            Self::PoliceVehicle => "police_vehicle",
        }
    }

    /// Incident column holding the assignment for this category.
    pub fn assignment_column(self) -> &'static str {
        match self {
            Self::Ambulance => "assigned_ambulance_id",
            Self::FireTruck => "assigned_fire_truck_id",
            Self::PoliceVehicle => "assigned_police_vehicle_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Available,
    InUse,
    Maintenance,
    Offline,
}

impl ResourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in_use",
            Self::Maintenance => "maintenance",
            Self::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Pending,
    Assigned,
    InProgress,
    Resolved,
    Cancelled,
}

impl IncidentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }

    /// Edges of the incident lifecycle:
    /// pending -> assigned -> in_progress -> resolved, with cancelled reachable from any
    /// non-terminal state. Staying put is not an edge.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Assigned)
                | (Self::Pending, Self::InProgress)
                | (Self::Assigned, Self::InProgress)
                | (Self::InProgress, Self::Resolved)
                | (Self::Pending, Self::Cancelled)
                | (Self::Assigned, Self::Cancelled)
                | (Self::InProgress, Self::Cancelled)
        )
    }

    /// States in which a unit may still be bound to the incident.
    pub fn accepts_assignment(self) -> bool {
        matches!(self, Self::Pending | Self::Assigned | Self::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentPriority {
    Low,
    Medium,
    High,
}

impl IncidentPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

macro_rules! display_from_str {
    ($name:ident, [$($variant:ident),+ $(,)?]) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
                [$(Self::$variant),+]
                    .into_iter()
                    .find(|candidate| candidate.as_str() == normalized)
                    .ok_or(())
            }
        }
    };
}

display_from_str!(ResourceType, [Ambulance, FireTruck, PoliceVehicle]);
display_from_str!(ResourceStatus, [Available, InUse, Maintenance, Offline]);
display_from_str!(IncidentStatus, [Pending, Assigned, InProgress, Resolved, Cancelled]);
display_from_str!(IncidentPriority, [Low, Medium, High]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub status: ResourceStatus,
    pub location: Location,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Resource {
    pub fn is_available(&self) -> bool {
        self.status == ResourceStatus::Available
    }
}

/// A resource as submitted by the operator, before the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub status: ResourceStatus,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<OwnerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: IncidentStatus,
    pub priority: IncidentPriority,
    pub reported_by: String,
    #[serde(default)]
    pub contact_number: String,
    pub location: Location,
    #[serde(flatten)]
    pub assignments: Assignments,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Incident {
    pub fn assigned(&self, category: ResourceType) -> Option<ResourceId> {
        self.assignments.get(category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: IncidentPriority,
    pub reported_by: String,
    #[serde(default)]
    pub contact_number: String,
    pub location: Location,
}

impl NewIncident {
    /// New incidents always enter the lifecycle as pending.
    pub fn initial_status(&self) -> IncidentStatus {
        IncidentStatus::Pending
    }
}
