pub mod assignment;
pub mod domain;
pub mod error;
pub mod ids;
pub mod patch;
pub mod time;
pub mod validation;

pub use assignment::{Assignment, AssignmentColumns, Assignments};
pub use dispatch_geo::Location;
pub use domain::{
    Incident, IncidentPriority, IncidentStatus, NewIncident, NewResource, Resource,
    ResourceStatus, ResourceType,
};
pub use error::{DispatchError, DispatchResult, ErrorCode};
pub use ids::{IncidentId, OwnerId, ResourceId};
pub use patch::{IncidentPatch, ResourcePatch};
pub use time::{now, Timestamp};
