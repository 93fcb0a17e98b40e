use crate::domain::{NewIncident, NewResource};
use crate::error::{DispatchError, DispatchResult};
use crate::patch::{IncidentPatch, ResourcePatch};

pub fn validate_new_resource(resource: &NewResource) -> DispatchResult<()> {
    require("resource name", &resource.name)?;
    resource.location.validate()?;
    Ok(())
}

/// Only the fields present in the patch are checked.
pub fn validate_resource_patch(patch: &ResourcePatch) -> DispatchResult<()> {
    if let Some(name) = &patch.name {
        require("resource name", name)?;
    }
    if let Some(location) = &patch.location {
        location.validate()?;
    }
    Ok(())
}

pub fn validate_new_incident(incident: &NewIncident) -> DispatchResult<()> {
    require("incident title", &incident.title)?;
    require("reporter name", &incident.reported_by)?;
    incident.location.validate()?;
    Ok(())
}

/// Same required fields as a new report, checked only when present.
pub fn validate_incident_patch(patch: &IncidentPatch) -> DispatchResult<()> {
    if let Some(title) = &patch.title {
        require("incident title", title)?;
    }
    if let Some(reported_by) = &patch.reported_by {
        require("reporter name", reported_by)?;
    }
    if let Some(location) = &patch.location {
        location.validate()?;
    }
    Ok(())
}

fn require(field: &str, value: &str) -> DispatchResult<()> {
    if value.trim().is_empty() {
        return Err(DispatchError::validation(format!("{field} is required")));
    }
    Ok(())
}
