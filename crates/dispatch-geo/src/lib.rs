use serde::{Deserialize, Serialize};
use std::fmt;

pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("address is required")]
    MissingAddress,
    #[error("unrecognised location value: {0}")]
    Unparseable(String),
}

/// Position of a resource or incident. Embedded in both records, never stored on its own.
///
/// Every read goes through [`parse_location`] (via `Deserialize`), so rows that still carry
/// the legacy `"lat,lng"` text encoding come out in the same structured shape as the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, address: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            address: address.into(),
        }
    }

    pub fn validate_coordinates(&self) -> Result<(), LocationError> {
        if !in_range(self.latitude, LATITUDE_RANGE) {
            return Err(LocationError::LatitudeOutOfRange(self.latitude));
        }
        if !in_range(self.longitude, LONGITUDE_RANGE) {
            return Err(LocationError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }

    /// Checks applied when a location is created or edited: coordinates in range and a
    /// non-blank address.
    pub fn validate(&self) -> Result<(), LocationError> {
        self.validate_coordinates()?;
        if self.address.trim().is_empty() {
            return Err(LocationError::MissingAddress);
        }
        Ok(())
    }

    /// Great-circle (haversine) distance in kilometres.
    pub fn distance_km(&self, other: &Location) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Address when present, otherwise `"lat, lng"`.
    pub fn label(&self) -> String {
        if self.address.trim().is_empty() {
            format!("{}, {}", self.latitude, self.longitude)
        } else {
            self.address.clone()
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Deserialize)]
struct StructuredLocation {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLocation {
    Structured(StructuredLocation),
    Text(String),
}

impl TryFrom<RawLocation> for Location {
    type Error = LocationError;

    fn try_from(value: RawLocation) -> Result<Self, Self::Error> {
        match value {
            RawLocation::Structured(structured) => Ok(structured.into()),
            RawLocation::Text(text) => parse_location(&text),
        }
    }
}

impl From<StructuredLocation> for Location {
    fn from(value: StructuredLocation) -> Self {
        Self {
            latitude: value.latitude,
            longitude: value.longitude,
            address: value.address.unwrap_or_default(),
        }
    }
}

/// Normalizes the textual encodings a store row may hold: a JSON object serialized into a
/// string, or the legacy `"lat,lng"` pair (address left empty).
pub fn parse_location(raw: &str) -> Result<Location, LocationError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str::<StructuredLocation>(trimmed)
            .map(Location::from)
            .map_err(|_| LocationError::Unparseable(trimmed.to_string()));
    }

    let Some((lat, lng)) = trimmed.split_once(',') else {
        return Err(LocationError::Unparseable(trimmed.to_string()));
    };
    let latitude = parse_coordinate(lat, trimmed)?;
    let longitude = parse_coordinate(lng, trimmed)?;
    Ok(Location::new(latitude, longitude, String::new()))
}

fn parse_coordinate(value: &str, raw: &str) -> Result<f64, LocationError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| LocationError::Unparseable(raw.to_string()))
}

fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
    value.is_finite() && value >= min && value <= max
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn contains(&self, location: &Location) -> bool {
        location.latitude <= self.north
            && location.latitude >= self.south
            && location.longitude <= self.east
            && location.longitude >= self.west
    }

    /// Smallest box holding every location, `None` for an empty input.
    pub fn enclosing<'a>(locations: impl IntoIterator<Item = &'a Location>) -> Option<Self> {
        locations.into_iter().fold(None, |acc, location| {
            Some(match acc {
                None => Self {
                    north: location.latitude,
                    south: location.latitude,
                    east: location.longitude,
                    west: location.longitude,
                },
                Some(bounds) => Self {
                    north: bounds.north.max(location.latitude),
                    south: bounds.south.min(location.latitude),
                    east: bounds.east.max(location.longitude),
                    west: bounds.west.min(location.longitude),
                },
            })
        })
    }
}
